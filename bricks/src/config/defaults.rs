//! Default configuration values - single source of truth

/// Maximum number of pooled connections
pub const POOL_SIZE: u32 = 10;

/// How long an acquire may wait for a free connection, in milliseconds
pub const ACQUIRE_TIMEOUT_MS: u64 = 30_000;

/// Prefix of environment variables read by `Config::load`
pub const ENV_PREFIX: &str = "BRICKS";

/// Config file looked up by `Config::load` when no path is given
pub const CONFIG_FILE: &str = "bricks";
