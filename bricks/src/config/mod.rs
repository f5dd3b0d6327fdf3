//! Configuration for bricks

mod defaults;
mod settings;

pub use settings::{Config, PoolConfig};
