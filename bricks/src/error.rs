//! Error types for bricks

use std::any::Any;

use thiserror::Error;

/// Result type alias for bricks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while acquiring connections, running statements,
/// projecting results or consuming row streams.
#[derive(Error, Debug)]
pub enum Error {
    /// A connection could not be acquired (exhausted, closed, unreachable).
    #[error("Pool error: {0}")]
    Pool(String),

    /// MySQL driver error, surfaced verbatim
    #[error(transparent)]
    MySql(#[from] mysql_async::Error),

    /// SQLite driver error, surfaced verbatim
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    /// An accessor's shape expectation was violated
    #[error("Cardinality error: expected {expected}, got {actual}")]
    Cardinality {
        expected: &'static str,
        actual: String,
    },

    /// Error raised by caller-supplied work
    #[error("{0}")]
    User(Box<dyn std::error::Error + Send + Sync>),

    /// Caller-supplied work panicked
    #[error("Work panicked: {0}")]
    Panic(String),

    /// The work failed and ROLLBACK failed as well
    #[error("{source} (rollback also failed: {rollback})")]
    Rollback {
        source: Box<Error>,
        rollback: Box<Error>,
    },

    /// A row stream's producer went away without a terminal event
    #[error("Row stream ended without a terminal event")]
    StreamAborted,

    /// A row sink rejected a forwarded row
    #[error("Sink error: {0}")]
    Sink(Box<dyn std::error::Error + Send + Sync>),

    /// The scope's connection was already handed back to the pool
    #[error("Connection already released")]
    Released,

    /// Type conversion error
    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion {
        expected: &'static str,
        actual: String,
    },

    /// Column not found in row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Statement could not be built
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid configuration or connection URL
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap any caller error (or message) as [`Error::User`].
    ///
    /// ```
    /// let err = bricks::Error::user("Intended rollback");
    /// assert_eq!(err.to_string(), "Intended rollback");
    /// ```
    pub fn user<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::User(err.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Error::Panic(message)
    }

    /// Acquisition failure.
    pub fn is_pool(&self) -> bool {
        matches!(self, Error::Pool(_))
    }

    /// The database rejected or failed a statement.
    pub fn is_driver(&self) -> bool {
        matches!(self, Error::MySql(_) | Error::Sqlite(_))
    }

    pub fn is_cardinality(&self) -> bool {
        matches!(self, Error::Cardinality { .. })
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Config(err.to_string())
    }
}
