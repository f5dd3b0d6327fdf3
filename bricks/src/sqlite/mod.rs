//! SQLite implementation for bricks

mod driver;
mod row;
mod types;

pub use driver::SqliteDriver;
