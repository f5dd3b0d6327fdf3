//! Core traits for bricks

mod driver;
mod from_row;
mod from_value;
mod to_value;

pub use driver::Driver;
pub use from_row::FromRow;
pub use from_value::FromValue;
pub use to_value::ToValue;
