//! Database module for the SQLite marker cache.

mod markers;
mod pool;

pub use markers::*;
pub use pool::*;
