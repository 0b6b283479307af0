//! Command-line arguments for each node binary.

pub mod dispatch;
pub mod reducer;
pub mod worker;
