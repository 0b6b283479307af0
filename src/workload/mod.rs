//! The map-side workload run by every worker.
//!
//! Only word count exists; it is also what the standalone engine runs.

pub mod wc;
