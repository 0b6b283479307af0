//! A small distributed word-count pipeline (lite).
//!
//! A dispatcher splits an input stream into chunks and hands each chunk
//! to one of a fixed set of worker (mapper) nodes. Each worker normalizes
//! and counts its chunk into a fresh [`KeyCountStore`], then forwards the
//! partial counts as one length-prefixed frame to a single reducer node,
//! which merges every frame into one running tally.

pub mod cmd;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod reducer;
pub mod standalone;
pub mod store;
pub mod tally;
pub mod utils;
pub mod worker;
pub mod workload;

pub use error::{Error, Result};
pub use store::KeyCountStore;

/////////////////////////////////////////////////////////////////////////////
// Defaults shared by the binaries
/////////////////////////////////////////////////////////////////////////////

/// Number of bytes the dispatcher reads per chunk, and the most a worker
/// accepts from one connection.
pub const CHUNK_SIZE: usize = 1023;

/// Port the reducer listens on unless told otherwise.
pub const REDUCER_PORT: u16 = 5555;

/// Where workers forward their partial counts unless told otherwise.
pub const REDUCER_ADDR: &str = "127.0.0.1:5555";
