//! Errors raised by the pipeline nodes.
//!
//! Running out of memory is not represented here: an allocation failure
//! aborts the process, which is the only sound outcome for a store that
//! can no longer uphold its invariants.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed entry text, an oversized frame or a payload that is not UTF-8.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer closed the connection before a whole frame arrived.
    #[error("connection closed mid-frame: expected {expected} bytes, received {received}")]
    Framing { expected: usize, received: usize },

    #[error("network failure: {0}")]
    Network(#[from] io::Error),

    /// Invalid dispatcher or endpoint configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn protocol(msg: impl ToString) -> Self {
        Error::Protocol(msg.to_string())
    }
}
