//! # Error Types
//!
//! Typed failures raised by the wire layer and by matrix validation. The
//! coordinator's session and binary layers wrap these in `anyhow::Error`.

use thiserror::Error;

/// Failure while reading or writing a length-prefixed frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Socket I/O failed, including EOF in the middle of a payload.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection after sending part of a length header.
    #[error("connection closed after {0} of 4 header bytes")]
    TruncatedHeader(usize),

    /// The declared payload length exceeds the frame limit.
    #[error("frame of {length} bytes exceeds limit of {limit} bytes")]
    TooLarge { length: usize, limit: usize },

    /// The payload did not decode into the expected message shape.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// A grid of values that is not a valid square matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("matrix has no rows")]
    Empty,

    #[error("row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
}
