//! Error types for siphon.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for all siphon operations.
///
/// Construction-time kinds (`InvalidArgument`, `OutOfRange`,
/// `UnknownEncoding`) are returned before any I/O is attempted. I/O kinds
/// surface through the pull chain and are delivered exactly once to the
/// caller driving the chain; every one of them is terminal for the whole
/// chain, with no automatic retry.
#[derive(Debug, Error)]
pub enum SiphonError {
    /// An option value is structurally invalid (missing path, zero buffer
    /// capacity, and similar).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Start offset must be non-negative.
    #[error("start offset out of range: {start} (must be >= 0)")]
    OutOfRange {
        /// The rejected offset.
        start: i64,
    },

    /// Encoding name is not in the known set.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Opening the origin or destination failed.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading from the origin failed.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the destination failed.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// Closing a descriptor failed. Delivered through the same path as
    /// read/write failures, including when it happens while tearing down
    /// after a clean end of input.
    #[error("close failed: {0}")]
    Close(#[source] std::io::Error),

    /// The destination kept confirming zero-byte writes without reporting
    /// an error.
    #[error("write stalled: no progress after {retries} zero-byte writes")]
    WriteStalled {
        /// Number of consecutive zero-byte confirmations observed.
        retries: u32,
    },

    /// A pull was issued on a terminated link, a sink was bound twice, or
    /// the chain was driven before binding.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// Result type alias using SiphonError.
pub type Result<T> = std::result::Result<T, SiphonError>;
