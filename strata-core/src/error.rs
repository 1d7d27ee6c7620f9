//! Error types for the strata framework

use std::net::IpAddr;

use thiserror::Error;

use crate::kind::Kind;

/// Result type alias for strata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the strata framework
#[derive(Error, Debug)]
pub enum Error {
    /// Network I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before a declared header or field
    #[error("truncated input: needed {needed} more bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Write past the end of a fixed-capacity buffer
    #[error("buffer overflow: {requested} bytes requested, {capacity} byte capacity")]
    Overflow { requested: usize, capacity: usize },

    /// A field value the codec cannot accept
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A layer rejected the payload kind handed to it
    #[error("{parent} layer does not accept {child} payloads")]
    UnsupportedLayer { parent: Kind, child: Kind },

    /// Deadline reached while draining the capture handle
    #[error("timed out waiting for a matching frame")]
    Timeout,

    /// Next-hop resolution had nowhere to go
    #[error("no route to {0}")]
    NoRoute(IpAddr),

    /// Packet capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// A layer chain the composer cannot work with
    #[error("invalid layer chain: {0}")]
    InvalidChain(String),
}

impl Error {
    /// Create an invalid field error with a custom reason
    pub fn invalid_field<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Create a capture error with a custom message
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create an invalid chain error with a custom message
    pub fn invalid_chain<S: Into<String>>(msg: S) -> Self {
        Error::InvalidChain(msg.into())
    }
}
