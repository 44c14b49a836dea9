//! Error types for Drishti

use thiserror::Error;

/// Framing failures while receiving a length-prefixed payload.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Peer closed after sending part of the 4-byte length prefix.
    #[error("length prefix truncated after {received} of 4 bytes")]
    TruncatedPrefix { received: usize },

    /// Peer closed before the declared body was fully received.
    #[error("peer closed mid-transfer ({received} of {expected} bytes received)")]
    Disconnected { received: usize, expected: usize },

    /// Declared body length exceeds the configured limit.
    #[error("declared payload of {declared} bytes exceeds limit of {limit} bytes")]
    Oversized { declared: usize, limit: usize },
}

/// Drishti error type
#[derive(Error, Debug)]
pub enum DrishtiError {
    #[error("Connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{command} returned no data")]
    NoData { command: String },

    #[error("Capture not ready after {polls} readiness checks")]
    NotReady { polls: u32 },

    #[error("Capture failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<DrishtiError>,
    },
}

impl From<toml::de::Error> for DrishtiError {
    fn from(e: toml::de::Error) -> Self {
        DrishtiError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DrishtiError>;
