//! Error types for topic queries.

use thiserror::Error;

/// Result type alias for topic operations.
pub type TopicResult<T> = Result<T, TopicError>;

/// Errors that can occur while exchanging a topic query.
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("topic i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("query of {0} bytes does not fit in a topic packet")]
    QueryTooLong(usize),

    #[error("malformed topic response: {0}")]
    Malformed(String),

    #[error("connection closed before a full response was received")]
    ConnectionClosed,
}
