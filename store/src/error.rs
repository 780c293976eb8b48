//! Error types for relationship store backends.
//!
//! These errors never reach pipeline callers: the store catches them and
//! degrades to the embedded fallback table instead.

use thiserror::Error;

/// Errors a graph backend can produce.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend was unreachable at construction time.
    #[error("backend connection failed: {0}")]
    ConnectionFailed(String),

    /// A query against a connected backend failed mid-session.
    #[error("backend query failed: {0}")]
    QueryFailed(String),

    /// Transport-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
