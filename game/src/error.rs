use std::time::Duration;

use thiserror::Error;

/// Exception name the server is known to emit transiently on command
/// listings. Tolerated by bounded retry.
pub const TRANSIENT_EXCEPTION: &str = "Exception/DbException";

#[derive(Debug, Error)]
pub enum GameError {
    #[error("socket transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server exception: {0}")]
    Server(String),

    #[error("transient server error persisted after {attempts} attempts")]
    TransientRetriesExhausted { attempts: u32 },

    #[error("malformed server payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("socket connection closed")]
    ConnectionClosed,
}

impl GameError {
    /// Whether this is the known transient server exception that callers
    /// may retry transparently.
    pub fn is_transient(&self) -> bool {
        matches!(self, GameError::Server(kind) if kind == TRANSIENT_EXCEPTION)
    }
}
