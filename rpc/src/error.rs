//! RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("node returned HTTP {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("no result for {0}")]
    MissingResult(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcError::Timeout(e.to_string())
        } else if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            RpcError::Status(status.as_u16())
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}
