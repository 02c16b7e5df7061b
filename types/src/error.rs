//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for ceremony types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CeremonyError {
    #[error("invalid answer code: {0}")]
    InvalidAnswer(u8),

    #[error("unknown session type: {0}")]
    UnknownSessionType(String),
}
