//! Error types for the GASP core.

use thiserror::Error;

/// Errors raised by the core data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An outpoint string was not of the form `<txid>.<index>`.
    #[error("invalid outpoint: {0}")]
    InvalidOutpoint(String),

    /// A cursor or `since` value was negative, fractional or not a number.
    #[error("invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// The raw transaction could not be decoded to compute its txid.
    #[error("malformed raw transaction: {0}")]
    MalformedTransaction(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
