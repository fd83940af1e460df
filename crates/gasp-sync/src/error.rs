//! Error types for the sync module.

use gasp_core::CoreError;
use gasp_store::StoreError;
use thiserror::Error;

use crate::messages::SyncErrorCode;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: current={local}, foreign={peer}")]
    VersionMismatch { local: u32, peer: u32 },

    /// A cursor or `since` value was not a non-negative integer.
    #[error("invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    /// Core data model error (outpoint or transaction decoding).
    #[error("core error: {0}")]
    CoreError(CoreError),

    /// Peer answered with an error.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: SyncErrorCode, message: String },

    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Encoding or decoding a wire message failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// No remote is attached to this engine.
    #[error("remote is disconnected")]
    Disconnected,
}

impl From<CoreError> for SyncError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidTimestamp(value) => SyncError::InvalidTimestamp(value),
            other => SyncError::CoreError(other),
        }
    }
}

/// Closed classification of sync failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Peers speak different protocol versions; aborts the pass.
    VersionMismatch,
    /// Malformed cursor value; rejected wherever it is validated.
    InvalidTimestamp,
    /// Anything scoped to a single item or round-trip.
    ItemFailure,
}

impl SyncError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            SyncError::InvalidTimestamp(_) => ErrorKind::InvalidTimestamp,
            SyncError::PeerError {
                code: SyncErrorCode::InvalidTimestamp,
                ..
            } => ErrorKind::InvalidTimestamp,
            _ => ErrorKind::ItemFailure,
        }
    }

    /// Wire code for this error.
    pub fn code(&self) -> SyncErrorCode {
        match self {
            SyncError::VersionMismatch { .. } => SyncErrorCode::VersionMismatch,
            SyncError::InvalidTimestamp(_) => SyncErrorCode::InvalidTimestamp,
            SyncError::StoreError(StoreError::NotFound(_)) => SyncErrorCode::NotFound,
            SyncError::StoreError(_) => SyncErrorCode::StoreError,
            SyncError::PeerError { code, .. } => *code,
            SyncError::InvalidMessage(_) | SyncError::Codec(_) | SyncError::CoreError(_) => {
                SyncErrorCode::InvalidMessage
            }
            SyncError::TransportError(_) | SyncError::Disconnected => SyncErrorCode::InternalError,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
