//! Error types for the store module.

use gasp_core::{CoreError, GraphId};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested output is not held by this store.
    #[error("output not found: {0}")]
    NotFound(String),

    /// The recipient does not want this graph (for example, its tip is already known).
    #[error("graph {0} is not wanted")]
    UnwantedGraph(GraphId),

    /// The temporary graph grew past the configured bound before finalization.
    #[error("graph {graph_id} exceeds {limit} nodes")]
    GraphTooLarge { graph_id: GraphId, limit: usize },

    /// The graph does not terminate in trusted data.
    #[error("graph {graph_id} is not anchored: {reason}")]
    Unanchored { graph_id: GraphId, reason: String },

    /// No temporary graph exists under this ID.
    #[error("no temporary graph for {0}")]
    MissingGraph(GraphId),

    /// Core data model error (bad outpoint, undecodable transaction).
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Error reported by a host-supplied backend.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
