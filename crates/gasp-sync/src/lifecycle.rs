//! Temporary graph lifecycle.

use gasp_core::GraphId;
use gasp_store::{Storage, StoreError};

use crate::engine::Gasp;
use crate::error::Result;
use crate::remote::Remote;

/// How a completed graph ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOutcome {
    /// Anchored and promoted into storage.
    Finalized,
    /// Rejected and dropped.
    Discarded,
}

impl<S: Storage, R: Remote> Gasp<S, R> {
    /// Validate and finalize a temporary graph, discarding it on any failure.
    ///
    /// Only a failing discard is returned as an error.
    pub async fn complete_graph(&self, graph_id: &GraphId) -> Result<GraphOutcome> {
        self.log
            .info(format_args!("completing newly-synced graph {graph_id}"));
        match self.finalize_anchored(graph_id).await {
            Ok(()) => {
                self.log
                    .info(format_args!("graph {graph_id} validated and finalized"));
                Ok(GraphOutcome::Finalized)
            }
            Err(e) => {
                self.log.warn(format_args!(
                    "error validating graph {graph_id}: {e}; discarding"
                ));
                self.storage.discard_graph(graph_id).await?;
                Ok(GraphOutcome::Discarded)
            }
        }
    }

    async fn finalize_anchored(&self, graph_id: &GraphId) -> std::result::Result<(), StoreError> {
        self.storage.validate_graph_anchor(graph_id).await?;
        self.log
            .debug(format_args!("graph {graph_id} is anchored"));
        self.storage.finalize_graph(graph_id).await
    }
}
