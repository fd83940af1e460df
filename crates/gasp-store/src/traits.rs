//! Storage trait: the interface the sync engine consumes.
//!
//! The engine never reads a temporary graph back. It only appends to,
//! validates, finalizes or discards graphs by ID, and queries the known-UTXO
//! set, which changes only as a side effect of `finalize_graph`.

use std::sync::Arc;

use async_trait::async_trait;
use gasp_core::{GraphId, GraphNode, NeededInputs, Outpoint, UtxoReference};

use crate::error::Result;

/// The storage collaborator.
///
/// All methods are async; every call is a suspension point for the engine.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Known UTXOs
    // ─────────────────────────────────────────────────────────────────────────

    /// UTXOs known to be unspent with a score after `since`.
    ///
    /// Unconfirmed (unscored) outputs are always returned, regardless of
    /// `since`, after the scored ones in ascending score order. `limit` is a
    /// page size: a page may run past it but must not split a group of equal
    /// scores (all unconfirmed outputs count as one group), since the next
    /// page is requested strictly after the highest score returned.
    async fn find_known_utxos(&self, since: u64, limit: Option<u32>) -> Result<Vec<UtxoReference>>;

    /// Build the graph node for an output.
    ///
    /// Without `wants_metadata`, metadata and input hashes are omitted.
    async fn hydrate_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode>;

    // ─────────────────────────────────────────────────────────────────────────
    // Temporary Graphs
    // ─────────────────────────────────────────────────────────────────────────

    /// Which inputs of `node` are still needed to complete its graph.
    ///
    /// `None` means the graph is complete and can be validated. An empty
    /// request means this node needs nothing more but other branches of the
    /// graph are still pending.
    async fn find_needed_inputs(&self, node: &GraphNode) -> Result<Option<NeededInputs>>;

    /// Append a node to its temporary graph.
    ///
    /// `spent_by` names the node that spends this one, unless this is the tip.
    /// Fails when the graph is unwanted or has grown too large.
    async fn append_to_graph(&self, node: &GraphNode, spent_by: Option<&Outpoint>) -> Result<()>;

    /// Check that the graph terminates only in proven or already trusted data.
    async fn validate_graph_anchor(&self, graph_id: &GraphId) -> Result<()>;

    /// Delete a temporary graph that failed to sync, if it exists.
    async fn discard_graph(&self, graph_id: &GraphId) -> Result<()>;

    /// Promote a temporary graph so its tip appears among the known UTXOs.
    async fn finalize_graph(&self, graph_id: &GraphId) -> Result<()>;
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    async fn find_known_utxos(&self, since: u64, limit: Option<u32>) -> Result<Vec<UtxoReference>> {
        (**self).find_known_utxos(since, limit).await
    }

    async fn hydrate_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode> {
        (**self)
            .hydrate_node(graph_id, txid, output_index, wants_metadata)
            .await
    }

    async fn find_needed_inputs(&self, node: &GraphNode) -> Result<Option<NeededInputs>> {
        (**self).find_needed_inputs(node).await
    }

    async fn append_to_graph(&self, node: &GraphNode, spent_by: Option<&Outpoint>) -> Result<()> {
        (**self).append_to_graph(node, spent_by).await
    }

    async fn validate_graph_anchor(&self, graph_id: &GraphId) -> Result<()> {
        (**self).validate_graph_anchor(graph_id).await
    }

    async fn discard_graph(&self, graph_id: &GraphId) -> Result<()> {
        (**self).discard_graph(graph_id).await
    }

    async fn finalize_graph(&self, graph_id: &GraphId) -> Result<()> {
        (**self).finalize_graph(graph_id).await
    }
}
