//! Protocol data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::outpoint::{GraphId, Outpoint};

/// An advertised unspent output.
///
/// `score` is an opaque, monotonically comparable cursor value (typically a
/// timestamp). Outputs without a score are unconfirmed and are never filtered
/// out by a `since` bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoReference {
    /// Transaction identifier.
    pub txid: String,
    /// Output index within the transaction.
    pub output_index: u32,
    /// Sync score, `None` when unconfirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
}

impl UtxoReference {
    /// Create a reference with a score.
    pub fn new(txid: impl Into<String>, output_index: u32, score: u64) -> Self {
        Self {
            txid: txid.into(),
            output_index,
            score: Some(score),
        }
    }

    /// Create a reference for an unconfirmed output.
    pub fn unconfirmed(txid: impl Into<String>, output_index: u32) -> Self {
        Self {
            txid: txid.into(),
            output_index,
            score: None,
        }
    }

    /// The canonical outpoint for this output.
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid.clone(), self.output_index)
    }

    /// Whether this output passes a `since` bound.
    ///
    /// Unconfirmed outputs always pass.
    pub fn is_at_or_after(&self, since: u64) -> bool {
        self.score.map_or(true, |score| score >= since)
    }

    /// Same transaction and output, ignoring score.
    pub fn same_output(&self, other: &UtxoReference) -> bool {
        self.txid == other.txid && self.output_index == other.output_index
    }
}

/// Metadata descriptor for one input of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMetadata {
    /// Hash of the metadata attached to the spent output.
    pub hash: String,
}

/// One transaction output together with the data needed to judge it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// The graph this node belongs to (outpoint of the graph tip).
    #[serde(rename = "graphID")]
    pub graph_id: GraphId,
    /// The transaction, hex encoded.
    #[serde(rename = "rawTx")]
    pub raw_tx: String,
    /// Index of the output within the transaction.
    #[serde(rename = "outputIndex")]
    pub output_index: u32,
    /// Merkle proof, when the transaction is mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    /// Transaction metadata, when requested.
    #[serde(rename = "txMetadata", default, skip_serializing_if = "Option::is_none")]
    pub tx_metadata: Option<String>,
    /// Output metadata, when requested.
    #[serde(rename = "outputMetadata", default, skip_serializing_if = "Option::is_none")]
    pub output_metadata: Option<String>,
    /// Inputs and their metadata hashes; only present when metadata was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<Outpoint, InputMetadata>>,
}

impl GraphNode {
    /// A node with no proof, metadata or inputs.
    pub fn new(graph_id: GraphId, raw_tx: impl Into<String>, output_index: u32) -> Self {
        Self {
            graph_id,
            raw_tx: raw_tx.into(),
            output_index,
            proof: None,
            tx_metadata: None,
            output_metadata: None,
            inputs: None,
        }
    }

    /// Whether this node is the tip of its graph, given its txid.
    pub fn is_tip(&self, txid: &str) -> bool {
        self.graph_id.txid == txid && self.graph_id.output_index == self.output_index
    }
}

/// How a requested input should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    /// Whether transaction and output metadata should accompany the node.
    #[serde(rename = "metadata")]
    pub wants_metadata: bool,
}

/// The inputs a party still needs to complete a graph.
///
/// The protocol passes `Option<NeededInputs>`; `None` means the graph is
/// self-sufficient from this node down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeededInputs {
    /// Requested outpoints.
    #[serde(rename = "requestedInputs")]
    pub requested_inputs: BTreeMap<Outpoint, InputRequest>,
}

impl NeededInputs {
    /// Build from `(outpoint, wants_metadata)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Outpoint, bool)>) -> Self {
        Self {
            requested_inputs: pairs
                .into_iter()
                .map(|(outpoint, wants_metadata)| (outpoint, InputRequest { wants_metadata }))
                .collect(),
        }
    }

    /// Number of requested inputs.
    pub fn len(&self) -> usize {
        self.requested_inputs.len()
    }

    /// Whether nothing is requested.
    pub fn is_empty(&self) -> bool {
        self.requested_inputs.is_empty()
    }
}
