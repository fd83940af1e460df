//! Recording storage wrapper.
//!
//! [`RecordingStorage`] wraps any [`Storage`], counts every call, records
//! appends and lifecycle decisions, and can be told to fail specific
//! operations. Scenario tests assert on what the engine asked of storage,
//! not only on the end state.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use gasp_core::{GraphId, GraphNode, NeededInputs, Outpoint, UtxoReference};
use gasp_store::{Result, Storage, StoreError};

/// Number of calls per storage operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub find_known_utxos: usize,
    pub hydrate_node: usize,
    pub find_needed_inputs: usize,
    pub append_to_graph: usize,
    pub validate_graph_anchor: usize,
    pub discard_graph: usize,
    pub finalize_graph: usize,
}

/// One `append_to_graph` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRecord {
    pub graph_id: GraphId,
    pub raw_tx: String,
    pub output_index: u32,
    pub spent_by: Option<Outpoint>,
}

#[derive(Debug, Default)]
struct Faults {
    hydrate: HashSet<String>,
    append: HashSet<String>,
    anchor: HashSet<GraphId>,
    request_all_inputs: bool,
}

#[derive(Debug, Default)]
struct Journal {
    counts: CallCounts,
    appends: Vec<AppendRecord>,
    discarded: Vec<GraphId>,
    finalized: Vec<GraphId>,
}

/// A storage wrapper that records calls and injects faults.
pub struct RecordingStorage<S> {
    inner: S,
    journal: Mutex<Journal>,
    faults: Mutex<Faults>,
}

impl<S: Storage> RecordingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            journal: Mutex::new(Journal::default()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// The wrapped storage.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make `hydrate_node` fail for this txid.
    pub fn fail_hydrate(&self, txid: impl Into<String>) {
        self.faults.lock().hydrate.insert(txid.into());
    }

    /// Make `append_to_graph` fail for nodes with this raw transaction.
    pub fn fail_append(&self, raw_tx: impl Into<String>) {
        self.faults.lock().append.insert(raw_tx.into());
    }

    /// Make `validate_graph_anchor` fail for this graph.
    pub fn fail_anchor(&self, graph_id: GraphId) {
        self.faults.lock().anchor.insert(graph_id);
    }

    /// Make `find_needed_inputs` request every input of an unproven node,
    /// even ones already held or already in the temporary graph.
    pub fn request_all_inputs(&self) {
        self.faults.lock().request_all_inputs = true;
    }

    pub fn counts(&self) -> CallCounts {
        self.journal.lock().counts
    }

    pub fn appends(&self) -> Vec<AppendRecord> {
        self.journal.lock().appends.clone()
    }

    /// How many times a node with this raw transaction was appended.
    pub fn append_count(&self, raw_tx: &str) -> usize {
        self.journal
            .lock()
            .appends
            .iter()
            .filter(|record| record.raw_tx == raw_tx)
            .count()
    }

    pub fn discarded(&self) -> Vec<GraphId> {
        self.journal.lock().discarded.clone()
    }

    pub fn finalized(&self) -> Vec<GraphId> {
        self.journal.lock().finalized.clone()
    }

    /// Forget everything recorded so far. Faults stay armed.
    pub fn reset(&self) {
        *self.journal.lock() = Journal::default();
    }

    fn record(&self, f: impl FnOnce(&mut Journal)) {
        f(&mut *self.journal.lock());
    }
}

#[async_trait]
impl<S: Storage> Storage for RecordingStorage<S> {
    async fn find_known_utxos(&self, since: u64, limit: Option<u32>) -> Result<Vec<UtxoReference>> {
        self.record(|j| j.counts.find_known_utxos += 1);
        self.inner.find_known_utxos(since, limit).await
    }

    async fn hydrate_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode> {
        self.record(|j| j.counts.hydrate_node += 1);
        let fail = self.faults.lock().hydrate.contains(txid);
        if fail {
            return Err(StoreError::Backend(format!("injected hydration failure for {txid}")));
        }
        self.inner
            .hydrate_node(graph_id, txid, output_index, wants_metadata)
            .await
    }

    async fn find_needed_inputs(&self, node: &GraphNode) -> Result<Option<NeededInputs>> {
        self.record(|j| j.counts.find_needed_inputs += 1);
        let greedy = self.faults.lock().request_all_inputs;
        if greedy && node.proof.is_none() {
            if let Some(inputs) = node.inputs.as_ref().filter(|inputs| !inputs.is_empty()) {
                return Ok(Some(NeededInputs::from_pairs(
                    inputs.keys().map(|input| (input.clone(), true)),
                )));
            }
        }
        self.inner.find_needed_inputs(node).await
    }

    async fn append_to_graph(&self, node: &GraphNode, spent_by: Option<&Outpoint>) -> Result<()> {
        self.record(|j| {
            j.counts.append_to_graph += 1;
            j.appends.push(AppendRecord {
                graph_id: node.graph_id.clone(),
                raw_tx: node.raw_tx.clone(),
                output_index: node.output_index,
                spent_by: spent_by.cloned(),
            });
        });
        let fail = self.faults.lock().append.contains(&node.raw_tx);
        if fail {
            return Err(StoreError::Backend(format!(
                "injected append failure for {}",
                node.raw_tx
            )));
        }
        self.inner.append_to_graph(node, spent_by).await
    }

    async fn validate_graph_anchor(&self, graph_id: &GraphId) -> Result<()> {
        self.record(|j| j.counts.validate_graph_anchor += 1);
        let fail = self.faults.lock().anchor.contains(graph_id);
        if fail {
            return Err(StoreError::Unanchored {
                graph_id: graph_id.clone(),
                reason: "injected anchor failure".into(),
            });
        }
        self.inner.validate_graph_anchor(graph_id).await
    }

    async fn discard_graph(&self, graph_id: &GraphId) -> Result<()> {
        self.record(|j| {
            j.counts.discard_graph += 1;
            j.discarded.push(graph_id.clone());
        });
        self.inner.discard_graph(graph_id).await
    }

    async fn finalize_graph(&self, graph_id: &GraphId) -> Result<()> {
        self.record(|j| {
            j.counts.finalize_graph += 1;
            j.finalized.push(graph_id.clone());
        });
        self.inner.finalize_graph(graph_id).await
    }
}
