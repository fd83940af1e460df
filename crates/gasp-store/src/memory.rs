//! In-memory implementation of the Storage trait.
//!
//! Keeps known outputs, ancestor transactions and temporary graphs in memory
//! with no persistence. Anchoring follows SPV rules: a node is trusted when it
//! carries a proof or is already held by the store, and a graph is anchored
//! when every path from its tip reaches a trusted node.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use gasp_core::{
    DoubleSha256, GraphId, GraphNode, InputMetadata, NeededInputs, Outpoint, TxidHasher,
    UtxoReference,
};

use crate::error::{Result, StoreError};
use crate::traits::Storage;

/// Default bound on the number of nodes in one temporary graph.
pub const DEFAULT_MAX_GRAPH_NODES: usize = 1000;

/// A transaction output as held by [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOutput {
    pub txid: String,
    pub output_index: u32,
    pub score: Option<u64>,
    pub raw_tx: String,
    pub proof: Option<String>,
    pub tx_metadata: Option<String>,
    pub output_metadata: Option<String>,
    pub inputs: BTreeMap<Outpoint, InputMetadata>,
}

impl StoredOutput {
    /// An unproven, unscored output with no inputs.
    pub fn new(txid: impl Into<String>, output_index: u32, raw_tx: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            output_index,
            score: None,
            raw_tx: raw_tx.into(),
            proof: None,
            tx_metadata: None,
            output_metadata: None,
            inputs: BTreeMap::new(),
        }
    }

    /// Set the sync score.
    pub fn with_score(mut self, score: u64) -> Self {
        self.score = Some(score);
        self
    }

    /// Attach a merkle proof.
    pub fn with_proof(mut self, proof: impl Into<String>) -> Self {
        self.proof = Some(proof.into());
        self
    }

    /// Attach transaction and output metadata.
    pub fn with_metadata(mut self, tx: impl Into<String>, output: impl Into<String>) -> Self {
        self.tx_metadata = Some(tx.into());
        self.output_metadata = Some(output.into());
        self
    }

    /// Record an input spent by this transaction.
    pub fn with_input(mut self, outpoint: Outpoint, hash: impl Into<String>) -> Self {
        self.inputs.insert(outpoint, InputMetadata { hash: hash.into() });
        self
    }

    /// Canonical outpoint of this output.
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid.clone(), self.output_index)
    }

    /// The reference advertised to peers.
    pub fn reference(&self) -> UtxoReference {
        UtxoReference {
            txid: self.txid.clone(),
            output_index: self.output_index,
            score: self.score,
        }
    }

    /// Hydrate as a graph node.
    pub fn to_node(&self, graph_id: &GraphId, wants_metadata: bool) -> GraphNode {
        GraphNode {
            graph_id: graph_id.clone(),
            raw_tx: self.raw_tx.clone(),
            output_index: self.output_index,
            proof: self.proof.clone(),
            tx_metadata: wants_metadata.then(|| self.tx_metadata.clone()).flatten(),
            output_metadata: wants_metadata.then(|| self.output_metadata.clone()).flatten(),
            inputs: wants_metadata.then(|| self.inputs.clone()),
        }
    }

    fn from_node(txid: String, node: &GraphNode) -> Self {
        Self {
            txid,
            output_index: node.output_index,
            score: None,
            raw_tx: node.raw_tx.clone(),
            proof: node.proof.clone(),
            tx_metadata: node.tx_metadata.clone(),
            output_metadata: node.output_metadata.clone(),
            inputs: node.inputs.clone().unwrap_or_default(),
        }
    }
}

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStorage {
    inner: RwLock<MemoryStorageInner>,
    hasher: Arc<dyn TxidHasher>,
    max_graph_nodes: usize,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Every output the store holds, spent or not.
    transactions: HashMap<Outpoint, StoredOutput>,

    /// Outputs currently unspent.
    utxos: BTreeSet<Outpoint>,

    /// Temporary graphs keyed by tip outpoint.
    graphs: HashMap<GraphId, TempGraph>,
}

#[derive(Default)]
struct TempGraph {
    nodes: BTreeMap<Outpoint, TempNode>,
}

struct TempNode {
    output: StoredOutput,
    spent_by: Option<Outpoint>,
}

impl MemoryStorage {
    /// Create an empty store using Bitcoin txid rules.
    pub fn new() -> Self {
        Self::with_hasher(DoubleSha256)
    }

    /// Create an empty store with a custom txid hasher.
    pub fn with_hasher(hasher: impl TxidHasher + 'static) -> Self {
        Self {
            inner: RwLock::new(MemoryStorageInner::default()),
            hasher: Arc::new(hasher),
            max_graph_nodes: DEFAULT_MAX_GRAPH_NODES,
        }
    }

    /// Bound the size of temporary graphs.
    pub fn with_max_graph_nodes(mut self, max: usize) -> Self {
        self.max_graph_nodes = max;
        self
    }

    /// Add an unspent output.
    pub fn insert_utxo(&self, output: StoredOutput) {
        let mut inner = self.inner.write();
        let outpoint = output.outpoint();
        inner.utxos.insert(outpoint.clone());
        inner.transactions.insert(outpoint, output);
    }

    /// Add an already spent ancestor output that can be served on request.
    pub fn insert_transaction(&self, output: StoredOutput) {
        let mut inner = self.inner.write();
        inner.transactions.insert(output.outpoint(), output);
    }

    /// Outpoints of all known unspent outputs, sorted.
    pub fn known_outpoints(&self) -> Vec<Outpoint> {
        self.inner.read().utxos.iter().cloned().collect()
    }

    /// Whether an output is held, spent or not.
    pub fn holds(&self, outpoint: &Outpoint) -> bool {
        self.inner.read().transactions.contains_key(outpoint)
    }

    /// Number of open temporary graphs.
    pub fn temp_graph_count(&self) -> usize {
        self.inner.read().graphs.len()
    }

    /// Number of nodes in a temporary graph, if it exists.
    pub fn temp_graph_len(&self, graph_id: &GraphId) -> Option<usize> {
        self.inner.read().graphs.get(graph_id).map(|g| g.nodes.len())
    }

    /// Nodes of a temporary graph with their spent-by references.
    pub fn temp_graph_nodes(&self, graph_id: &GraphId) -> Vec<(Outpoint, Option<Outpoint>)> {
        self.inner
            .read()
            .graphs
            .get(graph_id)
            .map(|g| {
                g.nodes
                    .iter()
                    .map(|(outpoint, node)| (outpoint.clone(), node.spent_by.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn node_outpoint(&self, node: &GraphNode) -> Result<Outpoint> {
        let txid = self.hasher.txid(&node.raw_tx)?;
        Ok(Outpoint::new(txid, node.output_index))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorageInner {
    /// Whether the tip of `graph` is anchored.
    ///
    /// Trust flows from proven or already held nodes to their spenders until
    /// nothing changes, so nodes on a cycle are never trusted. A node with an
    /// input that is neither held nor in the graph is never trusted either.
    fn is_anchored(&self, graph: &TempGraph, tip: &Outpoint) -> bool {
        let mut waiting: HashMap<&Outpoint, usize> = HashMap::new();
        let mut spenders: HashMap<&Outpoint, Vec<&Outpoint>> = HashMap::new();
        let mut trusted: Vec<&Outpoint> = Vec::new();

        for (outpoint, node) in &graph.nodes {
            if node.output.proof.is_some() || self.transactions.contains_key(outpoint) {
                trusted.push(outpoint);
                continue;
            }
            let inputs = &node.output.inputs;
            if inputs.is_empty() || inputs.keys().any(|input| self.is_missing(graph, input)) {
                continue;
            }
            let pending: Vec<&Outpoint> = inputs
                .keys()
                .filter(|input| !self.transactions.contains_key(*input))
                .collect();
            if pending.is_empty() {
                trusted.push(outpoint);
                continue;
            }
            waiting.insert(outpoint, pending.len());
            for input in pending {
                spenders.entry(input).or_default().push(outpoint);
            }
        }

        let mut anchored: HashSet<&Outpoint> = HashSet::new();
        while let Some(outpoint) = trusted.pop() {
            if !anchored.insert(outpoint) {
                continue;
            }
            for spender in spenders.get(&outpoint).into_iter().flatten() {
                if let Some(count) = waiting.get_mut(spender) {
                    *count -= 1;
                    if *count == 0 {
                        trusted.push(*spender);
                    }
                }
            }
        }
        anchored.contains(&tip)
    }

    /// Neither held nor pending in `graph`.
    fn is_missing(&self, graph: &TempGraph, input: &Outpoint) -> bool {
        !self.transactions.contains_key(input) && !graph.nodes.contains_key(input)
    }

    /// Whether every unproven node in `graph` has all its inputs at hand.
    fn is_resolved(&self, graph: &TempGraph) -> bool {
        graph.nodes.values().all(|node| {
            node.output.proof.is_some()
                || node
                    .output
                    .inputs
                    .keys()
                    .all(|input| !self.is_missing(graph, input))
        })
    }

    fn next_score(&self) -> u64 {
        self.transactions
            .values()
            .filter_map(|o| o.score)
            .max()
            .map_or(1, |max| max + 1)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find_known_utxos(&self, since: u64, limit: Option<u32>) -> Result<Vec<UtxoReference>> {
        let inner = self.inner.read();

        let mut utxos: Vec<UtxoReference> = inner
            .utxos
            .iter()
            .filter_map(|outpoint| inner.transactions.get(outpoint))
            .filter(|output| output.score.map_or(true, |score| score > since))
            .map(StoredOutput::reference)
            .collect();

        // Confirmed by ascending score, then unconfirmed.
        utxos.sort_by(|a, b| {
            (a.score.is_none(), a.score, &a.txid, a.output_index)
                .cmp(&(b.score.is_none(), b.score, &b.txid, b.output_index))
        });

        // A page never splits a score group: the next page starts strictly
        // after the last score returned, so a split group would be lost.
        // Unconfirmed outputs form one group.
        if let Some(limit) = limit.filter(|l| *l > 0).map(|l| l as usize) {
            if let Some(boundary) = utxos.get(limit - 1).map(|u| u.score) {
                let end = utxos[limit..]
                    .iter()
                    .position(|u| u.score != boundary)
                    .map_or(utxos.len(), |extra| limit + extra);
                utxos.truncate(end);
            }
        }
        Ok(utxos)
    }

    async fn hydrate_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode> {
        let outpoint = Outpoint::new(txid, output_index);
        let inner = self.inner.read();
        let output = inner
            .transactions
            .get(&outpoint)
            .ok_or_else(|| StoreError::NotFound(outpoint.encode()))?;
        Ok(output.to_node(graph_id, wants_metadata))
    }

    async fn find_needed_inputs(&self, node: &GraphNode) -> Result<Option<NeededInputs>> {
        let inner = self.inner.read();
        let Some(graph) = inner.graphs.get(&node.graph_id) else {
            return Ok(None);
        };

        let needed = match (&node.proof, &node.inputs) {
            (None, Some(inputs)) => NeededInputs::from_pairs(
                inputs
                    .keys()
                    .filter(|input| inner.is_missing(graph, input))
                    .map(|input| (input.clone(), true)),
            ),
            _ => NeededInputs::default(),
        };

        if !needed.is_empty() {
            tracing::debug!(graph_id = %node.graph_id, count = needed.len(), "requesting inputs");
            Ok(Some(needed))
        } else if inner.is_resolved(graph) {
            Ok(None)
        } else {
            // Sibling branches are still on their way.
            tracing::debug!(graph_id = %node.graph_id, "graph still has pending inputs");
            Ok(Some(needed))
        }
    }

    async fn append_to_graph(&self, node: &GraphNode, spent_by: Option<&Outpoint>) -> Result<()> {
        let outpoint = self.node_outpoint(node)?;
        let mut inner = self.inner.write();

        if outpoint == node.graph_id && inner.utxos.contains(&outpoint) {
            return Err(StoreError::UnwantedGraph(node.graph_id.clone()));
        }

        let graph = inner.graphs.entry(node.graph_id.clone()).or_default();
        if !graph.nodes.contains_key(&outpoint) && graph.nodes.len() >= self.max_graph_nodes {
            return Err(StoreError::GraphTooLarge {
                graph_id: node.graph_id.clone(),
                limit: self.max_graph_nodes,
            });
        }

        let output = StoredOutput::from_node(outpoint.txid.clone(), node);
        graph.nodes.insert(
            outpoint,
            TempNode {
                output,
                spent_by: spent_by.cloned(),
            },
        );
        Ok(())
    }

    async fn validate_graph_anchor(&self, graph_id: &GraphId) -> Result<()> {
        let inner = self.inner.read();
        let graph = inner
            .graphs
            .get(graph_id)
            .ok_or_else(|| StoreError::MissingGraph(graph_id.clone()))?;

        if !graph.nodes.contains_key(graph_id) {
            return Err(StoreError::Unanchored {
                graph_id: graph_id.clone(),
                reason: "tip is missing from the graph".into(),
            });
        }

        if inner.is_anchored(graph, graph_id) {
            Ok(())
        } else {
            Err(StoreError::Unanchored {
                graph_id: graph_id.clone(),
                reason: "a path ends in an unproven transaction or a cycle".into(),
            })
        }
    }

    async fn discard_graph(&self, graph_id: &GraphId) -> Result<()> {
        self.inner.write().graphs.remove(graph_id);
        Ok(())
    }

    async fn finalize_graph(&self, graph_id: &GraphId) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(graph) = inner.graphs.remove(graph_id) else {
            tracing::debug!(%graph_id, "no graph to finalize");
            return Ok(());
        };

        let score = inner.next_score();
        for (outpoint, node) in graph.nodes {
            let mut output = node.output;
            for input in output.inputs.keys() {
                inner.utxos.remove(input);
            }
            if &outpoint == graph_id {
                output.score = Some(score);
                inner.utxos.insert(outpoint.clone());
            }
            inner.transactions.entry(outpoint).or_insert(output);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raw transactions double as txids so tests stay readable.
    struct LabelTxid;

    impl TxidHasher for LabelTxid {
        fn txid(&self, raw_tx: &str) -> gasp_core::Result<String> {
            Ok(raw_tx.to_string())
        }
    }

    fn proven(txid: &str, score: u64) -> StoredOutput {
        StoredOutput::new(txid, 0, txid).with_score(score).with_proof("bump")
    }

    #[tokio::test]
    async fn test_find_known_utxos_since_and_limit() {
        let store = MemoryStorage::with_hasher(LabelTxid);
        store.insert_utxo(proven("a", 100));
        store.insert_utxo(proven("b", 200));
        store.insert_utxo(StoredOutput::new("c", 0, "c"));

        let all = store.find_known_utxos(0, None).await.unwrap();
        let txids: Vec<_> = all.iter().map(|u| u.txid.as_str()).collect();
        assert_eq!(txids, vec!["a", "b", "c"]);

        let since = store.find_known_utxos(150, None).await.unwrap();
        let txids: Vec<_> = since.iter().map(|u| u.txid.as_str()).collect();
        assert_eq!(txids, vec!["b", "c"]);

        let page = store.find_known_utxos(0, Some(2)).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_page_keeps_tied_scores_together() {
        let store = MemoryStorage::with_hasher(LabelTxid);
        for txid in ["a", "b", "c"] {
            store.insert_utxo(proven(txid, 10));
        }
        store.insert_utxo(proven("d", 20));

        let page = store.find_known_utxos(0, Some(2)).await.unwrap();
        let txids: Vec<_> = page.iter().map(|u| u.txid.as_str()).collect();
        assert_eq!(txids, vec!["a", "b", "c"]);

        let next = store.find_known_utxos(10, Some(2)).await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].txid, "d");
    }

    #[tokio::test]
    async fn test_page_returns_unconfirmed_outputs_together() {
        let store = MemoryStorage::with_hasher(LabelTxid);
        store.insert_utxo(proven("a", 10));
        for txid in ["u1", "u2", "u3", "u4"] {
            store.insert_utxo(StoredOutput::new(txid, 0, txid));
        }

        assert_eq!(store.find_known_utxos(0, Some(1)).await.unwrap().len(), 1);
        let page = store.find_known_utxos(0, Some(2)).await.unwrap();
        assert_eq!(page.len(), 5);
        assert!(page[1..].iter().all(|u| u.score.is_none()));
    }

    #[tokio::test]
    async fn test_hydrate_respects_metadata_flag() {
        let store = MemoryStorage::with_hasher(LabelTxid);
        store.insert_utxo(
            StoredOutput::new("t", 1, "t")
                .with_metadata("txm", "outm")
                .with_input(Outpoint::new("p", 0), "h"),
        );
        let graph_id = Outpoint::new("t", 1);

        let bare = store.hydrate_node(&graph_id, "t", 1, false).await.unwrap();
        assert!(bare.inputs.is_none());
        assert!(bare.tx_metadata.is_none());

        let full = store.hydrate_node(&graph_id, "t", 1, true).await.unwrap();
        assert_eq!(full.inputs.unwrap().len(), 1);
        assert_eq!(full.output_metadata.as_deref(), Some("outm"));

        let missing = store.hydrate_node(&graph_id, "nope", 0, true).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_finalize_promotes_anchored_chain() {
        let sender = MemoryStorage::with_hasher(LabelTxid);
        sender.insert_transaction(proven("parent", 10));
        sender.insert_utxo(
            StoredOutput::new("child", 0, "child")
                .with_score(20)
                .with_input(Outpoint::new("parent", 0), "h"),
        );
        let graph_id = Outpoint::new("child", 0);

        let receiver = MemoryStorage::with_hasher(LabelTxid);
        let tip = sender.hydrate_node(&graph_id, "child", 0, true).await.unwrap();
        receiver.append_to_graph(&tip, None).await.unwrap();

        let needed = receiver.find_needed_inputs(&tip).await.unwrap().unwrap();
        assert!(needed.requested_inputs.contains_key(&Outpoint::new("parent", 0)));
        assert!(receiver.validate_graph_anchor(&graph_id).await.is_err());

        let parent = sender.hydrate_node(&graph_id, "parent", 0, true).await.unwrap();
        receiver.append_to_graph(&parent, Some(&graph_id)).await.unwrap();
        assert!(receiver.find_needed_inputs(&tip).await.unwrap().is_none());
        receiver.validate_graph_anchor(&graph_id).await.unwrap();

        receiver.finalize_graph(&graph_id).await.unwrap();
        assert_eq!(receiver.known_outpoints(), vec![graph_id.clone()]);
        assert!(receiver.holds(&Outpoint::new("parent", 0)));
        assert_eq!(receiver.temp_graph_count(), 0);
    }

    #[tokio::test]
    async fn test_cycle_never_anchors() {
        let store = MemoryStorage::with_hasher(LabelTxid);
        let graph_id = Outpoint::new("x", 0);
        let mut x = GraphNode::new(graph_id.clone(), "x", 0);
        x.inputs = Some(BTreeMap::from([(
            Outpoint::new("y", 0),
            InputMetadata { hash: "h".into() },
        )]));
        let mut y = GraphNode::new(graph_id.clone(), "y", 0);
        y.inputs = Some(BTreeMap::from([(
            Outpoint::new("x", 0),
            InputMetadata { hash: "h".into() },
        )]));

        store.append_to_graph(&x, None).await.unwrap();
        store.append_to_graph(&y, Some(&graph_id)).await.unwrap();
        assert_eq!(
            store.temp_graph_nodes(&graph_id),
            vec![
                (Outpoint::new("x", 0), None),
                (Outpoint::new("y", 0), Some(graph_id.clone())),
            ]
        );
        assert!(matches!(
            store.validate_graph_anchor(&graph_id).await,
            Err(StoreError::Unanchored { .. })
        ));

        store.discard_graph(&graph_id).await.unwrap();
        assert_eq!(store.temp_graph_count(), 0);
        assert!(store.known_outpoints().is_empty());
    }

    #[tokio::test]
    async fn test_sibling_inputs_keep_graph_open() {
        let sender = MemoryStorage::with_hasher(LabelTxid);
        sender.insert_transaction(proven("p1", 1));
        sender.insert_transaction(proven("p2", 2));
        sender.insert_utxo(
            StoredOutput::new("t", 0, "t")
                .with_score(3)
                .with_input(Outpoint::new("p1", 0), "h1")
                .with_input(Outpoint::new("p2", 0), "h2"),
        );
        let graph_id = Outpoint::new("t", 0);
        let receiver = MemoryStorage::with_hasher(LabelTxid);

        let tip = sender.hydrate_node(&graph_id, "t", 0, true).await.unwrap();
        receiver.append_to_graph(&tip, None).await.unwrap();
        assert_eq!(receiver.find_needed_inputs(&tip).await.unwrap().unwrap().len(), 2);

        let first = sender.hydrate_node(&graph_id, "p1", 0, true).await.unwrap();
        receiver.append_to_graph(&first, Some(&graph_id)).await.unwrap();
        let pending = receiver.find_needed_inputs(&first).await.unwrap().unwrap();
        assert!(pending.is_empty());

        let second = sender.hydrate_node(&graph_id, "p2", 0, true).await.unwrap();
        receiver.append_to_graph(&second, Some(&graph_id)).await.unwrap();
        assert!(receiver.find_needed_inputs(&second).await.unwrap().is_none());
        receiver.validate_graph_anchor(&graph_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_anchor_check_handles_long_chains() {
        let depth = 50_000;
        let store = MemoryStorage::with_hasher(LabelTxid).with_max_graph_nodes(depth + 1);
        let label = |level: usize| format!("n{level}");
        let graph_id = Outpoint::new(label(depth), 0);

        for level in 0..=depth {
            let output = if level == 0 {
                proven(&label(0), 1)
            } else {
                StoredOutput::new(label(level), 0, label(level))
                    .with_input(Outpoint::new(label(level - 1), 0), "h")
            };
            let spent_by = (level < depth).then(|| Outpoint::new(label(level + 1), 0));
            store
                .append_to_graph(&output.to_node(&graph_id, true), spent_by.as_ref())
                .await
                .unwrap();
        }

        store.validate_graph_anchor(&graph_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_append_rejects_known_tip_and_oversized_graph() {
        let store = MemoryStorage::with_hasher(LabelTxid).with_max_graph_nodes(1);
        store.insert_utxo(proven("known", 5));

        let known = GraphNode::new(Outpoint::new("known", 0), "known", 0);
        assert!(matches!(
            store.append_to_graph(&known, None).await,
            Err(StoreError::UnwantedGraph(_))
        ));

        let graph_id = Outpoint::new("a", 0);
        store
            .append_to_graph(&GraphNode::new(graph_id.clone(), "a", 0), None)
            .await
            .unwrap();
        let extra = GraphNode::new(graph_id.clone(), "b", 0);
        assert!(matches!(
            store.append_to_graph(&extra, Some(&graph_id)).await,
            Err(StoreError::GraphTooLarge { limit: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_finalize_without_graph_is_noop() {
        let store = MemoryStorage::new();
        store.finalize_graph(&Outpoint::new("ghost", 0)).await.unwrap();
        assert!(store.known_outpoints().is_empty());
    }

    fn seeded(scores: &[Option<u64>]) -> MemoryStorage {
        let store = MemoryStorage::with_hasher(LabelTxid);
        for (i, score) in scores.iter().enumerate() {
            let output = StoredOutput::new(format!("t{i}"), 0, format!("t{i}"));
            store.insert_utxo(match score {
                Some(score) => output.with_score(*score),
                None => output,
            });
        }
        store
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    proptest::proptest! {
        #[test]
        fn test_known_utxos_respect_since_and_limit(
            scores in proptest::collection::vec(proptest::option::of(1u64..20), 0..12),
            since in 0u64..20,
            limit in proptest::option::of(0u32..6),
        ) {
            let store = seeded(&scores);
            let found = runtime().block_on(store.find_known_utxos(since, limit)).unwrap();

            let mut eligible: Vec<Option<u64>> = scores
                .iter()
                .copied()
                .filter(|s| s.map_or(true, |s| s > since))
                .collect();
            eligible.sort_by_key(|s| (s.is_none(), *s));
            let expected = match limit.map(|n| n as usize) {
                Some(n) if n > 0 && eligible.len() > n => {
                    n + eligible[n..].iter().take_while(|s| **s == eligible[n - 1]).count()
                }
                _ => eligible.len(),
            };

            proptest::prop_assert_eq!(found.len(), expected);
            proptest::prop_assert!(found.iter().all(|u| u.score.map_or(true, |s| s > since)));
            let confirmed: Vec<u64> = found.iter().map_while(|u| u.score).collect();
            proptest::prop_assert!(confirmed.windows(2).all(|w| w[0] <= w[1]));
            proptest::prop_assert!(found[confirmed.len()..].iter().all(|u| u.score.is_none()));
        }

        #[test]
        fn test_paging_by_last_score_reaches_every_output(
            scores in proptest::collection::vec(proptest::option::of(1u64..6), 0..16),
            limit in 1u32..5,
        ) {
            let store = seeded(&scores);
            let runtime = runtime();
            let mut cursor = 0;
            let mut seen = BTreeSet::new();
            loop {
                let page = runtime.block_on(store.find_known_utxos(cursor, Some(limit))).unwrap();
                let before = cursor;
                for utxo in &page {
                    cursor = cursor.max(utxo.score.unwrap_or(0));
                    seen.insert(utxo.outpoint());
                }
                if page.len() < limit as usize || cursor == before {
                    break;
                }
            }
            proptest::prop_assert_eq!(seen.len(), scores.len());
        }
    }
}
