//! Sync orchestrator.
//!
//! A [`Gasp`] engine owns one party's storage handle and its view of one
//! remote. [`Gasp::sync`] runs a full pass: pull everything the remote has
//! since the cursor, page by page, then push back whatever the remote has not
//! seen.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gasp_core::{
    validate_timestamp, DoubleSha256, GraphNode, Outpoint, TxidHasher, UtxoReference,
};
use gasp_store::Storage;

use crate::error::Result;
use crate::lifecycle::GraphOutcome;
use crate::log::{LogLevel, SyncLog};
use crate::messages::PROTOCOL_VERSION;
use crate::protocol::page_limit;
use crate::remote::Remote;
use crate::runner::Concurrency;

/// Default prefix attached to engine log events.
pub const DEFAULT_LOG_PREFIX: &str = "[GASP] ";

/// Configuration for an engine instance.
#[derive(Debug, Clone)]
pub struct GaspConfig {
    /// Protocol version spoken by this engine.
    pub version: u32,
    /// Cursor of the last interaction with the remote.
    pub last_interaction: i64,
    /// Verbosity.
    pub log_level: LogLevel,
    /// Prefix attached to every log event.
    pub log_prefix: String,
    /// Pull only; never push local graphs to the remote.
    pub unidirectional: bool,
    /// How independent items are processed.
    pub concurrency: Concurrency,
}

impl Default for GaspConfig {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            last_interaction: 0,
            log_level: LogLevel::Info,
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            unidirectional: false,
            concurrency: Concurrency::Parallel,
        }
    }
}

impl GaspConfig {
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_last_interaction(mut self, last_interaction: i64) -> Self {
        self.last_interaction = last_interaction;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn with_unidirectional(mut self, unidirectional: bool) -> Self {
        self.unidirectional = unidirectional;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Process every item one at a time.
    pub fn sequential(self) -> Self {
        self.with_concurrency(Concurrency::Sequential)
    }
}

/// Result of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Host label the pass was run against.
    pub host: String,
    /// Number of initial-response pages fetched.
    pub pages: usize,
    /// Number of UTXOs the remote offered across all pages.
    pub offered: usize,
    /// Outpoints both sides are known to hold after the pass.
    pub shared: usize,
    /// Incoming graphs that were validated and finalized.
    pub finalized: usize,
    /// Incoming graphs that failed validation and were discarded.
    pub discarded: usize,
    /// Incoming items that failed before reaching completion.
    pub failed_incoming: usize,
    /// Local UTXOs pushed to the remote.
    pub pushed: usize,
    /// Local UTXOs whose push failed.
    pub failed_outgoing: usize,
    /// Cursor after the pass.
    pub last_interaction: u64,
}

/// A sync engine bound to one storage and one remote.
pub struct Gasp<S: Storage, R: Remote> {
    pub(crate) storage: S,
    pub(crate) remote: R,
    pub(crate) version: u32,
    pub(crate) unidirectional: bool,
    pub(crate) concurrency: Concurrency,
    pub(crate) log: SyncLog,
    pub(crate) hasher: Arc<dyn TxidHasher>,
    last_interaction: AtomicU64,
}

impl<S: Storage, R: Remote> Gasp<S, R> {
    /// Create an engine.
    ///
    /// Fails with `InvalidTimestamp` when `config.last_interaction` is
    /// negative.
    pub fn new(storage: S, remote: R, config: GaspConfig) -> Result<Self> {
        let last_interaction = validate_timestamp(config.last_interaction)?;
        let log = SyncLog::new(config.log_level, config.log_prefix);
        log.info(format_args!(
            "initialized with version {}, last interaction {}, unidirectional {}, log level {:?}, {:?} processing",
            config.version,
            last_interaction,
            config.unidirectional,
            config.log_level,
            config.concurrency,
        ));
        Ok(Self {
            storage,
            remote,
            version: config.version,
            unidirectional: config.unidirectional,
            concurrency: config.concurrency,
            log,
            hasher: Arc::new(DoubleSha256),
            last_interaction: AtomicU64::new(last_interaction),
        })
    }

    /// Replace the transaction id function used for node identity.
    pub fn with_txid_hasher(mut self, hasher: impl TxidHasher + 'static) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Current cursor.
    pub fn last_interaction(&self) -> u64 {
        self.last_interaction.load(Ordering::SeqCst)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_unidirectional(&self) -> bool {
        self.unidirectional
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Advance the cursor; never moves it backwards.
    pub(crate) fn advance_cursor(&self, score: u64) {
        self.last_interaction.fetch_max(score, Ordering::SeqCst);
    }

    /// Run a full sync pass against the remote.
    ///
    /// `host` is a label for reports and logs only. A `limit` of `Some(0)` is
    /// treated as no limit, and any limit is clamped to the wire page cap.
    /// The pass keeps paging while the remote returns full pages.
    ///
    /// Only version mismatches, invalid cursors and failures of the handshake
    /// itself are returned as errors; per-item failures are logged and counted
    /// in the report.
    pub async fn sync(&self, host: &str, limit: Option<u32>) -> Result<SyncReport> {
        let limit = limit.filter(|l| *l > 0).map(|l| page_limit(Some(l)));
        let page_size = page_limit(limit) as usize;
        let mut report = SyncReport {
            host: host.to_string(),
            ..SyncReport::default()
        };
        self.log.info(format_args!(
            "starting sync with {host}, last interaction {}",
            self.last_interaction()
        ));

        let local_utxos = self.storage.find_known_utxos(0, None).await?;
        let mut known: HashSet<Outpoint> =
            local_utxos.iter().map(UtxoReference::outpoint).collect();
        let mut shared: HashSet<Outpoint> = HashSet::new();

        // Pull phase
        let last_response = loop {
            let cursor_before = self.last_interaction();
            let request = self.build_initial_request(cursor_before, limit)?;
            let response = self.remote.get_initial_response(&request).await?;
            report.pages += 1;
            report.offered += response.utxo_list.len();
            self.log.info(format_args!(
                "received page of {} UTXOs from {host} (remote since {})",
                response.utxo_list.len(),
                response.since
            ));

            let mut queued = HashSet::new();
            let mut queue = Vec::new();
            for utxo in &response.utxo_list {
                if let Some(score) = utxo.score {
                    self.advance_cursor(score);
                }
                let outpoint = utxo.outpoint();
                if known.remove(&outpoint) {
                    shared.insert(outpoint);
                } else if !shared.contains(&outpoint) && queued.insert(outpoint) {
                    queue.push(utxo.clone());
                }
            }

            let outcomes = self
                .concurrency
                .run(queue, |utxo| self.ingest_utxo(utxo))
                .await;
            for (outpoint, outcome) in outcomes {
                match outcome {
                    Ok(GraphOutcome::Finalized) => {
                        report.finalized += 1;
                        shared.insert(outpoint);
                    }
                    Ok(GraphOutcome::Discarded) => {
                        report.discarded += 1;
                        shared.insert(outpoint);
                    }
                    Err(e) => {
                        report.failed_incoming += 1;
                        self.log
                            .warn(format_args!("error with incoming UTXO {outpoint}: {e}"));
                    }
                }
            }

            let full_page = response.utxo_list.len() >= page_size;
            if !full_page {
                break response;
            }
            if self.last_interaction() == cursor_before {
                self.log.warn(format_args!(
                    "full page from {host} did not advance the cursor; stopping pagination"
                ));
                break response;
            }
        };

        // Push phase
        if self.unidirectional {
            self.log
                .info(format_args!("skipping outgoing UTXOs (unidirectional)"));
        } else {
            let since = last_response.since;
            let outgoing: Vec<UtxoReference> = local_utxos
                .into_iter()
                .filter(|utxo| utxo.is_at_or_after(since) && !shared.contains(&utxo.outpoint()))
                .collect();
            self.log.info(format_args!(
                "pushing {} UTXOs to {host} (since {since})",
                outgoing.len()
            ));
            let outcomes = self
                .concurrency
                .run(outgoing, |utxo| self.push_utxo(utxo))
                .await;
            for (outpoint, outcome) in outcomes {
                match outcome {
                    Ok(()) => report.pushed += 1,
                    Err(e) => {
                        report.failed_outgoing += 1;
                        self.log
                            .warn(format_args!("error with outgoing UTXO {outpoint}: {e}"));
                    }
                }
            }
        }

        report.shared = shared.len();
        report.last_interaction = self.last_interaction();
        self.log.info(format_args!(
            "sync with {host} completed: {} finalized, {} discarded, {} pushed",
            report.finalized, report.discarded, report.pushed
        ));
        Ok(report)
    }

    /// Fetch an offered UTXO, resolve its graph and complete it.
    async fn ingest_utxo(&self, utxo: UtxoReference) -> (Outpoint, Result<GraphOutcome>) {
        let outpoint = utxo.outpoint();
        let result = self.ingest_graph(&outpoint, &utxo).await;
        (outpoint, result)
    }

    async fn ingest_graph(&self, outpoint: &Outpoint, utxo: &UtxoReference) -> Result<GraphOutcome> {
        self.log
            .info(format_args!("requesting node for UTXO {outpoint}"));
        let node = self
            .remote
            .request_node(outpoint, &utxo.txid, utxo.output_index, true)
            .await?;
        self.log
            .debug(format_args!("received unspent graph node: {node:?}"));

        let graph_id = node.graph_id.clone();
        if let Err(e) = self.resolve_incoming(node).await {
            if let Err(discard) = self.storage.discard_graph(&graph_id).await {
                self.log.warn(format_args!(
                    "failed to discard graph {graph_id} after error: {discard}"
                ));
            }
            return Err(e);
        }
        self.complete_graph(&graph_id).await
    }

    /// Hydrate a local UTXO and send its graph to the remote.
    async fn push_utxo(&self, utxo: UtxoReference) -> (Outpoint, Result<()>) {
        let outpoint = utxo.outpoint();
        let result = self.push_graph(&outpoint, &utxo).await;
        (outpoint, result)
    }

    async fn push_graph(&self, outpoint: &Outpoint, utxo: &UtxoReference) -> Result<()> {
        self.log
            .info(format_args!("hydrating node for UTXO {outpoint}"));
        let node = self
            .storage
            .hydrate_node(outpoint, &utxo.txid, utxo.output_index, true)
            .await?;
        self.log
            .debug(format_args!("sending unspent graph node: {node:?}"));
        self.resolve_outgoing(node).await
    }

    /// Identity of a node: its computed txid plus output index.
    pub(crate) fn node_outpoint(&self, node: &GraphNode) -> Result<Outpoint> {
        let txid = self.hasher.txid(&node.raw_tx)?;
        Ok(Outpoint::new(txid, node.output_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, SyncError};
    use crate::remote::Disconnected;
    use gasp_core::Result as CoreResult;
    use gasp_store::{MemoryStorage, StoredOutput};

    struct LabelTxid;

    impl TxidHasher for LabelTxid {
        fn txid(&self, raw_tx: &str) -> CoreResult<String> {
            Ok(raw_tx.to_string())
        }
    }

    fn storage() -> MemoryStorage {
        MemoryStorage::with_hasher(LabelTxid)
    }

    fn quiet() -> GaspConfig {
        GaspConfig::default().with_log_level(LogLevel::None)
    }

    fn pair(
        a: MemoryStorage,
        b: MemoryStorage,
        config: GaspConfig,
    ) -> Gasp<MemoryStorage, Arc<Gasp<MemoryStorage, Disconnected>>> {
        let responder = Gasp::new(b, Disconnected, quiet())
            .unwrap()
            .with_txid_hasher(LabelTxid);
        Gasp::new(a, Arc::new(responder), config)
            .unwrap()
            .with_txid_hasher(LabelTxid)
    }

    #[test]
    fn test_config_defaults() {
        let config = GaspConfig::default();
        assert_eq!(config.version, PROTOCOL_VERSION);
        assert_eq!(config.last_interaction, 0);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_prefix, "[GASP] ");
        assert!(!config.unidirectional);
        assert_eq!(config.concurrency, Concurrency::Parallel);
        assert_eq!(config.sequential().concurrency, Concurrency::Sequential);
    }

    #[test]
    fn test_negative_cursor_rejected() {
        let result = Gasp::new(storage(), Disconnected, quiet().with_last_interaction(-1));
        match result {
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidTimestamp),
            Ok(_) => panic!("negative cursor accepted"),
        }
    }

    #[tokio::test]
    async fn test_sync_pulls_single_utxo() {
        let b = storage();
        b.insert_utxo(StoredOutput::new("t1", 0, "t1").with_score(111).with_proof("p"));
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", None).await.unwrap();

        assert_eq!(report.host, "peer");
        assert_eq!(report.pages, 1);
        assert_eq!(report.offered, 1);
        assert_eq!(report.finalized, 1);
        assert_eq!(report.last_interaction, 111);
        assert_eq!(engine.last_interaction(), 111);
        assert!(engine.storage().holds(&Outpoint::new("t1", 0)));
    }

    #[tokio::test]
    async fn test_sync_pushes_single_utxo() {
        let a = storage();
        a.insert_utxo(StoredOutput::new("t1", 0, "t1").with_score(111).with_proof("p"));
        let engine = pair(a, storage(), quiet());

        let report = engine.sync("peer", None).await.unwrap();

        assert_eq!(report.pushed, 1);
        assert_eq!(report.finalized, 0);
        assert!(engine.remote().storage().holds(&Outpoint::new("t1", 0)));
    }

    #[tokio::test]
    async fn test_shared_outputs_are_not_transferred() {
        let a = storage();
        let b = storage();
        for s in [&a, &b] {
            s.insert_utxo(StoredOutput::new("t1", 0, "t1").with_score(5).with_proof("p"));
        }
        let engine = pair(a, b, quiet());

        let report = engine.sync("peer", None).await.unwrap();

        assert_eq!(report.shared, 1);
        assert_eq!(report.finalized, 0);
        assert_eq!(report.pushed, 0);
    }

    #[tokio::test]
    async fn test_version_mismatch_aborts() {
        let engine = pair(storage(), storage(), quiet().with_version(2));
        let err = engine.sync("peer", None).await.unwrap_err();
        assert!(matches!(err, SyncError::VersionMismatch { local: 1, peer: 2 }));
        assert_eq!(
            err.to_string(),
            "protocol version mismatch: current=1, foreign=2"
        );
    }

    #[tokio::test]
    async fn test_unidirectional_skips_push() {
        let a = storage();
        a.insert_utxo(StoredOutput::new("t1", 0, "t1").with_score(1).with_proof("p"));
        let engine = pair(a, storage(), quiet().with_unidirectional(true));

        let report = engine.sync("peer", None).await.unwrap();

        assert_eq!(report.pushed, 0);
        assert!(engine.remote().storage().known_outpoints().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_follows_cursor() {
        let b = storage();
        for (i, score) in [10u64, 20, 30, 40, 50].into_iter().enumerate() {
            let label = format!("t{i}");
            b.insert_utxo(
                StoredOutput::new(label.clone(), 0, label)
                    .with_score(score)
                    .with_proof("p"),
            );
        }
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", Some(2)).await.unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.finalized, 5);
        assert_eq!(engine.last_interaction(), 50);
    }

    #[tokio::test]
    async fn test_pagination_keeps_tied_scores_on_one_page() {
        let b = storage();
        for (label, score) in [("a", 10u64), ("b", 10), ("c", 10), ("d", 20)] {
            b.insert_utxo(StoredOutput::new(label, 0, label).with_score(score).with_proof("p"));
        }
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", Some(2)).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.finalized, 4);
        assert_eq!(engine.storage().known_outpoints().len(), 4);
        assert_eq!(engine.last_interaction(), 20);
    }

    #[tokio::test]
    async fn test_unscored_outputs_beyond_limit_are_pulled() {
        let b = storage();
        for i in 0..5 {
            let label = format!("u{i}");
            b.insert_utxo(StoredOutput::new(label.clone(), 0, label).with_proof("p"));
        }
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", Some(2)).await.unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.finalized, 5);
        assert_eq!(engine.storage().known_outpoints().len(), 5);
        assert_eq!(engine.last_interaction(), 0);
    }

    #[tokio::test]
    async fn test_limit_above_page_cap_is_clamped() {
        let b = storage();
        b.insert_utxo(StoredOutput::new("t1", 0, "t1").with_score(3).with_proof("p"));
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", Some(u32::MAX)).await.unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.finalized, 1);
    }

    #[tokio::test]
    async fn test_unscored_full_page_stops_pagination() {
        let b = storage();
        b.insert_utxo(StoredOutput::new("u1", 0, "u1").with_proof("p"));
        b.insert_utxo(StoredOutput::new("u2", 0, "u2").with_proof("p"));
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", Some(2)).await.unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.finalized, 2);
    }

    #[tokio::test]
    async fn test_zero_limit_means_unlimited() {
        let b = storage();
        for label in ["a", "b", "c"] {
            b.insert_utxo(StoredOutput::new(label, 0, label).with_score(1).with_proof("p"));
        }
        let engine = pair(storage(), b, quiet());

        let report = engine.sync("peer", Some(0)).await.unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.finalized, 3);
    }
}
