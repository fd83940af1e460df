//! Test fixtures and helpers.
//!
//! Outputs are named by short labels that double as raw transactions and,
//! through [`LabelTxid`], as txids. Every output sits at index 0.

use std::sync::Arc;

use gasp_core::{Outpoint, TxidHasher};
use gasp_store::{MemoryStorage, StoredOutput};
use gasp_sync::{Disconnected, Gasp, GaspConfig, LogLevel};

use crate::recording::RecordingStorage;

/// A txid function that returns the raw transaction unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelTxid;

impl TxidHasher for LabelTxid {
    fn txid(&self, raw_tx: &str) -> gasp_core::Result<String> {
        Ok(raw_tx.to_string())
    }
}

/// Outpoint of a labelled output.
pub fn op(label: &str) -> Outpoint {
    Outpoint::new(label, 0)
}

/// An output with a merkle proof.
pub fn proven(label: &str) -> StoredOutput {
    StoredOutput::new(label, 0, label).with_proof(format!("proof-{label}"))
}

/// An output without a proof that spends the given labelled outputs.
pub fn spending(label: &str, inputs: &[&str]) -> StoredOutput {
    inputs
        .iter()
        .fold(StoredOutput::new(label, 0, label), |output, input| {
            output.with_input(op(input), format!("hash-{input}"))
        })
}

/// Empty storage keyed by labels.
pub fn label_storage() -> MemoryStorage {
    MemoryStorage::with_hasher(LabelTxid)
}

/// Config for tests: full verbosity, visible once [`init_tracing`] ran.
pub fn test_config() -> GaspConfig {
    GaspConfig::default().with_log_level(LogLevel::Debug)
}

/// Install a tracing subscriber writing through the test harness.
///
/// Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Storage of one party, wrapped in a recorder.
pub type PeerStorage = Arc<RecordingStorage<MemoryStorage>>;

/// An engine that only answers.
pub type Responder = Gasp<PeerStorage, Disconnected>;

/// An engine syncing against a [`Responder`].
pub type Initiator = Gasp<PeerStorage, Arc<Responder>>;

/// One party of a test scenario.
#[derive(Clone)]
pub struct Peer {
    pub storage: PeerStorage,
}

impl Peer {
    /// A party with empty label-keyed storage.
    pub fn new() -> Self {
        Self::with_storage(label_storage())
    }

    pub fn with_storage(storage: MemoryStorage) -> Self {
        Self {
            storage: Arc::new(RecordingStorage::new(storage)),
        }
    }

    /// The underlying memory store.
    pub fn memory(&self) -> &MemoryStorage {
        self.storage.inner()
    }

    /// Add an unspent output with a score.
    pub fn utxo(&self, output: StoredOutput, score: u64) -> &Self {
        self.memory().insert_utxo(output.with_score(score));
        self
    }

    /// Add an unconfirmed unspent output.
    pub fn unconfirmed(&self, output: StoredOutput) -> &Self {
        self.memory().insert_utxo(output);
        self
    }

    /// Add a spent ancestor.
    pub fn ancestor(&self, output: StoredOutput) -> &Self {
        self.memory().insert_transaction(output);
        self
    }

    /// Sorted outpoints this party knows as unspent.
    pub fn known(&self) -> Vec<Outpoint> {
        self.memory().known_outpoints()
    }

    /// This party as a responder.
    pub fn responder(&self, config: GaspConfig) -> Arc<Responder> {
        Arc::new(self.engine(Disconnected, config))
    }

    /// This party as an initiator against `remote`.
    pub fn initiator(&self, remote: &Peer, config: GaspConfig) -> Initiator {
        self.initiator_with(remote, config.clone(), config)
    }

    /// Like [`Peer::initiator`] with a separate responder config.
    pub fn initiator_with(
        &self,
        remote: &Peer,
        config: GaspConfig,
        remote_config: GaspConfig,
    ) -> Initiator {
        self.engine(remote.responder(remote_config), config)
    }

    fn engine<R: gasp_sync::Remote>(&self, remote: R, config: GaspConfig) -> Gasp<PeerStorage, R> {
        match Gasp::new(Arc::clone(&self.storage), remote, config) {
            Ok(engine) => engine.with_txid_hasher(LabelTxid),
            Err(e) => panic!("invalid test config: {e}"),
        }
    }
}

impl Default for Peer {
    fn default() -> Self {
        Self::new()
    }
}
