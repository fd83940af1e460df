//! # GASP Store
//!
//! The storage collaborator of the Graph Aware Sync Protocol. The protocol
//! core never persists anything itself: it asks a [`Storage`] implementation
//! to list known UTXOs, hydrate nodes, decide which ancestors are needed, and
//! to manage temporary graphs until they are finalized or discarded.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait the engine depends on
//! - [`MemoryStorage`] - Complete in-memory implementation with SPV-style anchoring
//! - [`StoredOutput`] - A transaction output as held by [`MemoryStorage`]
//!
//! ## Usage
//!
//! ```rust
//! use gasp_core::{Outpoint, TxidHasher, DoubleSha256};
//! use gasp_store::{MemoryStorage, StoredOutput, Storage};
//!
//! async fn example() {
//!     let storage = MemoryStorage::new();
//!     let raw_tx = "00ff";
//!     let txid = DoubleSha256.txid(raw_tx).unwrap();
//!     storage.insert_utxo(
//!         StoredOutput::new(txid, 0, raw_tx)
//!             .with_score(100)
//!             .with_proof("bump"),
//!     );
//!     let known = storage.find_known_utxos(0, None).await.unwrap();
//!     assert_eq!(known.len(), 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Temporary graphs are write-only to the engine**: nothing in a temporary
//!   graph is reported as known until `finalize_graph` promotes it.
//! - **Anchoring**: a graph is anchored when every path from its tip ends in a
//!   proven transaction or in a transaction the store already holds. Cycles
//!   never anchor.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryStorage, StoredOutput, DEFAULT_MAX_GRAPH_NODES};
pub use traits::Storage;
