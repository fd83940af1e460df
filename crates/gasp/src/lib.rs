//! # GASP
//!
//! The Graph Aware Sync Protocol: two parties exchange the unspent outputs
//! they hold together with every ancestor transaction needed to prove them,
//! so that each side only ever accepts outputs it can anchor.
//!
//! ## Overview
//!
//! - **Outpoints**: `txid.index` references that name outputs and graphs
//! - **Graphs**: the ancestors of one UTXO, assembled in temporary storage
//!   and then finalized or discarded as a whole
//! - **Storage**: an async collaborator that decides what is needed and what
//!   is anchored
//! - **Sync**: a pull-then-push pass driven by a monotone cursor
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gasp::{Disconnected, Gasp, GaspConfig, MemoryStorage};
//!
//! async fn example() -> gasp::Result<()> {
//!     let bob = Gasp::new(MemoryStorage::new(), Disconnected, GaspConfig::default())?;
//!     let alice = Gasp::new(
//!         MemoryStorage::new(),
//!         Arc::new(bob),
//!         GaspConfig::default().with_last_interaction(0),
//!     )?;
//!
//!     let report = alice.sync("bob", None).await?;
//!     println!("pulled {}, pushed {}", report.finalized, report.pushed);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `gasp::core` - Outpoints, graph nodes, txid hashing
//! - `gasp::store` - Storage trait and in-memory store
//! - `gasp::sync` - Engine, remotes and wire codec

// Re-export component crates
pub use gasp_core as core;
pub use gasp_store as store;
pub use gasp_sync as sync;

// Re-export main types for convenience
pub use gasp_sync::{
    Concurrency, Disconnected, ErrorKind, Gasp, GaspConfig, GraphOutcome, LogLevel, Remote,
    Result, SyncError, SyncReport, PROTOCOL_VERSION,
};

// Re-export commonly used core and store types
pub use gasp_core::{GraphId, GraphNode, NeededInputs, Outpoint, TxidHasher, UtxoReference};
pub use gasp_store::{MemoryStorage, Storage, StoredOutput};
