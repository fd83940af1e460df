//! # GASP Sync
//!
//! The Graph Aware Sync Protocol engine: synchronizes the unspent outputs of
//! two parties together with the transaction graphs that justify them.
//!
//! ## Overview
//!
//! A pass runs in two phases. In the pull phase the initiator asks the
//! responder for every UTXO it holds since the last interaction, fetches each
//! unknown one, walks back through its inputs until storage is satisfied, and
//! either finalizes or discards the resulting temporary graph. In the push
//! phase the initiator offers the UTXOs the responder has not seen, answering
//! the responder's requests for inputs the same way.
//!
//! ## Key Properties
//!
//! - **Idempotent**: a second pass over unchanged stores changes nothing
//! - **Cycle-safe**: node identity is tracked per item, so cyclic graphs terminate
//! - **Isolated**: one item failing never aborts the pass
//! - **Resumable**: the cursor only moves forward
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gasp_store::MemoryStorage;
//! use gasp_sync::{Disconnected, Gasp, GaspConfig};
//!
//! async fn example() -> gasp_sync::Result<()> {
//!     let responder = Gasp::new(MemoryStorage::new(), Disconnected, GaspConfig::default())?;
//!     let initiator = Gasp::new(MemoryStorage::new(), Arc::new(responder), GaspConfig::default())?;
//!
//!     let report = initiator.sync("peer", Some(100)).await?;
//!     println!("finalized {} graphs", report.finalized);
//!     Ok(())
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Initiator                              Responder
//!   |-------- InitialRequest ------------->|
//!   |<------- InitialResponse -------------|   (repeated per page)
//!   |-------- RequestNode ---------------->|
//!   |<------- GraphNode -------------------|   (repeated per needed input)
//!   |-------- SubmitNode ----------------->|
//!   |<------- NeededInputs ----------------|   (repeated until none needed)
//! ```

pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod messages;
pub mod protocol;
pub mod remote;
mod resolver;
pub mod runner;
pub mod wire;

pub use engine::{Gasp, GaspConfig, SyncReport, DEFAULT_LOG_PREFIX};
pub use error::{ErrorKind, Result, SyncError};
pub use lifecycle::GraphOutcome;
pub use log::{LogLevel, SyncLog};
pub use messages::{
    limits, InitialReply, InitialRequest, InitialResponse, SyncErrorCode, PROTOCOL_VERSION,
};
pub use remote::{Disconnected, Remote};
pub use runner::Concurrency;
pub use wire::{Channel, WireAnswer, WireCall, WireError, WireRemote};
