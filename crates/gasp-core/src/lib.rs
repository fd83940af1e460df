//! # GASP Core
//!
//! Pure data model for the Graph Aware Sync Protocol: outpoints, UTXO
//! references, graph nodes and the needed-inputs response.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Outpoint`] - Canonical `(txid, output index)` key, also used as a graph ID
//! - [`UtxoReference`] - An advertised UTXO with its sync score
//! - [`GraphNode`] - One transaction output plus proof, metadata and inputs
//! - [`NeededInputs`] - Which ancestors a party still wants
//! - [`TxidHasher`] - Capability that derives a txid from a raw transaction
//!
//! ## Wire Shape
//!
//! All types serialize with the field names used by existing GASP peers
//! (`graphID`, `rawTx`, `outputIndex`, `requestedInputs`, ...), so they can be
//! exchanged as JSON or CBOR without an adapter layer.

pub mod error;
pub mod outpoint;
pub mod timestamp;
pub mod txid;
pub mod types;

pub use error::{CoreError, Result};
pub use outpoint::{GraphId, Outpoint};
pub use timestamp::{validate_timestamp, validate_timestamp_f64};
pub use txid::{DoubleSha256, TxidHasher};
pub use types::{GraphNode, InputMetadata, InputRequest, NeededInputs, UtxoReference};
