//! # GASP Testkit
//!
//! Testing utilities for the Graph Aware Sync Protocol.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: label-keyed outputs, [`LabelTxid`], and [`Peer`] for wiring
//!   two parties together
//! - **Recording**: [`RecordingStorage`] counts storage calls and injects faults
//! - **Generators**: Proptest strategies for property-based testing
//! - **Convergence**: BLAKE3 digests of a party's known set, and
//!   [`verify_convergence`] to compare two parties after a pass
//!
//! ## Test Fixtures
//!
//! ```rust
//! use gasp_testkit::fixtures::{op, proven, test_config, Peer};
//!
//! async fn example() {
//!     let alice = Peer::new();
//!     let bob = Peer::new();
//!     bob.utxo(proven("t1"), 111);
//!
//!     alice.initiator(&bob, test_config()).sync("bob", None).await.unwrap();
//!     assert_eq!(alice.known(), vec![op("t1")]);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use gasp_testkit::generators::chains;
//!
//! proptest! {
//!     #[test]
//!     fn seeding_is_deterministic(specs in chains(4)) {
//!         // ...
//!     }
//! }
//! ```

pub mod convergence;
pub mod fixtures;
pub mod generators;
pub mod recording;

pub use convergence::{known_set_digest, verify_convergence, ConvergenceResult, StateDigest};
pub use fixtures::{LabelTxid, Peer};
pub use recording::{AppendRecord, CallCounts, RecordingStorage};
