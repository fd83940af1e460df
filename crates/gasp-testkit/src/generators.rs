//! Proptest generators for property-based testing.

use proptest::prelude::*;

use gasp_core::{Outpoint, UtxoReference};
use gasp_store::MemoryStorage;

use crate::fixtures::{op, proven, spending};

/// Generate a txid-like label.
pub fn label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,11}".prop_map(String::from)
}

/// Generate an outpoint, including txids that contain the separator.
pub fn outpoint() -> impl Strategy<Value = Outpoint> {
    ("[a-z0-9][a-z0-9.]{0,15}", any::<u32>()).prop_map(|(txid, index)| Outpoint::new(txid, index))
}

/// Generate a score.
pub fn score() -> impl Strategy<Value = u64> {
    1u64..=1_000_000
}

/// Generate a UTXO reference, sometimes unconfirmed.
pub fn utxo_reference() -> impl Strategy<Value = UtxoReference> {
    (label(), 0u32..4, proptest::option::of(score())).prop_map(|(txid, index, score)| {
        UtxoReference {
            txid,
            output_index: index,
            score,
        }
    })
}

/// Shape of a single-input chain ending in a UTXO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    /// Prefix of every label in the chain.
    pub name: String,
    /// Spends between the root and the tip.
    pub depth: usize,
    /// Score of the tip.
    pub score: u64,
    /// Whether the root carries a proof.
    pub anchored: bool,
}

impl ChainSpec {
    /// Label of the node at `level` (0 is the root).
    pub fn label(&self, level: usize) -> String {
        format!("{}-{}", self.name, level)
    }

    /// Outpoint of the tip.
    pub fn tip(&self) -> Outpoint {
        op(&self.label(self.depth))
    }

    /// Insert the chain: ancestors as spent transactions, the tip as a UTXO.
    pub fn seed(&self, storage: &MemoryStorage) {
        for level in 0..=self.depth {
            let label = self.label(level);
            let output = if level == 0 {
                if self.anchored {
                    proven(&label)
                } else {
                    spending(&label, &[])
                }
            } else {
                spending(&label, &[&self.label(level - 1)])
            };
            if level == self.depth {
                storage.insert_utxo(output.with_score(self.score));
            } else {
                storage.insert_transaction(output);
            }
        }
    }
}

/// Generate a set of chains with distinct names.
pub fn chains(max: usize) -> impl Strategy<Value = Vec<ChainSpec>> {
    prop::collection::vec((0usize..6, score(), any::<bool>()), 0..=max).prop_map(|shapes| {
        shapes
            .into_iter()
            .enumerate()
            .map(|(i, (depth, score, anchored))| ChainSpec {
                name: format!("g{i}"),
                depth,
                score,
                anchored,
            })
            .collect()
    })
}
