//! Convergence verification.
//!
//! After a bidirectional pass both parties should hold the same set of
//! unspent outputs. Each side can summarize its set as a digest and compare
//! without exchanging the full list.

use std::collections::BTreeSet;

use gasp_core::Outpoint;
use gasp_store::{Result, Storage};

/// BLAKE3 digest of a known-outpoint set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateDigest(pub [u8; 32]);

impl StateDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for StateDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StateDigest({})", self.to_hex())
    }
}

/// Outcome of comparing two parties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Both hold exactly the same outpoints.
    Converged(StateDigest),
    /// The sets differ.
    Diverged {
        /// Outpoints only the remote side holds.
        missing_local: Vec<Outpoint>,
        /// Outpoints only the local side holds.
        missing_remote: Vec<Outpoint>,
    },
}

impl ConvergenceResult {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged(_))
    }
}

async fn known_set<S: Storage + ?Sized>(storage: &S) -> Result<BTreeSet<Outpoint>> {
    let utxos = storage.find_known_utxos(0, None).await?;
    Ok(utxos.iter().map(|utxo| utxo.outpoint()).collect())
}

fn digest(outpoints: &BTreeSet<Outpoint>) -> StateDigest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"gasp-known-v1:");
    for outpoint in outpoints {
        hasher.update(outpoint.encode().as_bytes());
        hasher.update(b"\n");
    }
    StateDigest(*hasher.finalize().as_bytes())
}

/// Digest of every outpoint the storage reports as known.
///
/// Independent of insertion order and of scores.
pub async fn known_set_digest<S: Storage + ?Sized>(storage: &S) -> Result<StateDigest> {
    Ok(digest(&known_set(storage).await?))
}

/// Compare two parties' known sets.
pub async fn verify_convergence<A, B>(local: &A, remote: &B) -> Result<ConvergenceResult>
where
    A: Storage + ?Sized,
    B: Storage + ?Sized,
{
    let ours = known_set(local).await?;
    let theirs = known_set(remote).await?;
    if ours == theirs {
        return Ok(ConvergenceResult::Converged(digest(&ours)));
    }
    Ok(ConvergenceResult::Diverged {
        missing_local: theirs.difference(&ours).cloned().collect(),
        missing_remote: ours.difference(&theirs).cloned().collect(),
    })
}
