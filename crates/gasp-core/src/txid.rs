//! Transaction ID computation.
//!
//! Graph nodes carry raw transactions, not txids. Node identity (for cycle
//! detection and spent-by references) needs the txid, so the engine asks a
//! [`TxidHasher`] to derive it. Parsing transactions is outside the protocol
//! core; hosts with their own transaction model plug in their own hasher.

use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Derives a transaction ID from a raw transaction.
pub trait TxidHasher: Send + Sync {
    /// Compute the txid of `raw_tx`.
    fn txid(&self, raw_tx: &str) -> Result<String>;
}

/// Bitcoin-style txid: SHA-256 applied twice to the decoded bytes, displayed
/// in reversed byte order as lowercase hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleSha256;

impl TxidHasher for DoubleSha256 {
    fn txid(&self, raw_tx: &str) -> Result<String> {
        let bytes = hex::decode(raw_tx).map_err(|e| CoreError::MalformedTransaction(e.to_string()))?;
        let mut digest = Sha256::digest(Sha256::digest(&bytes));
        digest.reverse();
        Ok(hex::encode(digest))
    }
}

impl<T: TxidHasher + ?Sized> TxidHasher for std::sync::Arc<T> {
    fn txid(&self, raw_tx: &str) -> Result<String> {
        (**self).txid(raw_tx)
    }
}
