//! Canonical outpoint encoding.
//!
//! An outpoint names one output of one transaction. Its string form,
//! `<txid>.<output_index>`, is the key used for known-UTXO sets, requested
//! inputs and temporary graphs. When it names the tip of a dependency graph it
//! doubles as that graph's identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Separator between txid and output index in the canonical form.
pub const SEPARATOR: char = '.';

/// A `(txid, output index)` pair.
///
/// Parsing splits on the last separator, so the encoding stays injective even
/// for txids that themselves contain a `.`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Outpoint {
    /// Transaction identifier.
    pub txid: String,
    /// Index of the output within the transaction.
    pub output_index: u32,
}

/// Identifier of a dependency graph: the outpoint of its tip.
pub type GraphId = Outpoint;

impl Outpoint {
    /// Create an outpoint from its parts.
    pub fn new(txid: impl Into<String>, output_index: u32) -> Self {
        Self {
            txid: txid.into(),
            output_index,
        }
    }

    /// Canonical string form.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse the canonical string form.
    pub fn decode(s: &str) -> Result<Self, CoreError> {
        let (txid, index) = s
            .rsplit_once(SEPARATOR)
            .ok_or_else(|| CoreError::InvalidOutpoint(format!("missing separator in {s:?}")))?;
        if txid.is_empty() {
            return Err(CoreError::InvalidOutpoint(format!("empty txid in {s:?}")));
        }
        let output_index = index
            .parse::<u32>()
            .map_err(|e| CoreError::InvalidOutpoint(format!("bad output index in {s:?}: {e}")))?;
        Ok(Self::new(txid, output_index))
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.txid, SEPARATOR, self.output_index)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({self})")
    }
}

impl FromStr for Outpoint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<Outpoint> for String {
    fn from(outpoint: Outpoint) -> Self {
        outpoint.encode()
    }
}

impl TryFrom<String> for Outpoint {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::decode(&s)
    }
}
