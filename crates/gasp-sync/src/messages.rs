//! Handshake message types.
//!
//! The handshake is a request/response pair: the initiator sends its cursor,
//! the responder answers with the UTXOs it holds since that cursor and its own
//! cursor for the reverse direction.

use serde::{Deserialize, Serialize};

use gasp_core::UtxoReference;

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Message size limits, enforced on every decoded wire message.
pub mod limits {
    /// Max UTXOs in one initial response or reply.
    pub const MAX_UTXOS_PER_PAGE: usize = 10_000;
    /// Max outpoints in one needed-inputs response.
    pub const MAX_REQUESTED_INPUTS: usize = 1_000;
    /// Max encoded size of one wire message.
    pub const MAX_MESSAGE_BYTES: usize = 32 * 1024 * 1024;
}

/// Opens a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialRequest {
    /// Protocol version of the initiator.
    pub version: u32,
    /// Cursor of the last interaction with the responder.
    ///
    /// Signed on the wire so negative values from foreign peers are reported
    /// as invalid timestamps rather than decoding failures.
    pub since: i64,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// The responder's answer to an [`InitialRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialResponse {
    /// UTXOs the responder holds since the requested cursor.
    #[serde(rename = "UTXOList")]
    pub utxo_list: Vec<UtxoReference>,
    /// Cursor from which the responder wants UTXOs back.
    pub since: u64,
}

/// The initiator's answer to an [`InitialResponse`].
///
/// Excludes anything already listed in the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialReply {
    /// UTXOs held since the responder's cursor, minus those it already listed.
    #[serde(rename = "UTXOList")]
    pub utxo_list: Vec<UtxoReference>,
}

/// Error codes carried over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyncErrorCode {
    /// Unknown/unspecified error.
    Unknown = 0,
    /// Protocol version mismatch.
    VersionMismatch = 1,
    /// Malformed cursor.
    InvalidTimestamp = 2,
    /// Message too large.
    MessageTooLarge = 3,
    /// Invalid message format.
    InvalidMessage = 4,
    /// Requested output not held by the peer.
    NotFound = 5,
    /// Peer storage rejected the operation.
    StoreError = 6,
    /// Internal error on peer.
    InternalError = 7,
}
