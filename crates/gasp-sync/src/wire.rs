//! Wire codec for running the protocol between processes.
//!
//! Every [`Remote`] call becomes one request/answer round-trip of CBOR
//! encoded envelopes. The transport is anything that can carry bytes there
//! and back: a [`Channel`]. Errors travel as [`WireError`] and are rebuilt on
//! the calling side into the same [`SyncError`] kinds the responder raised.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gasp_core::{GraphId, GraphNode, NeededInputs};
use gasp_store::Storage;

use crate::engine::Gasp;
use crate::error::{Result, SyncError};
use crate::messages::{limits, InitialReply, InitialRequest, InitialResponse, SyncErrorCode};
use crate::remote::Remote;

/// A call from the initiator to the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireCall {
    InitialResponse(InitialRequest),
    InitialReply(InitialResponse),
    RequestNode {
        graph_id: GraphId,
        txid: String,
        output_index: u32,
        wants_metadata: bool,
    },
    SubmitNode(GraphNode),
}

/// The responder's answer to a [`WireCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireAnswer {
    InitialResponse(InitialResponse),
    InitialReply(InitialReply),
    Node(GraphNode),
    NeededInputs(Option<NeededInputs>),
    Error(WireError),
}

/// An error as carried over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Error code for programmatic handling.
    pub code: SyncErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Responder version, for version mismatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<u32>,
    /// Initiator version, for version mismatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<u32>,
}

impl From<&SyncError> for WireError {
    fn from(e: &SyncError) -> Self {
        let (local, peer) = match e {
            SyncError::VersionMismatch { local, peer } => (Some(*local), Some(*peer)),
            _ => (None, None),
        };
        let message = match e {
            SyncError::InvalidTimestamp(value) => value.clone(),
            SyncError::PeerError { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            code: e.code(),
            message,
            local,
            peer,
        }
    }
}

impl WireError {
    /// Rebuild the error on the calling side.
    pub fn into_sync_error(self) -> SyncError {
        match (self.code, self.local, self.peer) {
            (SyncErrorCode::VersionMismatch, Some(local), Some(peer)) => {
                SyncError::VersionMismatch { local, peer }
            }
            (SyncErrorCode::InvalidTimestamp, _, _) => SyncError::InvalidTimestamp(self.message),
            (code, _, _) => SyncError::PeerError {
                code,
                message: self.message,
            },
        }
    }
}

fn check_inputs(node: &GraphNode) -> std::result::Result<(), &'static str> {
    if node.inputs.as_ref().map_or(0, |inputs| inputs.len()) > limits::MAX_REQUESTED_INPUTS {
        return Err("too many inputs on node");
    }
    Ok(())
}

impl WireCall {
    /// Check if this call respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        match self {
            WireCall::InitialReply(response) => {
                if response.utxo_list.len() > limits::MAX_UTXOS_PER_PAGE {
                    return Err("too many UTXOs in initial response");
                }
            }
            WireCall::InitialResponse(request) => {
                if request.limit.map_or(false, |l| l as usize > limits::MAX_UTXOS_PER_PAGE) {
                    return Err("requested page size exceeds the page limit");
                }
            }
            WireCall::SubmitNode(node) => check_inputs(node)?,
            WireCall::RequestNode { .. } => {}
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode and check limits.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let call: Self = decode(bytes)?;
        call.validate_limits()
            .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;
        Ok(call)
    }
}

impl WireAnswer {
    /// Check if this answer respects size limits.
    pub fn validate_limits(&self) -> std::result::Result<(), &'static str> {
        match self {
            WireAnswer::InitialResponse(response) => {
                if response.utxo_list.len() > limits::MAX_UTXOS_PER_PAGE {
                    return Err("too many UTXOs in initial response");
                }
            }
            WireAnswer::InitialReply(reply) => {
                if reply.utxo_list.len() > limits::MAX_UTXOS_PER_PAGE {
                    return Err("too many UTXOs in initial reply");
                }
            }
            WireAnswer::NeededInputs(Some(needed)) => {
                if needed.len() > limits::MAX_REQUESTED_INPUTS {
                    return Err("too many requested inputs");
                }
            }
            WireAnswer::Node(node) => check_inputs(node)?,
            WireAnswer::NeededInputs(None) | WireAnswer::Error(_) => {}
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Decode and check limits.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let answer: Self = decode(bytes)?;
        answer
            .validate_limits()
            .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;
        Ok(answer)
    }
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    if buf.len() > limits::MAX_MESSAGE_BYTES {
        return Err(SyncError::InvalidMessage("message too large".into()));
    }
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > limits::MAX_MESSAGE_BYTES {
        return Err(SyncError::InvalidMessage("message too large".into()));
    }
    ciborium::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))
}

/// A byte round-trip to a responder.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Deliver one encoded call and return the encoded answer.
    async fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>>;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Arc<C> {
    async fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        (**self).round_trip(request).await
    }
}

/// In-process channel straight into an engine's responder.
#[async_trait]
impl<S: Storage, R: Remote> Channel for Gasp<S, R> {
    async fn round_trip(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        self.serve(&request).await
    }
}

impl<S: Storage, R: Remote> Gasp<S, R> {
    /// Answer one encoded call.
    ///
    /// Failures of the handler, and calls that cannot be decoded, are
    /// answered with an encoded [`WireError`]; only a failure to encode the
    /// answer itself is returned as an error.
    pub async fn serve(&self, request: &[u8]) -> Result<Vec<u8>> {
        let answer = if request.len() > limits::MAX_MESSAGE_BYTES {
            WireAnswer::Error(WireError {
                code: SyncErrorCode::MessageTooLarge,
                message: format!("{} bytes exceeds the message limit", request.len()),
                local: None,
                peer: None,
            })
        } else {
            match WireCall::decode(request) {
                Ok(call) => self.answer(call).await,
                Err(e) => {
                    self.log
                        .warn(format_args!("rejecting undecodable call: {e}"));
                    WireAnswer::Error(WireError::from(&e))
                }
            }
        };
        answer.encode()
    }

    async fn answer(&self, call: WireCall) -> WireAnswer {
        let result = match call {
            WireCall::InitialResponse(request) => self
                .get_initial_response(&request)
                .await
                .map(WireAnswer::InitialResponse),
            WireCall::InitialReply(response) => self
                .get_initial_reply(&response)
                .await
                .map(WireAnswer::InitialReply),
            WireCall::RequestNode {
                graph_id,
                txid,
                output_index,
                wants_metadata,
            } => self
                .request_node(&graph_id, &txid, output_index, wants_metadata)
                .await
                .map(WireAnswer::Node),
            WireCall::SubmitNode(node) => self
                .submit_node(&node)
                .await
                .map(WireAnswer::NeededInputs),
        };
        result.unwrap_or_else(|e| WireAnswer::Error(WireError::from(&e)))
    }
}

/// A [`Remote`] reached through a [`Channel`].
#[derive(Debug, Clone)]
pub struct WireRemote<C> {
    channel: C,
}

impl<C: Channel> WireRemote<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    async fn call(&self, call: WireCall) -> Result<WireAnswer> {
        call.validate_limits()
            .map_err(|e| SyncError::InvalidMessage(e.to_string()))?;
        let reply = self.channel.round_trip(call.encode()?).await?;
        match WireAnswer::decode(&reply)? {
            WireAnswer::Error(e) => Err(e.into_sync_error()),
            answer => Ok(answer),
        }
    }
}

fn unexpected(expected: &str, answer: &WireAnswer) -> SyncError {
    SyncError::InvalidMessage(format!("expected {expected}, got {answer:?}"))
}

#[async_trait]
impl<C: Channel> Remote for WireRemote<C> {
    async fn get_initial_response(&self, request: &InitialRequest) -> Result<InitialResponse> {
        match self.call(WireCall::InitialResponse(request.clone())).await? {
            WireAnswer::InitialResponse(response) => Ok(response),
            other => Err(unexpected("initial response", &other)),
        }
    }

    async fn get_initial_reply(&self, response: &InitialResponse) -> Result<InitialReply> {
        match self.call(WireCall::InitialReply(response.clone())).await? {
            WireAnswer::InitialReply(reply) => Ok(reply),
            other => Err(unexpected("initial reply", &other)),
        }
    }

    async fn request_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode> {
        let call = WireCall::RequestNode {
            graph_id: graph_id.clone(),
            txid: txid.to_string(),
            output_index,
            wants_metadata,
        };
        match self.call(call).await? {
            WireAnswer::Node(node) => Ok(node),
            other => Err(unexpected("node", &other)),
        }
    }

    async fn submit_node(&self, node: &GraphNode) -> Result<Option<NeededInputs>> {
        match self.call(WireCall::SubmitNode(node.clone())).await? {
            WireAnswer::NeededInputs(needed) => Ok(needed),
            other => Err(unexpected("needed inputs", &other)),
        }
    }
}
