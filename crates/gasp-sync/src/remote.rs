//! Remote abstraction.
//!
//! A [`Remote`] is the counterparty as seen from one engine. The contract is
//! symmetric: every engine also implements it as the responder, so two
//! engines in one process can be wired directly to each other. Over a real
//! network, [`crate::wire::WireRemote`] implements it on top of a byte
//! channel.

use std::sync::Arc;

use async_trait::async_trait;
use gasp_core::{GraphId, GraphNode, NeededInputs};

use crate::error::{Result, SyncError};
use crate::messages::{InitialReply, InitialRequest, InitialResponse};

/// The counterparty of a sync pass.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Remote: Send + Sync {
    /// Send an initial request and obtain the counterparty's initial response.
    async fn get_initial_response(&self, request: &InitialRequest) -> Result<InitialResponse>;

    /// Send an initial response and obtain the counterparty's reply.
    async fn get_initial_reply(&self, response: &InitialResponse) -> Result<InitialReply>;

    /// Request one node of a graph from the counterparty.
    async fn request_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode>;

    /// Submit a node and learn which of its inputs the counterparty still needs.
    async fn submit_node(&self, node: &GraphNode) -> Result<Option<NeededInputs>>;
}

#[async_trait]
impl<R: Remote + ?Sized> Remote for Arc<R> {
    async fn get_initial_response(&self, request: &InitialRequest) -> Result<InitialResponse> {
        (**self).get_initial_response(request).await
    }

    async fn get_initial_reply(&self, response: &InitialResponse) -> Result<InitialReply> {
        (**self).get_initial_reply(response).await
    }

    async fn request_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode> {
        (**self)
            .request_node(graph_id, txid, output_index, wants_metadata)
            .await
    }

    async fn submit_node(&self, node: &GraphNode) -> Result<Option<NeededInputs>> {
        (**self).submit_node(node).await
    }
}

/// A remote that rejects every call.
///
/// For engines that only ever answer requests and never initiate a pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl Remote for Disconnected {
    async fn get_initial_response(&self, _request: &InitialRequest) -> Result<InitialResponse> {
        Err(SyncError::Disconnected)
    }

    async fn get_initial_reply(&self, _response: &InitialResponse) -> Result<InitialReply> {
        Err(SyncError::Disconnected)
    }

    async fn request_node(
        &self,
        _graph_id: &GraphId,
        _txid: &str,
        _output_index: u32,
        _wants_metadata: bool,
    ) -> Result<GraphNode> {
        Err(SyncError::Disconnected)
    }

    async fn submit_node(&self, _node: &GraphNode) -> Result<Option<NeededInputs>> {
        Err(SyncError::Disconnected)
    }
}
