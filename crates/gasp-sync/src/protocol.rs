//! Handshake builders and the responder side of the protocol.
//!
//! Every engine answers its counterparty through the same [`Remote`]
//! contract it uses to initiate, so a pass between two engines needs nothing
//! more than handing one to the other.

use async_trait::async_trait;

use gasp_core::{validate_timestamp, GraphId, GraphNode, NeededInputs, UtxoReference};
use gasp_store::Storage;

use crate::engine::Gasp;
use crate::error::{Result, SyncError};
use crate::messages::{limits, InitialReply, InitialRequest, InitialResponse};
use crate::remote::Remote;

impl<S: Storage, R: Remote> Gasp<S, R> {
    /// Build the request that opens a pass.
    pub fn build_initial_request(&self, since: u64, limit: Option<u32>) -> Result<InitialRequest> {
        let since = i64::try_from(since).map_err(|_| SyncError::InvalidTimestamp(since.to_string()))?;
        let request = InitialRequest {
            version: self.version,
            since,
            limit,
        };
        self.log
            .debug(format_args!("built initial request: {request:?}"));
        Ok(request)
    }
}

/// Page size actually served: unlimited requests get a full page.
pub(crate) fn page_limit(requested: Option<u32>) -> u32 {
    let max = limits::MAX_UTXOS_PER_PAGE as u32;
    requested.filter(|l| *l > 0).map_or(max, |l| l.min(max))
}

/// Bring a page within `MAX_UTXOS_PER_PAGE`.
///
/// Cuts before the first entry of the score group that straddles the limit,
/// so the group is served whole on the next page. A single group larger than
/// the limit is cut at the limit. Returns whether anything was removed.
fn cap_page(page: &mut Vec<UtxoReference>) -> bool {
    let max = limits::MAX_UTXOS_PER_PAGE;
    if page.len() <= max {
        return false;
    }
    let straddling = page[max - 1].score;
    let end = if page[max].score != straddling {
        max
    } else {
        match page[..max].iter().position(|u| u.score == straddling) {
            Some(0) | None => max,
            Some(start) => start,
        }
    };
    page.truncate(end);
    true
}

#[async_trait]
impl<S: Storage, R: Remote> Remote for Gasp<S, R> {
    async fn get_initial_response(&self, request: &InitialRequest) -> Result<InitialResponse> {
        self.log
            .info(format_args!("received initial request: {request:?}"));
        if request.version != self.version {
            let err = SyncError::VersionMismatch {
                local: self.version,
                peer: request.version,
            };
            self.log.error(format_args!("{err}"));
            return Err(err);
        }
        let since = validate_timestamp(request.since)?;

        let limit = page_limit(request.limit);
        let mut utxo_list = self.storage.find_known_utxos(since, Some(limit)).await?;
        if cap_page(&mut utxo_list) {
            self.log.warn(format_args!(
                "trimmed initial response to {} UTXOs to stay within the page limit",
                utxo_list.len()
            ));
        }
        let response = InitialResponse {
            utxo_list,
            since: self.last_interaction(),
        };
        self.log.debug(format_args!(
            "built initial response with {} UTXOs (since {})",
            response.utxo_list.len(),
            response.since
        ));
        Ok(response)
    }

    async fn get_initial_reply(&self, response: &InitialResponse) -> Result<InitialReply> {
        self.log.info(format_args!(
            "received initial response with {} UTXOs (since {})",
            response.utxo_list.len(),
            response.since
        ));
        let known = self.storage.find_known_utxos(response.since, None).await?;
        let utxo_list: Vec<_> = known
            .into_iter()
            .filter(|mine| {
                !response
                    .utxo_list
                    .iter()
                    .any(|theirs| theirs.same_output(mine))
            })
            .collect();
        self.log
            .debug(format_args!("built initial reply with {} UTXOs", utxo_list.len()));
        Ok(InitialReply { utxo_list })
    }

    async fn request_node(
        &self,
        graph_id: &GraphId,
        txid: &str,
        output_index: u32,
        wants_metadata: bool,
    ) -> Result<GraphNode> {
        self.log.info(format_args!(
            "remote is requesting node {txid}.{output_index} of graph {graph_id}"
        ));
        let node = self
            .storage
            .hydrate_node(graph_id, txid, output_index, wants_metadata)
            .await?;
        Ok(node)
    }

    async fn submit_node(&self, node: &GraphNode) -> Result<Option<NeededInputs>> {
        self.log
            .info(format_args!("remote submitted node of graph {}", node.graph_id));
        self.storage.append_to_graph(node, None).await?;
        let needed = self.storage.find_needed_inputs(node).await?;
        match &needed {
            Some(requested) if requested.is_empty() => self.log.debug(format_args!(
                "graph {} is waiting for other branches",
                node.graph_id
            )),
            Some(requested) => self.log.debug(format_args!(
                "requesting {} inputs for graph {}",
                requested.len(),
                node.graph_id
            )),
            None => {
                self.complete_graph(&node.graph_id).await?;
            }
        }
        Ok(needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GaspConfig;
    use crate::error::ErrorKind;
    use crate::log::LogLevel;
    use crate::messages::PROTOCOL_VERSION;
    use crate::remote::Disconnected;
    use gasp_core::{Outpoint, TxidHasher, UtxoReference};
    use gasp_store::{MemoryStorage, StoredOutput};

    struct LabelTxid;

    impl TxidHasher for LabelTxid {
        fn txid(&self, raw_tx: &str) -> gasp_core::Result<String> {
            Ok(raw_tx.to_string())
        }
    }

    fn responder(storage: MemoryStorage) -> Gasp<MemoryStorage, Disconnected> {
        Gasp::new(
            storage,
            Disconnected,
            GaspConfig::default().with_log_level(LogLevel::None),
        )
        .unwrap()
        .with_txid_hasher(LabelTxid)
    }

    fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::with_hasher(LabelTxid);
        storage.insert_utxo(StoredOutput::new("a", 0, "a").with_score(10).with_proof("p"));
        storage.insert_utxo(StoredOutput::new("b", 0, "b").with_score(20).with_proof("p"));
        storage.insert_utxo(StoredOutput::new("c", 1, "c").with_score(30).with_proof("p"));
        storage
    }

    #[test]
    fn test_build_initial_request() {
        let engine = responder(MemoryStorage::new());
        let request = engine.build_initial_request(42, Some(5)).unwrap();
        assert_eq!(
            request,
            InitialRequest {
                version: PROTOCOL_VERSION,
                since: 42,
                limit: Some(5),
            }
        );
    }

    #[test]
    fn test_build_initial_request_rejects_unrepresentable_cursor() {
        let engine = responder(MemoryStorage::new());
        let err = engine.build_initial_request(u64::MAX, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimestamp);
    }

    #[tokio::test]
    async fn test_initial_response_filters_by_since() {
        let engine = responder(seeded());
        let response = engine
            .get_initial_response(&InitialRequest {
                version: PROTOCOL_VERSION,
                since: 10,
                limit: None,
            })
            .await
            .unwrap();

        let txids: Vec<_> = response.utxo_list.iter().map(|u| u.txid.as_str()).collect();
        assert_eq!(txids, vec!["b", "c"]);
        assert_eq!(response.since, 0);
    }

    #[tokio::test]
    async fn test_initial_response_rejects_version_and_negative_since() {
        let engine = responder(seeded());

        let err = engine
            .get_initial_response(&InitialRequest {
                version: 2,
                since: 0,
                limit: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::VersionMismatch { local: 1, peer: 2 }));

        let err = engine
            .get_initial_response(&InitialRequest {
                version: PROTOCOL_VERSION,
                since: -1,
                limit: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTimestamp);
    }

    #[tokio::test]
    async fn test_initial_reply_excludes_listed_outputs() {
        let engine = responder(seeded());
        let reply = engine
            .get_initial_reply(&InitialResponse {
                utxo_list: vec![UtxoReference::new("b", 0, 999)],
                since: 0,
            })
            .await
            .unwrap();

        let outpoints: Vec<_> = reply.utxo_list.iter().map(UtxoReference::outpoint).collect();
        assert_eq!(outpoints, vec![Outpoint::new("a", 0), Outpoint::new("c", 1)]);
    }

    #[tokio::test]
    async fn test_request_node_hydrates_from_storage() {
        let engine = responder(seeded());
        let graph_id = Outpoint::new("tip", 0);
        let node = engine.request_node(&graph_id, "c", 1, false).await.unwrap();
        assert_eq!(node.graph_id, graph_id);
        assert_eq!(node.raw_tx, "c");
        assert!(node.inputs.is_none());

        let err = engine.request_node(&graph_id, "missing", 0, true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ItemFailure);
    }

    #[tokio::test]
    async fn test_submit_node_completes_when_nothing_is_needed() {
        let engine = responder(MemoryStorage::with_hasher(LabelTxid));
        let tip = Outpoint::new("t1", 0);
        let mut node = GraphNode::new(tip.clone(), "t1", 0);
        node.proof = Some("p".into());

        let needed = engine.submit_node(&node).await.unwrap();

        assert!(needed.is_none());
        assert_eq!(engine.storage().known_outpoints(), vec![tip]);
    }

    #[tokio::test]
    async fn test_submit_node_requests_missing_inputs() {
        let engine = responder(MemoryStorage::with_hasher(LabelTxid));
        let tip = Outpoint::new("t2", 0);
        let parent = Outpoint::new("t1", 0);
        let mut node = GraphNode::new(tip.clone(), "t2", 0);
        node.inputs = Some(
            [(parent.clone(), gasp_core::InputMetadata { hash: "h".into() })]
                .into_iter()
                .collect(),
        );

        let needed = engine.submit_node(&node).await.unwrap().unwrap();

        assert!(needed.requested_inputs.contains_key(&parent));
        assert!(engine.storage().known_outpoints().is_empty());
        assert_eq!(engine.storage().temp_graph_len(&tip), Some(1));
    }

    #[tokio::test]
    async fn test_unlimited_request_is_served_one_full_page() {
        let storage = MemoryStorage::with_hasher(LabelTxid);
        let total = limits::MAX_UTXOS_PER_PAGE as u64 + 1;
        for score in 1..=total {
            let txid = format!("u{score}");
            storage.insert_utxo(StoredOutput::new(txid.clone(), 0, txid).with_score(score));
        }
        let engine = responder(storage);

        for limit in [None, Some(0), Some(u32::MAX)] {
            let response = engine
                .get_initial_response(&InitialRequest {
                    version: PROTOCOL_VERSION,
                    since: 0,
                    limit,
                })
                .await
                .unwrap();
            assert_eq!(response.utxo_list.len(), limits::MAX_UTXOS_PER_PAGE);
        }
    }

    #[test]
    fn test_page_limit() {
        let max = limits::MAX_UTXOS_PER_PAGE as u32;
        assert_eq!(page_limit(None), max);
        assert_eq!(page_limit(Some(0)), max);
        assert_eq!(page_limit(Some(7)), 7);
        assert_eq!(page_limit(Some(max + 1)), max);
    }

    #[test]
    fn test_cap_page_moves_straddling_group_to_next_page() {
        let max = limits::MAX_UTXOS_PER_PAGE;
        let mut page: Vec<UtxoReference> = (0..max - 2)
            .map(|i| UtxoReference::new(format!("a{i}"), 0, 1))
            .chain((0..5).map(|i| UtxoReference::new(format!("b{i}"), 0, 2)))
            .collect();
        assert!(cap_page(&mut page));
        assert_eq!(page.len(), max - 2);
        assert!(page.iter().all(|u| u.score == Some(1)));

        let mut exact: Vec<UtxoReference> = (0..max)
            .map(|i| UtxoReference::new(format!("a{i}"), 0, 1))
            .chain(std::iter::once(UtxoReference::new("b", 0, 2)))
            .collect();
        assert!(cap_page(&mut exact));
        assert_eq!(exact.len(), max);

        let mut huge = vec![UtxoReference::new("same", 0, 3); max + 3];
        assert!(cap_page(&mut huge));
        assert_eq!(huge.len(), max);
    }

    #[tokio::test]
    async fn test_submit_node_waits_for_sibling_inputs() {
        let engine = responder(MemoryStorage::with_hasher(LabelTxid));
        let tip = Outpoint::new("t", 0);
        let mut node = GraphNode::new(tip.clone(), "t", 0);
        node.inputs = Some(
            ["p1", "p2"]
                .into_iter()
                .map(|p| (Outpoint::new(p, 0), gasp_core::InputMetadata { hash: "h".into() }))
                .collect(),
        );
        assert_eq!(engine.submit_node(&node).await.unwrap().unwrap().len(), 2);

        let mut first = GraphNode::new(tip.clone(), "p1", 0);
        first.proof = Some("p".into());
        let pending = engine.submit_node(&first).await.unwrap().unwrap();
        assert!(pending.is_empty());
        assert!(engine.storage().known_outpoints().is_empty());

        let mut second = GraphNode::new(tip.clone(), "p2", 0);
        second.proof = Some("p".into());
        assert!(engine.submit_node(&second).await.unwrap().is_none());
        assert_eq!(engine.storage().known_outpoints(), vec![tip]);
    }
}
