//! Graph resolution.
//!
//! Walks a transaction graph from its tip towards its anchors, one frontier
//! level at a time. Each top-level item gets its own seen-set keyed by node
//! identity (computed txid plus output index), which is what makes cyclic
//! graphs terminate. Nodes of one level are processed through the engine's
//! [`Concurrency`](crate::runner::Concurrency) policy.

use std::collections::HashSet;

use gasp_core::{GraphNode, Outpoint};
use gasp_store::Storage;

use crate::engine::Gasp;
use crate::error::Result;
use crate::remote::Remote;

/// A node waiting to be appended, with the node that spends it.
struct Pending {
    node: GraphNode,
    spent_by: Option<Outpoint>,
}

impl<S: Storage, R: Remote> Gasp<S, R> {
    /// Pull a graph from the remote into local temporary storage.
    ///
    /// Any failure fails the whole item.
    pub(crate) async fn resolve_incoming(&self, root: GraphNode) -> Result<()> {
        let mut seen = HashSet::new();
        let mut frontier = vec![Pending {
            node: root,
            spent_by: None,
        }];

        while !frontier.is_empty() {
            let mut batch = Vec::with_capacity(frontier.len());
            for pending in frontier {
                let id = self.node_outpoint(&pending.node)?;
                if seen.insert(id.clone()) {
                    batch.push((id, pending));
                } else {
                    self.log
                        .debug(format_args!("node {id} already processed"));
                }
            }

            let results = self
                .concurrency
                .run(batch, |(id, pending)| self.ingest_node(id, pending))
                .await;
            frontier = Vec::new();
            for children in results {
                frontier.extend(children?);
            }
        }
        Ok(())
    }

    /// Append one node and fetch the inputs storage still needs.
    async fn ingest_node(&self, id: Outpoint, pending: Pending) -> Result<Vec<Pending>> {
        let Pending { node, spent_by } = pending;
        self.log
            .debug(format_args!("processing incoming node {id}"));
        self.storage
            .append_to_graph(&node, spent_by.as_ref())
            .await?;

        let needed = self.storage.find_needed_inputs(&node).await?;
        let Some(needed) = needed.filter(|n| !n.is_empty()) else {
            return Ok(Vec::new());
        };
        self.log.info(format_args!(
            "requesting {} inputs of node {id} in graph {}",
            needed.len(),
            node.graph_id
        ));

        let graph_id = &node.graph_id;
        let fetched = self
            .concurrency
            .run(needed.requested_inputs, |(input, request)| async move {
                self.remote
                    .request_node(
                        graph_id,
                        &input.txid,
                        input.output_index,
                        request.wants_metadata,
                    )
                    .await
            })
            .await;

        fetched
            .into_iter()
            .map(|child| {
                child.map(|node| Pending {
                    node,
                    spent_by: Some(id.clone()),
                })
            })
            .collect()
    }

    /// Push a local graph to the remote, answering its input requests.
    ///
    /// A failure submitting `root` fails the item. Failures further down are
    /// logged and stop only their own branch.
    pub(crate) async fn resolve_outgoing(&self, root: GraphNode) -> Result<()> {
        if self.unidirectional {
            self.log.debug(format_args!(
                "skipping outgoing node of graph {} (unidirectional)",
                root.graph_id
            ));
            return Ok(());
        }

        let mut seen = HashSet::new();
        seen.insert(self.node_outpoint(&root)?);
        let mut frontier = self.submit_outgoing(root).await?;

        while !frontier.is_empty() {
            let mut batch = Vec::with_capacity(frontier.len());
            for node in frontier {
                match self.node_outpoint(&node) {
                    Ok(id) if seen.insert(id.clone()) => batch.push((id, node)),
                    Ok(id) => self
                        .log
                        .debug(format_args!("node {id} already processed")),
                    Err(e) => self.log.error(format_args!(
                        "cannot identify outgoing node of graph {}: {e}",
                        node.graph_id
                    )),
                }
            }

            let results = self
                .concurrency
                .run(batch, |(id, node)| async move {
                    let result = self.submit_outgoing(node).await;
                    (id, result)
                })
                .await;
            frontier = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(children) => frontier.extend(children),
                    Err(e) => self
                        .log
                        .error(format_args!("error processing outgoing node {id}: {e}")),
                }
            }
        }
        Ok(())
    }

    /// Submit one node and hydrate whatever the remote asks for.
    async fn submit_outgoing(&self, node: GraphNode) -> Result<Vec<GraphNode>> {
        let needed = self.remote.submit_node(&node).await?;
        let Some(needed) = needed.filter(|n| !n.is_empty()) else {
            return Ok(Vec::new());
        };
        self.log.info(format_args!(
            "remote requested {} inputs for graph {}",
            needed.len(),
            node.graph_id
        ));

        let graph_id = &node.graph_id;
        let hydrated = self
            .concurrency
            .run(needed.requested_inputs, |(input, request)| async move {
                let result = self
                    .storage
                    .hydrate_node(
                        graph_id,
                        &input.txid,
                        input.output_index,
                        request.wants_metadata,
                    )
                    .await;
                (input, result)
            })
            .await;

        let mut children = Vec::with_capacity(hydrated.len());
        for (input, result) in hydrated {
            match result {
                Ok(child) => children.push(child),
                Err(e) => self.log.error(format_args!(
                    "failed to hydrate input {input} of graph {graph_id}: {e}"
                )),
            }
        }
        Ok(children)
    }
}
