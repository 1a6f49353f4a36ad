use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::network::Node;
use log::{info, warn};
use std::collections::BTreeMap;

/// In-process peers keyed by node id
///
/// Broadcasting is a synchronous fan-out: every other peer validates the block on its
/// own, so a partial acceptance is a normal outcome.
#[derive(Default, Clone)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Node>,
}

impl NodeRegistry {
    pub fn new() -> NodeRegistry {
        NodeRegistry::default()
    }

    /// Add a node, replacing any node with the same id
    pub fn register(&mut self, node: Node) {
        self.nodes.insert(node.id().to_string(), node);
    }

    pub fn get(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| BlockchainError::UnknownNode(id.to_string()))
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Offer `block` to every peer except `from`; peer id -> accepted
    pub fn broadcast_block(&self, from: &str, block: &Block) -> Result<BTreeMap<String, bool>> {
        self.get(from)?;
        let mut results = BTreeMap::new();
        for (peer_id, peer) in self.nodes.iter().filter(|(id, _)| id.as_str() != from) {
            let accepted = match peer.receive_block(block.clone()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Peer {peer_id} rejected block {}: {e}", block.get_hash());
                    false
                }
            };
            results.insert(peer_id.clone(), accepted);
        }
        info!(
            "Broadcast of block {} from {from}: {}/{} peers accepted",
            block.get_hash(),
            results.values().filter(|accepted| **accepted).count(),
            results.len()
        );
        Ok(results)
    }

    /// Broadcast the tip of node `from`
    pub fn broadcast_last_block(&self, from: &str) -> Result<BTreeMap<String, bool>> {
        let block = self.get(from)?.latest_block()?;
        self.broadcast_block(from, &block)
    }
}
