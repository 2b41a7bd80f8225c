//! Classic consistent-hash ring.

use crate::{hash, NodeId, RouteError, RouteResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-to-node assignment by clockwise-nearest virtual node on a
/// circular 32-bit hash space.
///
/// Each node owns `replica_count` virtual positions, so adding or
/// removing a node only remaps the keys owned by that node's positions.
/// The ordered key sequence and the owner table are always mutated
/// together under the write lock; lookups share a read lock.
pub struct HashRing(RwLock<RingState>);

#[derive(Default)]
struct RingState {
    /// Ascending virtual-node keys. Exactly the key set of `owners`.
    sorted: Vec<u32>,

    /// Virtual-node key to owning node.
    owners: HashMap<u32, NodeId>,
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("virtual_nodes", &self.0.read().unwrap().sorted.len())
            .finish()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self(RwLock::new(RingState::default()))
    }
}

impl HashRing {
    /// Build a ring from `(node_id, replica_count)` pairs. Construction
    /// is single-threaded by contract; concurrent lookups only begin
    /// once the ring is shared.
    pub fn build<'a>(
        nodes: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Self {
        let ring = Self::default();
        for (node_id, replica_count) in nodes {
            ring.insert_node(node_id, replica_count);
        }
        ring
    }

    /// Map `key` to the node owning the first virtual position clockwise
    /// from the key's hash, wrapping past the top of the space.
    pub fn lookup(&self, key: &str) -> RouteResult<NodeId> {
        let state = self.0.read().unwrap();
        if state.sorted.is_empty() {
            return Err(RouteError::NoNodesAvailable);
        }

        let h = hash::hash(key);
        let index = match state.sorted.binary_search(&h) {
            Ok(index) => index,
            Err(index) => index,
        };
        // past the largest virtual key the ring wraps to the smallest
        let index = if index == state.sorted.len() { 0 } else { index };

        let virtual_key = state.sorted[index];
        Ok(state
            .owners
            .get(&virtual_key)
            .expect("owner table out of sync with sorted keys")
            .clone())
    }

    /// Insert the virtual keys for all `replica_count` replicas of
    /// `node_id`, keeping the sequence sorted.
    ///
    /// A virtual-key collision across distinct nodes is last write wins:
    /// the new owner silently replaces the old one. With 32-bit keys
    /// derived from a strong hash this is a negligible-probability,
    /// accepted approximation.
    pub fn insert_node(&self, node_id: &str, replica_count: u32) {
        let mut state = self.0.write().unwrap();
        let owner: NodeId = node_id.into();
        for index in 0..replica_count {
            let virtual_key = hash::virtual_key(node_id, index);
            if let Err(position) = state.sorted.binary_search(&virtual_key)
            {
                state.sorted.insert(position, virtual_key);
            }
            state.owners.insert(virtual_key, owner.clone());
            tracing::debug!(
                %node_id,
                index,
                virtual_key,
                "inserted virtual node",
            );
        }
    }

    /// Remove the virtual keys for all `replica_count` replicas of
    /// `node_id` from both the owner table and the sorted sequence.
    pub fn delete_node(&self, node_id: &str, replica_count: u32) {
        let mut state = self.0.write().unwrap();
        for index in 0..replica_count {
            let virtual_key = hash::virtual_key(node_id, index);
            state.owners.remove(&virtual_key);
            if let Ok(position) = state.sorted.binary_search(&virtual_key) {
                state.sorted.remove(position);
            }
        }
        tracing::debug!(%node_id, replica_count, "removed virtual nodes");
    }
}
