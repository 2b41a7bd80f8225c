//! Kademlia-style xor-distance assignment trie.

use crate::{hash, NodeId, RouteError, RouteResult};
use std::sync::RwLock;

/// Depth of the trie, one level per bit of a virtual-node key.
const KEY_BITS: u32 = 32;

#[derive(Default)]
struct TrieNode {
    /// Child for bit 0 and child for bit 1. A branch with no populated
    /// descendant is pruned rather than retained, so a present child
    /// always leads to at least one owner.
    children: [Option<Box<TrieNode>>; 2],

    /// Set on the node reached after walking all [KEY_BITS] bits.
    owner: Option<NodeId>,
}

/// Key-to-node assignment by walking the bits of the key's hash through
/// a binary trie of virtual-node keys, most significant bit first.
///
/// Where the [HashRing](crate::HashRing) measures clockwise distance,
/// this measures xor distance: at each level the walk prefers the branch
/// matching the key's bit and falls back to the sibling when the
/// preferred branch is absent. The result is the nearest virtual key by
/// xor distance along the explored path - a greedy approximation, not a
/// global nearest-neighbor guarantee, and deliberately kept that way.
///
/// The whole trie sits behind one reader/writer lock because pruning on
/// delete touches a chain of ancestors that must be observed
/// consistently.
pub struct XorTrie(RwLock<TrieNode>);

impl std::fmt::Debug for XorTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XorTrie").finish()
    }
}

impl Default for XorTrie {
    fn default() -> Self {
        Self(RwLock::new(TrieNode::default()))
    }
}

impl XorTrie {
    /// Build a trie from `(node_id, replica_count)` pairs. Construction
    /// is single-threaded by contract; concurrent lookups only begin
    /// once the trie is shared.
    pub fn build<'a>(
        nodes: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Self {
        let trie = Self::default();
        for (node_id, replica_count) in nodes {
            trie.insert_node(node_id, replica_count);
        }
        trie
    }

    /// Map `key` to the node owning the greedily-nearest virtual key by
    /// xor distance from the key's hash.
    pub fn lookup(&self, key: &str) -> RouteResult<NodeId> {
        let root = self.0.read().unwrap();
        let h = hash::hash(key);

        let mut node = &*root;
        for bit in (0..KEY_BITS).rev() {
            let index = ((h >> bit) & 1) as usize;
            node = match node.children[index].as_deref() {
                Some(child) => child,
                None => match node.children[1 - index].as_deref() {
                    Some(sibling) => sibling,
                    // both branches absent only ever happens at an
                    // empty root
                    None => return Err(RouteError::NoNodesAvailable),
                },
            };
        }

        node.owner.clone().ok_or(RouteError::NoNodesAvailable)
    }

    /// Insert the virtual keys for all `replica_count` replicas of
    /// `node_id`, creating any missing branches.
    ///
    /// As with the ring, a virtual-key collision across distinct nodes
    /// is last write wins at the leaf.
    pub fn insert_node(&self, node_id: &str, replica_count: u32) {
        let mut root = self.0.write().unwrap();
        let owner: NodeId = node_id.into();
        for index in 0..replica_count {
            let virtual_key = hash::virtual_key(node_id, index);

            let mut node = &mut *root;
            for bit in (0..KEY_BITS).rev() {
                let branch = ((virtual_key >> bit) & 1) as usize;
                node = &mut **node.children[branch]
                    .get_or_insert_with(Default::default);
            }
            node.owner = Some(owner.clone());

            tracing::debug!(
                %node_id,
                index,
                virtual_key,
                "inserted virtual node",
            );
        }
    }

    /// Remove the virtual keys for all `replica_count` replicas of
    /// `node_id`, pruning every branch left without a populated
    /// descendant. The root itself always survives, possibly empty.
    pub fn delete_node(&self, node_id: &str, replica_count: u32) {
        let mut root = self.0.write().unwrap();
        for index in 0..replica_count {
            let virtual_key = hash::virtual_key(node_id, index);
            remove_key(&mut root, virtual_key, KEY_BITS - 1);
        }
        tracing::debug!(%node_id, replica_count, "removed virtual nodes");
    }
}

/// Drop the leaf for `virtual_key` below `node`, walking down from
/// `bit`. Returns true when `node` has been left with no children, which
/// tells the caller to drop `node` itself - the post-order prune walks
/// back up the ancestor chain this way until a still-populated node (or
/// the root) stops it.
fn remove_key(node: &mut TrieNode, virtual_key: u32, bit: u32) -> bool {
    let branch = ((virtual_key >> bit) & 1) as usize;

    if bit == 0 {
        // at the leaf's parent: drop the leaf outright
        node.children[branch] = None;
    } else if let Some(child) = node.children[branch].as_deref_mut() {
        if remove_key(child, virtual_key, bit - 1) {
            node.children[branch] = None;
        }
    }

    node.children[0].is_none() && node.children[1].is_none()
}
