//! Request routing: hot-key dispersal, hash assignment, lazy eviction.

use crate::{
    AssignmentFlavor, HashRing, HotKeyTracker, MembershipTable, NodeId,
    RouteError, RouteResult, RouterConfig, Timestamp, XorTrie,
};
use rand::Rng;
use std::sync::Arc;

/// The active key-to-node assignment structure.
///
/// Chosen once at construction from [RouterConfig::assignment]; both
/// variants expose the same lookup/insert/delete contract.
#[derive(Debug)]
pub enum Assignment {
    /// Clockwise-nearest assignment on a circular hash space.
    Ring(HashRing),

    /// Greedy xor-nearest assignment in a binary trie.
    Trie(XorTrie),
}

impl Assignment {
    /// Map `key` to its assigned node.
    pub fn lookup(&self, key: &str) -> RouteResult<NodeId> {
        match self {
            Assignment::Ring(ring) => ring.lookup(key),
            Assignment::Trie(trie) => trie.lookup(key),
        }
    }

    /// Insert all virtual keys for `node_id`.
    pub fn insert_node(&self, node_id: &str, replica_count: u32) {
        match self {
            Assignment::Ring(ring) => {
                ring.insert_node(node_id, replica_count)
            }
            Assignment::Trie(trie) => {
                trie.insert_node(node_id, replica_count)
            }
        }
    }

    /// Remove all virtual keys for `node_id`.
    pub fn delete_node(&self, node_id: &str, replica_count: u32) {
        match self {
            Assignment::Ring(ring) => {
                ring.delete_node(node_id, replica_count)
            }
            Assignment::Trie(trie) => {
                trie.delete_node(node_id, replica_count)
            }
        }
    }
}

/// The single routing entry point, composing the membership table, the
/// assignment structure, and the hot-key tracker.
///
/// All three structures are explicitly constructed and owned here (the
/// membership table shared via [Arc] so the transport layer can also
/// reach it); each guards itself with its own lock. A route is therefore
/// not atomic across them - a node can be evicted between being chosen
/// and being re-validated - which is why eviction is a retry loop rather
/// than a single check.
#[derive(Debug)]
pub struct Router {
    config: RouterConfig,
    membership: Arc<MembershipTable>,
    assignment: Assignment,
    hot_keys: HotKeyTracker,
}

impl Router {
    /// Construct a router over `membership`, seeding the assignment
    /// structure from the currently registered nodes.
    pub fn new(
        config: RouterConfig,
        membership: Arc<MembershipTable>,
    ) -> Self {
        let nodes = membership.snapshot();
        let nodes = nodes
            .iter()
            .map(|n| (&*n.node_id, n.replica_count));

        let assignment = match config.assignment {
            AssignmentFlavor::Ring => {
                Assignment::Ring(HashRing::build(nodes))
            }
            AssignmentFlavor::Trie => {
                Assignment::Trie(XorTrie::build(nodes))
            }
        };

        let hot_keys = HotKeyTracker::new(
            config.hot_key_threshold,
            config.hot_key_smoothing,
        );

        Self {
            config,
            membership,
            assignment,
            hot_keys,
        }
    }

    /// Route `key` to a backend node as of `now`.
    ///
    /// Hot keys are dispersed to a uniformly random live node instead of
    /// their hash assignment. Whatever node comes out, its membership
    /// record must still be fresh; stale nodes encountered here are
    /// evicted from the topology and the choice is redone on what
    /// remains, until a fresh node is found or the topology is empty.
    pub fn route(
        &self,
        key: &str,
        now: Timestamp,
    ) -> RouteResult<NodeId> {
        let dispersed = self.hot_keys.observe(key, now.as_secs());
        if dispersed {
            tracing::info!(%key, "hot key, dispersing");
        }

        let mut target = self.choose(key, dispersed)?;

        while self.membership.is_stale(
            &target,
            self.config.liveness_timeout(),
            now,
        ) {
            tracing::info!(node_id = %target, "evicting stale node");
            match self.delete_node(&target) {
                Ok(()) => {}
                // another request got to it first; the topology has
                // already moved on
                Err(RouteError::UnknownNode(_)) => {}
                Err(err) => return Err(err),
            }
            target = self.choose(key, dispersed)?;
        }

        Ok(target)
    }

    fn choose(&self, key: &str, dispersed: bool) -> RouteResult<NodeId> {
        if dispersed {
            let node_ids = self.membership.node_ids();
            if node_ids.is_empty() {
                return Err(RouteError::NoNodesAvailable);
            }
            let index = rand::thread_rng().gen_range(0..node_ids.len());
            Ok(node_ids[index].clone())
        } else {
            self.assignment.lookup(key)
        }
    }

    /// Register a node, or update the replica count of an existing one.
    ///
    /// For an existing node the virtual keys derived from its previous
    /// replica count are removed first, so the assignment structure
    /// never accumulates positions for counts no longer in effect.
    pub fn insert_node(
        &self,
        node_id: &str,
        replica_count: u32,
    ) -> RouteResult<()> {
        if replica_count == 0 {
            return Err(RouteError::invalid_parameter(
                "replica_count must be at least 1",
            ));
        }

        if let Some(previous) = self.membership.replica_count(node_id) {
            self.assignment.delete_node(node_id, previous);
        }

        self.membership.insert(node_id, replica_count)?;
        self.assignment.insert_node(node_id, replica_count);
        Ok(())
    }

    /// Remove a node from the membership table and the assignment
    /// structure.
    pub fn delete_node(&self, node_id: &str) -> RouteResult<()> {
        let node = self.membership.delete(node_id)?;
        self.assignment.delete_node(node_id, node.replica_count);
        Ok(())
    }

    /// Record a heartbeat from a registered node.
    pub fn heartbeat(&self, node_id: &str) -> RouteResult<()> {
        self.membership.heartbeat(node_id)
    }

    /// The membership table this router validates against.
    pub fn membership(&self) -> &Arc<MembershipTable> {
        &self.membership
    }
}
