//! Node membership and heartbeat-driven liveness.

use crate::{RouteError, RouteResult, Timestamp};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Opaque identifier of a backend node, its network address in practice.
/// Unique within a [MembershipTable].
pub type NodeId = Arc<str>;

/// A registered backend node.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerNode {
    /// The node identifier.
    pub node_id: NodeId,

    /// How many virtual positions this node owns in the hash space.
    /// Always at least 1 while the node is registered.
    pub replica_count: u32,

    /// When this node last proved liveness. Initialized past "now" by the
    /// registration grace so a slow-starting backend is not evicted
    /// before its first heartbeat.
    pub last_seen: Timestamp,
}

/// The authoritative registry of nodes eligible to receive traffic.
///
/// Heartbeats refresh freshness, administrative inserts and deletes
/// change the set. The table never removes nodes on its own; stale nodes
/// are evicted lazily by the [Router](crate::Router) when a lookup
/// encounters them.
pub struct MembershipTable {
    grace: std::time::Duration,
    nodes: RwLock<HashMap<NodeId, ServerNode>>,
}

impl std::fmt::Debug for MembershipTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipTable")
            .field("grace", &self.grace)
            .finish()
    }
}

impl MembershipTable {
    /// Construct an empty table granting `grace` to new registrations.
    pub fn new(grace: std::time::Duration) -> Self {
        Self {
            grace,
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a node, or update the replica count of an existing one.
    ///
    /// Re-registration does not refresh `last_seen`; only heartbeats
    /// prove liveness.
    pub fn insert(
        &self,
        node_id: &str,
        replica_count: u32,
    ) -> RouteResult<()> {
        if replica_count == 0 {
            return Err(RouteError::invalid_parameter(
                "replica_count must be at least 1",
            ));
        }

        let mut nodes = self.nodes.write().unwrap();
        match nodes.get_mut(node_id) {
            Some(node) => {
                node.replica_count = replica_count;
            }
            None => {
                let node_id: NodeId = node_id.into();
                nodes.insert(
                    node_id.clone(),
                    ServerNode {
                        node_id: node_id.clone(),
                        replica_count,
                        last_seen: Timestamp::now() + self.grace,
                    },
                );
                tracing::debug!(%node_id, replica_count, "registered node");
            }
        }

        Ok(())
    }

    /// Remove a node, returning its final record.
    pub fn delete(&self, node_id: &str) -> RouteResult<ServerNode> {
        self.nodes
            .write()
            .unwrap()
            .remove(node_id)
            .ok_or_else(|| RouteError::unknown_node(node_id))
    }

    /// Refresh the liveness of a registered node. Heartbeats from nodes
    /// that were never registered are rejected, not registered.
    pub fn heartbeat(&self, node_id: &str) -> RouteResult<()> {
        match self.nodes.write().unwrap().get_mut(node_id) {
            Some(node) => {
                node.last_seen = Timestamp::now();
                Ok(())
            }
            None => Err(RouteError::unknown_node(node_id)),
        }
    }

    /// True when the node has been silent for longer than `timeout` as of
    /// `now`. A node with no record at all is also stale: the assignment
    /// structures may briefly hold keys for a node deleted concurrently,
    /// and the eviction loop must converge on those too.
    pub fn is_stale(
        &self,
        node_id: &str,
        timeout: std::time::Duration,
        now: Timestamp,
    ) -> bool {
        match self.nodes.read().unwrap().get(node_id) {
            Some(node) => match now - node.last_seen {
                Ok(silence) => silence > timeout,
                // last_seen still in the future: inside the grace window
                Err(_) => false,
            },
            None => true,
        }
    }

    /// The replica count of a registered node.
    pub fn replica_count(&self, node_id: &str) -> Option<u32> {
        self.nodes
            .read()
            .unwrap()
            .get(node_id)
            .map(|n| n.replica_count)
    }

    /// Identifiers of all currently registered nodes, in no particular
    /// order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.read().unwrap().keys().cloned().collect()
    }

    /// A point-in-time copy of every record.
    pub fn snapshot(&self) -> Vec<ServerNode> {
        self.nodes.read().unwrap().values().cloned().collect()
    }

    /// Backdate a node's liveness, for staleness tests.
    #[cfg(test)]
    pub(crate) fn set_last_seen(&self, node_id: &str, last_seen: Timestamp) {
        self.nodes
            .write()
            .unwrap()
            .get_mut(node_id)
            .expect("node not registered")
            .last_seen = last_seen;
    }
}

#[cfg(test)]
mod test;
