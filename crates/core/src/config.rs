//! Routing engine configuration types.

/// Which key-to-node assignment structure the router consults.
///
/// Selected once at startup; the two structures implement the same
/// contract and differ only in their notion of "nearest".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentFlavor {
    /// Clockwise distance on a circular hash space.
    Ring,

    /// Greedy xor distance in a binary trie, kademlia-style.
    Trie,
}

/// Configuration parameters for [Router](crate::Router).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    /// The assignment structure to route with.
    ///
    /// Default: ring.
    pub assignment: AssignmentFlavor,

    /// Seconds of heartbeat silence after which a node is considered
    /// stale and becomes eligible for lazy eviction.
    ///
    /// Default: 15s.
    pub liveness_timeout_s: u32,

    /// Seconds of grace granted to a freshly registered node before its
    /// first heartbeat is due. Backends can take a while to come up, and
    /// evicting them before they ever report would make registration
    /// racy.
    ///
    /// Default: 60s.
    pub registration_grace_s: u32,

    /// A key whose pre-update moving average reaches this value is
    /// dispersed to a uniformly random node instead of its hash
    /// assignment, trading cache affinity for load spreading.
    ///
    /// Default: 3.0.
    pub hot_key_threshold: f64,

    /// Per-second decay factor applied to the moving average, in (0, 1).
    /// Smaller values forget bursts faster.
    ///
    /// Default: 0.5.
    pub hot_key_smoothing: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            assignment: AssignmentFlavor::Ring,
            liveness_timeout_s: 15,
            registration_grace_s: 60,
            hot_key_threshold: 3.0,
            hot_key_smoothing: 0.5,
        }
    }
}

impl RouterConfig {
    /// Get the liveness timeout as a [std::time::Duration].
    pub fn liveness_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.liveness_timeout_s as u64)
    }

    /// Get the registration grace as a [std::time::Duration].
    pub fn registration_grace(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.registration_grace_s as u64)
    }
}
