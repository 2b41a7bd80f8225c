//! config types.

use keywheel_core::RouterConfig;

/// Configuration for running a RouterSrv.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count.
    ///
    /// Routing lookups are pure in-memory operations, but they contend
    /// on reader/writer locks with topology mutation, so a few more
    /// workers than cpus keeps the intake drained without ballooning
    /// memory overhead.
    ///
    /// Defaults:
    /// - `testing = 2`
    /// - `production = 4 * cpu_count`
    pub worker_thread_count: usize,

    /// The address(es) at which to listen.
    ///
    /// Defaults:
    /// - `testing = "[127.0.0.1:0]"`
    /// - `production = "[0.0.0.0:5050]"`
    pub listen_address_list: Vec<std::net::SocketAddr>,

    /// Nodes registered at startup, before any administrative insert.
    /// Each is granted the registration grace, so the fleet has time to
    /// start heartbeating.
    ///
    /// Defaults:
    /// - `testing = []`
    /// - `production = ["localhost"]`
    pub initial_node_list: Vec<String>,

    /// Replica count given to each node of the initial node list.
    ///
    /// Defaults:
    /// - `testing = 3`
    /// - `production = 10`
    pub default_replica_count: u32,

    /// The port clients are redirected to on the chosen backend node.
    ///
    /// Defaults:
    /// - `testing = 8080`
    /// - `production = 8080`
    pub target_port: u16,

    /// Tunables for the routing engine itself: assignment flavor,
    /// liveness windows, hot-key thresholds.
    pub router: RouterConfig,
}

impl Config {
    /// Get a router srv config suitable for testing.
    pub fn testing() -> Self {
        Self {
            worker_thread_count: 2,
            listen_address_list: vec![(std::net::Ipv4Addr::LOCALHOST, 0)
                .into()],
            initial_node_list: Vec::new(),
            default_replica_count: 3,
            target_port: 8080,
            router: RouterConfig::default(),
        }
    }

    /// Get a router srv config suitable for production.
    pub fn production() -> Self {
        Self {
            worker_thread_count: num_cpus::get() * 4,
            listen_address_list: vec![(
                std::net::Ipv4Addr::UNSPECIFIED,
                5050,
            )
                .into()],
            initial_node_list: vec!["localhost".to_string()],
            default_replica_count: 10,
            target_port: 8080,
            router: RouterConfig::default(),
        }
    }
}
