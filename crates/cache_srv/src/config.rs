//! config types.

/// Configuration for running a CacheSrv.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count.
    ///
    /// Workers block on upstream fetches, so it is beneficial to have
    /// more of them than system cpus; they are bound on io, not on cpu.
    ///
    /// Defaults:
    /// - `testing = 2`
    /// - `production = 4 * cpu_count`
    pub worker_thread_count: usize,

    /// The address(es) at which to listen.
    ///
    /// Defaults:
    /// - `testing = "[127.0.0.1:0]"`
    /// - `production = "[0.0.0.0:8080]"`
    pub listen_address_list: Vec<std::net::SocketAddr>,

    /// How long fetched content stays servable before a fresh upstream
    /// fetch is required.
    ///
    /// Defaults:
    /// - `testing = 60s`
    /// - `production = 60s`
    pub content_ttl: std::time::Duration,

    /// Upstream responses larger than this are refused rather than
    /// cached.
    ///
    /// Defaults:
    /// - `testing = 64KiB`
    /// - `production = 10MiB`
    pub max_content_bytes: usize,
}

impl Config {
    /// Get a cache srv config suitable for testing.
    pub fn testing() -> Self {
        Self {
            worker_thread_count: 2,
            listen_address_list: vec![(std::net::Ipv4Addr::LOCALHOST, 0)
                .into()],
            content_ttl: std::time::Duration::from_secs(60),
            max_content_bytes: 1024 * 64,
        }
    }

    /// Get a cache srv config suitable for production.
    pub fn production() -> Self {
        Self {
            worker_thread_count: num_cpus::get() * 4,
            listen_address_list: vec![(
                std::net::Ipv4Addr::UNSPECIFIED,
                8080,
            )
                .into()],
            content_ttl: std::time::Duration::from_secs(60),
            max_content_bytes: 1024 * 1024 * 10,
        }
    }
}
