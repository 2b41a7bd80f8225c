//! keywheel router http server types.

use std::sync::Arc;

use crate::*;
use keywheel_core::{
    MembershipTable, RouteError, RouteResult, Router, Timestamp,
};

/// Print out a message if this thread dies.
struct ThreadGuard(&'static str);

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        tracing::debug!("{}", self.0);
    }
}

/// An actual keywheel_srv server instance.
///
/// This server is built to be direct, light-weight, and responsive.
/// On the server-side, as one aspect toward accomplishing this,
/// we are eschewing async code in favor of os thread workers: the axum
/// intake lives on one tokio thread, and all routing work happens on
/// blocking workers sharing one [Router].
pub struct RouterSrv {
    cont: Arc<std::sync::atomic::AtomicBool>,
    workers: Vec<std::thread::JoinHandle<std::io::Result<()>>>,
    addrs: Vec<std::net::SocketAddr>,
    router: Arc<Router>,
    server: Option<Server>,
}

impl Drop for RouterSrv {
    fn drop(&mut self) {
        let _g = ThreadGuard("Server Shutdown Complete!");

        tracing::debug!("begin server shutdown...");
        let _ = self.shutdown();
    }
}

impl RouterSrv {
    /// Construct a new RouterSrv instance.
    pub fn new(config: Config) -> std::io::Result<Self> {
        let config = Arc::new(config);

        // atomic flag for telling worker threads to shutdown
        let cont = Arc::new(std::sync::atomic::AtomicBool::new(true));

        // the explicitly constructed routing structures shared by all
        // workers
        let membership = Arc::new(MembershipTable::new(
            config.router.registration_grace(),
        ));
        for node_id in &config.initial_node_list {
            membership
                .insert(node_id, config.default_replica_count)
                .map_err(std::io::Error::other)?;
        }
        let router =
            Arc::new(Router::new(config.router.clone(), membership));

        // axum configuration
        let sconf = ServerConfig {
            addrs: config.listen_address_list.clone(),
            worker_thread_count: config.worker_thread_count,
        };

        // start the actual http server
        let server = Server::new(config.clone(), sconf)?;

        // get the address that was assigned
        let addrs = server.server_addrs().to_vec();
        tracing::info!(?addrs, "Listening");

        // spawn our worker threads
        let mut workers = Vec::with_capacity(config.worker_thread_count);
        for _ in 0..config.worker_thread_count {
            let config = config.clone();
            let cont = cont.clone();
            let router = router.clone();
            let recv = server.receiver().clone();
            workers.push(std::thread::spawn(move || {
                worker(config, cont, router, recv)
            }));
        }

        Ok(Self {
            cont,
            workers,
            addrs,
            router,
            server: Some(server),
        })
    }

    /// Shutdown the server, returning an error result if any
    /// of the worker threads had panicked.
    pub fn shutdown(&mut self) -> std::io::Result<()> {
        let mut is_err = false;
        self.cont.store(false, std::sync::atomic::Ordering::SeqCst);
        drop(self.server.take());
        while !self.workers.is_empty() {
            tracing::debug!(
                "waiting on {} threads to close...",
                self.workers.len()
            );
            if self.workers.pop().unwrap().join().is_err() {
                is_err = true;
            }
        }
        tracing::debug!("all threads closed.");
        if is_err {
            Err(std::io::Error::other("Failure shutting down worker thread"))
        } else {
            Ok(())
        }
    }

    /// Get the bound listening addresses of this server.
    pub fn listen_addrs(&self) -> &[std::net::SocketAddr] {
        self.addrs.as_slice()
    }

    /// Get the router driving this server, e.g. to inspect membership.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

fn worker(
    config: Arc<Config>,
    cont: Arc<std::sync::atomic::AtomicBool>,
    router: Arc<Router>,
    recv: HttpReceiver,
) -> std::io::Result<()> {
    let _g = ThreadGuard("worker thread has ended");

    while cont.load(std::sync::atomic::Ordering::SeqCst) {
        let (req, res) = match recv.recv() {
            None => break,
            Some(r) => r,
        };

        let handler = Handler {
            config: &config,
            router: &router,
            res,
        };

        handler.handle(req);
    }

    Ok(())
}

/// Status code a [RouteError] maps to at the request boundary.
fn error_status(err: &RouteError) -> u16 {
    match err {
        RouteError::NoNodesAvailable => 503,
        RouteError::UnknownNode(_) => 400,
        RouteError::InvalidParameter(_) => 400,
        RouteError::UnauthorizedSource => 403,
    }
}

/// Administrative mutation is restricted to requests originating on
/// this host, a defense against remote topology tampering.
pub(crate) fn require_loopback(
    source: &std::net::SocketAddr,
) -> RouteResult<()> {
    if source.ip().is_loopback() {
        Ok(())
    } else {
        Err(RouteError::UnauthorizedSource)
    }
}

/// The node identity of a heartbeat is its source address. Loopback
/// addresses collapse to "localhost" so local development matches the
/// usual seeded node list.
pub(crate) fn source_node_id(source: &std::net::SocketAddr) -> String {
    let ip = source.ip();
    if ip.is_loopback() {
        "localhost".to_string()
    } else {
        ip.to_string()
    }
}

struct Handler<'lt> {
    config: &'lt Config,
    router: &'lt Router,
    res: HttpRespondCb,
}

impl Handler<'_> {
    /// Wrap the handle call so we can respond to the client with errors.
    pub fn handle(mut self, req: HttpRequest) {
        match self.handle_inner(req) {
            Ok(res) => self.respond(res),
            Err(err) => {
                let status = error_status(&err);
                let body = serde_json::json!({
                    "error": err.to_string(),
                })
                .to_string()
                .into_bytes();
                self.respond(HttpResponse {
                    status,
                    body,
                    location: None,
                });
            }
        }
    }

    /// Dispatch to the correct handlers.
    fn handle_inner(
        &mut self,
        req: HttpRequest,
    ) -> RouteResult<HttpResponse> {
        match req {
            HttpRequest::HealthGet => Ok(ok_response()),
            HttpRequest::RouteGet { key } => self.handle_route(key),
            HttpRequest::HeartbeatPost { source } => {
                self.handle_heartbeat(source)
            }
            HttpRequest::InsertPost { source, form } => {
                self.handle_insert(source, form)
            }
            HttpRequest::DeletePost { source, form } => {
                self.handle_delete(source, form)
            }
        }
    }

    /// Route a key and redirect the client to the chosen node.
    fn handle_route(
        &mut self,
        key: Option<String>,
    ) -> RouteResult<HttpResponse> {
        let key = key.ok_or_else(|| {
            RouteError::invalid_parameter("missing 'url' query parameter")
        })?;

        let node_id = self.router.route(&key, Timestamp::now())?;
        tracing::debug!(%key, %node_id, "routed");

        Ok(HttpResponse {
            status: 307,
            body: b"{}".to_vec(),
            location: Some(format!(
                "http://{}:{}/?url={}",
                node_id, self.config.target_port, key,
            )),
        })
    }

    /// Refresh the liveness of the calling node.
    fn handle_heartbeat(
        &mut self,
        source: std::net::SocketAddr,
    ) -> RouteResult<HttpResponse> {
        let node_id = source_node_id(&source);
        self.router.heartbeat(&node_id)?;
        tracing::info!(%node_id, "received heartbeat");
        Ok(ok_response())
    }

    /// Validate an incoming insert and apply it to the topology.
    fn handle_insert(
        &mut self,
        source: std::net::SocketAddr,
        form: AdminForm,
    ) -> RouteResult<HttpResponse> {
        require_loopback(&source)?;

        let ip_address = form.ip_address.ok_or_else(|| {
            RouteError::invalid_parameter("missing 'ip_address' form field")
        })?;
        let replica_count: u32 = form
            .replica_count
            .ok_or_else(|| {
                RouteError::invalid_parameter(
                    "missing 'replica_count' form field",
                )
            })?
            .parse()
            .map_err(|_| {
                RouteError::invalid_parameter(
                    "'replica_count' must be a positive integer",
                )
            })?;

        self.router.insert_node(&ip_address, replica_count)?;
        tracing::info!(%ip_address, replica_count, "inserted node");
        Ok(ok_response())
    }

    /// Validate an incoming delete and apply it to the topology.
    fn handle_delete(
        &mut self,
        source: std::net::SocketAddr,
        form: AdminForm,
    ) -> RouteResult<HttpResponse> {
        require_loopback(&source)?;

        let ip_address = form.ip_address.ok_or_else(|| {
            RouteError::invalid_parameter("missing 'ip_address' form field")
        })?;

        self.router.delete_node(&ip_address)?;
        tracing::info!(%ip_address, "deleted node");
        Ok(ok_response())
    }

    /// Process the response.
    fn respond(self, res: HttpResponse) {
        let Self { res: cb, .. } = self;
        cb(res);
    }
}

fn ok_response() -> HttpResponse {
    HttpResponse {
        status: 200,
        body: b"{}".to_vec(),
        location: None,
    }
}
