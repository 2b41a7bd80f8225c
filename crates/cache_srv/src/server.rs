//! keywheel cache node http server types.

use std::sync::Arc;

use crate::*;

/// Print out a message if this thread dies.
struct ThreadGuard(&'static str);

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        tracing::debug!("{}", self.0);
    }
}

/// An actual keywheel_cache_srv server instance.
///
/// Workers serve cache hits directly and block on the upstream fetch
/// for misses; the fetch always happens with no cache lock held, so a
/// slow upstream stalls one worker, not the cache.
pub struct CacheSrv {
    cont: Arc<std::sync::atomic::AtomicBool>,
    workers: Vec<std::thread::JoinHandle<std::io::Result<()>>>,
    addrs: Vec<std::net::SocketAddr>,
    cache: Arc<ContentCache>,
    server: Option<Server>,
}

impl Drop for CacheSrv {
    fn drop(&mut self) {
        let _g = ThreadGuard("Server Shutdown Complete!");

        tracing::debug!("begin server shutdown...");
        let _ = self.shutdown();
    }
}

impl CacheSrv {
    /// Construct a new CacheSrv instance.
    pub fn new(config: Config) -> std::io::Result<Self> {
        let config = Arc::new(config);

        // atomic flag for telling worker threads to shutdown
        let cont = Arc::new(std::sync::atomic::AtomicBool::new(true));

        let cache = Arc::new(ContentCache::new(config.content_ttl));

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
            let cache = cache.clone();
            let recv = server.receiver().clone();
            workers.push(std::thread::spawn(move || {
                worker(config, cont, cache, recv)
            }));
        }

        Ok(Self {
            cont,
            workers,
            addrs,
            cache,
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

    /// Get the content cache behind this server.
    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }
}

fn worker(
    config: Arc<Config>,
    cont: Arc<std::sync::atomic::AtomicBool>,
    cache: Arc<ContentCache>,
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
            cache: &cache,
            res,
        };

        handler.handle(req);
    }

    Ok(())
}

struct Handler<'lt> {
    config: &'lt Config,
    cache: &'lt ContentCache,
    res: HttpRespondCb,
}

impl Handler<'_> {
    /// Wrap the handle call so we can respond to the client with errors.
    pub fn handle(mut self, req: HttpRequest) {
        match self.handle_inner(req) {
            Ok(res) => self.respond(res),
            Err(err) => self.respond(HttpResponse {
                status: 500,
                body: serde_json::json!({
                    "error": format!("{err:?}"),
                })
                .to_string()
                .into_bytes(),
                content_type: None,
            }),
        }
    }

    /// Dispatch to the correct handlers.
    fn handle_inner(
        &mut self,
        req: HttpRequest,
    ) -> std::io::Result<HttpResponse> {
        match req {
            HttpRequest::HealthGet => Ok(HttpResponse {
                status: 200,
                body: b"{}".to_vec(),
                content_type: None,
            }),
            HttpRequest::MetricsGet => self.handle_metrics(),
            HttpRequest::CacheGet { key } => self.handle_cache(key),
        }
    }

    /// Report the hit/request counters.
    fn handle_metrics(&mut self) -> std::io::Result<HttpResponse> {
        let (hits, requests) = self.cache.metrics();
        Ok(HttpResponse {
            status: 200,
            body: serde_json::json!({
                "hits": hits,
                "requests": requests,
            })
            .to_string()
            .into_bytes(),
            content_type: None,
        })
    }

    /// Serve cached content, fetching and caching it first on a miss.
    fn handle_cache(
        &mut self,
        key: Option<String>,
    ) -> std::io::Result<HttpResponse> {
        let Some(key) = key else {
            return Ok(HttpResponse {
                status: 400,
                body: serde_json::json!({
                    "error": "missing 'url' query parameter",
                })
                .to_string()
                .into_bytes(),
                content_type: None,
            });
        };

        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(%key, "served from cache");
            return Ok(HttpResponse {
                status: 200,
                body: entry.content.to_vec(),
                content_type: Some(entry.content_type),
            });
        }

        // miss: fetch upstream with no cache lock held
        let (content, content_type) = self.fetch(&key)?;
        self.cache
            .set(key.clone(), content.clone(), content_type.clone());
        tracing::debug!(%key, "fetched and cached");

        Ok(HttpResponse {
            status: 200,
            body: content.to_vec(),
            content_type: Some(content_type),
        })
    }

    /// Fetch the upstream URL, capped at the configured content size.
    fn fetch(
        &self,
        key: &str,
    ) -> std::io::Result<(bytes::Bytes, String)> {
        use std::io::Read;

        let res = ureq::get(key).call().map_err(std::io::Error::other)?;

        let content_type = res
            .header("Content-Type")
            .unwrap_or("application/octet-stream")
            .to_string();

        let max = self.config.max_content_bytes;
        let mut content = Vec::new();
        res.into_reader()
            .take(max as u64 + 1)
            .read_to_end(&mut content)?;
        if content.len() > max {
            return Err(std::io::Error::other("ContentTooLarge"));
        }

        Ok((content.into(), content_type))
    }

    /// Process the response.
    fn respond(self, res: HttpResponse) {
        let Self { res: cb, .. } = self;
        cb(res);
    }
}
