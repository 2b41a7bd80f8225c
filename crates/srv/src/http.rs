use crate::Config;
use axum::*;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub location: Option<String>,
}

impl HttpResponse {
    fn respond(self) -> response::Response {
        let mut builder = response::Response::builder()
            .status(self.status)
            .header("Content-Type", "application/json");
        if let Some(location) = &self.location {
            builder = builder.header("Location", location);
        }
        builder
            .body(body::Body::from(self.body))
            .expect("failed to encode response")
    }
}

pub type HttpRespondCb = Box<dyn FnOnce(HttpResponse) + 'static + Send>;

/// Form fields accepted by the administrative endpoints. Presence is
/// validated worker-side so a missing field is reported as an invalid
/// parameter rather than a generic extraction failure.
#[derive(Debug, Default, serde::Deserialize)]
pub struct AdminForm {
    pub ip_address: Option<String>,
    pub replica_count: Option<String>,
}

pub enum HttpRequest {
    HealthGet,
    RouteGet {
        key: Option<String>,
    },
    HeartbeatPost {
        source: SocketAddr,
    },
    InsertPost {
        source: SocketAddr,
        form: AdminForm,
    },
    DeletePost {
        source: SocketAddr,
        form: AdminForm,
    },
}

type HSend = async_channel::Sender<(HttpRequest, HttpRespondCb)>;
type HRecv = async_channel::Receiver<(HttpRequest, HttpRespondCb)>;

#[derive(Clone)]
pub struct HttpReceiver(HRecv);

impl HttpReceiver {
    pub fn recv(&self) -> Option<(HttpRequest, HttpRespondCb)> {
        match self.0.recv_blocking() {
            Ok(r) => Some(r),
            Err(_) => None,
        }
    }
}

pub struct ServerConfig {
    pub addrs: Vec<std::net::SocketAddr>,
    pub worker_thread_count: usize,
}

pub struct Server {
    t_join: Option<std::thread::JoinHandle<()>>,
    addrs: Vec<std::net::SocketAddr>,
    receiver: HttpReceiver,
    h_send: HSend,
    shutdown: Option<tokio::sync::watch::Sender<bool>>,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.h_send.close();
        // dropping the watch sender completes every listener's
        // graceful-shutdown future
        drop(self.shutdown.take());
        if let Some(t_join) = self.t_join.take() {
            let _ = t_join.join();
        }
    }
}

impl Server {
    pub fn new(
        config: Arc<Config>,
        server_config: ServerConfig,
    ) -> std::io::Result<Self> {
        let (s_ready, r_ready) = tokio::sync::oneshot::channel();
        let t_join = std::thread::spawn(move || {
            tokio_thread(config, server_config, s_ready)
        });
        match r_ready.blocking_recv() {
            Ok(Ok(Ready {
                h_send,
                addrs,
                receiver,
                shutdown,
            })) => Ok(Self {
                t_join: Some(t_join),
                addrs,
                receiver,
                h_send,
                shutdown: Some(shutdown),
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(std::io::Error::other("failed to bind server")),
        }
    }

    pub fn server_addrs(&self) -> &[std::net::SocketAddr] {
        self.addrs.as_slice()
    }

    pub fn receiver(&self) -> &HttpReceiver {
        &self.receiver
    }
}

struct Ready {
    h_send: HSend,
    addrs: Vec<std::net::SocketAddr>,
    receiver: HttpReceiver,
    shutdown: tokio::sync::watch::Sender<bool>,
}

#[derive(Clone)]
pub struct AppState {
    pub h_send: HSend,
}

type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

fn tokio_thread(
    config: Arc<Config>,
    server_config: ServerConfig,
    ready: tokio::sync::oneshot::Sender<std::io::Result<Ready>>,
) {
    tracing::trace!(?config, "Starting tokio thread");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async move {
            let (h_send, h_recv) =
                async_channel::bounded(server_config.worker_thread_count);

            let app: Router = Router::<AppState>::new()
                .route("/", routing::get(handle_route_get))
                .route("/health", routing::get(handle_health_get))
                .route("/heartbeat", routing::post(handle_heartbeat_post))
                .route("/insert", routing::post(handle_insert_post))
                .route("/delete", routing::post(handle_delete_post))
                .layer(extract::DefaultBodyLimit::max(1024))
                .with_state(AppState {
                    h_send: h_send.clone(),
                });

            let receiver = HttpReceiver(h_recv);

            let (shutdown, shutdown_recv) =
                tokio::sync::watch::channel(false);

            let mut addrs = Vec::with_capacity(server_config.addrs.len());
            let mut servers: Vec<BoxFut<'static, std::io::Result<()>>> =
                Vec::with_capacity(server_config.addrs.len());

            for addr in server_config.addrs {
                tracing::info!("Binding to: {}", addr);

                let listener =
                    match tokio::net::TcpListener::bind(addr).await {
                        Ok(listener) => listener,
                        Err(err) => {
                            let _ = ready.send(Err(err));
                            return;
                        }
                    };

                match listener.local_addr() {
                    Ok(addr) => {
                        tracing::info!("Bound with local address: {}", addr);
                        addrs.push(addr)
                    }
                    Err(err) => {
                        let _ = ready.send(Err(err));
                        return;
                    }
                }

                let app = app.clone();
                let mut shutdown_recv = shutdown_recv.clone();
                let s = std::future::IntoFuture::into_future(
                    serve(
                        listener,
                        app.into_make_service_with_connect_info::<SocketAddr>(
                        ),
                    )
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_recv.changed().await;
                    }),
                );

                servers.push(Box::pin(s));
            }

            tracing::info!("Sending ready signal");

            if ready
                .send(Ok(Ready {
                    h_send,
                    addrs,
                    receiver,
                    shutdown,
                }))
                .is_err()
            {
                return;
            }

            let _ = futures::future::join_all(servers).await;
        });
}

async fn handle_dispatch(
    h_send: &HSend,
    req: HttpRequest,
) -> response::Response {
    let (s, r) = tokio::sync::oneshot::channel();
    let s = Box::new(move |res| {
        let _ = s.send(res);
    });
    tokio::time::timeout(std::time::Duration::from_secs(10), async move {
        let _ = h_send.send((req, s)).await;
        match r.await {
            Ok(r) => r.respond(),
            Err(_) => HttpResponse {
                status: 500,
                body: b"{\"error\":\"request dropped\"}".to_vec(),
                location: None,
            }
            .respond(),
        }
    })
    .await
    .unwrap_or_else(|_| {
        HttpResponse {
            status: 500,
            body: b"{\"error\":\"internal timeout\"}".to_vec(),
            location: None,
        }
        .respond()
    })
}

#[derive(serde::Deserialize)]
struct RouteQuery {
    url: Option<String>,
}

async fn handle_health_get(
    extract::State(state): extract::State<AppState>,
) -> response::Response {
    handle_dispatch(&state.h_send, HttpRequest::HealthGet).await
}

async fn handle_route_get(
    extract::Query(query): extract::Query<RouteQuery>,
    extract::State(state): extract::State<AppState>,
) -> response::Response {
    handle_dispatch(
        &state.h_send,
        HttpRequest::RouteGet { key: query.url },
    )
    .await
}

async fn handle_heartbeat_post(
    extract::State(state): extract::State<AppState>,
    extract::ConnectInfo(source): extract::ConnectInfo<SocketAddr>,
) -> response::Response {
    handle_dispatch(&state.h_send, HttpRequest::HeartbeatPost { source })
        .await
}

async fn handle_insert_post(
    extract::State(state): extract::State<AppState>,
    extract::ConnectInfo(source): extract::ConnectInfo<SocketAddr>,
    extract::Form(form): extract::Form<AdminForm>,
) -> response::Response {
    handle_dispatch(
        &state.h_send,
        HttpRequest::InsertPost { source, form },
    )
    .await
}

async fn handle_delete_post(
    extract::State(state): extract::State<AppState>,
    extract::ConnectInfo(source): extract::ConnectInfo<SocketAddr>,
    extract::Form(form): extract::Form<AdminForm>,
) -> response::Response {
    handle_dispatch(
        &state.h_send,
        HttpRequest::DeletePost { source, form },
    )
    .await
}
