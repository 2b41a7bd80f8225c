//! A client for the keywheel router server's heartbeat and
//! administrative endpoints.
//!
//! Backends call [send_heartbeat] on an interval to stay routable; an
//! operator on the router host calls [send_insert] / [send_delete] to
//! change the topology. The router identifies a heartbeat by its source
//! address and restricts insert/delete to loopback callers, so these
//! helpers carry no explicit credentials.

#![deny(missing_docs)]

use url::Url;

/// Prove liveness to the router server.
///
/// Note the `send_` helpers block the calling thread; in an async
/// context treat them as blocking operations.
pub fn send_heartbeat(server_url: &Url) -> std::io::Result<()> {
    let mut url = server_url.clone();
    url.set_path("heartbeat");

    ureq::post(url.as_str())
        .send_form(&[])
        .map_err(std::io::Error::other)?;

    tracing::debug!(%url, "sent heartbeat");
    Ok(())
}

/// Register a node with the router server, or update its replica count.
pub fn send_insert(
    server_url: &Url,
    ip_address: &str,
    replica_count: u32,
) -> std::io::Result<()> {
    let mut url = server_url.clone();
    url.set_path("insert");

    ureq::post(url.as_str())
        .send_form(&[
            ("ip_address", ip_address),
            ("replica_count", &replica_count.to_string()),
        ])
        .map_err(std::io::Error::other)?;

    tracing::debug!(%url, %ip_address, replica_count, "sent insert");
    Ok(())
}

/// Remove a node from the router server's topology immediately, without
/// waiting for its heartbeats to lapse.
pub fn send_delete(
    server_url: &Url,
    ip_address: &str,
) -> std::io::Result<()> {
    let mut url = server_url.clone();
    url.set_path("delete");

    ureq::post(url.as_str())
        .send_form(&[("ip_address", ip_address)])
        .map_err(std::io::Error::other)?;

    tracing::debug!(%url, %ip_address, "sent delete");
    Ok(())
}
