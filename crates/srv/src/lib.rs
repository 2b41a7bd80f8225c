#![deny(missing_docs)]
//! Keywheel router server: the HTTP front end over the
//! [keywheel_core] routing engine.
//!
//! Clients ask `GET /?url=<key>` and are redirected to the backend node
//! the engine assigns for that key. Backends prove liveness with
//! `POST /heartbeat`, and a local operator changes the topology with
//! `POST /insert` and `POST /delete` (both rejected from non-loopback
//! sources).
//!
//! The server architecture favors directness over ceremony: a single
//! tokio thread runs the axum intake and hands every parsed request to a
//! pool of blocking OS-thread workers over a bounded channel. All
//! routing work is pure in-memory computation, so workers never block on
//! I/O while holding a request.

mod config;
pub use config::*;

mod http;
use http::*;

mod server;
pub use server::*;

#[cfg(test)]
mod test;
