#![deny(missing_docs)]
//! Keywheel cache node: the backend content server the router redirects
//! clients to.
//!
//! `GET /?url=<key>` serves the cached bytes for `<key>` when a fresh
//! copy is held, and otherwise fetches the upstream URL, caches it for a
//! configured TTL, and serves it. Hit and request counters are exposed
//! as JSON on `GET /metrics`.
//!
//! This crate intentionally does not depend on the routing engine; a
//! cache node is just a TTL key-value cache with an HTTP face, and can
//! be deployed behind any front end. It shares the router server's
//! architecture: one tokio intake thread, blocking worker threads, and
//! no upstream fetch ever happens while a cache lock is held.

mod config;
pub use config::*;

mod cache;
pub use cache::*;

mod http;
use http::*;

mod server;
pub use server::*;

#[cfg(test)]
mod test;
