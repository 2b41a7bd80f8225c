#![deny(missing_docs)]
//! Keywheel routing engine: map resource keys to interchangeable backend
//! nodes with cache affinity, adapting the topology as nodes join, leave,
//! or go silent, and spreading disproportionately hot keys across the
//! whole fleet.
//!
//! This crate is the in-memory core only. It does no I/O and spins no
//! threads of its own; the HTTP front end in `keywheel_srv` drives it from
//! many concurrent request workers. Every shared structure here carries
//! its own reader/writer lock, so lookups proceed in parallel and topology
//! mutation excludes only the structure it touches.
//!
//! The pieces, leaf first:
//!
//! - [hash] - deterministic key to 32-bit hash-space location.
//! - [HashRing] - clockwise-nearest virtual-node assignment.
//! - [XorTrie] - greedy xor-distance assignment over the same key space.
//! - [MembershipTable] - which nodes are live, per heartbeat freshness.
//! - [HotKeyTracker] - decaying per-key request-rate estimate.
//! - [Router] - composes the above into a single `route` entry point with
//!   lazy eviction of stale nodes.

mod timestamp;
pub use timestamp::*;

mod error;
pub use error::*;

pub mod hash;

mod config;
pub use config::*;

mod membership;
pub use membership::*;

mod ring;
pub use ring::*;

mod trie;
pub use trie::*;

mod hotkey;
pub use hotkey::*;

mod router;
pub use router::*;
