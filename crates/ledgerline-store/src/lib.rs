//! # ledgerline-store
//!
//! Ordered, durable, append-only storage for the ledgerline audit chain.
//!
//! Two trait contracts ([`LogStore`], [`CheckpointStore`]) and two
//! implementations:
//!
//! - [`MemoryStore`] — `Mutex`-protected in-memory reference store, with
//!   fault-injection hooks for integrity tests.
//! - [`JsonlStore`] — newline-delimited JSON files for durable single-node
//!   deployments.
//!
//! Both assign sequence ids atomically under their internal lock, which is
//! what makes `tail()` linearizable with respect to `append()` — the
//! guarantee the whole hash chain depends on.

pub mod jsonl;
pub mod memory;
pub mod traits;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use traits::{CheckpointStore, LogStore};
