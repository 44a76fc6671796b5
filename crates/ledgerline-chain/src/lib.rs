//! # ledgerline-chain
//!
//! The write half of the ledgerline tamper-evident audit chain:
//!
//! - [`digest`] — pure, deterministic SHA-256 digesting over the canonical
//!   entry form; the single field list shared by write and verify paths.
//! - [`writer::ChainWriter`] — serialized append that links each new entry
//!   to the current chain tail.
//! - [`facade::AuditLedger`] — the business-facing `record()` that swallows
//!   write failures so no unrelated transaction is ever aborted by the
//!   audit subsystem.
//! - [`config::AuditConfig`] — TOML tunables.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ledgerline_chain::AuditLedger;
//! use ledgerline_contracts::{AuditEvent, Severity};
//! use ledgerline_store::MemoryStore;
//!
//! let ledger = AuditLedger::new(Arc::new(MemoryStore::new()));
//! let entry = ledger.record(AuditEvent::new(
//!     "personnel.record.updated", "personnel", Severity::Notice,
//! ));
//! ```

pub mod config;
pub mod digest;
pub mod facade;
pub mod writer;

pub use config::AuditConfig;
pub use digest::{digest_for, digest_parts, entry_digest};
pub use facade::AuditLedger;
pub use writer::ChainWriter;
