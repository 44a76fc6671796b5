//! # ledgerline-contracts
//!
//! Shared record shapes and error types for the ledgerline tamper-evident
//! audit chain.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and the unified error type. The two
//! persisted shapes are [`entry::LogEntry`] and [`checkpoint::Checkpoint`];
//! everything else is in-memory plumbing around them.

pub mod checkpoint;
pub mod entry;
pub mod error;
pub mod report;

pub use checkpoint::Checkpoint;
pub use entry::{AuditEvent, LogEntry, PendingEntry, Provenance, Severity};
pub use error::{AuditError, AuditResult};
pub use report::{VerificationReport, Violation, ViolationKind};
