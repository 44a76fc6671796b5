//! Audit entry record shapes.
//!
//! `AuditEvent` is what business collaborators hand the subsystem — pure
//! classification, provenance, and payload. `LogEntry` is what the chain
//! writer persists: the event plus timestamps, the link to the predecessor
//! (`previous_digest`), and the entry's own `digest`. `PendingEntry` is the
//! in-between shape handed to the store for sequence assignment.
//!
//! The payload is a `BTreeMap` rather than a `serde_json::Map` so its JSON
//! serialization is key-sorted and therefore byte-stable — the digest input
//! must be reproducible at verify time, possibly years after the write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an audited event, caller-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Notice,
    Warning,
    Critical,
}

/// Who did it, from where — all optional, caller-supplied, unvalidated.
///
/// An explicit struct rather than a loose map so it is visible at compile
/// time which provenance fields participate in the digest (`actor_id` and
/// `source_address` do; the rest are display-only).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub session_id: Option<String>,
    pub source_address: Option<String>,
    pub client_info: Option<String>,
}

/// The caller-facing input to `record()`.
///
/// The subsystem supplies everything else: timestamps, sequence id,
/// chain linkage, and digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Specific event name, e.g. `"personnel.record.updated"`.
    pub event_type: String,
    /// Broad grouping, e.g. `"personnel"`, `"training"`, `"security"`.
    pub event_category: String,
    pub severity: Severity,
    pub provenance: Provenance,
    /// Opaque event-specific data. Key-sorted map for deterministic
    /// canonical serialization.
    pub payload: BTreeMap<String, serde_json::Value>,
}

impl AuditEvent {
    /// Build an event with empty provenance and payload.
    pub fn new(
        event_type: impl Into<String>,
        event_category: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            event_category: event_category.into(),
            severity,
            provenance: Provenance::default(),
            payload: BTreeMap::new(),
        }
    }

    /// Attach provenance, consuming and returning `self`.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Insert one payload field, consuming and returning `self`.
    pub fn with_payload_field(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// One immutable fact in the hash chain.
///
/// Each entry commits to its predecessor via `previous_digest`, forming an
/// append-only chain. Modifying any digested field of a stored entry
/// invalidates `digest`, which the integrity verifier detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned position in the chain, starting at 1. Never reused
    /// or reassigned; the single source of truth for chain order.
    pub sequence_id: u64,

    /// Wall-clock time at creation. Advisory and display-only — clock skew
    /// across writers means it must never be used to reconstruct order.
    pub occurred_at: DateTime<Utc>,

    /// Nanosecond-scale counter captured at the same instant, used only to
    /// strengthen digest-input uniqueness.
    pub occurred_at_fine: u128,

    pub event_type: String,
    pub event_category: String,
    pub severity: Severity,
    pub provenance: Provenance,
    pub payload: BTreeMap<String, serde_json::Value>,

    /// Digest of the entry with the immediately lower `sequence_id`, or
    /// `GENESIS_DIGEST` for the first entry ever written.
    pub previous_digest: String,

    /// This entry's own SHA-256 digest (lowercase hex) over its canonical
    /// form. Recomputing from the stored fields must reproduce this value.
    pub digest: String,
}

impl LogEntry {
    /// The sentinel `previous_digest` carried by the first entry in every
    /// chain.
    ///
    /// No SHA-256 computation over real input will ever produce all
    /// zeros, so an entry linking here marks the chain's origin without
    /// needing any predecessor lookup.
    pub const GENESIS_DIGEST: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A fully built entry awaiting its store-assigned `sequence_id`.
///
/// The digest is already computed: the canonical field list deliberately
/// excludes `sequence_id`, so the store can assign ids atomically without
/// participating in digest computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntry {
    pub occurred_at: DateTime<Utc>,
    pub occurred_at_fine: u128,
    pub event_type: String,
    pub event_category: String,
    pub severity: Severity,
    pub provenance: Provenance,
    pub payload: BTreeMap<String, serde_json::Value>,
    pub previous_digest: String,
    pub digest: String,
}

impl PendingEntry {
    /// Materialize the persisted entry once the store has assigned an id.
    pub fn into_entry(self, sequence_id: u64) -> LogEntry {
        LogEntry {
            sequence_id,
            occurred_at: self.occurred_at,
            occurred_at_fine: self.occurred_at_fine,
            event_type: self.event_type,
            event_category: self.event_category,
            severity: self.severity,
            provenance: self.provenance,
            payload: self.payload,
            previous_digest: self.previous_digest,
            digest: self.digest,
        }
    }
}
