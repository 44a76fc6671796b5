//! Verification report types.
//!
//! A verification pass never errors out on finding tampering — it completes
//! and describes everything it found. Infrastructure failures (an
//! unavailable store) are the only way `verify` itself fails.

use serde::{Deserialize, Serialize};

/// The kind of tampering a verification pass can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The entry's stored digest does not match the digest recomputed from
    /// its stored fields — the entry's content was altered after the fact.
    DigestMismatch,

    /// The entry's `previous_digest` does not match the stored digest of
    /// its actual predecessor — an entry was inserted, deleted, or
    /// reordered.
    ChainBreak,
}

/// One detected violation, pinned to the offending entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// The entry at which the violation was detected.
    pub sequence_id: u64,
    pub kind: ViolationKind,
    /// The digest the chain says should be there.
    pub expected: String,
    /// The digest actually found in storage.
    pub observed: String,
}

/// The outcome of one verification pass over a range of the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if zero violations were found.
    pub verified: bool,

    /// Number of entries examined. An empty range verifies as `true` with
    /// zero checked.
    pub total_checked: u64,

    /// Lowest `sequence_id` examined, if any entry was.
    pub first_id: Option<u64>,

    /// Highest `sequence_id` examined, if any entry was.
    pub last_id: Option<u64>,

    /// Every violation found, in ascending `sequence_id` order.
    pub violations: Vec<Violation>,
}

impl VerificationReport {
    /// A report over an empty range: verified, nothing checked.
    pub fn empty() -> Self {
        Self {
            verified: true,
            total_checked: 0,
            first_id: None,
            last_id: None,
            violations: Vec::new(),
        }
    }

    /// Fold a later chunk's report into this one.
    ///
    /// Used by chunked verification: totals add, bounds widen, violations
    /// append, and `verified` stays true only if both halves were clean.
    pub fn absorb(&mut self, other: VerificationReport) {
        self.verified = self.verified && other.verified;
        self.total_checked += other.total_checked;
        self.first_id = match (self.first_id, other.first_id) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_id = match (self.last_id, other.last_id) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.violations.extend(other.violations);
    }
}
