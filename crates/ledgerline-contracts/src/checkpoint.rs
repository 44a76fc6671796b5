//! Checkpoint record shape.
//!
//! A checkpoint folds a contiguous range of chain entries into one
//! aggregate digest so an auditor can spot-check a large historical range
//! cheaply — recompute one aggregate from stored entry digests instead of
//! replaying every entry's content digest from raw payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A periodic, immutable summary of a contiguous entry range.
///
/// Checkpoints partition history: the store rejects a new checkpoint whose
/// range overlaps an existing one. Checkpoints do not re-verify
/// `previous_digest` linkage; that remains the integrity verifier's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// First `sequence_id` folded into this checkpoint (inclusive).
    pub first_sequence_id: u64,

    /// Last `sequence_id` folded into this checkpoint (inclusive).
    pub last_sequence_id: u64,

    /// Number of entries in the range. Equals `last - first + 1` under the
    /// store's gap-free sequence assignment.
    pub entry_count: u64,

    /// Digest of the concatenation of all entry digests in the range, in
    /// ascending `sequence_id` order.
    pub aggregate_digest: String,

    /// Digest over {first, last, count, aggregate} — the checkpoint's own
    /// tamper-evident seal.
    pub checkpoint_digest: String,

    /// Wall-clock time the checkpoint was created.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// True when the two inclusive ranges share at least one sequence id.
    pub fn overlaps(&self, first: u64, last: u64) -> bool {
        first <= self.last_sequence_id && last >= self.first_sequence_id
    }
}
