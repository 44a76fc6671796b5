//! In-memory reference implementation of the storage traits.
//!
//! `MemoryStore` keeps entries and checkpoints in `Vec`s behind a single
//! `Mutex`, which trivially satisfies the linearizable-tail contract: every
//! append and every read runs under the same lock.
//!
//! The store also carries fault-injection hooks (`fail_requests`,
//! `corrupt_entry`, `excise_entry`) so integrity and failure-isolation
//! tests can simulate an unavailable backend and post-hoc tampering —
//! operations the real traits deliberately do not expose.

use std::sync::Mutex;

use tracing::debug;

use ledgerline_contracts::{
    AuditError, AuditResult, Checkpoint, LogEntry, PendingEntry,
};

use crate::traits::{CheckpointStore, LogStore};

/// The mutable interior of a `MemoryStore`.
struct MemoryState {
    /// All committed entries, ascending by `sequence_id`.
    entries: Vec<LogEntry>,
    /// All stored checkpoints, in creation order.
    checkpoints: Vec<Checkpoint>,
    /// The next sequence id to assign (starts at 1).
    next_sequence: u64,
    /// Fault injection: when true, every operation fails with
    /// `StorageUnavailable`.
    unavailable: bool,
}

/// An in-memory, append-only store for entries and checkpoints.
///
/// Suitable for tests and for embedding the subsystem in processes that
/// persist elsewhere. All operations acquire one internal `Mutex`.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store; the first append receives sequence id 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                entries: Vec::new(),
                checkpoints: Vec::new(),
                next_sequence: 1,
                unavailable: false,
            }),
        }
    }

    fn lock(&self) -> AuditResult<std::sync::MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|e| AuditError::StorageUnavailable {
                reason: format!("store lock poisoned: {}", e),
            })?;
        if state.unavailable {
            return Err(AuditError::StorageUnavailable {
                reason: "injected fault: store marked unavailable".to_string(),
            });
        }
        Ok(state)
    }

    // ── Fault injection (test support) ───────────────────────────────────────

    /// Make every subsequent operation fail with `StorageUnavailable`
    /// (`true`), or restore normal service (`false`).
    pub fn fail_requests(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = fail;
        }
    }

    /// Mutate a stored entry in place, bypassing the append-only contract.
    ///
    /// Exists solely so tamper-detection tests can simulate an attacker
    /// editing storage underneath the subsystem. Returns `false` when no
    /// entry has the given id.
    pub fn corrupt_entry(
        &self,
        sequence_id: u64,
        mutate: impl FnOnce(&mut LogEntry),
    ) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        match state
            .entries
            .iter_mut()
            .find(|e| e.sequence_id == sequence_id)
        {
            Some(entry) => {
                mutate(entry);
                true
            }
            None => false,
        }
    }

    /// Remove a stored entry, simulating a splice attack. Returns `false`
    /// when no entry has the given id.
    pub fn excise_entry(&self, sequence_id: u64) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let before = state.entries.len();
        state.entries.retain(|e| e.sequence_id != sequence_id);
        state.entries.len() != before
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore for MemoryStore {
    fn append(&self, entry: PendingEntry) -> AuditResult<LogEntry> {
        let mut state = self.lock()?;
        let sequence_id = state.next_sequence;
        let entry = entry.into_entry(sequence_id);
        state.entries.push(entry.clone());
        state.next_sequence += 1;

        debug!(sequence_id, event_type = %entry.event_type, "entry appended");
        Ok(entry)
    }

    fn tail(&self) -> AuditResult<Option<LogEntry>> {
        let state = self.lock()?;
        Ok(state.entries.last().cloned())
    }

    fn read_range(&self, from: Option<u64>, to: Option<u64>) -> AuditResult<Vec<LogEntry>> {
        let state = self.lock()?;
        let from = from.unwrap_or(u64::MIN);
        let to = to.unwrap_or(u64::MAX);
        Ok(state
            .entries
            .iter()
            .filter(|e| e.sequence_id >= from && e.sequence_id <= to)
            .cloned()
            .collect())
    }
}

impl CheckpointStore for MemoryStore {
    fn append_checkpoint(&self, checkpoint: Checkpoint) -> AuditResult<()> {
        let mut state = self.lock()?;

        // Overlap check and insert run under one lock acquisition, so two
        // racing checkpoint creations cannot both commit.
        if let Some(existing) = state
            .checkpoints
            .iter()
            .find(|c| c.overlaps(checkpoint.first_sequence_id, checkpoint.last_sequence_id))
        {
            return Err(AuditError::DuplicateRange {
                first: checkpoint.first_sequence_id,
                last: checkpoint.last_sequence_id,
                existing_first: existing.first_sequence_id,
                existing_last: existing.last_sequence_id,
            });
        }

        debug!(
            first = checkpoint.first_sequence_id,
            last = checkpoint.last_sequence_id,
            "checkpoint stored"
        );
        state.checkpoints.push(checkpoint);
        Ok(())
    }

    fn checkpoints(&self) -> AuditResult<Vec<Checkpoint>> {
        let state = self.lock()?;
        let mut checkpoints = state.checkpoints.clone();
        checkpoints.sort_by_key(|c| c.first_sequence_id);
        Ok(checkpoints)
    }
}
