//! The checkpoint manager: folds contiguous entry ranges into aggregate
//! digests for cheap long-range spot-checks.
//!
//! A checkpoint commits to the digests of every entry in its range (one
//! level of aggregation — the digest of the concatenated entry digests)
//! and then seals its own header fields with a second digest. An auditor
//! can later recompute the aggregate from stored entry digests without
//! replaying any payload, which is the fast tier of a two-tier strategy;
//! the slow tier (full recomputation and linkage) stays with
//! [`crate::IntegrityVerifier`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use ledgerline_chain::digest_parts;
use ledgerline_contracts::{AuditError, AuditResult, Checkpoint, LogEntry};
use ledgerline_store::{CheckpointStore, LogStore};

/// Creates and re-checks checkpoints over a store.
pub struct CheckpointManager<S: LogStore + CheckpointStore> {
    store: Arc<S>,
}

/// Outcome of re-checking one stored checkpoint against the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointCheck {
    /// The recomputed aggregate of stored entry digests matches.
    pub aggregate_ok: bool,
    /// The checkpoint's own seal matches its header fields.
    pub seal_ok: bool,
    /// The range still holds exactly `entry_count` entries.
    pub entry_count_ok: bool,
}

impl CheckpointCheck {
    pub fn passed(&self) -> bool {
        self.aggregate_ok && self.seal_ok && self.entry_count_ok
    }
}

/// Aggregate digest over entry digests, ascending by sequence id.
fn aggregate_digest(entries: &[LogEntry]) -> String {
    digest_parts(entries.iter().map(|e| e.digest.as_bytes()))
}

/// The checkpoint's own tamper-evident seal over its header fields.
fn seal_digest(first: u64, last: u64, entry_count: u64, aggregate: &str) -> String {
    digest_parts([
        first.to_le_bytes().as_slice(),
        last.to_le_bytes().as_slice(),
        entry_count.to_le_bytes().as_slice(),
        aggregate.as_bytes(),
    ])
}

impl<S: LogStore + CheckpointStore> CheckpointManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fold the entries in `[first, last]` into a new stored checkpoint.
    ///
    /// The checkpoint's bounds snap to the sequence ids actually present in
    /// the requested range. Fails with `EmptyRange` when nothing is there,
    /// and with `DuplicateRange` (from the store, atomically) when the
    /// range overlaps an existing checkpoint.
    pub fn create_checkpoint(&self, first: u64, last: u64) -> AuditResult<Checkpoint> {
        let entries = self.store.read_range(Some(first), Some(last))?;
        let (Some(head), Some(tail)) = (entries.first(), entries.last()) else {
            return Err(AuditError::EmptyRange { first, last });
        };

        let aggregate = aggregate_digest(&entries);
        let entry_count = entries.len() as u64;
        let checkpoint = Checkpoint {
            first_sequence_id: head.sequence_id,
            last_sequence_id: tail.sequence_id,
            entry_count,
            checkpoint_digest: seal_digest(
                head.sequence_id,
                tail.sequence_id,
                entry_count,
                &aggregate,
            ),
            aggregate_digest: aggregate,
            created_at: Utc::now(),
        };

        self.store.append_checkpoint(checkpoint.clone())?;
        info!(
            first = checkpoint.first_sequence_id,
            last = checkpoint.last_sequence_id,
            entry_count,
            "checkpoint created"
        );
        Ok(checkpoint)
    }

    /// Fold the next `span` entries not yet covered by any checkpoint.
    ///
    /// This is the scheduler entry point: it resumes after the highest
    /// checkpointed sequence id and acts only once a full span has
    /// accumulated, so repeated invocations produce uniform, contiguous
    /// checkpoints. Returns `Ok(None)` when fewer than `span`
    /// uncheckpointed entries exist yet.
    pub fn create_next_checkpoint(&self, span: u64) -> AuditResult<Option<Checkpoint>> {
        let span = span.max(1);
        let start = self
            .store
            .checkpoints()?
            .iter()
            .map(|c| c.last_sequence_id)
            .max()
            .map(|last| last + 1)
            .unwrap_or(1);
        let end = start.saturating_add(span - 1);

        let entries = self.store.read_range(Some(start), Some(end))?;
        if (entries.len() as u64) < span {
            debug!(
                start,
                span,
                available = entries.len(),
                "not enough uncheckpointed entries for a full span"
            );
            return Ok(None);
        }
        self.create_checkpoint(start, end).map(Some)
    }

    /// Cheap spot-check: re-derive `checkpoint`'s digests from the log and
    /// its own header without replaying any entry payload.
    pub fn check(&self, checkpoint: &Checkpoint) -> AuditResult<CheckpointCheck> {
        let entries = self.store.read_range(
            Some(checkpoint.first_sequence_id),
            Some(checkpoint.last_sequence_id),
        )?;

        let check = CheckpointCheck {
            aggregate_ok: aggregate_digest(&entries) == checkpoint.aggregate_digest,
            seal_ok: seal_digest(
                checkpoint.first_sequence_id,
                checkpoint.last_sequence_id,
                checkpoint.entry_count,
                &checkpoint.aggregate_digest,
            ) == checkpoint.checkpoint_digest,
            entry_count_ok: entries.len() as u64 == checkpoint.entry_count,
        };

        if !check.passed() {
            warn!(
                first = checkpoint.first_sequence_id,
                last = checkpoint.last_sequence_id,
                aggregate_ok = check.aggregate_ok,
                seal_ok = check.seal_ok,
                entry_count_ok = check.entry_count_ok,
                "checkpoint re-check FAILED"
            );
        }
        Ok(check)
    }

    /// Re-check every stored checkpoint; returns each alongside its result.
    pub fn check_all(&self) -> AuditResult<Vec<(Checkpoint, CheckpointCheck)>> {
        let checkpoints = self.store.checkpoints()?;
        let mut results = Vec::with_capacity(checkpoints.len());
        for checkpoint in checkpoints {
            let check = self.check(&checkpoint)?;
            results.push((checkpoint, check));
        }
        Ok(results)
    }
}
