//! Storage trait definitions.
//!
//! The chain writer, verifier, and checkpoint manager all talk to storage
//! exclusively through these two traits. The load-bearing guarantee is the
//! `tail()` contract: a tail read must reflect every previously committed
//! append, because the writer links each new entry to whatever `tail()`
//! returns.

use ledgerline_contracts::{AuditResult, Checkpoint, LogEntry, PendingEntry};

/// An ordered, durable, append-only collection of [`LogEntry`] records.
///
/// Implementations must never silently drop or reorder writes: an `append`
/// either commits fully and returns the assigned id, or fails with
/// `StorageUnavailable` having written nothing observable. Partial entries
/// (a digest with no persisted sequence id) must never be visible to
/// readers.
pub trait LogStore: Send + Sync {
    /// Persist `entry`, assigning the next sequence id.
    ///
    /// Ids are strictly increasing and gap-free under single-writer
    /// discipline, starting at 1. Returns the fully populated entry.
    fn append(&self, entry: PendingEntry) -> AuditResult<LogEntry>;

    /// The most recent committed entry, or `None` when the log is empty.
    ///
    /// Must be linearizable with respect to `append`: a tail read issued
    /// after an append commits observes that append.
    fn tail(&self) -> AuditResult<Option<LogEntry>>;

    /// All entries with `from <= sequence_id <= to`, ascending.
    ///
    /// `None` bounds are open: `read_range(None, None)` returns the whole
    /// log.
    fn read_range(&self, from: Option<u64>, to: Option<u64>) -> AuditResult<Vec<LogEntry>>;
}

/// Durable storage for [`Checkpoint`] records.
///
/// Checkpoints partition history: `append_checkpoint` must atomically
/// reject a checkpoint whose range overlaps one already stored, so two
/// concurrent checkpoint creations over overlapping ranges cannot both
/// succeed.
pub trait CheckpointStore: Send + Sync {
    /// Persist `checkpoint`, or fail with `DuplicateRange` if its range
    /// overlaps an existing checkpoint.
    fn append_checkpoint(&self, checkpoint: Checkpoint) -> AuditResult<()>;

    /// All stored checkpoints, ascending by `first_sequence_id`.
    fn checkpoints(&self) -> AuditResult<Vec<Checkpoint>>;
}
