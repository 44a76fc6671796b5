//! The chain writer: serialized append with tail linkage.
//!
//! `ChainWriter::write` is the only code path that creates entries. It runs
//! the read-tail → digest → append sequence under a writer-owned mutex, so
//! two concurrent writes can never both read the same tail and fork the
//! chain into two entries claiming the same predecessor.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tracing::debug;

use ledgerline_contracts::{
    AuditError, AuditEvent, AuditResult, LogEntry, PendingEntry,
};
use ledgerline_store::LogStore;

use crate::digest::digest_for_pending;

/// Appends audit events to a log store, linking each entry to the current
/// chain tail.
///
/// One writer instance per chain. Clones of the `Arc<S>` store may be read
/// concurrently by verifiers; only writes serialize here.
pub struct ChainWriter<S: LogStore> {
    store: Arc<S>,
    /// Serializes the tail-read/append critical section.
    write_lock: Mutex<()>,
}

impl<S: LogStore> ChainWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The store this writer appends to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Append one event to the chain and return the persisted entry.
    ///
    /// Algorithm: read the current tail digest (genesis sentinel when the
    /// log is empty), stamp the event with wall-clock and fine timestamps,
    /// compute the digest over the canonical field list, append. All four
    /// steps hold the write lock.
    ///
    /// Failures (`StorageUnavailable`, `DigestComputation`) surface to the
    /// direct caller undisguised — isolating *business* transactions from
    /// audit failures is the facade's job, not this writer's.
    pub fn write(&self, event: AuditEvent) -> AuditResult<LogEntry> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AuditError::StorageUnavailable {
                reason: format!("writer lock poisoned: {}", e),
            })?;

        let previous_digest = match self.store.tail()? {
            Some(tail) => tail.digest,
            None => LogEntry::GENESIS_DIGEST.to_string(),
        };

        let occurred_at = Utc::now();
        let occurred_at_fine = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut pending = PendingEntry {
            occurred_at,
            occurred_at_fine,
            event_type: event.event_type,
            event_category: event.event_category,
            severity: event.severity,
            provenance: event.provenance,
            payload: event.payload,
            previous_digest,
            digest: String::new(),
        };
        pending.digest = digest_for_pending(&pending)?;

        let entry = self.store.append(pending)?;

        debug!(
            sequence_id = entry.sequence_id,
            event_type = %entry.event_type,
            digest = %entry.digest,
            "chain entry written"
        );
        Ok(entry)
    }
}
