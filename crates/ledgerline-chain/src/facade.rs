//! The audit facade: the only entry point business collaborators use.
//!
//! `AuditLedger::record` wraps the chain writer in a compensating-action
//! boundary: on success the committed entry is returned; on any failure the
//! error is logged operationally and `None` comes back, so the caller's own
//! unit of work proceeds unaffected. Audit completeness is valuable, but it
//! must never become a single point of failure for unrelated business
//! operations.
//!
//! Verification failures are a different matter entirely and are never
//! routed through here — a tampered chain is always surfaced.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use ledgerline_contracts::{AuditEvent, LogEntry};
use ledgerline_store::LogStore;

use crate::writer::ChainWriter;

/// Failure-isolating wrapper around [`ChainWriter`].
pub struct AuditLedger<S: LogStore> {
    writer: ChainWriter<S>,
    /// Consecutive `record` failures since the last success.
    consecutive_failures: AtomicU32,
    /// Threshold at which repeated failures escalate from `warn` to
    /// `error` logging.
    alert_after: u32,
}

impl<S: LogStore> AuditLedger<S> {
    /// Wrap a store with the default escalation threshold.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_alert_threshold(store, crate::config::AuditConfig::default().alert_after_failures)
    }

    /// Wrap a store, escalating log severity after `alert_after`
    /// consecutive failures.
    pub fn with_alert_threshold(store: Arc<S>, alert_after: u32) -> Self {
        Self {
            writer: ChainWriter::new(store),
            consecutive_failures: AtomicU32::new(0),
            alert_after: alert_after.max(1),
        }
    }

    /// The underlying serialized writer, for callers that need failures
    /// surfaced instead of swallowed.
    pub fn writer(&self) -> &ChainWriter<S> {
        &self.writer
    }

    /// Consecutive failures since the last successful `record`.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Record one audit event; never fails, never panics.
    ///
    /// Returns the committed entry, or `None` when the write failed. The
    /// failure is logged with the event's classification so operators can
    /// reconstruct what went unrecorded.
    pub fn record(&self, event: AuditEvent) -> Option<LogEntry> {
        let event_type = event.event_type.clone();
        match self.writer.write(event) {
            Ok(entry) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                debug!(
                    sequence_id = entry.sequence_id,
                    event_type = %entry.event_type,
                    "audit event recorded"
                );
                Some(entry)
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.alert_after {
                    // TODO: emit to an external alert channel once one is
                    // configured; tracing is the only sink today.
                    error!(
                        %event_type,
                        consecutive_failures = failures,
                        error = %e,
                        "audit write failing repeatedly; events are being lost"
                    );
                } else {
                    warn!(
                        %event_type,
                        consecutive_failures = failures,
                        error = %e,
                        "audit write failed; business operation continues"
                    );
                }
                None
            }
        }
    }
}
