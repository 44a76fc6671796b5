//! The integrity verifier: replays a range of the chain and reports every
//! violation it finds.
//!
//! Two independent checks run on every pass, because the two attacks they
//! detect are independent:
//!
//! 1. **Digest recomputation** — an entry whose stored digest differs from
//!    the digest recomputed over its stored fields was edited in place
//!    (`DigestMismatch`).
//! 2. **Linkage** — an entry whose `previous_digest` differs from the
//!    *stored* digest of its actual predecessor marks an insertion,
//!    deletion, or reorder (`ChainBreak`).
//!
//! The linkage check deliberately compares against the predecessor's stored
//! digest, not its recomputed one: editing entry B's payload in storage
//! produces exactly one `DigestMismatch` at B and no `ChainBreak` at C,
//! because C still links to B's stored digest. The two violation kinds
//! therefore pinpoint *which* entry was touched and *how*.
//!
//! Read-only and side-effect-free. Callers are expected to record the
//! verification pass itself as a new audit entry through the facade; the
//! recursion is non-circular because that entry's sequence id is
//! necessarily greater than the verified range's upper bound.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ledgerline_chain::digest_for;
use ledgerline_contracts::{
    AuditResult, LogEntry, VerificationReport, Violation, ViolationKind,
};
use ledgerline_store::LogStore;

/// Walks chain ranges and reports tampering.
pub struct IntegrityVerifier<S: LogStore> {
    store: Arc<S>,
}

impl<S: LogStore> IntegrityVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Verify all entries with `from <= sequence_id <= to` in one read.
    ///
    /// Open bounds (`None`) verify from the start and/or to the tail. An
    /// empty range verifies as `true` with zero entries checked. Violations
    /// are reported, never auto-corrected, and never suppressed.
    pub fn verify(
        &self,
        from: Option<u64>,
        to: Option<u64>,
    ) -> AuditResult<VerificationReport> {
        let entries = self.store.read_range(from, to)?;
        let mut report = VerificationReport::empty();
        let mut predecessor: Option<(u64, String)> = None;
        Self::check_entries(&entries, &mut predecessor, &mut report);
        Self::log_outcome(&report);
        Ok(report)
    }

    /// Verify a large range in bounded reads of `chunk` entries each.
    ///
    /// Produces the same report `verify` would, while keeping memory and
    /// single-read I/O proportional to `chunk` rather than to the whole
    /// range. Linkage is checked across chunk boundaries by carrying the
    /// last entry's stored digest forward.
    pub fn verify_chunked(
        &self,
        from: Option<u64>,
        to: Option<u64>,
        chunk: u64,
    ) -> AuditResult<VerificationReport> {
        let chunk = chunk.max(1);
        let start = from.unwrap_or(1);
        let end = match to {
            Some(to) => to,
            None => match self.store.tail()? {
                Some(tail) => tail.sequence_id,
                None => return Ok(VerificationReport::empty()),
            },
        };

        let mut report = VerificationReport::empty();
        let mut predecessor: Option<(u64, String)> = None;
        let mut cursor = start;
        while cursor <= end {
            let upper = cursor.saturating_add(chunk - 1).min(end);
            let entries = self.store.read_range(Some(cursor), Some(upper))?;
            debug!(from = cursor, to = upper, count = entries.len(), "verifying chunk");

            let mut chunk_report = VerificationReport::empty();
            Self::check_entries(&entries, &mut predecessor, &mut chunk_report);
            report.absorb(chunk_report);

            if upper == u64::MAX {
                break;
            }
            cursor = upper + 1;
        }

        Self::log_outcome(&report);
        Ok(report)
    }

    /// Run both checks over `entries`, carrying predecessor state in and
    /// out so callers can stitch consecutive slices together.
    fn check_entries(
        entries: &[LogEntry],
        predecessor: &mut Option<(u64, String)>,
        report: &mut VerificationReport,
    ) {
        for entry in entries {
            report.total_checked += 1;
            report.first_id.get_or_insert(entry.sequence_id);
            report.last_id = Some(entry.sequence_id);

            // Check 1: the stored digest must match a recomputation over
            // the stored fields. A recomputation that cannot even run
            // (undigestible stored payload) is itself a mismatch.
            match digest_for(entry) {
                Ok(recomputed) if recomputed == entry.digest => {}
                Ok(recomputed) => {
                    report.violations.push(Violation {
                        sequence_id: entry.sequence_id,
                        kind: ViolationKind::DigestMismatch,
                        expected: recomputed,
                        observed: entry.digest.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        sequence_id = entry.sequence_id,
                        error = %e,
                        "stored entry cannot be re-digested"
                    );
                    report.violations.push(Violation {
                        sequence_id: entry.sequence_id,
                        kind: ViolationKind::DigestMismatch,
                        expected: "<uncomputable>".to_string(),
                        observed: entry.digest.clone(),
                    });
                }
            }

            // Check 2: linkage against the predecessor's *stored* digest.
            // Only from the second examined entry onward — the first entry
            // of a mid-chain range has its predecessor outside the range.
            if let Some((_, previous_stored)) = predecessor {
                if entry.previous_digest != *previous_stored {
                    report.violations.push(Violation {
                        sequence_id: entry.sequence_id,
                        kind: ViolationKind::ChainBreak,
                        expected: previous_stored.clone(),
                        observed: entry.previous_digest.clone(),
                    });
                }
            }
            *predecessor = Some((entry.sequence_id, entry.digest.clone()));
        }

        report.verified = report.violations.is_empty();
    }

    fn log_outcome(report: &VerificationReport) {
        if report.verified {
            info!(
                total_checked = report.total_checked,
                first_id = ?report.first_id,
                last_id = ?report.last_id,
                "chain verification passed"
            );
        } else {
            warn!(
                total_checked = report.total_checked,
                violations = report.violations.len(),
                "chain verification FAILED; tampering detected"
            );
        }
    }
}
