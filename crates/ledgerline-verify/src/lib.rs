//! # ledgerline-verify
//!
//! The read half of the ledgerline tamper-evident audit chain:
//!
//! - [`verifier::IntegrityVerifier`] — replays chain ranges, recomputes
//!   digests, checks linkage, and reports every `DigestMismatch` and
//!   `ChainBreak` it finds.
//! - [`checkpoint::CheckpointManager`] — folds contiguous ranges into
//!   aggregate digests for cheap long-range spot-checks, and re-checks
//!   stored checkpoints.
//!
//! Both are pure readers: they run concurrently with writers and with each
//! other, and need no locking beyond what the store provides.

pub mod checkpoint;
pub mod verifier;

pub use checkpoint::{CheckpointCheck, CheckpointManager};
pub use verifier::IntegrityVerifier;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use ledgerline_chain::{digest_parts, ChainWriter};
    use ledgerline_contracts::{
        AuditError, AuditEvent, Provenance, Severity, ViolationKind,
    };
    use ledgerline_store::{CheckpointStore, LogStore, MemoryStore};

    use super::{CheckpointManager, IntegrityVerifier};

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn make_event(label: &str) -> AuditEvent {
        AuditEvent::new("inventory.item.issued", "inventory", Severity::Info)
            .with_provenance(Provenance {
                actor_id: Some("u-88".to_string()),
                source_address: Some("192.168.4.2".to_string()),
                ..Default::default()
            })
            .with_payload_field("label", json!(label))
    }

    /// A store with `count` chained entries, plus writer and verifier.
    fn populated(count: usize) -> (Arc<MemoryStore>, IntegrityVerifier<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let writer = ChainWriter::new(store.clone());
        for i in 0..count {
            writer.write(make_event(&format!("e{i}"))).unwrap();
        }
        (store.clone(), IntegrityVerifier::new(store))
    }

    // ── IntegrityVerifier ────────────────────────────────────────────────────

    /// Scenario A: an untouched log of three entries verifies clean.
    #[test]
    fn untampered_log_verifies_clean() {
        let (_, verifier) = populated(3);
        let report = verifier.verify(None, None).unwrap();

        assert!(report.verified);
        assert_eq!(report.total_checked, 3);
        assert_eq!(report.first_id, Some(1));
        assert_eq!(report.last_id, Some(3));
        assert!(report.violations.is_empty());
    }

    #[test]
    fn empty_log_verifies_clean_with_zero_checked() {
        let (_, verifier) = populated(0);
        let report = verifier.verify(None, None).unwrap();
        assert!(report.verified);
        assert_eq!(report.total_checked, 0);
        assert_eq!(report.first_id, None);
    }

    #[test]
    fn empty_subrange_verifies_clean() {
        let (_, verifier) = populated(3);
        let report = verifier.verify(Some(10), Some(20)).unwrap();
        assert!(report.verified);
        assert_eq!(report.total_checked, 0);
    }

    /// Scenario B: flipping a payload field of entry 2 in storage produces
    /// exactly one `DigestMismatch` at 2 and — critically — no `ChainBreak`
    /// at 3, because entry 3 still links to entry 2's *stored* digest.
    #[test]
    fn payload_edit_yields_one_mismatch_and_no_break() {
        let (store, verifier) = populated(3);
        assert!(store.corrupt_entry(2, |e| {
            e.payload.insert("label".to_string(), json!("TAMPERED"));
        }));

        let report = verifier.verify(None, None).unwrap();

        assert!(!report.verified);
        assert_eq!(report.total_checked, 3);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].sequence_id, 2);
        assert_eq!(report.violations[0].kind, ViolationKind::DigestMismatch);
        assert_eq!(report.violations[0].observed, {
            let entries = store.read_range(Some(2), Some(2)).unwrap();
            entries[0].digest.clone()
        });
    }

    /// Rewriting entry 2's stored digest itself is detected twice: the
    /// digest no longer matches entry 2's content, and entry 3's linkage
    /// now points at a value no longer present.
    #[test]
    fn digest_rewrite_yields_mismatch_and_break() {
        let (store, verifier) = populated(3);
        assert!(store.corrupt_entry(2, |e| e.digest = "f".repeat(64)));

        let report = verifier.verify(None, None).unwrap();

        assert!(!report.verified);
        assert_eq!(report.violations.len(), 2);
        assert_eq!(report.violations[0].sequence_id, 2);
        assert_eq!(report.violations[0].kind, ViolationKind::DigestMismatch);
        assert_eq!(report.violations[1].sequence_id, 3);
        assert_eq!(report.violations[1].kind, ViolationKind::ChainBreak);
        assert_eq!(report.violations[1].observed, report.violations[0].expected);
    }

    /// Splice detection: deleting a mid-chain entry breaks linkage at the
    /// entry immediately following the gap.
    #[test]
    fn excised_entry_breaks_chain_at_successor() {
        let (store, verifier) = populated(5);
        assert!(store.excise_entry(3));

        let report = verifier.verify(None, None).unwrap();

        assert!(!report.verified);
        assert_eq!(report.total_checked, 4);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].sequence_id, 4);
        assert_eq!(report.violations[0].kind, ViolationKind::ChainBreak);
    }

    /// A mid-chain range's first entry has its predecessor outside the
    /// range, so only later entries are linkage-checked.
    #[test]
    fn subrange_skips_linkage_for_first_entry() {
        let (_, verifier) = populated(6);
        let report = verifier.verify(Some(3), Some(5)).unwrap();

        assert!(report.verified);
        assert_eq!(report.total_checked, 3);
        assert_eq!(report.first_id, Some(3));
        assert_eq!(report.last_id, Some(5));
    }

    /// Concurrency non-forking: hundreds of concurrent writes still form a
    /// single linear chain with zero violations.
    #[test]
    fn concurrent_writes_verify_clean() {
        let store = Arc::new(MemoryStore::new());
        let writer = Arc::new(ChainWriter::new(store.clone()));

        let threads: Vec<_> = (0..10)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..30 {
                        writer.write(make_event(&format!("t{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let verifier = IntegrityVerifier::new(store);
        let report = verifier.verify(None, None).unwrap();
        assert!(report.verified);
        assert_eq!(report.total_checked, 300);
    }

    // ── Chunked verification ─────────────────────────────────────────────────

    /// Chunked verification produces the same verdict, totals, and
    /// violations as a single-shot pass, including when the chunk size does
    /// not divide the range evenly.
    #[test]
    fn chunked_matches_single_shot() {
        let (store, verifier) = populated(23);
        store.corrupt_entry(11, |e| {
            e.payload.insert("label".to_string(), json!("edited"));
        });
        store.excise_entry(17);

        let single = verifier.verify(None, None).unwrap();
        let chunked = verifier.verify_chunked(None, None, 7).unwrap();

        assert_eq!(single.verified, chunked.verified);
        assert_eq!(single.total_checked, chunked.total_checked);
        assert_eq!(single.violations.len(), chunked.violations.len());
        for (a, b) in single.violations.iter().zip(chunked.violations.iter()) {
            assert_eq!(a.sequence_id, b.sequence_id);
            assert_eq!(a.kind, b.kind);
        }
    }

    /// A break straddling a chunk boundary is still caught — linkage state
    /// carries across chunks.
    #[test]
    fn chunked_catches_break_at_chunk_boundary() {
        let (store, verifier) = populated(10);
        // Entries 1..=10, chunk 5: entry 6 opens the second chunk.
        store.corrupt_entry(5, |e| e.digest = "e".repeat(64));

        let report = verifier.verify_chunked(None, None, 5).unwrap();
        assert!(!report.verified);
        assert!(report
            .violations
            .iter()
            .any(|v| v.sequence_id == 6 && v.kind == ViolationKind::ChainBreak));
    }

    #[test]
    fn chunked_empty_log_verifies_clean() {
        let (_, verifier) = populated(0);
        let report = verifier.verify_chunked(None, None, 100).unwrap();
        assert!(report.verified);
        assert_eq!(report.total_checked, 0);
    }

    // ── CheckpointManager ────────────────────────────────────────────────────

    /// Scenario C: a checkpoint over fifty entries carries the right count
    /// and an aggregate equal to an independently computed digest of the
    /// fifty stored entry digests.
    #[test]
    fn checkpoint_aggregate_matches_independent_computation() {
        let (store, _) = populated(50);
        let manager = CheckpointManager::new(store.clone());

        let checkpoint = manager.create_checkpoint(1, 50).unwrap();

        assert_eq!(checkpoint.first_sequence_id, 1);
        assert_eq!(checkpoint.last_sequence_id, 50);
        assert_eq!(checkpoint.entry_count, 50);

        let entries = store.read_range(Some(1), Some(50)).unwrap();
        let independent = digest_parts(entries.iter().map(|e| e.digest.as_bytes()));
        assert_eq!(checkpoint.aggregate_digest, independent);

        // And the cheap re-check tier agrees.
        let check = manager.check(&checkpoint).unwrap();
        assert!(check.passed());
    }

    /// Checkpoint determinism: the seal and aggregate are pure functions of
    /// the range contents, so a re-derivation reproduces both exactly.
    #[test]
    fn checkpoint_digests_are_deterministic() {
        let (store, _) = populated(10);
        let manager = CheckpointManager::new(store.clone());
        let checkpoint = manager.create_checkpoint(1, 10).unwrap();

        let entries = store.read_range(Some(1), Some(10)).unwrap();
        let aggregate = digest_parts(entries.iter().map(|e| e.digest.as_bytes()));
        let seal = digest_parts([
            1u64.to_le_bytes().as_slice(),
            10u64.to_le_bytes().as_slice(),
            10u64.to_le_bytes().as_slice(),
            aggregate.as_bytes(),
        ]);

        assert_eq!(checkpoint.aggregate_digest, aggregate);
        assert_eq!(checkpoint.checkpoint_digest, seal);
    }

    /// The checkpoint's bounds snap to the entries actually present in a
    /// wider requested range.
    #[test]
    fn checkpoint_bounds_snap_to_present_entries() {
        let (store, _) = populated(5);
        let manager = CheckpointManager::new(store);
        let checkpoint = manager.create_checkpoint(1, 1000).unwrap();
        assert_eq!(checkpoint.first_sequence_id, 1);
        assert_eq!(checkpoint.last_sequence_id, 5);
        assert_eq!(checkpoint.entry_count, 5);
    }

    #[test]
    fn checkpoint_over_empty_range_is_rejected() {
        let (store, _) = populated(3);
        let manager = CheckpointManager::new(store);

        let err = manager.create_checkpoint(10, 20).unwrap_err();
        assert!(matches!(err, AuditError::EmptyRange { first: 10, last: 20 }));
    }

    #[test]
    fn overlapping_checkpoint_is_rejected_before_write() {
        let (store, _) = populated(20);
        let manager = CheckpointManager::new(store.clone());

        manager.create_checkpoint(1, 10).unwrap();
        let err = manager.create_checkpoint(5, 15).unwrap_err();
        assert!(matches!(err, AuditError::DuplicateRange { .. }));

        // The rejected attempt wrote nothing.
        assert_eq!(store.checkpoints().unwrap().len(), 1);

        // Adjacent partition is accepted.
        manager.create_checkpoint(11, 20).unwrap();
    }

    /// Scheduled checkpointing folds one full span at a time, resuming
    /// after the highest checkpointed id, and declines partial spans.
    #[test]
    fn next_checkpoint_folds_full_spans_only() {
        let (store, _) = populated(25);
        let manager = CheckpointManager::new(store);

        let first = manager.create_next_checkpoint(10).unwrap().unwrap();
        assert_eq!((first.first_sequence_id, first.last_sequence_id), (1, 10));

        let second = manager.create_next_checkpoint(10).unwrap().unwrap();
        assert_eq!((second.first_sequence_id, second.last_sequence_id), (11, 20));

        // Only five uncheckpointed entries remain — not a full span yet.
        assert!(manager.create_next_checkpoint(10).unwrap().is_none());
    }

    /// The scheduler resumes after manually created checkpoints too.
    #[test]
    fn next_checkpoint_resumes_after_manual_checkpoint() {
        let (store, _) = populated(12);
        let manager = CheckpointManager::new(store);
        manager.create_checkpoint(1, 8).unwrap();

        let next = manager.create_next_checkpoint(4).unwrap().unwrap();
        assert_eq!((next.first_sequence_id, next.last_sequence_id), (9, 12));
        assert_eq!(next.entry_count, 4);
    }

    #[test]
    fn next_checkpoint_on_empty_log_is_none() {
        let (store, _) = populated(0);
        let manager = CheckpointManager::new(store);
        assert!(manager.create_next_checkpoint(10).unwrap().is_none());
    }

    /// The cheap tier notices a tampered entry digest without replaying
    /// payloads, and notices an excised entry via the count.
    #[test]
    fn checkpoint_recheck_detects_tampering() {
        let (store, _) = populated(10);
        let manager = CheckpointManager::new(store.clone());
        let checkpoint = manager.create_checkpoint(1, 10).unwrap();

        store.corrupt_entry(4, |e| e.digest = "d".repeat(64));
        let check = manager.check(&checkpoint).unwrap();
        assert!(!check.aggregate_ok);
        assert!(check.seal_ok, "the checkpoint record itself is untouched");
        assert!(check.entry_count_ok);
        assert!(!check.passed());

        store.excise_entry(7);
        let check = manager.check(&checkpoint).unwrap();
        assert!(!check.entry_count_ok);
    }

    /// Tampering with the checkpoint record itself breaks its seal.
    #[test]
    fn checkpoint_seal_detects_header_tampering() {
        let (store, _) = populated(10);
        let manager = CheckpointManager::new(store);
        let mut checkpoint = manager.create_checkpoint(1, 10).unwrap();

        checkpoint.entry_count = 9;
        let check = manager.check(&checkpoint).unwrap();
        assert!(!check.seal_ok);
    }

    #[test]
    fn check_all_covers_every_stored_checkpoint() {
        let (store, _) = populated(30);
        let manager = CheckpointManager::new(store.clone());
        manager.create_checkpoint(1, 10).unwrap();
        manager.create_checkpoint(11, 20).unwrap();
        manager.create_checkpoint(21, 30).unwrap();

        let results = manager.check_all().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, check)| check.passed()));

        store.corrupt_entry(15, |e| e.digest = "c".repeat(64));
        let results = manager.check_all().unwrap();
        let failed: Vec<u64> = results
            .iter()
            .filter(|(_, check)| !check.passed())
            .map(|(cp, _)| cp.first_sequence_id)
            .collect();
        assert_eq!(failed, vec![11]);
    }
}
