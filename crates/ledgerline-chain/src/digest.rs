//! Digest engine: deterministic SHA-256 digests over canonical input.
//!
//! Pure computation, no state, no I/O. Every field that contributes to an
//! entry's digest is listed explicitly so nothing is accidentally omitted,
//! and the exact same list is used at write time and at verify time.
//!
//! Canonical entry digest input (parts, in order):
//!   1. `occurred_at` as epoch milliseconds, 8-byte little-endian
//!   2. `occurred_at_fine` as 16-byte little-endian
//!   3. `event_type` as UTF-8 bytes
//!   4. `actor_id` as UTF-8 bytes (empty when absent)
//!   5. `source_address` as UTF-8 bytes (empty when absent)
//!   6. canonical JSON of `payload` (compact, key-sorted)
//!   7. `previous_digest` as ASCII bytes (64 hex chars)
//!
//! Each part is fed to the hash as an 8-byte little-endian length prefix
//! followed by the part's bytes, so variable-length neighbours cannot be
//! confused for one another ("ab"+"c" hashes differently from "a"+"bc").
//! The payload map is a `BTreeMap`, so its compact JSON form is key-sorted
//! and byte-stable across runs and processes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use ledgerline_contracts::{AuditError, AuditResult, LogEntry, PendingEntry};

/// Digest an ordered list of byte parts.
///
/// Deterministic: the same ordered parts always produce the same lowercase
/// 64-character hex digest, and any single-byte change to any part changes
/// the output.
pub fn digest_parts<I, P>(parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        let bytes = part.as_ref();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}

/// Serialize a payload map to its canonical form: compact JSON with
/// key-sorted objects.
///
/// Returns `DigestComputation` if the payload cannot be serialized — an
/// event that cannot be digested must never be written without a digest.
pub fn canonical_payload(
    payload: &BTreeMap<String, serde_json::Value>,
) -> AuditResult<String> {
    serde_json::to_string(payload).map_err(|e| AuditError::DigestComputation {
        reason: format!("payload not serializable: {}", e),
    })
}

/// Compute an entry digest from its constituent fields.
///
/// This is the one canonical field list; both the chain writer and the
/// integrity verifier go through here, so the two can never diverge.
pub fn entry_digest(
    occurred_at: DateTime<Utc>,
    occurred_at_fine: u128,
    event_type: &str,
    actor_id: Option<&str>,
    source_address: Option<&str>,
    payload: &BTreeMap<String, serde_json::Value>,
    previous_digest: &str,
) -> AuditResult<String> {
    let payload_json = canonical_payload(payload)?;
    Ok(digest_parts([
        occurred_at.timestamp_millis().to_le_bytes().as_slice(),
        occurred_at_fine.to_le_bytes().as_slice(),
        event_type.as_bytes(),
        actor_id.unwrap_or_default().as_bytes(),
        source_address.unwrap_or_default().as_bytes(),
        payload_json.as_bytes(),
        previous_digest.as_bytes(),
    ]))
}

/// Recompute a stored entry's digest from its stored fields (including its
/// stored `previous_digest`). Reproduces the stored `digest` bit-for-bit
/// unless the entry was altered after the fact.
pub fn digest_for(entry: &LogEntry) -> AuditResult<String> {
    entry_digest(
        entry.occurred_at,
        entry.occurred_at_fine,
        &entry.event_type,
        entry.provenance.actor_id.as_deref(),
        entry.provenance.source_address.as_deref(),
        &entry.payload,
        &entry.previous_digest,
    )
}

/// Digest for a pending entry awaiting sequence assignment. The canonical
/// field list excludes `sequence_id`, so this equals [`digest_for`] on the
/// persisted entry.
pub fn digest_for_pending(pending: &PendingEntry) -> AuditResult<String> {
    entry_digest(
        pending.occurred_at,
        pending.occurred_at_fine,
        &pending.event_type,
        pending.provenance.actor_id.as_deref(),
        pending.provenance.source_address.as_deref(),
        &pending.payload,
        &pending.previous_digest,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_payload() -> BTreeMap<String, serde_json::Value> {
        let mut payload = BTreeMap::new();
        payload.insert("course".to_string(), serde_json::json!("first-aid"));
        payload.insert("score".to_string(), serde_json::json!(92));
        payload
    }

    #[test]
    fn digest_is_64_lowercase_hex() {
        let digest = digest_parts(["hello", "world"]);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn same_parts_same_digest() {
        assert_eq!(digest_parts(["a", "b", "c"]), digest_parts(["a", "b", "c"]));
    }

    /// The length prefix prevents part-boundary ambiguity.
    #[test]
    fn part_boundaries_matter() {
        assert_ne!(digest_parts(["ab", "c"]), digest_parts(["a", "bc"]));
        assert_ne!(digest_parts(["abc"]), digest_parts(["ab", "c"]));
        assert_ne!(digest_parts(["a", ""]), digest_parts(["a"]));
    }

    #[test]
    fn single_character_change_changes_digest() {
        let base = entry_digest(
            fixed_time(),
            123,
            "training.completed",
            Some("u-1"),
            Some("10.0.0.1"),
            &sample_payload(),
            LogEntry::GENESIS_DIGEST,
        )
        .unwrap();

        let mut tweaked = sample_payload();
        tweaked.insert("course".to_string(), serde_json::json!("first-aiD"));
        let changed = entry_digest(
            fixed_time(),
            123,
            "training.completed",
            Some("u-1"),
            Some("10.0.0.1"),
            &tweaked,
            LogEntry::GENESIS_DIGEST,
        )
        .unwrap();

        assert_ne!(base, changed);
    }

    #[test]
    fn entry_digest_is_deterministic() {
        let args = || {
            entry_digest(
                fixed_time(),
                999,
                "meeting.scheduled",
                None,
                None,
                &sample_payload(),
                LogEntry::GENESIS_DIGEST,
            )
            .unwrap()
        };
        assert_eq!(args(), args());
    }

    /// Absent provenance hashes identically to empty-string provenance —
    /// documented behavior of the canonical field list.
    #[test]
    fn absent_and_empty_provenance_agree() {
        let absent = entry_digest(
            fixed_time(),
            1,
            "t",
            None,
            None,
            &BTreeMap::new(),
            LogEntry::GENESIS_DIGEST,
        )
        .unwrap();
        let empty = entry_digest(
            fixed_time(),
            1,
            "t",
            Some(""),
            Some(""),
            &BTreeMap::new(),
            LogEntry::GENESIS_DIGEST,
        )
        .unwrap();
        assert_eq!(absent, empty);
    }

    /// `digest_for` on a stored entry equals `digest_for_pending` on the
    /// pending shape it came from — sequence assignment never moves the
    /// digest.
    #[test]
    fn pending_and_stored_digests_agree() {
        let pending = ledgerline_contracts::PendingEntry {
            occurred_at: fixed_time(),
            occurred_at_fine: 55,
            event_type: "inventory.issued".to_string(),
            event_category: "inventory".to_string(),
            severity: ledgerline_contracts::Severity::Info,
            provenance: ledgerline_contracts::Provenance {
                actor_id: Some("u-9".to_string()),
                ..Default::default()
            },
            payload: sample_payload(),
            previous_digest: LogEntry::GENESIS_DIGEST.to_string(),
            digest: String::new(),
        };

        let from_pending = digest_for_pending(&pending).unwrap();
        let mut pending = pending;
        pending.digest = from_pending.clone();
        let entry = pending.into_entry(41);

        assert_eq!(digest_for(&entry).unwrap(), from_pending);
    }
}
