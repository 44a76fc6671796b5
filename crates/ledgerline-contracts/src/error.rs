//! Error types for the ledgerline audit subsystem.
//!
//! All fallible operations in the subsystem return `AuditResult<T>`.
//! Variants carry enough context to produce an actionable operator log line
//! without consulting the source.
//!
//! Note that `DigestMismatch` and `ChainBreak` are *not* errors: a
//! verification pass that finds tampering still completes successfully and
//! reports its findings in a `VerificationReport`. Only infrastructure
//! failures travel through `AuditError`.

use thiserror::Error;

/// The unified error type for the ledgerline crates.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log store could not complete a read or append.
    ///
    /// Recoverable by retrying later. Never interpreted as "the append
    /// succeeded" — an append that returns this error wrote nothing
    /// observable.
    #[error("log store unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// Canonicalization or hashing failed on malformed payload input.
    ///
    /// An event that cannot be digested must never be written without a
    /// digest, so this surfaces immediately instead of being skipped.
    #[error("digest computation failed: {reason}")]
    DigestComputation { reason: String },

    /// A checkpoint was requested over a range containing no entries.
    #[error("no entries in range [{first}, {last}]; nothing to checkpoint")]
    EmptyRange { first: u64, last: u64 },

    /// A checkpoint was requested over a range that overlaps an existing
    /// checkpoint. Checkpoints partition history; overlaps are rejected
    /// before anything is written.
    #[error(
        "checkpoint range [{first}, {last}] overlaps existing checkpoint [{existing_first}, {existing_last}]"
    )]
    DuplicateRange {
        first: u64,
        last: u64,
        existing_first: u64,
        existing_last: u64,
    },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the ledgerline crates.
pub type AuditResult<T> = Result<T, AuditError>;
