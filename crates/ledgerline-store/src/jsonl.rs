//! Durable append-only store backed by newline-delimited JSON files.
//!
//! Layout: a directory holding `entries.jsonl` (one [`LogEntry`] per line,
//! in append order) and `checkpoints.jsonl` (one [`Checkpoint`] per line).
//! On open, both files are replayed to rebuild the in-memory mirror and the
//! next sequence id, so the chain resumes exactly where the previous
//! process left off.
//!
//! Readers are served from the mirror, never from a partially flushed file,
//! so a failed append is not observable. Torn bytes — a partial line left
//! by a crash or by an append that failed midway — are handled by tracking
//! the byte offset of the last clean line boundary: a failed append
//! truncates the file back to it immediately, and open() truncates any
//! torn tail before accepting new writes. A later append therefore always
//! starts on a fresh line and can never merge with torn bytes, which would
//! otherwise corrupt the record before it or silently absorb it. A
//! malformed line that is *not* at the end of the file cannot be explained
//! by an interrupted append and refuses to load.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use ledgerline_contracts::{
    AuditError, AuditResult, Checkpoint, LogEntry, PendingEntry,
};

use crate::traits::{CheckpointStore, LogStore};

const ENTRIES_FILE: &str = "entries.jsonl";
const CHECKPOINTS_FILE: &str = "checkpoints.jsonl";

/// An append handle that always writes at a clean line boundary.
///
/// `committed_len` is the file length up to and including the last fully
/// persisted line. A failed append truncates back to it, so torn bytes
/// never survive into the next write.
struct AppendFile {
    file: File,
    committed_len: u64,
}

impl AppendFile {
    /// Open `path` for appending, truncating any torn tail beyond
    /// `committed_len` (as determined by replaying the file).
    fn open(path: &Path, committed_len: u64) -> AuditResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AuditError::StorageUnavailable {
                reason: format!("cannot open '{}': {}", path.display(), e),
            })?;

        let actual_len = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| AuditError::StorageUnavailable {
                reason: format!("cannot stat '{}': {}", path.display(), e),
            })?;
        if actual_len > committed_len {
            warn!(
                path = %path.display(),
                torn_bytes = actual_len - committed_len,
                "truncating torn tail from interrupted write"
            );
            file.set_len(committed_len)
                .map_err(|e| AuditError::StorageUnavailable {
                    reason: format!("cannot truncate torn tail of '{}': {}", path.display(), e),
                })?;
        }

        Ok(Self { file, committed_len })
    }

    /// Serialize `record`, append it as one line, and flush.
    ///
    /// On any write failure the file is truncated back to the last clean
    /// line boundary before the error surfaces, so a retry (or any later
    /// append) starts on a fresh line.
    fn append_record<T: serde::Serialize>(&mut self, record: &T) -> AuditResult<()> {
        let line = serde_json::to_string(record).map_err(|e| AuditError::StorageUnavailable {
            reason: format!("cannot serialize record: {}", e),
        })?;

        let outcome = writeln!(self.file, "{}", line).and_then(|_| self.file.flush());
        match outcome {
            Ok(()) => {
                self.committed_len += line.len() as u64 + 1;
                Ok(())
            }
            Err(e) => {
                if let Err(truncate_err) = self.file.set_len(self.committed_len) {
                    warn!(
                        error = %truncate_err,
                        "could not restore line boundary after failed append"
                    );
                }
                Err(AuditError::StorageUnavailable {
                    reason: format!("append failed: {}", e),
                })
            }
        }
    }
}

/// The mutable interior of a `JsonlStore`: append handles plus a full
/// in-memory mirror of what the files contain.
struct JsonlInner {
    entries_file: AppendFile,
    checkpoints_file: AppendFile,
    entries: Vec<LogEntry>,
    checkpoints: Vec<Checkpoint>,
    next_sequence: u64,
}

/// A single-node durable store: append-only JSONL files with an in-memory
/// mirror for reads.
///
/// All operations run under one `Mutex`, which satisfies the
/// linearizable-tail contract the same way [`crate::MemoryStore`] does.
pub struct JsonlStore {
    dir: PathBuf,
    inner: Mutex<JsonlInner>,
}

impl JsonlStore {
    /// Open (or create) the store directory and replay its contents.
    pub fn open(dir: impl AsRef<Path>) -> AuditResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| AuditError::StorageUnavailable {
            reason: format!("cannot create store directory '{}': {}", dir.display(), e),
        })?;

        let entries_path = dir.join(ENTRIES_FILE);
        let checkpoints_path = dir.join(CHECKPOINTS_FILE);

        let (entries, entries_committed): (Vec<LogEntry>, u64) =
            Self::load_lines(&entries_path)?;
        let (checkpoints, checkpoints_committed): (Vec<Checkpoint>, u64) =
            Self::load_lines(&checkpoints_path)?;

        let next_sequence = entries.last().map(|e| e.sequence_id + 1).unwrap_or(1);

        info!(
            dir = %dir.display(),
            entries = entries.len(),
            checkpoints = checkpoints.len(),
            next_sequence,
            "jsonl store opened"
        );

        Ok(Self {
            inner: Mutex::new(JsonlInner {
                entries_file: AppendFile::open(&entries_path, entries_committed)?,
                checkpoints_file: AppendFile::open(&checkpoints_path, checkpoints_committed)?,
                entries,
                checkpoints,
                next_sequence,
            }),
            dir,
        })
    }

    /// The directory this store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replay one JSONL file into records, returning them together with
    /// the byte offset just past the last clean line.
    ///
    /// A malformed *final* line is assumed to be a torn write from a crash
    /// and is excluded (the returned offset stops before it, so the opener
    /// truncates it away); a malformed line anywhere else is corruption
    /// and fails the load.
    fn load_lines<T: serde::de::DeserializeOwned>(path: &Path) -> AuditResult<(Vec<T>, u64)> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => {
                return Err(AuditError::StorageUnavailable {
                    reason: format!("cannot read '{}': {}", path.display(), e),
                })
            }
        };

        let mut records = Vec::new();
        let mut committed = 0u64;
        let mut offset = 0usize;
        let mut line_number = 0usize;
        for raw in contents.split_inclusive('\n') {
            offset += raw.len();
            line_number += 1;
            let line = raw.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                committed = offset as u64;
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(record) => {
                    records.push(record);
                    committed = offset as u64;
                }
                Err(e) if offset == contents.len() => {
                    warn!(
                        path = %path.display(),
                        line = line_number,
                        error = %e,
                        "excluding torn final line from interrupted write"
                    );
                }
                Err(e) => {
                    return Err(AuditError::StorageUnavailable {
                        reason: format!(
                            "corrupt record at '{}' line {}: {}",
                            path.display(),
                            line_number,
                            e
                        ),
                    });
                }
            }
        }
        Ok((records, committed))
    }

    fn lock(&self) -> AuditResult<std::sync::MutexGuard<'_, JsonlInner>> {
        self.inner.lock().map_err(|e| AuditError::StorageUnavailable {
            reason: format!("store lock poisoned: {}", e),
        })
    }
}

impl LogStore for JsonlStore {
    fn append(&self, entry: PendingEntry) -> AuditResult<LogEntry> {
        let mut inner = self.lock()?;
        let entry = entry.into_entry(inner.next_sequence);

        // File first, mirror second: a failed write leaves the mirror (and
        // therefore all readers) untouched.
        inner.entries_file.append_record(&entry)?;
        inner.entries.push(entry.clone());
        inner.next_sequence += 1;

        debug!(
            sequence_id = entry.sequence_id,
            event_type = %entry.event_type,
            "entry appended"
        );
        Ok(entry)
    }

    fn tail(&self) -> AuditResult<Option<LogEntry>> {
        let inner = self.lock()?;
        Ok(inner.entries.last().cloned())
    }

    fn read_range(&self, from: Option<u64>, to: Option<u64>) -> AuditResult<Vec<LogEntry>> {
        let inner = self.lock()?;
        let from = from.unwrap_or(u64::MIN);
        let to = to.unwrap_or(u64::MAX);
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.sequence_id >= from && e.sequence_id <= to)
            .cloned()
            .collect())
    }
}

impl CheckpointStore for JsonlStore {
    fn append_checkpoint(&self, checkpoint: Checkpoint) -> AuditResult<()> {
        let mut inner = self.lock()?;

        if let Some(existing) = inner
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

        inner.checkpoints_file.append_record(&checkpoint)?;
        debug!(
            first = checkpoint.first_sequence_id,
            last = checkpoint.last_sequence_id,
            "checkpoint stored"
        );
        inner.checkpoints.push(checkpoint);
        Ok(())
    }

    fn checkpoints(&self) -> AuditResult<Vec<Checkpoint>> {
        let inner = self.lock()?;
        let mut checkpoints = inner.checkpoints.clone();
        checkpoints.sort_by_key(|c| c.first_sequence_id);
        Ok(checkpoints)
    }
}
