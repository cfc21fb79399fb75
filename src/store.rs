use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Local working status for a review thread. Absence of a record means
/// `Active`; `clear_status` removes the record rather than storing `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadStatus {
    Active,
    Completed,
    InProgress,
    Skipped,
    Blocked,
}

impl ThreadStatus {
    pub const ALL: [ThreadStatus; 5] = [
        ThreadStatus::Active,
        ThreadStatus::Completed,
        ThreadStatus::InProgress,
        ThreadStatus::Skipped,
        ThreadStatus::Blocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThreadStatus::Active => "ACTIVE",
            ThreadStatus::Completed => "COMPLETED",
            ThreadStatus::InProgress => "IN_PROGRESS",
            ThreadStatus::Skipped => "SKIPPED",
            ThreadStatus::Blocked => "BLOCKED",
        }
    }

    pub fn names() -> [&'static str; 5] {
        Self::ALL.map(ThreadStatus::as_str)
    }

    /// A thread with this local status still needs developer attention.
    pub fn is_actionable(self) -> bool {
        matches!(self, ThreadStatus::Active | ThreadStatus::InProgress)
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let canon = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == canon)
            .ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    pub status: ThreadStatus,
    pub updated_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// On-disk aggregate holding every locally-tracked thread status for one PR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusFile {
    pub pr_number: u64,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub threads: HashMap<String, StatusRecord>,
}

impl StatusFile {
    pub fn empty(pr_number: u64) -> Self {
        Self {
            pr_number,
            last_updated: None,
            threads: HashMap::new(),
        }
    }
}

/// Reads and writes `pr-{n}-status.json` files in a working directory.
///
/// Writes are whole-file with an atomic replace (temp file in the same
/// directory, fsync, rename), so a concurrent reader never observes a
/// partial file. Two concurrent writers are last-writer-wins at full-file
/// granularity; that race is accepted for an interactive CLI.
pub struct StatusStore {
    working_dir: PathBuf,
    clock: Box<dyn Fn() -> DateTime<Utc>>,
}

impl StatusStore {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            clock: Box::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(
        working_dir: impl Into<PathBuf>,
        clock: impl Fn() -> DateTime<Utc> + 'static,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            clock: Box::new(clock),
        }
    }

    pub fn status_file_path(&self, pr_number: u64) -> PathBuf {
        self.working_dir.join(format!("pr-{pr_number}-status.json"))
    }

    /// Load the aggregate for a PR. A missing file is an empty aggregate,
    /// not an error; an unparseable file is a corrupt-state error naming the
    /// path, and the file is left exactly as found.
    pub fn load(&self, pr_number: u64) -> Result<StatusFile> {
        let path = self.status_file_path(pr_number);
        if !path.exists() {
            return Ok(StatusFile::empty(pr_number));
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::CorruptState { path, source: e })
    }

    /// Persist the full aggregate atomically, refreshing `last_updated` to
    /// the max of "now" and every record timestamp.
    pub fn save(&self, file: &mut StatusFile) -> Result<()> {
        let now = (self.clock)();
        let newest = file.threads.values().map(|r| r.updated_at).max();
        file.last_updated = Some(newest.map_or(now, |t| t.max(now)));

        std::fs::create_dir_all(&self.working_dir)?;
        let path = self.status_file_path(file.pr_number);
        let tmp = self.working_dir.join(format!(
            "pr-{}-status.json.tmp.{}",
            file.pr_number,
            std::process::id()
        ));

        let json = serde_json::to_string_pretty(file)
            .map_err(|e| Error::State(format!("failed to serialize status file: {e}")))?;
        let mut out = std::fs::File::create(&tmp)?;
        out.write_all(json.as_bytes())?;
        out.sync_all()?;
        drop(out);
        std::fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), "status file saved");
        Ok(())
    }

    /// Insert or overwrite the record for a thread and persist. Returns the
    /// saved aggregate. Timestamps never move backwards for a thread, even
    /// if the wall clock does.
    pub fn set_status(
        &self,
        pr_number: u64,
        thread_id: &str,
        status: ThreadStatus,
        note: Option<&str>,
    ) -> Result<StatusFile> {
        let mut file = self.load(pr_number)?;
        let now = (self.clock)();
        let updated_at = match file.threads.get(thread_id) {
            Some(prev) => prev.updated_at.max(now),
            None => now,
        };
        file.threads.insert(
            thread_id.to_string(),
            StatusRecord {
                status,
                updated_at,
                note: note.map(str::to_string),
            },
        );
        self.save(&mut file)?;
        Ok(file)
    }

    /// Remove the record for a thread if present and persist. Absent record
    /// is a no-op: nothing is written and no file is created. Returns the
    /// resulting aggregate and the removed record, if any.
    pub fn clear_status(
        &self,
        pr_number: u64,
        thread_id: &str,
    ) -> Result<(StatusFile, Option<StatusRecord>)> {
        let mut file = self.load(pr_number)?;
        let removed = file.threads.remove(thread_id);
        if removed.is_some() {
            self.save(&mut file)?;
        }
        Ok((file, removed))
    }
}
