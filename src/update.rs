use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::sources::Platform;
use crate::store::{StatusRecord, StatusStore, ThreadStatus};

/// Result of a status mutation, carried back to the CLI for printing.
#[derive(Debug)]
pub enum Outcome {
    Updated {
        thread_id: String,
        record: StatusRecord,
        last_updated: DateTime<Utc>,
    },
    Cleared {
        thread_id: String,
        removed: StatusRecord,
        last_updated: DateTime<Utc>,
    },
    /// `--clear` for a thread that had no record; nothing was written.
    NothingToClear { thread_id: String },
}

impl Outcome {
    pub fn describe(&self) -> String {
        match self {
            Outcome::Updated {
                thread_id, record, ..
            } => match &record.note {
                Some(note) => {
                    format!("updated thread #{thread_id} to [{} - {note}]", record.status)
                }
                None => format!("updated thread #{thread_id} to [{}]", record.status),
            },
            Outcome::Cleared { thread_id, .. } => {
                format!("cleared stored status for thread #{thread_id}")
            }
            Outcome::NothingToClear { thread_id } => {
                format!("thread #{thread_id} had no stored status")
            }
        }
    }
}

/// Validate and apply one status change. All validation happens before any
/// disk write; the thread id is checked for shape only, never against the
/// remote system, so this works offline.
pub fn apply(
    store: &StatusStore,
    platform: &'static Platform,
    pr_number: u64,
    thread_id: &str,
    status: Option<&str>,
    note: Option<&str>,
    clear: bool,
) -> Result<Outcome> {
    let status = match (status, clear) {
        (Some(_), true) => {
            return Err(Error::Usage(
                "give either a status or --clear, not both".to_string(),
            ));
        }
        (None, false) => {
            return Err(Error::Usage(
                "a status is required (or --clear to remove the stored one)".to_string(),
            ));
        }
        (None, true) => None,
        (Some(raw), false) => Some(raw.parse::<ThreadStatus>()?),
    };
    if !platform.valid_thread_id(thread_id) {
        return Err(Error::InvalidThreadId {
            value: thread_id.to_string(),
            platform: platform.name,
            expected: platform.thread_id_expected,
        });
    }

    let Some(status) = status else {
        let (file, removed) = store.clear_status(pr_number, thread_id)?;
        return Ok(match removed {
            Some(removed) => {
                info!(pr = pr_number, thread = thread_id, "status cleared");
                Outcome::Cleared {
                    thread_id: thread_id.to_string(),
                    removed,
                    last_updated: file.last_updated.unwrap_or_else(Utc::now),
                }
            }
            None => Outcome::NothingToClear {
                thread_id: thread_id.to_string(),
            },
        });
    };

    let file = store.set_status(pr_number, thread_id, status, note)?;
    info!(pr = pr_number, thread = thread_id, status = %status, "status updated");
    Ok(Outcome::Updated {
        thread_id: thread_id.to_string(),
        record: file.threads[thread_id].clone(),
        last_updated: file.last_updated.unwrap_or_else(Utc::now),
    })
}
