use serde::Serialize;

use crate::sources::{Platform, Thread};
use crate::store::{StatusFile, StatusRecord, ThreadStatus};

/// One thread of the merged view: remote data plus the local override, if
/// any, with the display label and filtering flags precomputed.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledThread {
    #[serde(flatten)]
    pub thread: Thread,
    pub local: Option<StatusRecord>,
    /// Local status when a record exists, otherwise the remote status.
    pub effective_status: String,
    /// Combined local/remote display label; only set when a record exists.
    pub label: Option<String>,
    /// Local COMPLETED confirmed by a terminal remote status.
    pub verified: bool,
    pub actionable: bool,
}

/// Merge remote threads with the local status file into a display-ready
/// view. Pure: mutates neither input. Output preserves the order of
/// `threads`; records for ids not present in `threads` are simply not
/// represented (they stay in the store until explicitly cleared).
pub fn reconcile(
    threads: &[Thread],
    status_file: &StatusFile,
    platform: &Platform,
) -> Vec<ReconciledThread> {
    threads
        .iter()
        .map(|thread| match status_file.threads.get(&thread.id) {
            None => ReconciledThread {
                thread: thread.clone(),
                local: None,
                effective_status: thread.status.clone(),
                label: None,
                verified: false,
                actionable: !platform.is_terminal(&thread.status),
            },
            Some(record) => {
                let verified = record.status == ThreadStatus::Completed
                    && platform.is_terminal(&thread.status);
                let label = if verified {
                    format!("COMPLETED→{}", thread.status.to_ascii_uppercase())
                } else {
                    format!("{} ({}: [{}])", record.status, platform.name, thread.status)
                };
                ReconciledThread {
                    thread: thread.clone(),
                    local: Some(record.clone()),
                    effective_status: record.status.to_string(),
                    label: Some(label),
                    verified,
                    actionable: record.status.is_actionable(),
                }
            }
        })
        .collect()
}
