use crate::error::{Error, Result};
use crate::reconcile::ReconciledThread;
use crate::sources::{ChangedFile, PrInfo};

/// Render the reconciled view as a markdown report: header, threads grouped
/// by file, general comments, a per-status summary and an action item list.
/// Threads keep the remote order inside each group. `include_handled` adds
/// already-handled threads to the action items as checked entries.
pub fn render_markdown(
    pr: &PrInfo,
    view: &[ReconciledThread],
    include_handled: bool,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# PR Comments for PR #{}\n\n", pr.number));
    out.push_str(&format!("**Title:** {}\n", pr.title));
    out.push_str(&format!("**Author:** {}\n", pr.author));
    out.push_str(&format!("**Status:** {}\n\n", pr.status));
    if let Some(url) = &pr.url {
        out.push_str(&format!("**URL:** {url}\n\n"));
    }

    out.push_str("## Review threads\n\n");
    if view.is_empty() {
        out.push_str("No review threads found.\n\n");
    }

    // File-anchored threads first, grouped by location in order of first
    // appearance, then PR-level comments.
    let mut groups: Vec<(String, Vec<&ReconciledThread>)> = Vec::new();
    let mut general: Vec<&ReconciledThread> = Vec::new();
    for entry in view {
        match &entry.thread.file_path {
            Some(path) => {
                let location = match entry.thread.line {
                    Some(line) => format!("{path}:{line}"),
                    None => path.clone(),
                };
                match groups.iter_mut().find(|(key, _)| *key == location) {
                    Some((_, members)) => members.push(entry),
                    None => groups.push((location, vec![entry])),
                }
            }
            None => general.push(entry),
        }
    }

    for (location, members) in &groups {
        out.push_str(&format!("### {location}\n\n"));
        for entry in members {
            push_thread(&mut out, entry);
        }
    }
    if !general.is_empty() {
        out.push_str("### General comments\n\n");
        for entry in &general {
            push_thread(&mut out, entry);
        }
    }

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- Total threads: {}\n", view.len()));
    out.push_str(&format!(
        "- Actionable: {}\n",
        view.iter().filter(|t| t.actionable).count()
    ));
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for entry in view {
        *counts.entry(entry.effective_status.as_str()).or_default() += 1;
    }
    for (status, count) in counts {
        out.push_str(&format!("- {status}: {count}\n"));
    }
    out.push('\n');

    out.push_str("## Action items\n\n");
    let mut any = false;
    for entry in view {
        if entry.actionable {
            any = true;
            out.push_str(&format!("- [ ] {}\n", item_line(entry)));
        } else if include_handled {
            any = true;
            out.push_str(&format!("- [x] {}\n", item_line(entry)));
        }
    }
    if !any {
        out.push_str("Nothing to do.\n");
    }

    out
}

fn push_thread(out: &mut String, entry: &ReconciledThread) {
    let display = entry
        .label
        .as_deref()
        .unwrap_or(entry.thread.status.as_str());
    out.push_str(&format!("**Thread #{}** *{display}*\n\n", entry.thread.id));
    out.push_str(&format!("**{}:**\n", entry.thread.author));
    for line in entry.thread.text.lines() {
        out.push_str(&format!("> {line}\n"));
    }
    if entry.thread.text.is_empty() {
        out.push_str(">\n");
    }
    if let Some(note) = entry.local.as_ref().and_then(|r| r.note.as_deref()) {
        out.push_str(&format!("\nNote: {note}\n"));
    }
    out.push('\n');
}

fn item_line(entry: &ReconciledThread) -> String {
    let summary = entry.thread.text.lines().next().unwrap_or("").to_string();
    match &entry.thread.file_path {
        Some(path) => format!("Thread #{} ({path}): {summary}", entry.thread.id),
        None => format!("Thread #{}: {summary}", entry.thread.id),
    }
}

pub fn render_json(view: &[ReconciledThread]) -> Result<String> {
    serde_json::to_string_pretty(view)
        .map_err(|e| Error::State(format!("failed to serialize reconciled view: {e}")))
}

pub fn render_files_table(files: &[ChangedFile]) -> String {
    if files.is_empty() {
        return "No changed files.\n".to_string();
    }
    let mut out = String::new();
    for file in files {
        let mut line = format!("{:<9} {}", file.change_type.as_str(), file.path);
        if let Some(original) = &file.original_path {
            line.push_str(&format!(" (from {original})"));
        }
        if let (Some(add), Some(del)) = (file.additions, file.deletions) {
            line.push_str(&format!(" (+{add} -{del})"));
        }
        line.push('\n');
        out.push_str(&line);
    }
    out
}

pub fn render_files_json(files: &[ChangedFile]) -> Result<String> {
    serde_json::to_string_pretty(files)
        .map_err(|e| Error::State(format!("failed to serialize file list: {e}")))
}
