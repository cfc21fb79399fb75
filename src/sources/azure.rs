use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::config::AzureConfig;
use crate::error::{Error, Result};

use super::{
    encode_segment, ChangeKind, ChangedFile, CommentSource, HttpClient, HttpResponse, Platform,
    PrInfo, Thread, UreqClient, AZURE_DEVOPS,
};

const API_VERSION: &str = "7.1";

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct AdoList<T> {
    #[serde(default)]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoThread {
    id: u64,
    status: Option<String>,
    #[serde(default)]
    is_deleted: bool,
    thread_context: Option<AdoThreadContext>,
    #[serde(default)]
    comments: Vec<AdoComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoThreadContext {
    file_path: Option<String>,
    right_file_start: Option<AdoPosition>,
}

#[derive(Debug, Deserialize)]
struct AdoPosition {
    line: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoComment {
    #[serde(default)]
    content: String,
    comment_type: Option<String>,
    #[serde(default)]
    is_deleted: bool,
    author: Option<AdoIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoIdentity {
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoPullRequest {
    title: String,
    status: String,
    created_by: Option<AdoIdentity>,
}

#[derive(Debug, Deserialize)]
struct AdoIteration {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoChangeList {
    #[serde(default)]
    change_entries: Vec<AdoChange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoChange {
    change_type: Option<String>,
    #[serde(default)]
    item: Option<AdoItem>,
    source_server_item: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoItem {
    path: Option<String>,
    #[serde(default)]
    is_folder: bool,
}

#[derive(Debug, Deserialize)]
struct AdoProjects {
    count: u64,
}

/// Azure DevOps REST adapter (api-version 7.1, PAT basic auth).
pub struct AzureSource {
    organization: String,
    project: String,
    repository: String,
    token: String,
    client: Box<dyn HttpClient>,
}

impl AzureSource {
    pub fn new(cfg: &AzureConfig, token: &str) -> Self {
        Self {
            organization: cfg.organization.clone(),
            project: cfg.project.clone(),
            repository: cfg.repository.clone(),
            token: token.to_string(),
            client: Box::new(UreqClient::new()),
        }
    }

    #[cfg(test)]
    fn with_client(org: &str, project: &str, repo: &str, client: Box<dyn HttpClient>) -> Self {
        Self {
            organization: org.to_string(),
            project: project.to_string(),
            repository: repo.to_string(),
            token: "test-token".to_string(),
            client,
        }
    }

    fn base_url(&self) -> String {
        format!(
            "https://dev.azure.com/{}/{}/_apis/git",
            encode_segment(&self.organization),
            encode_segment(&self.project)
        )
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        // ADO PATs go over basic auth with an empty username.
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!(":{}", self.token));
        vec![("Authorization", format!("Basic {credentials}"))]
    }

    fn pr_url(&self, pr_number: u64, suffix: &str) -> String {
        format!(
            "{}/repositories/{}/pullRequests/{}{}?api-version={}",
            self.base_url(),
            encode_segment(&self.repository),
            pr_number,
            suffix,
            API_VERSION
        )
    }

    fn get_ok(&self, url: &str, pr_number: u64) -> Result<String> {
        let resp = self.client.get(url, &self.headers())?;
        self.check_status(resp, url, Some(pr_number))
    }

    fn check_status(
        &self,
        resp: HttpResponse,
        url: &str,
        pr_number: Option<u64>,
    ) -> Result<String> {
        match resp.status {
            200 => Ok(resp.body),
            401 | 403 => Err(Error::Source(format!(
                "authentication failed (HTTP {}): check {} or regenerate your PAT",
                resp.status,
                AZURE_DEVOPS.token_env_var
            ))),
            404 => Err(match pr_number {
                Some(pr) => Error::Source(format!(
                    "PR #{pr} not found in repository '{}'",
                    self.repository
                )),
                None => Error::Source(format!(
                    "organization '{}' not found",
                    self.organization
                )),
            }),
            status => Err(Error::Source(format!(
                "unexpected HTTP {status} from {url}: {}",
                snippet(&resp.body)
            ))),
        }
    }

    fn parse_thread(thread: AdoThread) -> Option<Thread> {
        if thread.is_deleted {
            return None;
        }
        // System comments (votes, ref updates) are not review feedback.
        let first = thread.comments.iter().find(|c| {
            !c.is_deleted
                && c.comment_type
                    .as_deref()
                    .is_none_or(|t| !t.eq_ignore_ascii_case("system"))
        })?;

        let (file_path, line) = match &thread.thread_context {
            Some(ctx) => (
                ctx.file_path
                    .as_deref()
                    .map(|p| p.trim_start_matches('/').to_string()),
                ctx.right_file_start.as_ref().and_then(|pos| pos.line),
            ),
            None => (None, None),
        };

        Some(Thread {
            id: thread.id.to_string(),
            status: thread.status.clone().unwrap_or_else(|| "unknown".to_string()),
            file_path,
            line,
            author: first
                .author
                .as_ref()
                .map_or_else(|| "Unknown".to_string(), |a| a.display_name.clone()),
            text: first.content.trim().to_string(),
        })
    }
}

/// ADO change types are comma-separated flags, e.g. `rename, edit`.
fn normalize_change_type(raw: &str) -> ChangeKind {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("rename") {
        ChangeKind::Renamed
    } else if lower.contains("add") {
        ChangeKind::Added
    } else if lower.contains("delete") {
        ChangeKind::Deleted
    } else {
        ChangeKind::Modified
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

impl CommentSource for AzureSource {
    fn platform(&self) -> &'static Platform {
        &AZURE_DEVOPS
    }

    fn fetch_pr(&self, pr_number: u64) -> Result<PrInfo> {
        let url = self.pr_url(pr_number, "");
        let body = self.get_ok(&url, pr_number)?;
        let pr: AdoPullRequest = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse PR response: {e}")))?;

        Ok(PrInfo {
            number: pr_number,
            title: pr.title,
            author: pr
                .created_by
                .map_or_else(|| "Unknown".to_string(), |a| a.display_name),
            status: pr.status,
            url: None,
        })
    }

    fn fetch_threads(&self, pr_number: u64) -> Result<Vec<Thread>> {
        let url = self.pr_url(pr_number, "/threads");
        let body = self.get_ok(&url, pr_number)?;
        let list: AdoList<AdoThread> = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse threads response: {e}")))?;

        let threads: Vec<Thread> = list
            .value
            .into_iter()
            .filter_map(AzureSource::parse_thread)
            .collect();
        debug!(pr = pr_number, count = threads.len(), "fetched review threads");
        Ok(threads)
    }

    fn fetch_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>> {
        let url = self.pr_url(pr_number, "/iterations");
        let body = self.get_ok(&url, pr_number)?;
        let iterations: AdoList<AdoIteration> = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse iterations response: {e}")))?;

        let Some(latest) = iterations.value.iter().map(|i| i.id).max() else {
            return Ok(Vec::new());
        };

        let url = self.pr_url(pr_number, &format!("/iterations/{latest}/changes"));
        let body = self.get_ok(&url, pr_number)?;
        let changes: AdoChangeList = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse changes response: {e}")))?;

        let mut seen = std::collections::HashSet::new();
        let mut files = Vec::new();
        for change in changes.change_entries {
            let Some(item) = change.item else { continue };
            let Some(path) = item.path.filter(|p| !p.is_empty()) else {
                continue;
            };
            if item.is_folder || !seen.insert(path.clone()) {
                continue;
            }

            let change_type = normalize_change_type(change.change_type.as_deref().unwrap_or("edit"));
            let original_path = (change_type == ChangeKind::Renamed)
                .then(|| change.source_server_item)
                .flatten()
                .map(|p| p.trim_start_matches('/').to_string());

            files.push(ChangedFile {
                path: path.trim_start_matches('/').to_string(),
                change_type,
                original_path,
                additions: None,
                deletions: None,
            });
        }
        debug!(pr = pr_number, count = files.len(), iteration = latest, "fetched changed files");
        Ok(files)
    }

    fn check_connection(&self) -> Result<String> {
        let url = format!(
            "https://dev.azure.com/{}/_apis/projects?api-version={}",
            encode_segment(&self.organization),
            API_VERSION
        );
        let resp = self.client.get(&url, &self.headers())?;
        let body = self.check_status(resp, &url, None)?;
        let projects: AdoProjects = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse projects response: {e}")))?;

        Ok(format!(
            "connected to Azure DevOps organization '{}' ({} projects visible)",
            self.organization, projects.count
        ))
    }
}
