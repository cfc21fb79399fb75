pub mod azure;
pub mod github;

use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Remote vocabulary for one review platform. Each adapter supplies its own
/// record so nothing downstream hard-codes a platform's status strings or id
/// format.
#[derive(Debug)]
pub struct Platform {
    /// Short name used in display labels, e.g. `IN_PROGRESS (Azure: [active])`.
    pub name: &'static str,
    /// Value used in config files and `--platform`.
    pub key: &'static str,
    /// Remote statuses meaning the platform considers the thread closed.
    pub terminal_statuses: &'static [&'static str],
    /// Syntactic format of a thread id on this platform.
    pub thread_id_pattern: &'static str,
    /// Human description of the id format, used in validation errors.
    pub thread_id_expected: &'static str,
    pub token_env_var: &'static str,
}

pub static AZURE_DEVOPS: Platform = Platform {
    name: "Azure",
    key: "azure-devops",
    terminal_statuses: &["fixed", "closed", "wontFix", "byDesign"],
    thread_id_pattern: r"^[0-9]+$",
    thread_id_expected: "a numeric id",
    token_env_var: "AZURE_DEVOPS_PAT",
};

pub static GITHUB: Platform = Platform {
    name: "GitHub",
    key: "github",
    terminal_statuses: &["resolved"],
    thread_id_pattern: r"^[A-Za-z0-9_=-]+$",
    thread_id_expected: "a GraphQL node id",
    token_env_var: "GITHUB_PAT",
};

impl Platform {
    pub fn from_key(key: &str) -> Option<&'static Platform> {
        [&AZURE_DEVOPS, &GITHUB]
            .into_iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn keys() -> [&'static str; 2] {
        [AZURE_DEVOPS.key, GITHUB.key]
    }

    /// Remote statuses are compared case-insensitively; platforms are not
    /// consistent about casing (`wontFix` vs `wontfix`).
    pub fn is_terminal(&self, remote_status: &str) -> bool {
        self.terminal_statuses
            .iter()
            .any(|s| s.eq_ignore_ascii_case(remote_status))
    }

    pub fn valid_thread_id(&self, id: &str) -> bool {
        Regex::new(self.thread_id_pattern).unwrap().is_match(id)
    }
}

/// One review discussion on a PR, as reported by the remote system. The
/// remote status is carried through as an opaque string.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub id: String,
    pub status: String,
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrInfo {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub status: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFile {
    pub path: String,
    pub change_type: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletions: Option<u64>,
}

pub trait CommentSource {
    fn platform(&self) -> &'static Platform;

    /// Fetch title/author/status for a PR.
    fn fetch_pr(&self, pr_number: u64) -> Result<PrInfo>;

    /// Fetch review threads in the remote system's order.
    fn fetch_threads(&self, pr_number: u64) -> Result<Vec<Thread>>;

    /// Fetch the PR's changed files with normalized change types.
    fn fetch_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>>;

    /// Verify the platform is reachable with the resolved credential.
    /// Returns a one-line human description of what was reached.
    fn check_connection(&self) -> Result<String>;
}

pub enum AnySource {
    Azure(azure::AzureSource),
    GitHub(github::GitHubSource),
}

impl CommentSource for AnySource {
    fn platform(&self) -> &'static Platform {
        match self {
            AnySource::Azure(s) => s.platform(),
            AnySource::GitHub(s) => s.platform(),
        }
    }

    fn fetch_pr(&self, pr_number: u64) -> Result<PrInfo> {
        match self {
            AnySource::Azure(s) => s.fetch_pr(pr_number),
            AnySource::GitHub(s) => s.fetch_pr(pr_number),
        }
    }

    fn fetch_threads(&self, pr_number: u64) -> Result<Vec<Thread>> {
        match self {
            AnySource::Azure(s) => s.fetch_threads(pr_number),
            AnySource::GitHub(s) => s.fetch_threads(pr_number),
        }
    }

    fn fetch_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>> {
        match self {
            AnySource::Azure(s) => s.fetch_changed_files(pr_number),
            AnySource::GitHub(s) => s.fetch_changed_files(pr_number),
        }
    }

    fn check_connection(&self) -> Result<String> {
        match self {
            AnySource::Azure(s) => s.check_connection(),
            AnySource::GitHub(s) => s.check_connection(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking HTTP transport beneath the adapters, injectable for tests.
/// Non-2xx statuses come back as a normal response so adapters can attach
/// endpoint-specific context; only transport failures are errors.
pub trait HttpClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse>;

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct UreqClient {
    timeout: Duration,
}

impl UreqClient {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    fn to_response(url: &str, result: std::result::Result<ureq::Response, ureq::Error>) -> Result<HttpResponse> {
        match result {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.into_string()?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, resp)) => Ok(HttpResponse {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(Error::Source(format!("request to {url} failed: {e}"))),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse> {
        let mut req = ureq::get(url).timeout(self.timeout);
        for (name, value) in headers {
            req = req.set(name, value);
        }
        Self::to_response(url, req.call())
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let mut req = ureq::post(url).timeout(self.timeout);
        for (name, value) in headers {
            req = req.set(name, value);
        }
        Self::to_response(url, req.send_json(body))
    }
}

/// Percent-encode a path segment. Org and project names on Azure DevOps
/// routinely contain spaces.
pub(crate) fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
