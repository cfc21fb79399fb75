use serde::Deserialize;
use tracing::debug;

use crate::config::GithubConfig;
use crate::error::{Error, Result};

use super::{
    ChangeKind, ChangedFile, CommentSource, HttpClient, HttpResponse, Platform, PrInfo, Thread,
    UreqClient, GITHUB,
};

const API_BASE: &str = "https://api.github.com";
const FILES_PER_PAGE: usize = 100;

const REVIEW_THREADS_QUERY: &str = r#"
    query($owner: String!, $repo: String!, $pr: Int!) {
        repository(owner: $owner, name: $repo) {
            pullRequest(number: $pr) {
                reviewThreads(first: 100) {
                    nodes {
                        id
                        isResolved
                        isOutdated
                        path
                        line
                        comments(first: 1) {
                            nodes {
                                author { login }
                                body
                            }
                        }
                    }
                }
            }
        }
    }
"#;

#[derive(Debug, Deserialize)]
struct GqlEnvelope {
    data: Option<GqlData>,
    errors: Option<Vec<GqlError>>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    repository: Option<GqlRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlRepository {
    pull_request: Option<GqlPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlPullRequest {
    review_threads: GqlThreadConnection,
}

#[derive(Debug, Deserialize)]
struct GqlThreadConnection {
    #[serde(default)]
    nodes: Vec<GqlThreadNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlThreadNode {
    id: String,
    is_resolved: bool,
    #[serde(default)]
    is_outdated: bool,
    path: Option<String>,
    line: Option<u32>,
    comments: GqlCommentConnection,
}

#[derive(Debug, Deserialize)]
struct GqlCommentConnection {
    #[serde(default)]
    nodes: Vec<GqlComment>,
}

#[derive(Debug, Deserialize)]
struct GqlComment {
    author: Option<GqlAuthor>,
    body: String,
}

#[derive(Debug, Deserialize)]
struct GqlAuthor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    title: String,
    state: String,
    user: Option<GqlAuthor>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhFile {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    previous_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

/// GitHub adapter: GraphQL for review threads (REST has no thread grouping),
/// REST for everything else.
pub struct GitHubSource {
    owner: String,
    repo: String,
    token: String,
    client: Box<dyn HttpClient>,
}

impl GitHubSource {
    pub fn new(cfg: &GithubConfig, token: &str) -> Self {
        Self {
            owner: cfg.owner.clone(),
            repo: cfg.repo.clone(),
            token: token.to_string(),
            client: Box::new(UreqClient::new()),
        }
    }

    #[cfg(test)]
    fn with_client(owner: &str, repo: &str, client: Box<dyn HttpClient>) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: "test-token".to_string(),
            client,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", self.token)),
            ("Accept", "application/vnd.github.v3+json".to_string()),
            ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ]
    }

    fn check_status(&self, resp: HttpResponse, url: &str, pr_number: Option<u64>) -> Result<String> {
        match resp.status {
            200 => Ok(resp.body),
            401 | 403 => Err(Error::Source(format!(
                "authentication failed (HTTP {}): check {}",
                resp.status,
                GITHUB.token_env_var
            ))),
            404 => Err(match pr_number {
                Some(pr) => Error::Source(format!(
                    "PR #{pr} not found in {}/{}",
                    self.owner, self.repo
                )),
                None => Error::Source(format!("{}/{} not reachable", self.owner, self.repo)),
            }),
            status => Err(Error::Source(format!(
                "unexpected HTTP {status} from {url}"
            ))),
        }
    }

    fn graphql(&self, variables: serde_json::Value) -> Result<GqlData> {
        let url = format!("{API_BASE}/graphql");
        let body = serde_json::json!({
            "query": REVIEW_THREADS_QUERY,
            "variables": variables,
        });
        let resp = self.client.post_json(&url, &self.headers(), &body)?;
        let body = self.check_status(resp, &url, None)?;

        let envelope: GqlEnvelope = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse GraphQL response: {e}")))?;
        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(Error::Source(format!(
                "GraphQL errors: {}",
                messages.join(", ")
            )));
        }
        envelope
            .data
            .ok_or_else(|| Error::Source("GraphQL response had no data".to_string()))
    }

    fn derive_status(node: &GqlThreadNode) -> &'static str {
        if node.is_resolved {
            "resolved"
        } else if node.is_outdated {
            "outdated"
        } else {
            "active"
        }
    }
}

fn normalize_status(status: &str) -> ChangeKind {
    match status {
        "added" | "copied" => ChangeKind::Added,
        "removed" => ChangeKind::Deleted,
        "renamed" => ChangeKind::Renamed,
        _ => ChangeKind::Modified,
    }
}

impl CommentSource for GitHubSource {
    fn platform(&self) -> &'static Platform {
        &GITHUB
    }

    fn fetch_pr(&self, pr_number: u64) -> Result<PrInfo> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls/{}",
            self.owner, self.repo, pr_number
        );
        let resp = self.client.get(&url, &self.headers())?;
        let body = self.check_status(resp, &url, Some(pr_number))?;
        let pull: GhPull = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse PR response: {e}")))?;

        Ok(PrInfo {
            number: pr_number,
            title: pull.title,
            author: pull
                .user
                .map_or_else(|| "ghost".to_string(), |u| u.login),
            status: pull.state,
            url: pull.html_url,
        })
    }

    fn fetch_threads(&self, pr_number: u64) -> Result<Vec<Thread>> {
        let data = self.graphql(serde_json::json!({
            "owner": self.owner,
            "repo": self.repo,
            "pr": pr_number,
        }))?;

        let repository = data.repository.ok_or_else(|| {
            Error::Source(format!("repository {}/{} not found", self.owner, self.repo))
        })?;
        let pull = repository.pull_request.ok_or_else(|| {
            Error::Source(format!(
                "PR #{pr_number} not found in {}/{}",
                self.owner, self.repo
            ))
        })?;

        let threads: Vec<Thread> = pull
            .review_threads
            .nodes
            .into_iter()
            .map(|node| {
                let status = Self::derive_status(&node).to_string();
                let first = node.comments.nodes.into_iter().next();
                let (author, text) = match first {
                    Some(c) => (
                        c.author.map_or_else(|| "ghost".to_string(), |a| a.login),
                        c.body.trim().to_string(),
                    ),
                    None => ("ghost".to_string(), String::new()),
                };
                Thread {
                    id: node.id,
                    status,
                    file_path: node.path,
                    line: node.line,
                    author,
                    text,
                }
            })
            .collect();
        debug!(pr = pr_number, count = threads.len(), "fetched review threads");
        Ok(threads)
    }

    fn fetch_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>> {
        let mut files = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{API_BASE}/repos/{}/{}/pulls/{}/files?per_page={FILES_PER_PAGE}&page={page}",
                self.owner, self.repo, pr_number
            );
            let resp = self.client.get(&url, &self.headers())?;
            let body = self.check_status(resp, &url, Some(pr_number))?;
            let batch: Vec<GhFile> = serde_json::from_str(&body)
                .map_err(|e| Error::Source(format!("failed to parse files response: {e}")))?;
            let batch_len = batch.len();

            for file in batch {
                let change_type = normalize_status(&file.status);
                files.push(ChangedFile {
                    path: file.filename,
                    change_type,
                    original_path: (change_type == ChangeKind::Renamed)
                        .then_some(file.previous_filename)
                        .flatten(),
                    additions: Some(file.additions),
                    deletions: Some(file.deletions),
                });
            }

            if batch_len < FILES_PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(pr = pr_number, count = files.len(), "fetched changed files");
        Ok(files)
    }

    fn check_connection(&self) -> Result<String> {
        let url = format!("{API_BASE}/user");
        let resp = self.client.get(&url, &self.headers())?;
        let body = self.check_status(resp, &url, None)?;
        let user: GhUser = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse user response: {e}")))?;
        Ok(format!("authenticated to GitHub as {}", user.login))
    }
}
