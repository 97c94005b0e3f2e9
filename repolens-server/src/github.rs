//! GitHub content API client.
//!
//! Read-only: directory listings, language statistics, and raw file
//! content. Calls carry a short fixed timeout and are never retried;
//! 404 and 403 are distinguished so callers can show specific messages.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine;
use serde::Deserialize;

/// Budget for one auxiliary lookup.
const API_TIMEOUT: Duration = Duration::from_secs(5);

/// GitHub rejects requests without a User-Agent.
const USER_AGENT: &str = "repolens";

/// Cap on recursive directory rendering, matching the non-goal of full
/// pagination support.
const MAX_TREE_DEPTH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("repository or path not found")]
    NotFound,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("GitHub API returned {status}")]
    Http { status: u16 },
    #[error("GitHub request timed out")]
    Timeout,
    #[error("error connecting to GitHub: {0}")]
    Network(String),
    #[error("unexpected GitHub response: {0}")]
    Decode(String),
}

/// One entry of a contents listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    /// `"file"` or `"dir"`.
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl ContentEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == "dir"
    }
}

/// Contents endpoint response for a single file.
#[derive(Debug, Deserialize)]
struct FileContent {
    content: String,
    encoding: String,
}

pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: "https://api.github.com".to_string(),
        }
    }

    /// Override the API origin (tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, url: String) -> Result<reqwest::Response, GitHubError> {
        let mut req = self
            .http
            .get(&url)
            .timeout(API_TIMEOUT)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {token}"));
        }
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                GitHubError::Timeout
            } else {
                GitHubError::Network(e.to_string())
            }
        })?;

        match resp.status().as_u16() {
            200..=299 => Ok(resp),
            404 => Err(GitHubError::NotFound),
            403 => Err(GitHubError::RateLimited),
            status => Err(GitHubError::Http { status }),
        }
    }

    /// List the contents of a repository path (empty path for the root).
    pub async fn list_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentEntry>, GitHubError> {
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.base_url);
        let resp = self.get(url).await?;
        resp.json::<Vec<ContentEntry>>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// Language byte counts for a repository.
    pub async fn languages(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<BTreeMap<String, u64>, GitHubError> {
        let url = format!("{}/repos/{owner}/{repo}/languages", self.base_url);
        let resp = self.get(url).await?;
        resp.json::<BTreeMap<String, u64>>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// Raw content of one file, decoded from the contents endpoint.
    pub async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<String, GitHubError> {
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.base_url);
        let resp = self.get(url).await?;
        let file: FileContent = resp
            .json()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))?;
        if file.encoding != "base64" {
            return Err(GitHubError::Decode(format!(
                "unsupported content encoding: {}",
                file.encoding
            )));
        }
        // GitHub inserts newlines into the base64 payload.
        let compact: String = file.content.split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| GitHubError::Decode(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// Render the repository tree as an indented text listing.
    ///
    /// Subdirectory listing failures are reported inline and do not abort
    /// the rendering.
    pub async fn directory_structure(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<String, GitHubError> {
        let contents = self.list_contents(owner, repo, "").await?;
        let mut lines = Vec::new();
        self.render_level(owner, repo, contents, String::new(), 0, &mut lines)
            .await;
        Ok(lines.join("\n"))
    }

    fn render_level<'a>(
        &'a self,
        owner: &'a str,
        repo: &'a str,
        contents: Vec<ContentEntry>,
        prefix: String,
        depth: usize,
        lines: &'a mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for item in contents {
                if item.is_dir() {
                    lines.push(format!("{prefix}📁 {}/", item.name));
                    if depth + 1 >= MAX_TREE_DEPTH {
                        continue;
                    }
                    match self.list_contents(owner, repo, &item.path).await {
                        Ok(sub) => {
                            let sub_prefix = format!("{prefix}  ");
                            self.render_level(owner, repo, sub, sub_prefix, depth + 1, &mut *lines)
                                .await;
                        }
                        Err(e) => {
                            lines.push(format!("{prefix}  (Error accessing directory: {e})"));
                        }
                    }
                } else {
                    lines.push(format!("{prefix}📄 {}", item.name));
                }
            }
        })
    }
}
