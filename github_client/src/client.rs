//! GitHub REST API client.

use crate::error::{Error, Result};
use crate::models::{IssueComment, IssueItem};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const USER_AGENT_VALUE: &str = "linktrackerd";

/// Whether a tracked item is an issue or a pull request.
///
/// The REST API serves them from different collections even though
/// the web URLs only differ in one path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Issue,
    Pull,
}

impl ItemKind {
    pub fn api_segment(&self) -> &'static str {
        match self {
            ItemKind::Issue => "issues",
            ItemKind::Pull => "pulls",
        }
    }
}

/// A parsed github.com URL: either a whole repository or a single
/// issue/pull request inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubTarget {
    pub owner: String,
    pub repo: String,
    pub item: Option<(ItemKind, u64)>,
}

impl GithubTarget {
    /// Parses a github.com web URL. Returns `None` for anything that is
    /// not a repository or issue/pull URL.
    pub fn parse(url: &str) -> Option<Self> {
        let re = regex::Regex::new(
            r"^https://github\.com/([^/\s]+)/([^/\s]+?)(?:/(issues|pull)/(\d+))?/?$",
        )
        .unwrap();
        let caps = re.captures(url.trim())?;

        let owner = caps.get(1)?.as_str().to_string();
        let repo = caps.get(2)?.as_str().to_string();

        let item = match (caps.get(3), caps.get(4)) {
            (Some(kind), Some(number)) => {
                let kind = match kind.as_str() {
                    "pull" => ItemKind::Pull,
                    _ => ItemKind::Issue,
                };
                Some((kind, number.as_str().parse().ok()?))
            }
            _ => None,
        };

        Some(Self { owner, repo, item })
    }
}

/// Unauthenticated GitHub API client.
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different API host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(self.build_headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Fetches a single issue or pull request.
    pub async fn issue(
        &self,
        owner: &str,
        repo: &str,
        kind: ItemKind,
        number: u64,
    ) -> Result<IssueItem> {
        let url = format!(
            "{}/repos/{}/{}/{}/{}",
            self.base_url,
            owner,
            repo,
            kind.api_segment(),
            number
        );
        self.get_json(&url).await
    }

    /// Fetches the newest comment on an issue or pull request, if any.
    ///
    /// Comments on both issues and pull requests live in the issue
    /// comment collection.
    pub async fn newest_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Option<IssueComment>> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments?sort=created&direction=desc&per_page=1",
            self.base_url, owner, repo, number
        );
        let comments: Vec<IssueComment> = self.get_json(&url).await?;
        Ok(comments.into_iter().next())
    }

    /// Fetches the newest issue or pull request of a repository, if any.
    pub async fn newest_repo_issue(&self, owner: &str, repo: &str) -> Result<Option<IssueItem>> {
        let url = format!(
            "{}/repos/{}/{}/issues?state=all&sort=created&direction=desc&per_page=1",
            self.base_url, owner, repo
        );
        let items: Vec<IssueItem> = self.get_json(&url).await?;
        Ok(items.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_url() {
        let target = GithubTarget::parse("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(target.owner, "rust-lang");
        assert_eq!(target.repo, "rust");
        assert!(target.item.is_none());
    }

    #[test]
    fn test_parse_repo_url_trailing_slash() {
        let target = GithubTarget::parse("https://github.com/rust-lang/rust/").unwrap();
        assert_eq!(target.repo, "rust");
        assert!(target.item.is_none());
    }

    #[test]
    fn test_parse_issue_url() {
        let target = GithubTarget::parse("https://github.com/tokio-rs/tokio/issues/123").unwrap();
        assert_eq!(target.owner, "tokio-rs");
        assert_eq!(target.repo, "tokio");
        assert_eq!(target.item, Some((ItemKind::Issue, 123)));
    }

    #[test]
    fn test_parse_pull_url() {
        let target = GithubTarget::parse("https://github.com/tokio-rs/tokio/pull/45").unwrap();
        assert_eq!(target.item, Some((ItemKind::Pull, 45)));
    }

    #[test]
    fn test_parse_rejects_other_paths() {
        assert!(GithubTarget::parse("https://github.com/tokio-rs/tokio/wiki").is_none());
        assert!(GithubTarget::parse("https://github.com/tokio-rs").is_none());
        assert!(GithubTarget::parse("https://gitlab.com/a/b").is_none());
        assert!(GithubTarget::parse("not a url").is_none());
    }

    #[test]
    fn test_pull_maps_to_pulls_segment() {
        assert_eq!(ItemKind::Pull.api_segment(), "pulls");
        assert_eq!(ItemKind::Issue.api_segment(), "issues");
    }
}
