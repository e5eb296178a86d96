//! Resolves a tracked URL into its most recent activity.
//!
//! Two providers are supported: GitHub (repository, issue and pull
//! request URLs) and StackOverflow (question URLs). Activity that falls
//! outside the current update window is discarded, so a sweep only ever
//! reports what happened since the previous sweep anchor.

pub mod window;

use async_trait::async_trait;
use chrono::offset::{Offset, Utc};
use chrono::{DateTime, FixedOffset};
use github_client::{GithubClient, GithubTarget};
use stackoverflow_client::{question_id_from_url, StackOverflowClient};
use tracing::{debug, warn};

use crate::error::AppResult;

const PREVIEW_LEN: usize = 200;

/// All timestamps are rendered in this offset (UTC+3).
pub fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap_or_else(|| Utc.fix())
}

/// The newest visible event on a tracked resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestActivity {
    pub title: String,
    pub user_name: String,
    pub created_at: DateTime<FixedOffset>,
    pub preview: String,
}

/// Seam between the update sweep and the provider clients.
#[async_trait]
pub trait ActivityResolver: Send + Sync {
    /// Returns the newest activity on `url` inside the current update
    /// window, or `None` when there is nothing new (or the URL is not
    /// resolvable).
    async fn resolve(&self, url: &str) -> Option<LatestActivity>;
}

pub struct LinkResolver {
    github: GithubClient,
    stackoverflow: StackOverflowClient,
}

impl LinkResolver {
    pub fn new(request_timeout_sec: u64) -> AppResult<Self> {
        let github = GithubClient::new(request_timeout_sec)
            .map_err(|e| anyhow::anyhow!("Failed to build GitHub client: {}", e))?;
        let stackoverflow = StackOverflowClient::new(request_timeout_sec)
            .map_err(|e| anyhow::anyhow!("Failed to build StackOverflow client: {}", e))?;
        Ok(Self {
            github,
            stackoverflow,
        })
    }

    async fn resolve_at(&self, url: &str, now: DateTime<FixedOffset>) -> Option<LatestActivity> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_string();

        let activity = match host.as_str() {
            "github.com" => self.resolve_github(url).await,
            "stackoverflow.com" => self.resolve_stackoverflow(url).await,
            _ => {
                debug!("Unsupported host for {}", url);
                None
            }
        }?;

        if activity.created_at > window::window_start(now) {
            Some(activity)
        } else {
            None
        }
    }

    async fn resolve_github(&self, url: &str) -> Option<LatestActivity> {
        let target = GithubTarget::parse(url)?;

        match target.item {
            Some((kind, number)) => {
                let item = self
                    .github
                    .issue(&target.owner, &target.repo, kind, number)
                    .await
                    .map_err(|e| warn!("GitHub request failed for {}: {}", url, e))
                    .ok()?;

                let comment = self
                    .github
                    .newest_comment(&target.owner, &target.repo, number)
                    .await
                    .map_err(|e| warn!("GitHub comments request failed for {}: {}", url, e))
                    .ok()?;

                // The item title names the thread; author, date and
                // preview come from the newest comment when one exists
                match comment {
                    Some(comment) => Some(LatestActivity {
                        title: item.title,
                        user_name: comment.user.login,
                        created_at: parse_github_date(&comment.created_at)?,
                        preview: truncate_preview(comment.body.as_deref().unwrap_or("")),
                    }),
                    None => Some(LatestActivity {
                        title: item.title,
                        user_name: item.user.login,
                        created_at: parse_github_date(&item.created_at)?,
                        preview: truncate_preview(item.body.as_deref().unwrap_or("")),
                    }),
                }
            }
            None => {
                let item = self
                    .github
                    .newest_repo_issue(&target.owner, &target.repo)
                    .await
                    .map_err(|e| warn!("GitHub request failed for {}: {}", url, e))
                    .ok()??;

                Some(LatestActivity {
                    title: item.title,
                    user_name: item.user.login,
                    created_at: parse_github_date(&item.created_at)?,
                    preview: truncate_preview(item.body.as_deref().unwrap_or("")),
                })
            }
        }
    }

    async fn resolve_stackoverflow(&self, url: &str) -> Option<LatestActivity> {
        let question_id = question_id_from_url(url)?;

        let question = self
            .stackoverflow
            .question(question_id)
            .await
            .map_err(|e| warn!("StackOverflow request failed for {}: {}", url, e))
            .ok()??;

        let answer = self
            .stackoverflow
            .newest_answer(question_id)
            .await
            .map_err(|e| warn!("StackOverflow answers request failed for {}: {}", url, e))
            .ok()?;
        let comment = self
            .stackoverflow
            .newest_comment(question_id)
            .await
            .map_err(|e| warn!("StackOverflow comments request failed for {}: {}", url, e))
            .ok()?;

        // Newest of the two wins, an answer on equal timestamps
        let post = match (answer, comment) {
            (Some(a), Some(c)) if c.creation_date > a.creation_date => c,
            (Some(a), _) => a,
            (None, Some(c)) => c,
            (None, None) => return None,
        };

        let created_at = DateTime::from_timestamp(post.creation_date, 0)?
            .with_timezone(&display_offset());

        Some(LatestActivity {
            title: question.title,
            user_name: post
                .owner
                .and_then(|o| o.display_name)
                .unwrap_or_else(|| "unknown".to_string()),
            created_at,
            preview: truncate_preview(post.body.as_deref().unwrap_or("")),
        })
    }
}

#[async_trait]
impl ActivityResolver for LinkResolver {
    async fn resolve(&self, url: &str) -> Option<LatestActivity> {
        let now = Utc::now().with_timezone(&display_offset());
        self.resolve_at(url, now).await
    }
}

fn parse_github_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| warn!("Unparseable GitHub timestamp {:?}: {}", raw, e))
        .ok()
        .map(|dt| dt.with_timezone(&display_offset()))
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_LEN {
        text.to_string()
    } else {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{}...", cut)
    }
}
