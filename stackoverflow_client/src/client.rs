//! Stack Exchange API client.

use crate::error::{Error, Result};
use crate::models::{Post, Question, Wrapper};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.stackexchange.com/2.3";

const SITE: &str = "stackoverflow";

/// Extracts the question id from a stackoverflow.com question URL.
pub fn question_id_from_url(url: &str) -> Option<u64> {
    let re = regex::Regex::new(r"^https://stackoverflow\.com/questions/(\d+)(?:/|$)").unwrap();
    let caps = re.captures(url.trim())?;
    caps.get(1)?.as_str().parse().ok()
}

/// Anonymous Stack Exchange API client.
pub struct StackOverflowClient {
    client: reqwest::Client,
    base_url: String,
}

impl StackOverflowClient {
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

    async fn get_items<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
            });
        }

        let wrapper: Wrapper<T> = response.json().await?;
        Ok(wrapper.items)
    }

    /// Fetches a question. Returns `None` when the id does not exist.
    pub async fn question(&self, question_id: u64) -> Result<Option<Question>> {
        let url = format!("{}/questions/{}?site={}", self.base_url, question_id, SITE);
        let items = self.get_items(&url).await?;
        Ok(items.into_iter().next())
    }

    /// Fetches the newest answer to a question, if any.
    pub async fn newest_answer(&self, question_id: u64) -> Result<Option<Post>> {
        let url = format!(
            "{}/questions/{}/answers?order=desc&sort=creation&site={}&filter=withbody&pagesize=1",
            self.base_url, question_id, SITE
        );
        let items = self.get_items(&url).await?;
        Ok(items.into_iter().next())
    }

    /// Fetches the newest comment on a question, if any.
    pub async fn newest_comment(&self, question_id: u64) -> Result<Option<Post>> {
        let url = format!(
            "{}/questions/{}/comments?order=desc&sort=creation&site={}&filter=withbody&pagesize=1",
            self.base_url, question_id, SITE
        );
        let items = self.get_items(&url).await?;
        Ok(items.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_id_from_plain_url() {
        assert_eq!(
            question_id_from_url("https://stackoverflow.com/questions/11227809"),
            Some(11227809)
        );
    }

    #[test]
    fn test_question_id_from_url_with_slug() {
        assert_eq!(
            question_id_from_url(
                "https://stackoverflow.com/questions/11227809/why-is-processing-sorted"
            ),
            Some(11227809)
        );
    }

    #[test]
    fn test_question_id_rejects_other_urls() {
        assert_eq!(question_id_from_url("https://stackoverflow.com/users/1"), None);
        assert_eq!(question_id_from_url("https://github.com/a/b"), None);
        assert_eq!(
            question_id_from_url("https://stackoverflow.com/questions/abc"),
            None
        );
    }
}
