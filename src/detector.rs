//! Sweeps tracked subscriptions and collects fresh updates.
//!
//! Subscriptions are read in fixed-size pages so a large installation
//! never loads its whole table at once; inside a page the provider
//! lookups run concurrently with a bounded fan-out.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::api::schemas::LinkUpdate;
use crate::db::repo::{Repo, SubscriptionRow};
use crate::error::AppResult;
use crate::formatter::make_description;
use crate::resolver::ActivityResolver;

pub const BATCH_SIZE: u64 = 500;
const RESOLVE_CONCURRENCY: usize = 64;

pub struct UpdateDetector {
    repo: Arc<Repo>,
    resolver: Arc<dyn ActivityResolver>,
}

impl UpdateDetector {
    pub fn new(repo: Arc<Repo>, resolver: Arc<dyn ActivityResolver>) -> Self {
        Self { repo, resolver }
    }

    /// Checks every subscription of every chat. Author filters apply.
    pub async fn detect_all(&self) -> AppResult<Vec<LinkUpdate>> {
        let mut updates = Vec::new();
        let mut offset = 0;

        loop {
            let batch = self.repo.page_subscriptions(offset, BATCH_SIZE).await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len() as u64;

            let found: Vec<LinkUpdate> = stream::iter(batch)
                .map(|row| self.check_row(row, true))
                .buffer_unordered(RESOLVE_CONCURRENCY)
                .filter_map(|update| async move { update })
                .collect()
                .await;
            updates.extend(found);

            if batch_len < BATCH_SIZE {
                break;
            }
            offset += BATCH_SIZE;
        }

        Ok(updates)
    }

    /// Checks the subscriptions of one chat that carry at least one of
    /// `tags`. Author filters are ignored here: an explicit tag query
    /// asks for everything on those links.
    pub async fn detect_by_tags(
        &self,
        chat_id: i64,
        tags: &[String],
    ) -> AppResult<Vec<LinkUpdate>> {
        let rows = self.repo.list_subscriptions_by_tags(chat_id, tags).await?;

        let updates = stream::iter(rows)
            .map(|row| self.check_row(row, false))
            .buffer_unordered(RESOLVE_CONCURRENCY)
            .filter_map(|update| async move { update })
            .collect()
            .await;

        Ok(updates)
    }

    async fn check_row(&self, row: SubscriptionRow, apply_filters: bool) -> Option<LinkUpdate> {
        let activity = self.resolver.resolve(&row.url).await?;

        // An empty filter list means every author is of interest
        if apply_filters && !row.filters.is_empty() && !row.filters.contains(&activity.user_name) {
            return None;
        }

        Some(LinkUpdate {
            id: row.link_id,
            url: row.url,
            description: make_description(&activity),
            tg_chat_id: row.chat_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::Tags;
    use crate::resolver::LatestActivity;
    use anyhow::Context;
    use async_trait::async_trait;
    use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
    use std::collections::HashMap;

    struct StubResolver {
        by_url: HashMap<String, LatestActivity>,
    }

    #[async_trait]
    impl ActivityResolver for StubResolver {
        async fn resolve(&self, url: &str) -> Option<LatestActivity> {
            self.by_url.get(url).cloned()
        }
    }

    fn activity(user: &str) -> LatestActivity {
        LatestActivity {
            title: "Topic".to_string(),
            user_name: user.to_string(),
            created_at: "2026-03-05T12:00:00+03:00".parse().unwrap(),
            preview: "body".to_string(),
        }
    }

    async fn setup_repo() -> AppResult<Arc<Repo>> {
        let db = Database::connect("sqlite::memory:")
            .await
            .context("connect")?;

        for ddl in [
            r#"
            CREATE TABLE chats (
                id INTEGER PRIMARY KEY NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE links (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                chat_id INTEGER NOT NULL,
                link_id INTEGER NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                filters TEXT NOT NULL DEFAULT '[]',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(chat_id, link_id)
            )
            "#,
        ] {
            db.execute(Statement::from_string(DbBackend::Sqlite, ddl))
                .await
                .context("create table")?;
        }

        Ok(Arc::new(Repo::new(db)))
    }

    #[tokio::test]
    async fn test_detect_all_reports_fresh_activity_per_chat() {
        let repo = setup_repo().await.unwrap();
        repo.add_chat(1).await.unwrap();
        repo.add_chat(2).await.unwrap();
        repo.add_subscription(1, "https://github.com/a/b", Tags::default(), Tags::default())
            .await
            .unwrap();
        repo.add_subscription(2, "https://github.com/a/b", Tags::default(), Tags::default())
            .await
            .unwrap();
        repo.add_subscription(2, "https://github.com/c/d", Tags::default(), Tags::default())
            .await
            .unwrap();

        let resolver = StubResolver {
            by_url: HashMap::from([("https://github.com/a/b".to_string(), activity("alice"))]),
        };
        let detector = UpdateDetector::new(repo, Arc::new(resolver));

        let mut updates = detector.detect_all().await.unwrap();
        updates.sort_by_key(|u| u.tg_chat_id);

        // Both subscribers of a/b get the update, the quiet link yields nothing
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].tg_chat_id, 1);
        assert_eq!(updates[1].tg_chat_id, 2);
        assert!(updates.iter().all(|u| u.url == "https://github.com/a/b"));
        assert!(updates[0].description.contains("Пользователь: alice"));
    }

    #[tokio::test]
    async fn test_detect_all_honors_author_filters() {
        let repo = setup_repo().await.unwrap();
        repo.add_chat(1).await.unwrap();
        repo.add_subscription(
            1,
            "https://github.com/a/b",
            Tags::default(),
            Tags(vec!["alice".to_string()]),
        )
        .await
        .unwrap();
        repo.add_subscription(
            1,
            "https://github.com/c/d",
            Tags::default(),
            Tags(vec!["alice".to_string()]),
        )
        .await
        .unwrap();

        let resolver = StubResolver {
            by_url: HashMap::from([
                ("https://github.com/a/b".to_string(), activity("alice")),
                ("https://github.com/c/d".to_string(), activity("bob")),
            ]),
        };
        let detector = UpdateDetector::new(repo, Arc::new(resolver));

        let updates = detector.detect_all().await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].url, "https://github.com/a/b");
    }

    #[tokio::test]
    async fn test_detect_by_tags_selects_links_and_ignores_filters() {
        let repo = setup_repo().await.unwrap();
        repo.add_chat(1).await.unwrap();
        repo.add_subscription(
            1,
            "https://github.com/a/b",
            Tags(vec!["work".to_string()]),
            Tags(vec!["alice".to_string()]),
        )
        .await
        .unwrap();
        repo.add_subscription(
            1,
            "https://github.com/c/d",
            Tags(vec!["hobby".to_string()]),
            Tags::default(),
        )
        .await
        .unwrap();

        let resolver = StubResolver {
            by_url: HashMap::from([
                ("https://github.com/a/b".to_string(), activity("bob")),
                ("https://github.com/c/d".to_string(), activity("bob")),
            ]),
        };
        let detector = UpdateDetector::new(repo, Arc::new(resolver));

        // bob is not in the author filter, the tag query reports him anyway
        let updates = detector
            .detect_by_tags(1, &["work".to_string()])
            .await
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].url, "https://github.com/a/b");
    }
}
