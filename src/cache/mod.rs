//! TTL cache for link list responses.
//!
//! GET /links is the hottest read endpoint; entries live for a short
//! TTL and are invalidated eagerly whenever a chat's subscriptions
//! change. Expired entries are dropped lazily on access.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

use crate::api::schemas::ListLinksResponse;

#[derive(Clone)]
pub struct LinksCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<i64, (Instant, ListLinksResponse)>>>,
}

impl LinksCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, chat_id: i64) -> Option<ListLinksResponse> {
        {
            let entries = self.entries.read().await;
            match entries.get(&chat_id) {
                Some((inserted_at, response)) if inserted_at.elapsed() < self.ttl => {
                    return Some(response.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Stale entry, take the write lock to drop it
        self.entries.write().await.remove(&chat_id);
        None
    }

    pub async fn insert(&self, chat_id: i64, response: ListLinksResponse) {
        self.entries
            .write()
            .await
            .insert(chat_id, (Instant::now(), response));
    }

    pub async fn invalidate(&self, chat_id: i64) {
        self.entries.write().await.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::schemas::LinkResponse;

    fn response(url: &str) -> ListLinksResponse {
        ListLinksResponse {
            links: vec![LinkResponse {
                id: 1,
                url: url.to_string(),
                tags: vec![],
                filters: vec![],
            }],
            size: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_served_until_ttl() {
        let cache = LinksCache::new(Duration::from_secs(60));
        cache.insert(1, response("https://github.com/a/b")).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(1).await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(1).await.is_none());
        // And it stays gone
        assert!(cache.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let cache = LinksCache::new(Duration::from_secs(60));
        cache.insert(1, response("https://github.com/a/b")).await;
        cache.insert(2, response("https://github.com/c/d")).await;

        cache.invalidate(1).await;

        assert!(cache.get(1).await.is_none());
        assert_eq!(cache.get(2).await.unwrap().size, 1);
    }

    #[tokio::test]
    async fn test_miss_on_unknown_chat() {
        let cache = LinksCache::new(Duration::from_secs(60));
        assert!(cache.get(42).await.is_none());
    }
}
