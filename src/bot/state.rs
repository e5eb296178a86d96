//! Per-chat /track dialogue state.
//!
//! The /track flow spans several messages (link, tags, filters,
//! confirmation). State lives in memory keyed by chat id and expires
//! after a TTL so an abandoned dialogue never blocks the chat forever.
//! Expired entries are dropped lazily on access.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackState {
    WaitingForLink,
    WaitingForTags {
        url: String,
    },
    WaitingForFilters {
        url: String,
        tags: Vec<String>,
    },
    WaitingForConfirmation {
        url: String,
        tags: Vec<String>,
        filters: Vec<String>,
    },
}

#[derive(Clone)]
pub struct TrackDialogues {
    ttl: Duration,
    states: Arc<RwLock<HashMap<i64, (Instant, TrackState)>>>,
}

impl TrackDialogues {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, chat_id: i64) -> Option<TrackState> {
        {
            let states = self.states.read().await;
            match states.get(&chat_id) {
                Some((touched_at, state)) if touched_at.elapsed() < self.ttl => {
                    return Some(state.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.states.write().await.remove(&chat_id);
        None
    }

    pub async fn set(&self, chat_id: i64, state: TrackState) {
        self.states
            .write()
            .await
            .insert(chat_id, (Instant::now(), state));
    }

    pub async fn clear(&self, chat_id: i64) {
        self.states.write().await.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_state_expires_after_ttl() {
        let dialogues = TrackDialogues::new(Duration::from_secs(900));
        dialogues.set(1, TrackState::WaitingForLink).await;

        tokio::time::advance(Duration::from_secs(899)).await;
        assert_eq!(dialogues.get(1).await, Some(TrackState::WaitingForLink));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(dialogues.get(1).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_refreshes_ttl() {
        let dialogues = TrackDialogues::new(Duration::from_secs(900));
        dialogues.set(1, TrackState::WaitingForLink).await;

        tokio::time::advance(Duration::from_secs(600)).await;
        dialogues
            .set(
                1,
                TrackState::WaitingForTags {
                    url: "https://github.com/a/b".to_string(),
                },
            )
            .await;

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(dialogues.get(1).await.is_some());
    }

    #[tokio::test]
    async fn test_clear_and_isolation_between_chats() {
        let dialogues = TrackDialogues::new(Duration::from_secs(900));
        dialogues.set(1, TrackState::WaitingForLink).await;
        dialogues.set(2, TrackState::WaitingForLink).await;

        dialogues.clear(1).await;

        assert_eq!(dialogues.get(1).await, None);
        assert!(dialogues.get(2).await.is_some());
    }
}
