//! Delivers detected updates to Telegram chats.
//!
//! Updates are grouped so every chat receives a single message per
//! sweep, however many of its links changed. One failing chat never
//! blocks delivery to the others.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::api::schemas::LinkUpdate;
use crate::error::AppResult;

/// Seam between update delivery and the Telegram API.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()>;
}

pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

/// Collapses updates into one message body per chat.
pub fn group_messages(updates: &[LinkUpdate]) -> HashMap<i64, String> {
    let mut grouped: HashMap<i64, String> = HashMap::new();
    for update in updates {
        let entry = grouped.entry(update.tg_chat_id).or_default();
        entry.push_str(&format!(
            "⚡ Есть обновления по ссылке {}:\n{}\n\n",
            update.url, update.description
        ));
    }
    grouped
}

#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn MessageSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }

    pub async fn send_updates(&self, updates: &[LinkUpdate]) {
        if updates.is_empty() {
            return;
        }

        let grouped = group_messages(updates);
        info!("Delivering updates to {} chats", grouped.len());

        for (chat_id, text) in grouped {
            if let Err(e) = self.sender.send(chat_id, &text).await {
                warn!("Failed to deliver updates to chat {}: {}", chat_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct RecordingSender {
        pub sent: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingSender {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn update(chat_id: i64, url: &str) -> LinkUpdate {
        LinkUpdate {
            id: 1,
            url: url.to_string(),
            description: format!("changes on {}", url),
            tg_chat_id: chat_id,
        }
    }

    #[test]
    fn test_group_messages_one_body_per_chat() {
        let updates = vec![
            update(777, "https://github.com/a/b"),
            update(777, "https://github.com/c/d"),
            update(888, "https://github.com/a/b"),
        ];

        let grouped = group_messages(&updates);
        assert_eq!(grouped.len(), 2);

        let body = &grouped[&777];
        assert!(body.contains("⚡ Есть обновления по ссылке https://github.com/a/b:\n"));
        assert!(body.contains("⚡ Есть обновления по ссылке https://github.com/c/d:\n"));
        assert!(body.contains("changes on https://github.com/a/b"));
        assert!(!grouped[&888].contains("c/d"));
    }

    #[tokio::test]
    async fn test_send_updates_one_message_per_chat() {
        let sender = RecordingSender::new();
        let notifier = Notifier::new(sender.clone());

        notifier
            .send_updates(&[
                update(777, "https://github.com/a/b"),
                update(777, "https://github.com/c/d"),
                update(888, "https://github.com/a/b"),
            ])
            .await;

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn test_send_updates_skips_empty_batch() {
        let sender = RecordingSender::new();
        let notifier = Notifier::new(sender.clone());

        notifier.send_updates(&[]).await;

        assert!(sender.sent.lock().unwrap().is_empty());
    }
}
