//! In-process update queue with a dead letter side channel.
//!
//! Batches travel as JSON strings so the consumer exercises the same
//! parse path a broker-backed deployment would. A message the consumer
//! cannot parse goes to the dead letter queue with the raw payload
//! preserved, and consumption continues.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::schemas::ListLinksUpdate;
use crate::error::AppResult;
use crate::notifier::Notifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub error: String,
    pub original_message: String,
}

pub struct QueuePublisher {
    tx: mpsc::Sender<String>,
}

pub struct QueueConsumer {
    rx: mpsc::Receiver<String>,
    dlq: mpsc::Sender<DeadLetter>,
}

/// Builds the queue. The third element receives dead letters.
pub fn channel(capacity: usize) -> (QueuePublisher, QueueConsumer, mpsc::Receiver<DeadLetter>) {
    let (tx, rx) = mpsc::channel(capacity);
    let (dlq_tx, dlq_rx) = mpsc::channel(capacity);
    (
        QueuePublisher { tx },
        QueueConsumer { rx, dlq: dlq_tx },
        dlq_rx,
    )
}

impl QueuePublisher {
    pub async fn publish(&self, updates: &ListLinksUpdate) -> AppResult<()> {
        let payload = serde_json::to_string(updates)?;
        self.tx
            .send(payload)
            .await
            .map_err(|e| anyhow::anyhow!("Update queue closed: {}", e))?;
        Ok(())
    }
}

impl QueueConsumer {
    /// Drains the queue until every publisher is dropped.
    pub async fn run(mut self, notifier: Notifier) {
        while let Some(raw) = self.rx.recv().await {
            match serde_json::from_str::<ListLinksUpdate>(&raw) {
                Ok(batch) => {
                    debug!("Consuming batch of {} updates", batch.links.len());
                    notifier.send_updates(&batch.links).await;
                }
                Err(e) => {
                    warn!("Unparseable update batch, sending to dead letter queue: {}", e);
                    let letter = DeadLetter {
                        error: e.to_string(),
                        original_message: raw,
                    };
                    if self.dlq.send(letter).await.is_err() {
                        warn!("Dead letter queue closed, dropping message");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::schemas::LinkUpdate;
    use crate::notifier::MessageSender;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingSender {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send(&self, chat_id: i64, text: &str) -> crate::error::AppResult<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_valid_batch_is_delivered() {
        let (publisher, consumer, _dlq) = channel(8);
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::new(sender.clone());

        publisher
            .publish(&ListLinksUpdate {
                links: vec![LinkUpdate {
                    id: 1,
                    url: "https://github.com/a/b".to_string(),
                    description: "d".to_string(),
                    tg_chat_id: 777,
                }],
            })
            .await
            .unwrap();
        drop(publisher);

        consumer.run(notifier).await;

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 777);
    }

    #[tokio::test]
    async fn test_poison_message_goes_to_dead_letter_queue() {
        let (publisher, consumer, mut dlq) = channel(8);
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::new(sender.clone());

        // Bypass the typed publisher to inject garbage
        publisher.tx.send("not json at all".to_string()).await.unwrap();
        publisher
            .publish(&ListLinksUpdate {
                links: vec![LinkUpdate {
                    id: 1,
                    url: "https://github.com/a/b".to_string(),
                    description: "d".to_string(),
                    tg_chat_id: 777,
                }],
            })
            .await
            .unwrap();
        drop(publisher);

        consumer.run(notifier).await;

        // The poison message is quarantined with its payload intact
        let letter = dlq.recv().await.unwrap();
        assert_eq!(letter.original_message, "not json at all");
        assert!(!letter.error.is_empty());

        // And the batch behind it was still delivered
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }
}
