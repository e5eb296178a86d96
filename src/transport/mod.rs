//! How detected updates reach subscribers.
//!
//! `Direct` hands them straight to the notifier; `Queue` publishes them
//! to the internal queue for a separately running consumer. The choice
//! is made once at startup from configuration.

pub mod queue;

use crate::api::schemas::{LinkUpdate, ListLinksUpdate};
use crate::error::AppResult;
use crate::notifier::Notifier;

pub enum UpdateTransport {
    Direct(Notifier),
    Queue(queue::QueuePublisher),
}

impl UpdateTransport {
    pub async fn deliver(&self, updates: Vec<LinkUpdate>) -> AppResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        match self {
            UpdateTransport::Direct(notifier) => {
                notifier.send_updates(&updates).await;
                Ok(())
            }
            UpdateTransport::Queue(publisher) => {
                publisher.publish(&ListLinksUpdate { links: updates }).await
            }
        }
    }
}
