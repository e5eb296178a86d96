use anyhow::Context;
use chrono::Local;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::entities::{chats, links, subscriptions};
use crate::db::types::Tags;
use crate::error::{AppError, AppResult};

/// A subscription of one chat, joined with its link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLink {
    pub id: i32,
    pub url: String,
    pub tags: Tags,
    pub filters: Tags,
}

/// A (chat, link) pair as seen by the update sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRow {
    pub chat_id: i64,
    pub link_id: i32,
    pub url: String,
    pub tags: Tags,
    pub filters: Tags,
}

pub struct Repo {
    db: DatabaseConnection,
}

impl Repo {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.db.ping().await.context("Database ping failed")?;
        Ok(())
    }

    // ==================== Chats ====================

    /// Register a chat. Registering twice is a no-op.
    pub async fn add_chat(&self, chat_id: i64) -> AppResult<()> {
        let now = Local::now().naive_local();

        let new_chat = chats::ActiveModel {
            id: Set(chat_id),
            created_at: Set(now),
        };

        // INSERT ... ON CONFLICT(id) DO NOTHING
        chats::Entity::insert(new_chat)
            .on_conflict(
                OnConflict::column(chats::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("Failed to register chat")?;

        Ok(())
    }

    /// Delete a chat together with its subscriptions. Links no longer
    /// referenced by any subscription are removed as well.
    ///
    /// Returns `false` when the chat was not registered.
    pub async fn delete_chat(&self, chat_id: i64) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let existing = chats::Entity::find_by_id(chat_id)
            .one(&txn)
            .await
            .context("Failed to query chat")?;
        if existing.is_none() {
            return Ok(false);
        }

        let link_ids: Vec<i32> = subscriptions::Entity::find()
            .filter(subscriptions::Column::ChatId.eq(chat_id))
            .all(&txn)
            .await
            .context("Failed to query chat subscriptions")?
            .into_iter()
            .map(|s| s.link_id)
            .collect();

        subscriptions::Entity::delete_many()
            .filter(subscriptions::Column::ChatId.eq(chat_id))
            .exec(&txn)
            .await
            .context("Failed to delete chat subscriptions")?;

        chats::Entity::delete_by_id(chat_id)
            .exec(&txn)
            .await
            .context("Failed to delete chat")?;

        delete_orphan_links(&txn, &link_ids).await?;

        txn.commit().await.context("Failed to commit transaction")?;

        Ok(true)
    }

    // ==================== Subscriptions ====================

    /// Subscribe a chat to a URL. The link row is shared across chats
    /// and created on first use. Returns the link id.
    pub async fn add_subscription(
        &self,
        chat_id: i64,
        url: &str,
        tags: Tags,
        filters: Tags,
    ) -> AppResult<i32> {
        let now = Local::now().naive_local();

        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let chat = chats::Entity::find_by_id(chat_id)
            .one(&txn)
            .await
            .context("Failed to query chat")?;
        if chat.is_none() {
            return Err(AppError::ChatNotFound(chat_id));
        }

        let existing_link = links::Entity::find()
            .filter(links::Column::Url.eq(url))
            .one(&txn)
            .await
            .context("Failed to query link")?;

        let link_id = match existing_link {
            Some(link) => {
                let already = subscriptions::Entity::find()
                    .filter(subscriptions::Column::ChatId.eq(chat_id))
                    .filter(subscriptions::Column::LinkId.eq(link.id))
                    .count(&txn)
                    .await
                    .context("Failed to check for existing subscription")?;
                if already > 0 {
                    return Err(AppError::LinkAlreadyTracked(url.to_string()));
                }
                link.id
            }
            None => {
                let new_link = links::ActiveModel {
                    id: NotSet,
                    url: Set(url.to_string()),
                    created_at: Set(now),
                };
                links::Entity::insert(new_link)
                    .exec(&txn)
                    .await
                    .context("Failed to create link")?
                    .last_insert_id
            }
        };

        let new_subscription = subscriptions::ActiveModel {
            id: NotSet,
            chat_id: Set(chat_id),
            link_id: Set(link_id),
            tags: Set(tags),
            filters: Set(filters),
            created_at: Set(now),
        };
        subscriptions::Entity::insert(new_subscription)
            .exec(&txn)
            .await
            .context("Failed to create subscription")?;

        txn.commit().await.context("Failed to commit transaction")?;

        Ok(link_id)
    }

    /// Unsubscribe a chat from a URL. The link row is removed once no
    /// chat references it.
    ///
    /// Returns the removed subscription's link id, tags and filters,
    /// or `None` when the chat was not tracking the URL.
    pub async fn remove_subscription(
        &self,
        chat_id: i64,
        url: &str,
    ) -> AppResult<Option<(i32, Tags, Tags)>> {
        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let link = links::Entity::find()
            .filter(links::Column::Url.eq(url))
            .one(&txn)
            .await
            .context("Failed to query link")?;
        let Some(link) = link else {
            return Ok(None);
        };

        let subscription = subscriptions::Entity::find()
            .filter(subscriptions::Column::ChatId.eq(chat_id))
            .filter(subscriptions::Column::LinkId.eq(link.id))
            .one(&txn)
            .await
            .context("Failed to query subscription")?;
        let Some(subscription) = subscription else {
            return Ok(None);
        };

        let removed = (link.id, subscription.tags.clone(), subscription.filters.clone());

        subscriptions::Entity::delete_by_id(subscription.id)
            .exec(&txn)
            .await
            .context("Failed to delete subscription")?;

        delete_orphan_links(&txn, &[link.id]).await?;

        txn.commit().await.context("Failed to commit transaction")?;

        Ok(Some(removed))
    }

    /// All subscriptions of one chat, oldest first.
    pub async fn list_subscriptions(&self, chat_id: i64) -> AppResult<Vec<TrackedLink>> {
        let rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::ChatId.eq(chat_id))
            .order_by_asc(subscriptions::Column::Id)
            .find_also_related(links::Entity)
            .all(&self.db)
            .await
            .context("Failed to list subscriptions")?;

        Ok(rows
            .into_iter()
            .filter_map(|(sub, link)| {
                link.map(|link| TrackedLink {
                    id: link.id,
                    url: link.url,
                    tags: sub.tags,
                    filters: sub.filters,
                })
            })
            .collect())
    }

    /// One page of all subscriptions across chats, ordered by
    /// subscription id so that repeated pages never skip rows.
    pub async fn page_subscriptions(
        &self,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<SubscriptionRow>> {
        let rows = subscriptions::Entity::find()
            .order_by_asc(subscriptions::Column::Id)
            .find_also_related(links::Entity)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .context("Failed to page subscriptions")?;

        Ok(rows
            .into_iter()
            .filter_map(|(sub, link)| {
                link.map(|link| SubscriptionRow {
                    chat_id: sub.chat_id,
                    link_id: sub.link_id,
                    url: link.url,
                    tags: sub.tags,
                    filters: sub.filters,
                })
            })
            .collect())
    }

    /// Subscriptions of one chat whose tag list shares at least one
    /// entry with `tags`.
    pub async fn list_subscriptions_by_tags(
        &self,
        chat_id: i64,
        tags: &[String],
    ) -> AppResult<Vec<SubscriptionRow>> {
        let rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::ChatId.eq(chat_id))
            .order_by_asc(subscriptions::Column::Id)
            .find_also_related(links::Entity)
            .all(&self.db)
            .await
            .context("Failed to list subscriptions by tags")?;

        Ok(rows
            .into_iter()
            .filter(|(sub, _)| sub.tags.intersects(tags))
            .filter_map(|(sub, link)| {
                link.map(|link| SubscriptionRow {
                    chat_id: sub.chat_id,
                    link_id: sub.link_id,
                    url: link.url,
                    tags: sub.tags,
                    filters: sub.filters,
                })
            })
            .collect())
    }
}

/// Removes every link in `link_ids` that no subscription references.
async fn delete_orphan_links<C: ConnectionTrait>(conn: &C, link_ids: &[i32]) -> AppResult<()> {
    for &link_id in link_ids {
        let remaining = subscriptions::Entity::find()
            .filter(subscriptions::Column::LinkId.eq(link_id))
            .count(conn)
            .await
            .context("Failed to count link subscriptions")?;
        if remaining == 0 {
            links::Entity::delete_by_id(link_id)
                .exec(conn)
                .await
                .context("Failed to delete orphan link")?;
        }
    }
    Ok(())
}
