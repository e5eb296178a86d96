use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::bot::commands::Command;
use crate::bot::state::{TrackDialogues, TrackState};
use crate::cache::LinksCache;
use crate::db::repo::{Repo, TrackedLink};
use crate::db::types::Tags;
use crate::detector::UpdateDetector;
use crate::error::{AppError, AppResult};
use crate::notifier::group_messages;
use crate::scheduler::{NotificationMode, NotificationScheduler};

pub const CALLBACK_NOTIF_IMMEDIATE: &str = "notif_immediate";
pub const CALLBACK_NOTIF_DIGEST: &str = "notif_digest";

#[derive(Clone)]
pub struct BotHandler {
    repo: Arc<Repo>,
    detector: Arc<UpdateDetector>,
    cache: LinksCache,
    dialogues: TrackDialogues,
    scheduler: Arc<NotificationScheduler>,
}

impl BotHandler {
    pub fn new(
        repo: Arc<Repo>,
        detector: Arc<UpdateDetector>,
        cache: LinksCache,
        dialogues: TrackDialogues,
        scheduler: Arc<NotificationScheduler>,
    ) -> Self {
        Self {
            repo,
            detector,
            cache,
            dialogues,
            scheduler,
        }
    }

    pub async fn handle_command(&self, bot: Bot, msg: Message, cmd: Command) -> AppResult<()> {
        let chat_id = msg.chat.id.0;

        match cmd {
            Command::Start => {
                self.repo.add_chat(chat_id).await?;
                info!("Chat {} registered via /start", chat_id);
                bot.send_message(
                    msg.chat.id,
                    "Чат зарегистрирован. Используйте /track, чтобы добавить ссылку.",
                )
                .await?;
            }
            Command::Help => {
                bot.send_message(msg.chat.id, Command::descriptions().to_string())
                    .await?;
            }
            Command::Track => {
                self.dialogues.set(chat_id, TrackState::WaitingForLink).await;
                bot.send_message(
                    msg.chat.id,
                    "Отправьте ссылку на GitHub или StackOverflow:",
                )
                .await?;
            }
            Command::Untrack(arg) => {
                let url = arg.trim();
                if url.is_empty() {
                    bot.send_message(msg.chat.id, "Использование: /untrack <ссылка>")
                        .await?;
                    return Ok(());
                }

                match self.repo.remove_subscription(chat_id, url).await? {
                    Some(_) => {
                        self.cache.invalidate(chat_id).await;
                        bot.send_message(msg.chat.id, "Ссылка больше не отслеживается.")
                            .await?;
                    }
                    None => {
                        bot.send_message(msg.chat.id, "Эта ссылка не отслеживается.")
                            .await?;
                    }
                }
            }
            Command::List => {
                let tracked = self.repo.list_subscriptions(chat_id).await?;
                bot.send_message(msg.chat.id, format_subscriptions(&tracked))
                    .await?;
            }
            Command::Updates(arg) => {
                let tags = parse_list(&arg);
                if tags.is_empty() {
                    bot.send_message(msg.chat.id, "Использование: /updates <тег1,тег2,...>")
                        .await?;
                    return Ok(());
                }

                let updates = self.detector.detect_by_tags(chat_id, &tags).await?;
                let text = group_messages(&updates)
                    .remove(&chat_id)
                    .unwrap_or_else(|| "Обновлений нет.".to_string());
                bot.send_message(msg.chat.id, text).await?;
            }
            Command::Notifications => {
                let keyboard = InlineKeyboardMarkup::new([[
                    InlineKeyboardButton::callback("Сразу", CALLBACK_NOTIF_IMMEDIATE),
                    InlineKeyboardButton::callback("Раз в день", CALLBACK_NOTIF_DIGEST),
                ]]);
                bot.send_message(msg.chat.id, "Как присылать уведомления?")
                    .reply_markup(keyboard)
                    .await?;
            }
        }

        Ok(())
    }

    pub async fn handle_message(&self, bot: Bot, msg: Message, text: &str) -> AppResult<()> {
        let chat_id = msg.chat.id.0;

        let Some(state) = self.dialogues.get(chat_id).await else {
            return Ok(());
        };

        match state {
            TrackState::WaitingForLink => {
                let url = text.trim().to_string();
                if !supported_link(&url) {
                    bot.send_message(
                        msg.chat.id,
                        "Эта ссылка не поддерживается. Отправьте ссылку на GitHub или StackOverflow:",
                    )
                    .await?;
                    return Ok(());
                }

                self.dialogues
                    .set(chat_id, TrackState::WaitingForTags { url })
                    .await;
                bot.send_message(
                    msg.chat.id,
                    "Введите теги через пробел (или «-», если теги не нужны):",
                )
                .await?;
            }
            TrackState::WaitingForTags { url } => {
                let tags = parse_list(text);
                self.dialogues
                    .set(chat_id, TrackState::WaitingForFilters { url, tags })
                    .await;
                bot.send_message(
                    msg.chat.id,
                    "Введите имена пользователей для фильтра (или «-», чтобы получать всё):",
                )
                .await?;
            }
            TrackState::WaitingForFilters { url, tags } => {
                let filters = parse_list(text);
                let summary = format_confirmation(&url, &tags, &filters);
                self.dialogues
                    .set(
                        chat_id,
                        TrackState::WaitingForConfirmation { url, tags, filters },
                    )
                    .await;
                bot.send_message(msg.chat.id, summary).await?;
            }
            TrackState::WaitingForConfirmation { url, tags, filters } => {
                if is_affirmative(text) {
                    self.dialogues.clear(chat_id).await;
                    match self
                        .repo
                        .add_subscription(chat_id, &url, Tags(tags), Tags(filters))
                        .await
                    {
                        Ok(_) => {
                            self.cache.invalidate(chat_id).await;
                            info!("Chat {} now tracks {}", chat_id, url);
                            bot.send_message(msg.chat.id, "Ссылка добавлена ✅").await?;
                        }
                        Err(AppError::LinkAlreadyTracked(_)) => {
                            bot.send_message(msg.chat.id, "Эта ссылка уже отслеживается.")
                                .await?;
                        }
                        Err(AppError::ChatNotFound(_)) => {
                            bot.send_message(
                                msg.chat.id,
                                "Сначала зарегистрируйте чат командой /start.",
                            )
                            .await?;
                        }
                        Err(e) => return Err(e),
                    }
                } else if is_negative(text) {
                    self.dialogues.clear(chat_id).await;
                    bot.send_message(msg.chat.id, "Отменено.").await?;
                } else {
                    bot.send_message(msg.chat.id, "Ответьте «да» или «нет».")
                        .await?;
                }
            }
        }

        Ok(())
    }

    pub async fn handle_callback(&self, bot: Bot, query: CallbackQuery) -> AppResult<()> {
        let Some(data) = query.data.as_deref() else {
            return Ok(());
        };

        let confirmation = match data {
            CALLBACK_NOTIF_IMMEDIATE => {
                self.scheduler.set_mode(NotificationMode::Immediate).await;
                "Уведомления будут приходить сразу."
            }
            CALLBACK_NOTIF_DIGEST => {
                self.scheduler.set_mode(NotificationMode::Digest).await;
                "Уведомления будут приходить раз в день."
            }
            other => {
                warn!("Unknown callback data: {}", other);
                return Ok(());
            }
        };

        bot.answer_callback_query(query.id).await?;
        if let Some(message) = query.message {
            bot.send_message(message.chat().id, confirmation).await?;
        }

        Ok(())
    }
}

fn supported_link(url: &str) -> bool {
    github_client::GithubTarget::parse(url).is_some()
        || stackoverflow_client::question_id_from_url(url).is_some()
}

/// Splits user input on commas and spaces. A lone "-" means "nothing".
fn parse_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed == "-" {
        return Vec::new();
    }
    trimmed
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_affirmative(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "да" | "подтвердить" | "yes")
}

fn is_negative(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "нет" | "отмена" | "no")
}

fn format_subscriptions(links: &[TrackedLink]) -> String {
    if links.is_empty() {
        return "Нет отслеживаемых ссылок.".to_string();
    }

    let mut out = String::from("Отслеживаемые ссылки:\n");
    for link in links {
        out.push_str(&format!("• {}", link.url));
        if !link.tags.is_empty() {
            out.push_str(&format!(" (теги: {})", link.tags.join(", ")));
        }
        if !link.filters.is_empty() {
            out.push_str(&format!(" (фильтры: {})", link.filters.join(", ")));
        }
        out.push('\n');
    }
    out
}

fn format_confirmation(url: &str, tags: &[String], filters: &[String]) -> String {
    let tags_line = if tags.is_empty() {
        "без тегов".to_string()
    } else {
        tags.join(", ")
    };
    let filters_line = if filters.is_empty() {
        "без фильтров".to_string()
    } else {
        filters.join(", ")
    };
    format!(
        "Ссылка: {}\nТеги: {}\nФильтры: {}\n\nПодтвердить? (да/нет)",
        url, tags_line, filters_line
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::Tags;

    #[test]
    fn test_parse_list_dash_means_empty() {
        assert!(parse_list("-").is_empty());
        assert!(parse_list("  -  ").is_empty());
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_list_splits_on_commas_and_spaces() {
        assert_eq!(parse_list("work, rust"), vec!["work", "rust"]);
        assert_eq!(parse_list("alice bob"), vec!["alice", "bob"]);
        assert_eq!(parse_list("a,,  b , "), vec!["a", "b"]);
    }

    #[test]
    fn test_confirmation_words() {
        assert!(is_affirmative("Да"));
        assert!(is_affirmative(" подтвердить "));
        assert!(is_negative("НЕТ"));
        assert!(is_negative("отмена"));
        assert!(!is_affirmative("может быть"));
        assert!(!is_negative("может быть"));
    }

    #[test]
    fn test_supported_link() {
        assert!(supported_link("https://github.com/tokio-rs/tokio/issues/1"));
        assert!(supported_link("https://stackoverflow.com/questions/11227809"));
        assert!(!supported_link("https://example.com/page"));
    }

    #[test]
    fn test_format_subscriptions_lists_tags_and_filters() {
        let links = vec![
            TrackedLink {
                id: 1,
                url: "https://github.com/a/b".to_string(),
                tags: Tags(vec!["work".to_string()]),
                filters: Tags::default(),
            },
            TrackedLink {
                id: 2,
                url: "https://github.com/c/d".to_string(),
                tags: Tags::default(),
                filters: Tags(vec!["alice".to_string()]),
            },
        ];

        let text = format_subscriptions(&links);
        assert!(text.contains("• https://github.com/a/b (теги: work)"));
        assert!(text.contains("• https://github.com/c/d (фильтры: alice)"));
    }

    #[test]
    fn test_format_subscriptions_empty() {
        assert_eq!(format_subscriptions(&[]), "Нет отслеживаемых ссылок.");
    }
}
