pub mod commands;
mod handler;
pub mod state;

use anyhow::Result;
use teloxide::dispatching::{Dispatcher, DpHandlerDescription, UpdateFilterExt};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{BotCommandScope, Me};
use teloxide::utils::command::BotCommands;
use tracing::info;

pub use commands::Command;
pub use handler::BotHandler;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub async fn run(bot: Bot, handler: BotHandler) -> Result<()> {
    info!("Starting Telegram Bot...");

    setup_commands(&bot).await;

    let handler_tree = build_handler_tree();

    Dispatcher::builder(bot, handler_tree)
        .dependencies(dptree::deps![handler])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn build_handler_tree(
) -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = Message::filter_text()
        .chain(filter_hybrid_command::<Command, HandlerResult>())
        .endpoint(handle_command);

    let message_handler = Message::filter_text()
        .chain(filter_relevant_message::<HandlerResult>())
        .endpoint(handle_message);

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback);

    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(command_handler)
                .branch(message_handler),
        )
        .branch(callback_handler)
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, handler: BotHandler) -> HandlerResult {
    handler.handle_command(bot, msg, cmd).await?;
    Ok(())
}

/// Plain messages only matter while a /track dialogue is in progress.
async fn handle_message(bot: Bot, msg: Message, handler: BotHandler, text: String) -> HandlerResult {
    handler.handle_message(bot, msg, &text).await?;
    Ok(())
}

async fn handle_callback(bot: Bot, query: CallbackQuery, handler: BotHandler) -> HandlerResult {
    handler.handle_callback(bot, query).await?;
    Ok(())
}

async fn setup_commands(bot: &Bot) {
    if let Err(e) = bot
        .set_my_commands(Command::bot_commands())
        .scope(BotCommandScope::Default)
        .await
    {
        tracing::warn!("Failed to set default commands: {:#}", e);
    } else {
        info!("Set default commands for all users");
    }
}

/// A hybrid command filter:
/// - private chats accept both `/cmd` and `/cmd@bot`
/// - groups accept only the explicit `/cmd@bot` form
#[must_use]
fn filter_hybrid_command<C, Output>() -> Handler<'static, Output, DpHandlerDescription>
where
    C: BotCommands + Send + Sync + 'static,
    Output: Send + Sync + 'static,
{
    dptree::filter_map(move |message: Message, me: Me, text: String| {
        let bot_name = me.user.username.expect("Bots must have a username");

        let cmd = C::parse(&text, &bot_name).ok()?;

        if message.chat.is_private() {
            return Some(cmd);
        }

        // Parsing against an empty bot name succeeds only for the bare
        // form, which groups must not react to
        let is_bare_command = C::parse(&text, "").is_ok();
        if is_bare_command {
            return None;
        }

        Some(cmd)
    })
}

/// Keeps a message when it is addressed to the bot: any private
/// message, or a group message that mentions the bot or replies to it.
#[must_use]
fn filter_relevant_message<Output>() -> Handler<'static, Output, DpHandlerDescription>
where
    Output: Send + Sync + 'static,
{
    dptree::filter_map(move |message: Message, me: Me, text: String| {
        if message.chat.is_private() {
            return Some(message);
        }

        let bot_name = me.user.username.expect("Bots must have a username");
        let mention_str = format!("@{}", bot_name);

        if text.to_lowercase().contains(&mention_str.to_lowercase()) {
            return Some(message);
        }

        if let Some(reply) = message.reply_to_message() {
            if let Some(user) = reply.from.as_ref() {
                if user.id == me.user.id {
                    return Some(message);
                }
            }
        }

        None
    })
}
