use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Поддерживаемые команды:")]
pub enum Command {
    #[command(description = "зарегистрировать чат")]
    Start,
    #[command(description = "показать справку")]
    Help,
    #[command(description = "начать отслеживание ссылки")]
    Track,
    #[command(description = "прекратить отслеживание\n  использование: /untrack <ссылка>")]
    Untrack(String),
    #[command(description = "список отслеживаемых ссылок")]
    List,
    #[command(description = "обновления по тегам\n  использование: /updates <тег1,тег2,...>")]
    Updates(String),
    #[command(description = "выбрать режим уведомлений")]
    Notifications,
}
