use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Telegram bot error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Chat {0} is not registered")]
    ChatNotFound(i64),

    #[error("Link is not tracked: {0}")]
    LinkNotFound(String),

    #[error("Link is already tracked: {0}")]
    LinkAlreadyTracked(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Short stable name of the error kind, used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigError",
            AppError::Database(_) => "DatabaseError",
            AppError::Telegram(_) => "TelegramError",
            AppError::ChatNotFound(_) => "ChatNotFound",
            AppError::LinkNotFound(_) => "LinkNotFound",
            AppError::LinkAlreadyTracked(_) => "LinkAlreadyTracked",
            AppError::Validation(_) => "ValidationError",
            AppError::Serialization(_) => "SerializationError",
            AppError::Io(_) => "IoError",
            AppError::Anyhow(_) => "InternalError",
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
