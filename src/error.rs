use thiserror::Error;

/// Failures surfaced by the bot's domain and infrastructure layers.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("'{0}' is not a valid group name")]
    InvalidGroupName(String),

    #[error("messaging transport error: {0}")]
    Transport(String),

    #[error("schedule source error: {0}")]
    Schedule(String),

    #[error("failed to read workbook {path}: {reason}")]
    Workbook { path: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

impl From<teloxide::RequestError> for BotError {
    fn from(err: teloxide::RequestError) -> Self {
        BotError::Transport(err.to_string())
    }
}

impl From<teloxide::DownloadError> for BotError {
    fn from(err: teloxide::DownloadError) -> Self {
        BotError::Transport(err.to_string())
    }
}
