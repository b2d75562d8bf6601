use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use std::env;
use std::path::PathBuf;

use crate::utils::datetime::parse_clock_time;
use crate::utils::validation::validate_telegram_chat_id;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub schedule_url: String,
    /// Local workbooks; when non-empty they replace the web source.
    pub schedule_files: Vec<PathBuf>,
    pub poll_time: NaiveTime,
    pub attachment_time: NaiveTime,
    pub schedule_refresh_cron: String,
    pub attachments_dir: PathBuf,
    pub admin_chat_id: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = var_or("DATABASE_URL", "sqlite:./data/attendance.db");

        let http_port = var_or("HTTP_PORT", "3000")
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let schedule_url = var_or("SCHEDULE_URL", "https://www.mirea.ru/schedule/");

        let schedule_files = env::var("SCHEDULE_FILES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect();

        let poll_time = clock_var("POLL_TIME", "19:00")?;
        let attachment_time = clock_var("ATTACHMENT_TIME", "19:00")?;

        let schedule_refresh_cron = var_or("SCHEDULE_REFRESH_CRON", "0 0 3 * * Mon");
        let attachments_dir = PathBuf::from(var_or("ATTACHMENTS_DIR", "./data/attachments"));

        let admin_chat_id = match env::var("ADMIN_CHAT_ID") {
            Ok(value) if !value.trim().is_empty() => {
                let chat_id: i64 = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid ADMIN_CHAT_ID"))?;
                validate_telegram_chat_id(chat_id).map_err(|e| anyhow!("Invalid ADMIN_CHAT_ID: {}", e))?;
                Some(chat_id)
            }
            _ => None,
        };

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            schedule_url,
            schedule_files,
            poll_time,
            attachment_time,
            schedule_refresh_cron,
            attachments_dir,
            admin_chat_id,
        })
    }
}

/// Unset and blank both fall back to `default`.
fn var_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn clock_var(name: &str, default: &str) -> Result<NaiveTime> {
    let value = var_or(name, default);
    parse_clock_time(&value).ok_or_else(|| anyhow!("Invalid {}: expected HH:MM, got '{}'", name, value))
}
