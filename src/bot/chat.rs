//! Transport-neutral view of a chat. Handlers talk to `ChatClient` so the
//! attendance and attachment flows never see teloxide types.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BotError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the chat currently shows.
    Keep,
    /// One button per option, one option per row.
    Options(Vec<String>),
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub file_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub from_id: Option<i64>,
    pub username: Option<String>,
    pub text: Option<String>,
    pub document: Option<DocumentRef>,
}

impl IncomingMessage {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Name used in logs: `@username`, else the numeric id.
    pub fn sender(&self) -> String {
        match (&self.username, self.from_id) {
            (Some(username), _) => format!("@{}", username),
            (None, Some(id)) => id.to_string(),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollAnswerEvent {
    pub poll_id: String,
    pub user_id: i64,
    pub username: Option<String>,
    /// Zero-based indices of the chosen options; empty when a vote is retracted.
    pub option_ids: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPoll {
    pub message_id: i32,
    pub poll_id: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    fn chat_id(&self) -> i64;

    /// Returns the id of the sent message.
    async fn send_text(&self, text: &str, keyboard: Keyboard) -> Result<i32, BotError>;

    async fn send_document(&self, caption: &str, path: &Path) -> Result<i32, BotError>;

    async fn send_poll(&self, poll: &PollRequest) -> Result<SentPoll, BotError>;

    /// Soft failure: `false` when the poll could not be stopped.
    async fn stop_poll(&self, message_id: i32) -> bool;

    async fn pin_message(&self, message_id: i32) -> Result<(), BotError>;

    /// Soft failure: `false` when the message could not be deleted.
    async fn delete_message(&self, message_id: i32) -> bool;

    /// Stores the referenced document under `dir` and returns the local path.
    async fn download_file(&self, document: &DocumentRef, dir: &Path) -> Result<PathBuf, BotError>;
}

/// Produces clients bound to a chat id.
pub trait ChatFactory: Send + Sync {
    fn open(&self, chat_id: i64) -> Arc<dyn ChatClient>;
}
