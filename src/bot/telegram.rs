//! teloxide-backed implementation of the chat port.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    InputFile, KeyboardButton, KeyboardMarkup, KeyboardRemove, MessageId, PollAnswer,
};

use crate::bot::chat::{
    ChatClient, ChatFactory, DocumentRef, IncomingMessage, Keyboard, PollAnswerEvent, PollRequest, SentPoll,
};
use crate::error::BotError;
use crate::utils::logging::log_delivery_failure;

pub struct TelegramChat {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChat {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl ChatClient for TelegramChat {
    fn chat_id(&self) -> i64 {
        self.chat_id.0
    }

    async fn send_text(&self, text: &str, keyboard: Keyboard) -> Result<i32, BotError> {
        let request = self.bot.send_message(self.chat_id, text);
        let sent = match keyboard {
            Keyboard::Keep => request.await?,
            Keyboard::Remove => request.reply_markup(KeyboardRemove::new()).await?,
            Keyboard::Options(options) => {
                let rows: Vec<Vec<KeyboardButton>> = options
                    .into_iter()
                    .map(|option| vec![KeyboardButton::new(option)])
                    .collect();
                request.reply_markup(KeyboardMarkup::new(rows)).await?
            }
        };
        Ok(sent.id.0)
    }

    async fn send_document(&self, caption: &str, path: &Path) -> Result<i32, BotError> {
        let sent = self
            .bot
            .send_document(self.chat_id, InputFile::file(path))
            .caption(caption)
            .await?;
        Ok(sent.id.0)
    }

    async fn send_poll(&self, poll: &PollRequest) -> Result<SentPoll, BotError> {
        let sent = self
            .bot
            .send_poll(self.chat_id, poll.question.clone(), poll.options.clone())
            .is_anonymous(poll.is_anonymous)
            .allows_multiple_answers(poll.allows_multiple_answers)
            .await?;
        let poll_id = sent
            .poll()
            .map(|poll| poll.id.clone())
            .ok_or_else(|| BotError::Transport("sent message carries no poll".to_string()))?;
        Ok(SentPoll {
            message_id: sent.id.0,
            poll_id,
        })
    }

    async fn stop_poll(&self, message_id: i32) -> bool {
        match self.bot.stop_poll(self.chat_id, MessageId(message_id)).await {
            Ok(_) => true,
            Err(e) => {
                log_delivery_failure("stop_poll", self.chat_id.0, &e.to_string());
                false
            }
        }
    }

    async fn pin_message(&self, message_id: i32) -> Result<(), BotError> {
        self.bot
            .pin_chat_message(self.chat_id, MessageId(message_id))
            .disable_notification(true)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, message_id: i32) -> bool {
        match self.bot.delete_message(self.chat_id, MessageId(message_id)).await {
            Ok(_) => true,
            Err(e) => {
                log_delivery_failure("delete_message", self.chat_id.0, &e.to_string());
                false
            }
        }
    }

    async fn download_file(&self, document: &DocumentRef, dir: &Path) -> Result<PathBuf, BotError> {
        tokio::fs::create_dir_all(dir).await?;

        let file = self.bot.get_file(document.file_id.clone()).await?;
        let name = document
            .file_name
            .clone()
            .unwrap_or_else(|| document.file_id.clone())
            .replace(['/', '\\'], "_");
        let path = dir.join(format!("{}-{}", Local::now().format("%Y%m%d%H%M%S"), name));

        let mut destination = tokio::fs::File::create(&path).await?;
        self.bot.download_file(&file.path, &mut destination).await?;
        Ok(path)
    }
}

pub struct TelegramChatFactory {
    bot: Bot,
}

impl TelegramChatFactory {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl ChatFactory for TelegramChatFactory {
    fn open(&self, chat_id: i64) -> Arc<dyn ChatClient> {
        Arc::new(TelegramChat::new(self.bot.clone(), chat_id))
    }
}

pub fn incoming_message(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        from_id: msg.from().map(|user| user.id.0 as i64),
        username: msg.from().and_then(|user| user.username.clone()),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        document: msg.document().map(|document| DocumentRef {
            file_id: document.file.id.clone(),
            file_name: document.file_name.clone(),
        }),
    }
}

pub fn poll_answer_event(answer: &PollAnswer) -> PollAnswerEvent {
    PollAnswerEvent {
        poll_id: answer.poll_id.clone(),
        user_id: answer.user.id.0 as i64,
        username: answer.user.username.clone(),
        option_ids: answer.option_ids.iter().map(|&index| index as usize).collect(),
    }
}
