pub mod message;
pub mod poll;

use std::sync::Arc;

use chrono::Local;
use teloxide::{dispatching::UpdateHandler, prelude::*, types::PollAnswer};

use crate::bot::context::BotContext;
use crate::bot::telegram::{incoming_message, poll_answer_event};

type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub struct BotHandler {
    pub ctx: Arc<BotContext>,
}

impl BotHandler {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<HandlerError> {
        let ctx_messages = self.ctx.clone();
        let ctx_polls = self.ctx.clone();

        dptree::entry()
            .branch(Update::filter_message().endpoint(move |msg: Message| {
                let ctx = ctx_messages.clone();
                async move {
                    let incoming = incoming_message(&msg);
                    if let Err(e) = message::dispatch_message(&ctx, incoming, Local::now().date_naive()).await {
                        tracing::error!("Failed to handle message in chat {}: {}", msg.chat.id, e);
                    }
                    Ok::<(), HandlerError>(())
                }
            }))
            .branch(Update::filter_poll_answer().endpoint(move |answer: PollAnswer| {
                let ctx = ctx_polls.clone();
                async move {
                    poll::dispatch_poll_answer(&ctx, &poll_answer_event(&answer)).await;
                    Ok::<(), HandlerError>(())
                }
            }))
    }
}
