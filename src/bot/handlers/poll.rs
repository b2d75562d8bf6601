use tracing::debug;

use crate::bot::chat::PollAnswerEvent;
use crate::bot::context::BotContext;

/// Offers the answer to every group; only the one owning the poll records it.
pub async fn dispatch_poll_answer(ctx: &BotContext, answer: &PollAnswerEvent) -> bool {
    for runtime in ctx.groups().await {
        if runtime.handle_poll_answer(answer).await {
            return true;
        }
    }
    debug!("Poll answer for unknown poll {} ignored", answer.poll_id);
    false
}
