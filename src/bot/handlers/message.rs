use chrono::NaiveDate;
use teloxide::utils::command::BotCommands;

use crate::bot::chat::{IncomingMessage, Keyboard};
use crate::bot::commands::{parse_command, Command};
use crate::bot::context::BotContext;
use crate::bot::registration::{accept_claim, register_group};
use crate::bot::registry::ChatRole;
use crate::error::BotError;
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};
use crate::utils::validation::validate_display_name;

pub const NAME_SET: &str = "Имя установлено";

/// Routes one chat message: registration tokens first, then bot-wide commands,
/// then supervisor chat input to the owning group.
pub async fn dispatch_message(ctx: &BotContext, message: IncomingMessage, today: NaiveDate) -> Result<(), BotError> {
    if let Some(claim) = ctx.registrar.claim(message.text()) {
        return accept_claim(ctx, &message, claim).await;
    }

    let command = parse_command(message.text(), &ctx.bot_name);
    let user = message.sender();
    let user_id = message.from_id.unwrap_or(0);
    if let Some(command) = &command {
        log_command_start(&format!("{:?}", command), &user, user_id, message.chat_id, None);
    }

    let is_admin = ctx.services.registry.is_admin_chat(message.chat_id);
    let handled = match &command {
        Some(Command::Help) => {
            reply(ctx, &message, &Command::descriptions().to_string()).await?;
            true
        }
        Some(Command::Name(name)) => {
            set_display_name(ctx, &message, name).await?;
            true
        }
        Some(Command::Register(name)) if is_admin => {
            register_group(ctx, message.chat_id, name).await?;
            true
        }
        Some(Command::Refresh) if is_admin => {
            refresh_schedules(ctx, &message).await?;
            true
        }
        // Admin-only commands from other chats are ignored
        Some(Command::Register(_)) | Some(Command::Refresh) => true,
        _ => false,
    };

    if !handled {
        if let Some((group, ChatRole::Supervisor)) = ctx.services.registry.route(message.chat_id) {
            if let Some(runtime) = ctx.group(&group).await {
                runtime
                    .handle_supervisor_message(&message, command.as_ref(), today)
                    .await;
            }
        }
    }

    if let Some(command) = &command {
        log_command_success(&format!("{:?}", command), &user, user_id, message.chat_id, None);
    }
    Ok(())
}

async fn set_display_name(ctx: &BotContext, message: &IncomingMessage, name: &str) -> Result<(), BotError> {
    let Some(user_id) = message.from_id else {
        return Ok(());
    };

    if let Err(e) = validate_display_name(name) {
        log_command_error("Name", &message.sender(), user_id, message.chat_id, &e.to_string());
        return reply(ctx, message, &e.to_string()).await;
    }

    ctx.services.names.set(user_id, name).await?;
    reply(ctx, message, NAME_SET).await
}

async fn refresh_schedules(ctx: &BotContext, message: &IncomingMessage) -> Result<(), BotError> {
    let text = match ctx.services.schedules.update().await {
        Ok(count) => format!("Schedule refreshed: {} groups", count),
        Err(e) => {
            log_command_error("Refresh", &message.sender(), message.from_id.unwrap_or(0), message.chat_id, &e.to_string());
            format!("Schedule refresh failed: {}", e)
        }
    };
    reply(ctx, message, &text).await
}

async fn reply(ctx: &BotContext, message: &IncomingMessage, text: &str) -> Result<(), BotError> {
    ctx.chats.open(message.chat_id).send_text(text, Keyboard::Keep).await?;
    Ok(())
}
