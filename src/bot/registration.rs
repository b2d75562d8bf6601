//! Token handshake that binds chats to roles. The admin token is generated at
//! startup; group registration issues one token per role and only their
//! SHA-256 hashes are kept.

use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::bot::chat::{IncomingMessage, Keyboard};
use crate::bot::context::BotContext;
use crate::bot::registry::ChatRole;
use crate::database::models::StoredGroup;
use crate::error::BotError;
use crate::schedule::model::Group;
use crate::services::conversation::ConversationState;
use crate::utils::logging::{log_database_operation, log_system_event};

pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Admin,
    Chat { group: String, role: ChatRole },
}

#[derive(Debug, Clone)]
struct GroupTokens {
    group: String,
    supervisor_hash: String,
    group_hash: String,
}

pub struct Registrar {
    admin_hash: String,
    tokens: RwLock<Vec<GroupTokens>>,
}

impl Registrar {
    pub fn new(admin_token: &str) -> Self {
        Self {
            admin_hash: hash_token(admin_token),
            tokens: RwLock::new(Vec::new()),
        }
    }

    pub fn remember(&self, group: &str, supervisor_hash: &str, group_hash: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(GroupTokens {
                group: group.to_string(),
                supervisor_hash: supervisor_hash.to_string(),
                group_hash: group_hash.to_string(),
            });
    }

    /// Recognizes a message consisting of a registration token.
    pub fn claim(&self, text: &str) -> Option<Claim> {
        let text = text.trim();
        if text.is_empty() || text.contains(char::is_whitespace) {
            return None;
        }

        let hash = hash_token(text);
        if hash == self.admin_hash {
            return Some(Claim::Admin);
        }

        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.iter().find_map(|entry| {
            if entry.supervisor_hash == hash {
                Some(Claim::Chat { group: entry.group.clone(), role: ChatRole::Supervisor })
            } else if entry.group_hash == hash {
                Some(Claim::Chat { group: entry.group.clone(), role: ChatRole::Group })
            } else {
                None
            }
        })
    }
}

/// `/зарегистрировать <name>` from the admin chat.
pub async fn register_group(ctx: &BotContext, chat_id: i64, argument: &str) -> Result<(), BotError> {
    let reply = ctx.chats.open(chat_id);

    let group = match Group::parse(argument) {
        Ok(group) => group,
        Err(_) => {
            reply
                .send_text(&format!("Invalid group name: {}", argument.trim()), Keyboard::Keep)
                .await?;
            return Ok(());
        }
    };

    if ctx.group(group.name()).await.is_some() {
        reply
            .send_text(&format!("Group {} is already registered", group), Keyboard::Keep)
            .await?;
        return Ok(());
    }

    let supervisor_token = generate_token();
    let group_token = generate_token();
    let supervisor_hash = hash_token(&supervisor_token);
    let group_hash = hash_token(&group_token);

    StoredGroup::create(&ctx.services.db.pool, group.name(), &supervisor_hash, &group_hash).await?;
    log_database_operation("INSERT", "groups", Some(group.name()));
    ctx.registrar.remember(group.name(), &supervisor_hash, &group_hash);
    ctx.start_group(group.clone()).await?;

    reply
        .send_text(
            &format!(
                "NEW RECORD CREATED\nName: {}\n\nAUTH TOKENS\nSupervisor token: {}\nGroup token: {}",
                group, supervisor_token, group_token
            ),
            Keyboard::Keep,
        )
        .await?;
    log_system_event("Group registered", Some(group.name()));
    Ok(())
}

/// Binds the chat that sent a token to the claimed role.
pub async fn accept_claim(ctx: &BotContext, message: &IncomingMessage, claim: Claim) -> Result<(), BotError> {
    let client = ctx.chats.open(message.chat_id);
    // Tokens should not linger in chat history
    client.delete_message(message.message_id).await;

    match claim {
        Claim::Admin => {
            ctx.services.registry.bind_admin(client.clone());
            client.send_text("Admin chat registered", Keyboard::Keep).await?;
            log_system_event("Admin chat bound", Some(&message.chat_id.to_string()));
        }
        Claim::Chat { group, role } => {
            StoredGroup::bind_chat(&ctx.services.db.pool, &group, role, message.chat_id).await?;
            ctx.services.registry.bind(&group, role, client.clone());

            let confirmation = match role {
                ChatRole::Supervisor => format!("Supervisor chat {} registered", group),
                ChatRole::Group => format!("Group chat {} registered", group),
            };
            client.send_text(&confirmation, Keyboard::Keep).await?;

            if role == ChatRole::Supervisor {
                if let Some(prompt) = ConversationState::Default.entry_prompt() {
                    client.send_text(&prompt.text, prompt.keyboard).await?;
                }
            }
            log_system_event("Chat bound", Some(&format!("{} {:?} -> {}", group, role, message.chat_id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_sha256_hex() {
        let hash = hash_token("secret");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("  secret \n"));
        assert_ne!(hash, hash_token("other"));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_claims() {
        let registrar = Registrar::new("admin-token");
        registrar.remember("ИКБО-01-22", &hash_token("sup"), &hash_token("grp"));

        assert_eq!(registrar.claim("admin-token"), Some(Claim::Admin));
        assert_eq!(
            registrar.claim(" sup "),
            Some(Claim::Chat { group: "ИКБО-01-22".to_string(), role: ChatRole::Supervisor })
        );
        assert_eq!(
            registrar.claim("grp"),
            Some(Claim::Chat { group: "ИКБО-01-22".to_string(), role: ChatRole::Group })
        );
        assert_eq!(registrar.claim("hello there"), None);
        assert_eq!(registrar.claim("unknown"), None);
    }
}
