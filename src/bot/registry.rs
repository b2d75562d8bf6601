use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::bot::chat::ChatClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatRole {
    Supervisor,
    Group,
}

#[derive(Default, Clone)]
struct GroupChats {
    supervisor: Option<Arc<dyn ChatClient>>,
    group: Option<Arc<dyn ChatClient>>,
}

#[derive(Default)]
struct RegistryState {
    admin: Option<Arc<dyn ChatClient>>,
    groups: HashMap<String, GroupChats>,
    routes: HashMap<i64, (String, ChatRole)>,
}

/// Single source of truth for which chat plays which role. Handlers resolve
/// clients here at use time, so rebinding a chat takes effect immediately.
#[derive(Default)]
pub struct ChatRegistry {
    state: RwLock<RegistryState>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_admin(&self, client: Arc<dyn ChatClient>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.admin = Some(client);
    }

    pub fn admin(&self) -> Option<Arc<dyn ChatClient>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).admin.clone()
    }

    pub fn is_admin_chat(&self, chat_id: i64) -> bool {
        self.admin().is_some_and(|admin| admin.chat_id() == chat_id)
    }

    /// Binds `client` to a role of `group`, replacing any previous chat for that role.
    /// A chat holds one role at a time, so its earlier binding is released.
    pub fn bind(&self, group: &str, role: ChatRole, client: Arc<dyn ChatClient>) {
        let key = group.to_lowercase();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if let Some((old_key, old_role)) = state.routes.remove(&client.chat_id()) {
            if let Some(old_chats) = state.groups.get_mut(&old_key) {
                let old_slot = match old_role {
                    ChatRole::Supervisor => &mut old_chats.supervisor,
                    ChatRole::Group => &mut old_chats.group,
                };
                if old_slot.as_ref().is_some_and(|old| old.chat_id() == client.chat_id()) {
                    *old_slot = None;
                }
            }
        }

        let chats = state.groups.entry(key.clone()).or_default();
        let slot = match role {
            ChatRole::Supervisor => &mut chats.supervisor,
            ChatRole::Group => &mut chats.group,
        };
        let previous = slot.replace(client.clone());

        if let Some(previous) = previous {
            state.routes.remove(&previous.chat_id());
        }
        state.routes.insert(client.chat_id(), (key, role));
    }

    pub fn client(&self, group: &str, role: ChatRole) -> Option<Arc<dyn ChatClient>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let chats = state.groups.get(&group.to_lowercase())?;
        match role {
            ChatRole::Supervisor => chats.supervisor.clone(),
            ChatRole::Group => chats.group.clone(),
        }
    }

    /// Which group and role the chat is bound to, if any. Group keys are lowercase.
    pub fn route(&self, chat_id: i64) -> Option<(String, ChatRole)> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .routes
            .get(&chat_id)
            .cloned()
    }

    /// Both chats of the group are bound.
    pub fn is_ready(&self, group: &str) -> bool {
        self.client(group, ChatRole::Supervisor).is_some() && self.client(group, ChatRole::Group).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingChat;

    #[test]
    fn test_bind_and_route() {
        let registry = ChatRegistry::new();
        registry.bind("ИКБО-01-22", ChatRole::Supervisor, RecordingChat::shared(10));

        assert_eq!(
            registry.route(10),
            Some(("икбо-01-22".to_string(), ChatRole::Supervisor))
        );
        assert!(registry.client("икбо-01-22", ChatRole::Supervisor).is_some());
        assert!(!registry.is_ready("ИКБО-01-22"));

        registry.bind("ИКБО-01-22", ChatRole::Group, RecordingChat::shared(20));
        assert!(registry.is_ready("ИКБО-01-22"));
    }

    #[test]
    fn test_rebinding_replaces_previous_route() {
        let registry = ChatRegistry::new();
        registry.bind("ИКБО-01-22", ChatRole::Group, RecordingChat::shared(20));
        registry.bind("ИКБО-01-22", ChatRole::Group, RecordingChat::shared(21));

        assert!(registry.route(20).is_none());
        assert_eq!(registry.route(21).map(|(_, role)| role), Some(ChatRole::Group));
        assert_eq!(
            registry.client("ИКБО-01-22", ChatRole::Group).map(|c| c.chat_id()),
            Some(21)
        );
    }

    #[test]
    fn test_chat_moves_between_groups_and_roles() {
        let registry = ChatRegistry::new();
        registry.bind("ИКБО-01-22", ChatRole::Group, RecordingChat::shared(20));
        registry.bind("ИКБО-02-22", ChatRole::Group, RecordingChat::shared(20));

        assert!(registry.client("ИКБО-01-22", ChatRole::Group).is_none());
        assert_eq!(
            registry.route(20),
            Some(("икбо-02-22".to_string(), ChatRole::Group))
        );

        registry.bind("ИКБО-02-22", ChatRole::Supervisor, RecordingChat::shared(20));
        assert!(registry.client("ИКБО-02-22", ChatRole::Group).is_none());
        assert_eq!(
            registry.client("ИКБО-02-22", ChatRole::Supervisor).map(|c| c.chat_id()),
            Some(20)
        );
        assert_eq!(registry.route(20).map(|(_, role)| role), Some(ChatRole::Supervisor));
    }

    #[test]
    fn test_admin_binding() {
        let registry = ChatRegistry::new();
        assert!(!registry.is_admin_chat(1));

        registry.bind_admin(RecordingChat::shared(1));
        assert!(registry.is_admin_chat(1));
        assert!(!registry.is_admin_chat(2));
    }
}
