use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::bot::chat::ChatFactory;
use crate::bot::registration::Registrar;
use crate::bot::registry::ChatRole;
use crate::database::models::StoredGroup;
use crate::error::BotError;
use crate::schedule::model::Group;
use crate::services::group::{GroupRuntime, GroupServices, GroupSettings};
use crate::services::scheduler::DailyScheduler;
use crate::utils::logging::log_system_event;

/// Everything the update handlers need, shared behind an `Arc`.
pub struct BotContext {
    pub services: GroupServices,
    pub chats: Arc<dyn ChatFactory>,
    pub registrar: Registrar,
    pub settings: GroupSettings,
    /// Bot username, used to accept `/command@bot` mentions.
    pub bot_name: String,
    groups: RwLock<HashMap<String, Arc<GroupRuntime>>>,
    scheduler: Option<DailyScheduler>,
}

impl BotContext {
    pub fn new(
        services: GroupServices,
        chats: Arc<dyn ChatFactory>,
        registrar: Registrar,
        settings: GroupSettings,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            services,
            chats,
            registrar,
            settings,
            bot_name: bot_name.into(),
            groups: RwLock::new(HashMap::new()),
            scheduler: None,
        }
    }

    /// Groups started after this get their daily jobs on `scheduler`.
    pub fn with_scheduler(mut self, scheduler: DailyScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Recreates runtimes and chat bindings of every stored group.
    pub async fn restore_groups(&self) -> Result<usize, BotError> {
        let stored = StoredGroup::find_all(&self.services.db.pool).await?;
        let mut restored = 0;

        for record in stored {
            let group = match Group::parse(&record.name) {
                Ok(group) => group,
                Err(e) => {
                    warn!("Skipping stored group: {}", e);
                    continue;
                }
            };
            self.registrar
                .remember(group.name(), &record.supervisor_token_hash, &record.group_token_hash);
            self.start_group(group.clone()).await?;

            let bindings = [
                (ChatRole::Supervisor, record.supervisor_chat_id),
                (ChatRole::Group, record.group_chat_id),
            ];
            for (role, chat_id) in bindings {
                if let Some(chat_id) = chat_id {
                    self.services.registry.bind(group.name(), role, self.chats.open(chat_id));
                }
            }
            restored += 1;
        }

        log_system_event("Groups restored", Some(&restored.to_string()));
        Ok(restored)
    }

    pub async fn start_group(&self, group: Group) -> Result<Arc<GroupRuntime>, BotError> {
        let runtime = Arc::new(GroupRuntime::new(group.clone(), &self.services, &self.settings).await?);
        if let Some(scheduler) = &self.scheduler {
            runtime.schedule_jobs(scheduler, &self.settings).await?;
        }
        self.groups.write().await.insert(group.key(), runtime.clone());
        Ok(runtime)
    }

    /// Case-insensitive lookup by group name.
    pub async fn group(&self, name: &str) -> Option<Arc<GroupRuntime>> {
        self.groups.read().await.get(&name.trim().to_lowercase()).cloned()
    }

    pub async fn groups(&self) -> Vec<Arc<GroupRuntime>> {
        self.groups.read().await.values().cloned().collect()
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }

    pub async fn shutdown(&self) {
        for runtime in self.groups().await {
            runtime.shutdown().await;
        }
        if let Some(scheduler) = &self.scheduler {
            if let Err(e) = scheduler.shutdown().await {
                warn!("Daily scheduler shutdown failed: {}", e);
            }
        }
    }
}
