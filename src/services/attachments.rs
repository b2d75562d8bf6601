use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::bot::chat::{IncomingMessage, Keyboard};
use crate::bot::commands::Command;
use crate::bot::registry::{ChatRegistry, ChatRole};
use crate::database::connection::DatabaseManager;
use crate::database::models::StoredAttachment;
use crate::error::BotError;
use crate::schedule::cache::ScheduleCache;
use crate::schedule::model::{EducationalActivity, Group, GroupSchedule};
use crate::services::conversation::{
    transition, AttachmentDraft, ConversationContext, ConversationState, Prompt, Transition,
};
use crate::utils::datetime::format_date;
use crate::utils::logging::{log_database_operation, log_delivery_failure, log_group_event};

pub const SAVED: &str = "Сохранено";
pub const SAVE_FAILED: &str = "Не удалось сохранить приложение";
pub const DELETED: &str = "Удалено";

/// A supervisor note for one lesson, optionally with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub activity: EducationalActivity,
    pub comment: String,
    pub attachment: Option<PathBuf>,
}

impl AttachmentRecord {
    pub fn label(&self) -> String {
        format!("{} {}", format_date(self.date), self.activity.label())
    }

    /// Text posted to the group chat.
    pub fn message(&self) -> String {
        format!("{}\n{}", self.activity.name(), self.comment)
    }
}

struct Dialogue {
    state: ConversationState,
    records: Vec<AttachmentRecord>,
}

/// Owns the supervisor dialogue and the saved records of one group. Both the
/// dialogue and the scheduled delivery go through the same lock.
pub struct AttachmentHandler {
    group: Group,
    registry: Arc<ChatRegistry>,
    schedules: Arc<ScheduleCache>,
    db: DatabaseManager,
    storage_dir: PathBuf,
    dialogue: Mutex<Dialogue>,
}

impl AttachmentHandler {
    /// Restores previously saved records of the group.
    pub async fn load(
        group: Group,
        registry: Arc<ChatRegistry>,
        schedules: Arc<ScheduleCache>,
        db: DatabaseManager,
        storage_dir: PathBuf,
    ) -> Result<Self, BotError> {
        let records: Vec<AttachmentRecord> = StoredAttachment::find_by_group(&db.pool, group.name())
            .await?
            .into_iter()
            .filter_map(StoredAttachment::into_record)
            .collect();
        log_database_operation(
            "LOAD",
            "attachments",
            Some(&format!("{} records for {}", records.len(), group)),
        );

        Ok(Self {
            group,
            registry,
            schedules,
            db,
            storage_dir,
            dialogue: Mutex::new(Dialogue {
                state: ConversationState::Default,
                records,
            }),
        })
    }

    pub async fn handle_supervisor_message(
        &self,
        message: &IncomingMessage,
        command: Option<&Command>,
        today: NaiveDate,
    ) {
        let mut dialogue = self.dialogue.lock().await;

        let schedule = match dialogue.state {
            ConversationState::WaitDate => self.lookup_schedule().await,
            _ => None,
        };
        let context = ConversationContext {
            today,
            schedule: schedule.as_deref(),
            saved: &dialogue.records,
        };
        let step = transition(&dialogue.state, message, command, &context);

        match step {
            Transition::Stay => {}
            Transition::Reply(prompt) => self.prompt(&prompt).await,
            Transition::Enter(next) => self.enter(&mut dialogue, next).await,
            Transition::DeliverTomorrow => {
                if let Some(tomorrow) = today.succ_opt() {
                    self.deliver(&dialogue.records, tomorrow).await;
                }
            }
            Transition::Delete(id) => {
                self.delete(&mut dialogue, id).await;
                self.enter(&mut dialogue, ConversationState::Default).await;
            }
        }
    }

    /// Scheduled evening delivery of the attachments for `date`. Records for
    /// lessons before `date` are dropped afterwards.
    pub async fn deliver_scheduled(&self, date: NaiveDate) {
        let mut dialogue = self.dialogue.lock().await;
        self.deliver(&dialogue.records, date).await;

        let stale: Vec<Uuid> = dialogue
            .records
            .iter()
            .filter(|record| record.date < date)
            .map(|record| record.id)
            .collect();
        for id in stale {
            self.delete_record(&mut dialogue, id).await;
        }
    }

    pub async fn state(&self) -> ConversationState {
        self.dialogue.lock().await.state.clone()
    }

    pub async fn records(&self) -> Vec<AttachmentRecord> {
        self.dialogue.lock().await.records.clone()
    }

    async fn lookup_schedule(&self) -> Option<Arc<GroupSchedule>> {
        match self.schedules.get_schedule(self.group.name()).await {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!("Schedule lookup for group {} failed: {}", self.group, e);
                None
            }
        }
    }

    async fn enter(&self, dialogue: &mut Dialogue, next: ConversationState) {
        let next = match next {
            ConversationState::SaveAttachment(draft) => {
                match self.save(dialogue, draft).await {
                    Ok(()) => self.prompt(&Prompt::new(SAVED, Keyboard::Remove)).await,
                    Err(e) => {
                        warn!("Saving attachment for group {} failed: {}", self.group, e);
                        self.prompt(&Prompt::new(SAVE_FAILED, Keyboard::Remove)).await;
                    }
                }
                ConversationState::Default
            }
            other => other,
        };

        if let Some(prompt) = next.entry_prompt() {
            self.prompt(&prompt).await;
        }
        dialogue.state = next;
    }

    async fn save(&self, dialogue: &mut Dialogue, draft: AttachmentDraft) -> Result<(), BotError> {
        let attachment = match &draft.document {
            Some(document) => {
                let chat = self
                    .registry
                    .client(self.group.name(), ChatRole::Supervisor)
                    .ok_or_else(|| BotError::Transport("supervisor chat is not registered".to_string()))?;
                let dir = self.storage_dir.join(self.group.name());
                Some(chat.download_file(document, &dir).await?)
            }
            None => None,
        };

        let record = AttachmentRecord {
            id: Uuid::new_v4(),
            date: draft.date,
            activity: draft.activity,
            comment: draft.comment,
            attachment,
        };
        StoredAttachment::create(&self.db.pool, self.group.name(), &record).await?;
        log_group_event(self.group.name(), "attachment saved", Some(&record.label()));
        dialogue.records.push(record);
        Ok(())
    }

    async fn delete(&self, dialogue: &mut Dialogue, id: Uuid) {
        if self.delete_record(dialogue, id).await {
            self.prompt(&Prompt::new(DELETED, Keyboard::Remove)).await;
        }
    }

    async fn delete_record(&self, dialogue: &mut Dialogue, id: Uuid) -> bool {
        if let Err(e) = StoredAttachment::delete(&self.db.pool, id).await {
            warn!("Deleting attachment {} failed: {}", id, e);
            return false;
        }
        let before = dialogue.records.len();
        dialogue.records.retain(|record| record.id != id);
        before != dialogue.records.len()
    }

    async fn deliver(&self, records: &[AttachmentRecord], date: NaiveDate) {
        let Some(chat) = self.registry.client(self.group.name(), ChatRole::Group) else {
            return;
        };

        for record in records.iter().filter(|record| record.date == date) {
            let result = match &record.attachment {
                Some(path) if path.exists() => chat.send_document(&record.message(), path).await,
                _ => chat.send_text(&record.message(), Keyboard::Keep).await,
            };
            if let Err(e) = result {
                log_delivery_failure("attachment", chat.chat_id(), &e.to_string());
            }
        }
    }

    async fn prompt(&self, prompt: &Prompt) {
        let Some(chat) = self.registry.client(self.group.name(), ChatRole::Supervisor) else {
            return;
        };
        if let Err(e) = chat.send_text(&prompt.text, prompt.keyboard.clone()).await {
            log_delivery_failure("prompt", chat.chat_id(), &e.to_string());
        }
    }
}
