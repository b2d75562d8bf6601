//! In-memory doubles for the chat transport and the schedule source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveTime;

use crate::bot::chat::{ChatClient, ChatFactory, DocumentRef, Keyboard, PollRequest, SentPoll};
use crate::bot::context::BotContext;
use crate::bot::registration::{generate_token, Registrar};
use crate::bot::registry::ChatRegistry;
use crate::database::connection::DatabaseManager;
use crate::error::BotError;
use crate::schedule::cache::ScheduleCache;
use crate::schedule::model::GroupSchedule;
use crate::schedule::source::ScheduleSource;
use crate::services::display_names::DisplayNames;
use crate::services::group::{GroupServices, GroupSettings};
use crate::services::scheduler::DailyScheduler;

/// Everything a `RecordingChat` was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text { text: String, keyboard: Keyboard },
    Document { caption: String, path: PathBuf },
    Poll(PollRequest),
    StopPoll(i32),
    Pin(i32),
    Delete(i32),
}

pub struct RecordingChat {
    chat_id: i64,
    next_message_id: AtomicI32,
    outgoing: Mutex<Vec<Outgoing>>,
    fail_deletes: AtomicBool,
}

impl RecordingChat {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            next_message_id: AtomicI32::new(1),
            outgoing: Mutex::new(Vec::new()),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn shared(chat_id: i64) -> Arc<Self> {
        Arc::new(Self::new(chat_id))
    }

    /// Makes subsequent `delete_message` calls fail, as Telegram does for old messages.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.outgoing.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.outgoing()
            .into_iter()
            .filter_map(|item| match item {
                Outgoing::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn polls(&self) -> Vec<PollRequest> {
        self.outgoing()
            .into_iter()
            .filter_map(|item| match item {
                Outgoing::Poll(poll) => Some(poll),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.outgoing.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn record(&self, item: Outgoing) -> i32 {
        self.outgoing.lock().unwrap_or_else(PoisonError::into_inner).push(item);
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    fn chat_id(&self) -> i64 {
        self.chat_id
    }

    async fn send_text(&self, text: &str, keyboard: Keyboard) -> Result<i32, BotError> {
        Ok(self.record(Outgoing::Text {
            text: text.to_string(),
            keyboard,
        }))
    }

    async fn send_document(&self, caption: &str, path: &Path) -> Result<i32, BotError> {
        Ok(self.record(Outgoing::Document {
            caption: caption.to_string(),
            path: path.to_path_buf(),
        }))
    }

    async fn send_poll(&self, poll: &PollRequest) -> Result<SentPoll, BotError> {
        let message_id = self.record(Outgoing::Poll(poll.clone()));
        Ok(SentPoll {
            message_id,
            poll_id: format!("poll-{}-{}", self.chat_id, message_id),
        })
    }

    async fn stop_poll(&self, message_id: i32) -> bool {
        self.record(Outgoing::StopPoll(message_id));
        true
    }

    async fn pin_message(&self, message_id: i32) -> Result<(), BotError> {
        self.record(Outgoing::Pin(message_id));
        Ok(())
    }

    async fn delete_message(&self, message_id: i32) -> bool {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return false;
        }
        self.record(Outgoing::Delete(message_id));
        true
    }

    async fn download_file(&self, document: &DocumentRef, dir: &Path) -> Result<PathBuf, BotError> {
        tokio::fs::create_dir_all(dir).await?;
        let name = document.file_name.clone().unwrap_or_else(|| document.file_id.clone());
        let path = dir.join(name);
        tokio::fs::write(&path, document.file_id.as_bytes()).await?;
        Ok(path)
    }
}

/// Hands out one `RecordingChat` per chat id and keeps them for inspection.
#[derive(Default)]
pub struct RecordingFactory {
    chats: Mutex<HashMap<i64, Arc<RecordingChat>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(&self, chat_id: i64) -> Arc<RecordingChat> {
        self.chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(chat_id)
            .or_insert_with(|| RecordingChat::shared(chat_id))
            .clone()
    }
}

impl ChatFactory for RecordingFactory {
    fn open(&self, chat_id: i64) -> Arc<dyn ChatClient> {
        self.chat(chat_id)
    }
}

/// Serves a fixed set of schedules and counts how often it was asked.
pub struct StaticScheduleSource {
    schedules: Vec<GroupSchedule>,
    fetches: AtomicUsize,
}

impl StaticScheduleSource {
    pub fn new(schedules: Vec<GroupSchedule>) -> Self {
        Self {
            schedules,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for StaticScheduleSource {
    async fn fetch_schedules(&self) -> Result<Vec<GroupSchedule>, BotError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.schedules.clone())
    }
}

/// A fully wired `BotContext` over recording chats and a static schedule source.
/// Daily jobs are only scheduled when built with `with_scheduler`.
pub struct TestHarness {
    pub ctx: Arc<BotContext>,
    pub chats: Arc<RecordingFactory>,
    pub source: Arc<StaticScheduleSource>,
    pub admin_token: String,
}

impl TestHarness {
    pub async fn new(
        db: DatabaseManager,
        schedules: Vec<GroupSchedule>,
        attachments_dir: PathBuf,
    ) -> Result<Self, BotError> {
        Self::build(db, schedules, attachments_dir, None).await
    }

    pub async fn with_scheduler(
        db: DatabaseManager,
        schedules: Vec<GroupSchedule>,
        attachments_dir: PathBuf,
        scheduler: DailyScheduler,
    ) -> Result<Self, BotError> {
        Self::build(db, schedules, attachments_dir, Some(scheduler)).await
    }

    async fn build(
        db: DatabaseManager,
        schedules: Vec<GroupSchedule>,
        attachments_dir: PathBuf,
        scheduler: Option<DailyScheduler>,
    ) -> Result<Self, BotError> {
        let chats = Arc::new(RecordingFactory::new());
        let source = Arc::new(StaticScheduleSource::new(schedules));
        let admin_token = generate_token();

        let services = GroupServices {
            registry: Arc::new(ChatRegistry::new()),
            schedules: Arc::new(ScheduleCache::new(source.clone())),
            names: Arc::new(DisplayNames::load(db.clone()).await?),
            db,
        };
        let settings = GroupSettings {
            poll_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            attachment_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            attachments_dir,
        };
        let mut ctx = BotContext::new(services, chats.clone(), Registrar::new(&admin_token), settings, "testbot");
        if let Some(scheduler) = scheduler {
            ctx = ctx.with_scheduler(scheduler);
        }

        Ok(Self {
            ctx: Arc::new(ctx),
            chats,
            source,
            admin_token,
        })
    }
}
