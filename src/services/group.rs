use std::path::PathBuf;
use std::sync::{Arc, PoisonError};

use chrono::{Local, NaiveDate, NaiveTime};
use tracing::warn;
use uuid::Uuid;

use crate::bot::chat::{IncomingMessage, PollAnswerEvent};
use crate::bot::commands::Command;
use crate::bot::registry::ChatRegistry;
use crate::database::connection::DatabaseManager;
use crate::error::BotError;
use crate::schedule::cache::ScheduleCache;
use crate::schedule::model::Group;
use crate::services::attachments::AttachmentHandler;
use crate::services::attendance::AttendanceHandler;
use crate::services::display_names::DisplayNames;
use crate::services::scheduler::DailyScheduler;
use crate::utils::logging::log_group_event;

/// Daily timing and storage shared by every group.
#[derive(Debug, Clone)]
pub struct GroupSettings {
    pub poll_time: NaiveTime,
    pub attachment_time: NaiveTime,
    pub attachments_dir: PathBuf,
}

/// Shared collaborators a group runtime is built from.
#[derive(Clone)]
pub struct GroupServices {
    pub db: DatabaseManager,
    pub registry: Arc<ChatRegistry>,
    pub schedules: Arc<ScheduleCache>,
    pub names: Arc<DisplayNames>,
}

/// The attendance and attachment handlers of one group plus their daily jobs.
pub struct GroupRuntime {
    pub group: Group,
    pub attendance: Arc<AttendanceHandler>,
    pub attachments: Arc<AttachmentHandler>,
    jobs: std::sync::Mutex<Vec<(DailyScheduler, Uuid)>>,
}

impl GroupRuntime {
    pub async fn new(group: Group, services: &GroupServices, settings: &GroupSettings) -> Result<Self, BotError> {
        let attendance = AttendanceHandler::new(
            group.clone(),
            services.registry.clone(),
            services.schedules.clone(),
            services.names.clone(),
        );
        let attachments = AttachmentHandler::load(
            group.clone(),
            services.registry.clone(),
            services.schedules.clone(),
            services.db.clone(),
            settings.attachments_dir.clone(),
        )
        .await?;

        Ok(Self {
            group,
            attendance: Arc::new(attendance),
            attachments: Arc::new(attachments),
            jobs: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Schedules the evening poll rollover and attachment delivery.
    pub async fn schedule_jobs(&self, scheduler: &DailyScheduler, settings: &GroupSettings) -> Result<(), BotError> {
        let attendance = self.attendance.clone();
        let poll = scheduler
            .add_daily(&format!("{} poll", self.group), settings.poll_time, move || {
                let attendance = attendance.clone();
                async move { attendance.on_daily_trigger(Local::now().date_naive()).await }
            })
            .await?;
        self.track_job(scheduler, poll);

        let attachments = self.attachments.clone();
        let delivery = scheduler
            .add_daily(&format!("{} attachments", self.group), settings.attachment_time, move || {
                let attachments = attachments.clone();
                async move {
                    if let Some(tomorrow) = Local::now().date_naive().succ_opt() {
                        attachments.deliver_scheduled(tomorrow).await;
                    }
                }
            })
            .await?;
        self.track_job(scheduler, delivery);

        log_group_event(self.group.name(), "jobs scheduled", None);
        Ok(())
    }

    fn track_job(&self, scheduler: &DailyScheduler, id: Uuid) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((scheduler.clone(), id));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Supervisor chat input goes to both handlers.
    pub async fn handle_supervisor_message(&self, message: &IncomingMessage, command: Option<&Command>, today: NaiveDate) {
        if let Some(command) = command {
            self.attendance.handle_command(command, today).await;
        }
        self.attachments
            .handle_supervisor_message(message, command, today)
            .await;
    }

    pub async fn handle_poll_answer(&self, answer: &PollAnswerEvent) -> bool {
        self.attendance.handle_poll_answer(answer).await
    }

    /// Removes the group's daily jobs from the scheduler.
    pub async fn shutdown(&self) {
        let jobs: Vec<(DailyScheduler, Uuid)> = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for (scheduler, id) in jobs {
            if let Err(e) = scheduler.remove(&id).await {
                warn!("Failed to remove job {} of group {}: {}", id, self.group, e);
            }
        }
        log_group_event(self.group.name(), "stopped", None);
    }
}
