use std::future::Future;

use chrono::{Duration, FixedOffset, Local, NaiveTime, Timelike};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BotError;

/// Six-field cron expression firing every day when the wall clock at `offset` reads `at`.
/// Jobs are evaluated in UTC, so the local time is shifted by the offset.
pub fn daily_cron(at: NaiveTime, offset: FixedOffset) -> String {
    let utc = at - Duration::seconds(i64::from(offset.local_minus_utc()));
    format!("0 {} {} * * *", utc.minute(), utc.hour())
}

/// Shared cron scheduler running every group's daily jobs.
#[derive(Clone)]
pub struct DailyScheduler {
    scheduler: JobScheduler,
}

impl DailyScheduler {
    pub async fn new() -> Result<Self, BotError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self { scheduler })
    }

    pub async fn start(&self) -> Result<(), BotError> {
        self.scheduler.start().await?;
        info!("Daily scheduler started");
        Ok(())
    }

    /// Adds a job running `action` each day at local time `at`.
    /// The UTC offset is fixed when the job is added.
    pub async fn add_daily<F, Fut>(&self, name: &str, at: NaiveTime, action: F) -> Result<Uuid, BotError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cron = daily_cron(at, *Local::now().offset());
        let job_name = name.to_string();

        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            debug!("Daily job '{}' firing", job_name);
            Box::pin(action())
        })?;
        let id = self.scheduler.add(job).await?;

        info!("Daily job '{}' scheduled at {} (cron '{}')", name, at.format("%H:%M"), cron);
        Ok(id)
    }

    pub async fn remove(&self, id: &Uuid) -> Result<(), BotError> {
        self.scheduler.remove(id).await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), BotError> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        info!("Daily scheduler stopped");
        Ok(())
    }
}
