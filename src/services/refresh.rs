use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::schedule::cache::ScheduleCache;

/// Periodically re-extracts every group's schedule so timetable changes are picked up.
pub struct ScheduleRefreshService {
    schedules: Arc<ScheduleCache>,
    scheduler: JobScheduler,
}

impl ScheduleRefreshService {
    pub async fn new(schedules: Arc<ScheduleCache>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self { schedules, scheduler })
    }

    /// `cron` uses the six-field form with seconds, evaluated in UTC.
    pub async fn start(&mut self, cron: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let schedules = self.schedules.clone();

        let refresh_job = Job::new_async(cron, move |_uuid, _l| {
            let schedules = schedules.clone();
            Box::pin(async move {
                match schedules.update().await {
                    Ok(count) => tracing::info!("Scheduled refresh loaded {} group schedules", count),
                    Err(e) => tracing::error!("Scheduled schedule refresh failed: {}", e),
                }
            })
        })?;

        self.scheduler.add(refresh_job).await?;
        self.scheduler.start().await?;

        tracing::info!("Schedule refresh service started with cron '{}'", cron);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}
