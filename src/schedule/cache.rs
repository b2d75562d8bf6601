use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::error::BotError;
use crate::schedule::model::GroupSchedule;
use crate::schedule::source::ScheduleSource;

/// Lazily filled, explicitly refreshable set of group schedules.
pub struct ScheduleCache {
    source: Arc<dyn ScheduleSource>,
    schedules: RwLock<Vec<Arc<GroupSchedule>>>,
    refresh: Mutex<()>,
}

impl ScheduleCache {
    pub fn new(source: Arc<dyn ScheduleSource>) -> Self {
        Self {
            source,
            schedules: RwLock::new(Vec::new()),
            refresh: Mutex::new(()),
        }
    }

    /// Case-insensitive lookup by group name. Fills the cache on first use.
    pub async fn get_schedule(&self, group_name: &str) -> Result<Option<Arc<GroupSchedule>>, BotError> {
        self.ensure_filled().await?;
        let schedules = self.schedules.read().await;
        Ok(schedules
            .iter()
            .find(|schedule| schedule.group.matches(group_name))
            .cloned())
    }

    pub async fn all_schedules(&self) -> Result<Vec<Arc<GroupSchedule>>, BotError> {
        self.ensure_filled().await?;
        Ok(self.schedules.read().await.clone())
    }

    /// Re-extracts from the source and replaces the cached set. Returns the new count.
    pub async fn update(&self) -> Result<usize, BotError> {
        let _guard = self.refresh.lock().await;
        self.reload().await
    }

    /// Number of schedules currently held, without triggering a fill.
    pub async fn cached_count(&self) -> usize {
        self.schedules.read().await.len()
    }

    async fn ensure_filled(&self) -> Result<(), BotError> {
        if !self.schedules.read().await.is_empty() {
            return Ok(());
        }
        let _guard = self.refresh.lock().await;
        // Another caller may have filled it while we waited
        if self.schedules.read().await.is_empty() {
            self.reload().await?;
        }
        Ok(())
    }

    async fn reload(&self) -> Result<usize, BotError> {
        let fresh: Vec<Arc<GroupSchedule>> = self
            .source
            .fetch_schedules()
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        let count = fresh.len();
        *self.schedules.write().await = fresh;
        info!("Schedule cache holds {} group schedules", count);
        Ok(count)
    }
}
