use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::database::connection::DatabaseManager;
use crate::database::models::DisplayName;
use crate::error::BotError;
use crate::utils::logging::log_database_operation;

/// User-chosen names shown in absence reports, persisted across restarts.
pub struct DisplayNames {
    db: DatabaseManager,
    names: RwLock<HashMap<i64, String>>,
}

impl DisplayNames {
    pub async fn load(db: DatabaseManager) -> Result<Self, BotError> {
        let names = DisplayName::find_all(&db.pool)
            .await?
            .into_iter()
            .map(|row| (row.user_id, row.full_name))
            .collect::<HashMap<_, _>>();
        log_database_operation("LOAD", "display_names", Some(&format!("{} names", names.len())));

        Ok(Self {
            db,
            names: RwLock::new(names),
        })
    }

    pub async fn set(&self, user_id: i64, name: &str) -> Result<(), BotError> {
        let name = name.trim();
        DisplayName::upsert(&self.db.pool, user_id, name).await?;
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, name.to_string());
        Ok(())
    }

    pub fn get(&self, user_id: i64) -> Option<String> {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }
}
