use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DisplayName {
    pub user_id: i64,
    pub full_name: String,
    pub updated_at: String,
}

impl DisplayName {
    pub async fn upsert(pool: &sqlx::SqlitePool, user_id: i64, full_name: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO display_names (user_id, full_name, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET full_name = excluded.full_name, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(full_name)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_all(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DisplayName>("SELECT user_id, full_name, updated_at FROM display_names")
            .fetch_all(pool)
            .await
    }
}
