use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::bot::registry::ChatRole;

/// A registered group with the hashes of its two registration tokens.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StoredGroup {
    pub name: String,
    pub supervisor_token_hash: String,
    pub group_token_hash: String,
    pub supervisor_chat_id: Option<i64>,
    pub group_chat_id: Option<i64>,
    pub created_at: String,
}

impl StoredGroup {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        name: &str,
        supervisor_token_hash: &str,
        group_token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO groups (name, supervisor_token_hash, group_token_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(supervisor_token_hash)
        .bind(group_token_hash)
        .bind(&now)
        .execute(pool)
        .await?;

        Self::find_by_name(pool, name)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Case-insensitive lookup. Done in Rust since SQLite's `lower()` only folds ASCII.
    pub async fn find_by_name(pool: &sqlx::SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let wanted = name.trim().to_lowercase();
        Ok(Self::find_all(pool)
            .await?
            .into_iter()
            .find(|group| group.name.to_lowercase() == wanted))
    }

    pub async fn find_all(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StoredGroup>(
            "SELECT name, supervisor_token_hash, group_token_hash, supervisor_chat_id, group_chat_id, created_at
             FROM groups ORDER BY created_at",
        )
        .fetch_all(pool)
        .await
    }

    /// Stores `chat_id` for the role, releasing any other group or role it held.
    pub async fn bind_chat(
        pool: &sqlx::SqlitePool,
        name: &str,
        role: ChatRole,
        chat_id: i64,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE groups SET supervisor_chat_id = NULL WHERE supervisor_chat_id = ?")
            .bind(chat_id)
            .execute(&mut tx)
            .await?;
        sqlx::query("UPDATE groups SET group_chat_id = NULL WHERE group_chat_id = ?")
            .bind(chat_id)
            .execute(&mut tx)
            .await?;

        let query = match role {
            ChatRole::Supervisor => "UPDATE groups SET supervisor_chat_id = ? WHERE name = ?",
            ChatRole::Group => "UPDATE groups SET group_chat_id = ? WHERE name = ?",
        };
        sqlx::query(query).bind(chat_id).bind(name).execute(&mut tx).await?;

        tx.commit().await
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM groups")
            .fetch_one(pool)
            .await
    }
}
