use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

use crate::schedule::model::{Activity, EducationalActivity, LessonType};
use crate::services::attachments::AttachmentRecord;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub id: String,
    pub group_name: String,
    pub lesson_date: String,
    pub activity_name: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub teacher: String,
    pub room: String,
    pub lesson_type: String,
    pub comment: String,
    pub file_path: Option<String>,
    pub created_at: String,
}

impl StoredAttachment {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        group_name: &str,
        record: &AttachmentRecord,
    ) -> Result<(), sqlx::Error> {
        let activity = &record.activity;
        sqlx::query(
            r#"
            INSERT INTO attachments (id, group_name, lesson_date, activity_name, start_time, duration_minutes,
                                     teacher, room, lesson_type, comment, file_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(group_name)
        .bind(record.date.format("%Y-%m-%d").to_string())
        .bind(activity.name())
        .bind(activity.start_time().format("%H:%M").to_string())
        .bind(activity.activity.duration.num_minutes())
        .bind(&activity.teacher)
        .bind(&activity.room)
        .bind(activity.lesson_type.as_str())
        .bind(&record.comment)
        .bind(record.attachment.as_ref().map(|path| path.display().to_string()))
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_group(pool: &sqlx::SqlitePool, group_name: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, StoredAttachment>(
            "SELECT id, group_name, lesson_date, activity_name, start_time, duration_minutes, teacher, room,
                    lesson_type, comment, file_path, created_at
             FROM attachments WHERE group_name = ? ORDER BY lesson_date, start_time, created_at",
        )
        .bind(group_name)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &sqlx::SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id.to_string())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rebuilds the in-memory record; rows with unreadable dates or ids are skipped.
    pub fn into_record(self) -> Option<AttachmentRecord> {
        let parsed = (
            Uuid::parse_str(&self.id).ok(),
            NaiveDate::parse_from_str(&self.lesson_date, "%Y-%m-%d").ok(),
            NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok(),
        );
        let (Some(id), Some(date), Some(start_time)) = parsed else {
            warn!("Skipping malformed attachment row {}", self.id);
            return None;
        };

        Some(AttachmentRecord {
            id,
            date,
            activity: EducationalActivity {
                activity: Activity::new(self.activity_name, start_time, Duration::minutes(self.duration_minutes)),
                teacher: self.teacher,
                room: self.room,
                lesson_type: LessonType::from_stored(&self.lesson_type),
            },
            comment: self.comment,
            attachment: self.file_path.map(PathBuf::from),
        })
    }
}
