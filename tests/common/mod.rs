#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;

use attendance_bot::bot::chat::IncomingMessage;
use attendance_bot::bot::registry::ChatRole;
use attendance_bot::database::connection::DatabaseManager;
use attendance_bot::schedule::calendar::{Semester, SemesterSeason};
use attendance_bot::schedule::model::{ActivityDescriber, EducationalActivity, Group, GroupSchedule, LessonType};
use attendance_bot::services::group::GroupRuntime;
use attendance_bot::testing::{RecordingChat, TestHarness};
use chrono::{NaiveDate, NaiveTime, Weekday};
use tempfile::{tempdir, TempDir};

pub const GROUP: &str = "ИКБО-01-23";
pub const ADMIN_CHAT: i64 = 500;
pub const SUPERVISOR_CHAT: i64 = 700;
pub const GROUP_CHAT: i64 = -800;

pub async fn setup_test_db() -> (DatabaseManager, TempDir) {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await.unwrap();
    db_manager.run_migrations().await.unwrap();

    (db_manager, temp_dir)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday 01.09.2025, first day of the autumn semester.
pub fn monday() -> NaiveDate {
    date(2025, 9, 1)
}

pub fn lesson(name: &str, hour: u32, minute: u32) -> EducationalActivity {
    EducationalActivity::new(
        name,
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
        "Иванов И.И.",
        "А-1",
        LessonType::Lecture,
    )
}

/// Physics and chemistry every Tuesday of the autumn semester.
pub fn tuesday_schedule() -> GroupSchedule {
    let semester = Semester::for_season(SemesterSeason::Autumn, 2025).unwrap();
    let every_week: BTreeSet<u32> = (1..=semester.week_count()).collect();
    GroupSchedule {
        group: Group::parse(GROUP).unwrap(),
        semester,
        describers: vec![
            ActivityDescriber {
                activity: lesson("Химия", 10, 40),
                active_weeks: every_week.clone(),
                weekday: Weekday::Tue,
            },
            ActivityDescriber {
                activity: lesson("Физика", 9, 0),
                active_weeks: every_week,
                weekday: Weekday::Tue,
            },
        ],
    }
}

pub fn message(chat_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id,
        message_id: 42,
        from_id: Some(1001),
        username: Some("starosta".to_string()),
        text: Some(text.to_string()),
        document: None,
    }
}

/// A harness over a fresh database with the Tuesday schedule loaded.
pub async fn harness() -> (TestHarness, TempDir) {
    let (db, temp_dir) = setup_test_db().await;
    let attachments_dir = temp_dir.path().join("attachments");
    let harness = TestHarness::new(db, vec![tuesday_schedule()], attachments_dir)
        .await
        .unwrap();
    (harness, temp_dir)
}

/// Starts the group runtime and binds both of its chats directly.
pub async fn ready_group(harness: &TestHarness) -> (Arc<GroupRuntime>, Arc<RecordingChat>, Arc<RecordingChat>) {
    let runtime = harness.ctx.start_group(Group::parse(GROUP).unwrap()).await.unwrap();
    let supervisor = harness.chats.chat(SUPERVISOR_CHAT);
    let group = harness.chats.chat(GROUP_CHAT);
    let registry = &harness.ctx.services.registry;
    registry.bind(GROUP, ChatRole::Supervisor, supervisor.clone());
    registry.bind(GROUP, ChatRole::Group, group.clone());
    (runtime, supervisor, group)
}
