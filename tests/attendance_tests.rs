#![allow(clippy::unwrap_used)]

mod common;

use attendance_bot::bot::chat::PollAnswerEvent;
use attendance_bot::bot::handlers::message::dispatch_message;
use attendance_bot::bot::handlers::poll::dispatch_poll_answer;
use attendance_bot::bot::registry::ChatRole;
use attendance_bot::schedule::model::Group;
use attendance_bot::services::attendance::{GROUP_CHAT_MISSING, NO_STATISTICS};
use attendance_bot::testing::Outgoing;
use common::*;

fn answer(poll_id: &str, user_id: i64, option_ids: Vec<usize>) -> PollAnswerEvent {
    PollAnswerEvent {
        poll_id: poll_id.to_string(),
        user_id,
        username: Some(format!("student{}", user_id)),
        option_ids,
    }
}

#[tokio::test]
async fn test_rollover_posts_and_pins_poll_for_tomorrow() {
    let (harness, _temp_dir) = harness().await;
    let (runtime, supervisor, group) = ready_group(&harness).await;

    runtime.attendance.on_daily_trigger(monday()).await;

    // Nothing was open yet
    assert_eq!(supervisor.texts(), vec![NO_STATISTICS.to_string()]);

    let polls = group.polls();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].question, "Какие пары прогуливаешь 02.09.2025?");
    assert_eq!(polls[0].options, vec!["[09:00] Физика", "[10:40] Химия"]);
    assert!(!polls[0].is_anonymous);
    assert!(polls[0].allows_multiple_answers);
    assert!(group.outgoing().contains(&Outgoing::Pin(1)));

    let day = runtime.attendance.current_day().await.unwrap();
    assert_eq!(day.date, date(2025, 9, 2));
    assert_eq!(day.poll.unwrap().message_id, 1);
}

#[tokio::test]
async fn test_answers_end_up_in_supervisor_report() {
    let (harness, _temp_dir) = harness().await;
    let (runtime, supervisor, group) = ready_group(&harness).await;
    harness.ctx.services.names.set(11, "Иванов Иван").await.unwrap();

    runtime.attendance.on_daily_trigger(monday()).await;
    let poll_id = format!("poll-{}-1", GROUP_CHAT);

    assert!(dispatch_poll_answer(&harness.ctx, &answer(&poll_id, 11, vec![1])).await);
    assert!(dispatch_poll_answer(&harness.ctx, &answer(&poll_id, 12, vec![0, 1])).await);
    assert!(dispatch_poll_answer(&harness.ctx, &answer(&poll_id, 13, vec![])).await);
    assert!(!dispatch_poll_answer(&harness.ctx, &answer("unknown-poll", 14, vec![0])).await);

    supervisor.clear();
    group.clear();
    runtime.attendance.on_daily_trigger(date(2025, 9, 2)).await;

    assert_eq!(
        supervisor.texts(),
        vec!["Статистика отсутствующих\n\nДата: 02.09.2025\n\n\
              [09:00] - Физика\n@student12\n\n\
              [10:40] - Химия\nИванов Иван\n@student12"
            .to_string()]
    );

    // The old poll is stopped and removed; Wednesday has no lessons so no new poll
    assert_eq!(group.outgoing(), vec![Outgoing::StopPoll(1), Outgoing::Delete(1)]);
    let day = runtime.attendance.current_day().await.unwrap();
    assert_eq!(day.date, date(2025, 9, 3));
    assert!(day.activities.is_empty());
    assert!(day.poll.is_none());
}

#[tokio::test]
async fn test_daily_trigger_waits_for_both_chats() {
    let (harness, _temp_dir) = harness().await;
    let runtime = harness.ctx.start_group(Group::parse(GROUP).unwrap()).await.unwrap();
    let supervisor = harness.chats.chat(SUPERVISOR_CHAT);
    harness
        .ctx
        .services
        .registry
        .bind(GROUP, ChatRole::Supervisor, supervisor.clone());

    runtime.attendance.on_daily_trigger(monday()).await;

    assert!(supervisor.outgoing().is_empty());
    assert!(runtime.attendance.current_day().await.is_none());
}

#[tokio::test]
async fn test_failed_poll_deletion_does_not_stop_rollover() {
    let (harness, _temp_dir) = harness().await;
    let (runtime, _supervisor, group) = ready_group(&harness).await;
    group.fail_deletes();

    runtime.attendance.on_daily_trigger(monday()).await;
    runtime.attendance.on_daily_trigger(date(2025, 9, 8)).await;

    let outgoing = group.outgoing();
    assert!(outgoing.contains(&Outgoing::StopPoll(1)));
    assert!(!outgoing.iter().any(|item| matches!(item, Outgoing::Delete(_))));
    assert_eq!(group.polls().len(), 2);
    assert_eq!(runtime.attendance.current_day().await.unwrap().date, date(2025, 9, 9));
}

#[tokio::test]
async fn test_stat_command_from_supervisor() {
    let (harness, _temp_dir) = harness().await;
    let (runtime, supervisor, _group) = ready_group(&harness).await;
    runtime.attendance.on_daily_trigger(monday()).await;
    supervisor.clear();

    dispatch_message(&harness.ctx, message(SUPERVISOR_CHAT, "/стат"), monday())
        .await
        .unwrap();

    let report = supervisor.last_text().unwrap();
    assert!(report.starts_with("Статистика отсутствующих\n\nДата: 02.09.2025"));
    assert!(report.contains("[09:00] - Физика"));
}

#[tokio::test]
async fn test_stat_from_group_chat_is_ignored() {
    let (harness, _temp_dir) = harness().await;
    let (_runtime, supervisor, group) = ready_group(&harness).await;

    dispatch_message(&harness.ctx, message(GROUP_CHAT, "/стат"), monday())
        .await
        .unwrap();

    assert!(supervisor.outgoing().is_empty());
    assert!(group.outgoing().is_empty());
}

#[tokio::test]
async fn test_close_command_rolls_the_day_over() {
    let (harness, _temp_dir) = harness().await;
    let (runtime, supervisor, group) = ready_group(&harness).await;

    dispatch_message(&harness.ctx, message(SUPERVISOR_CHAT, "/закрыть"), monday())
        .await
        .unwrap();

    assert_eq!(supervisor.texts()[0], NO_STATISTICS);
    assert_eq!(group.polls().len(), 1);
    assert_eq!(runtime.attendance.current_day().await.unwrap().date, date(2025, 9, 2));
}

#[tokio::test]
async fn test_close_without_group_chat_is_refused() {
    let (harness, _temp_dir) = harness().await;
    let runtime = harness.ctx.start_group(Group::parse(GROUP).unwrap()).await.unwrap();
    let supervisor = harness.chats.chat(SUPERVISOR_CHAT);
    harness
        .ctx
        .services
        .registry
        .bind(GROUP, ChatRole::Supervisor, supervisor.clone());

    dispatch_message(&harness.ctx, message(SUPERVISOR_CHAT, "/закрыть"), monday())
        .await
        .unwrap();

    assert_eq!(supervisor.texts(), vec![GROUP_CHAT_MISSING.to_string()]);
    assert!(runtime.attendance.current_day().await.is_none());
}
