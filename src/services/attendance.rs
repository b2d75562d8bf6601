//! Daily absence polling. Each evening the current day is closed (report to
//! the supervisor, poll removed from the group chat) and a poll for the next
//! day's lessons is posted and pinned.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::bot::chat::{Keyboard, PollAnswerEvent, PollRequest, SentPoll};
use crate::bot::commands::Command;
use crate::bot::registry::{ChatRegistry, ChatRole};
use crate::schedule::cache::ScheduleCache;
use crate::schedule::model::{EducationalActivity, Group};
use crate::services::display_names::DisplayNames;
use crate::utils::datetime::{format_date, format_time};
use crate::utils::logging::{log_delivery_failure, log_group_event};

/// Telegram caps polls at ten options.
pub const MAX_POLL_OPTIONS: usize = 10;
/// Added when only one lesson is scheduled, since polls need two options.
pub const ATTEND_ALL_OPTION: &str = "Буду на всех парах";
pub const NO_STATISTICS: &str = "Нет статистики";
pub const GROUP_CHAT_MISSING: &str = "Чат группы ещё не зарегистрирован";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub user_id: i64,
    pub username: Option<String>,
    /// One flag per activity of the day; `true` means present.
    pub statuses: Vec<bool>,
}

impl StudentRecord {
    fn new(user_id: i64, username: Option<String>, activity_count: usize) -> Self {
        Self {
            user_id,
            username,
            statuses: vec![true; activity_count],
        }
    }

    /// Replaces earlier answers; indices past the activity list are ignored.
    fn apply(&mut self, option_ids: &[usize]) {
        self.statuses.iter_mut().for_each(|present| *present = true);
        for &index in option_ids {
            if let Some(present) = self.statuses.get_mut(index) {
                *present = false;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub activities: Vec<EducationalActivity>,
    pub students: Vec<StudentRecord>,
    pub poll: Option<SentPoll>,
}

impl DayRecord {
    pub fn new(date: NaiveDate, mut activities: Vec<EducationalActivity>) -> Self {
        activities.truncate(MAX_POLL_OPTIONS);
        Self {
            date,
            activities,
            students: Vec::new(),
            poll: None,
        }
    }

    /// `None` when there is nothing to ask about.
    pub fn poll_request(&self) -> Option<PollRequest> {
        if self.activities.is_empty() {
            return None;
        }

        let mut options: Vec<String> = self.activities.iter().map(EducationalActivity::label).collect();
        if options.len() == 1 {
            options.push(ATTEND_ALL_OPTION.to_string());
        }

        Some(PollRequest {
            question: format!("Какие пары прогуливаешь {}?", format_date(self.date)),
            options,
            is_anonymous: false,
            allows_multiple_answers: true,
        })
    }

    /// Applies an answer if it belongs to this day's poll.
    pub fn record_answer(&mut self, answer: &PollAnswerEvent) -> bool {
        let matches = self
            .poll
            .as_ref()
            .is_some_and(|poll| poll.poll_id == answer.poll_id);
        if !matches {
            return false;
        }

        let activity_count = self.activities.len();
        let position = self.students.iter().position(|s| s.user_id == answer.user_id);
        let student = match position {
            Some(index) => &mut self.students[index],
            None => {
                self.students
                    .push(StudentRecord::new(answer.user_id, answer.username.clone(), activity_count));
                let last = self.students.len() - 1;
                &mut self.students[last]
            }
        };
        if answer.username.is_some() {
            student.username = answer.username.clone();
        }
        student.apply(&answer.option_ids);
        true
    }

    /// Per-activity list of absent students.
    pub fn report(&self, display_name: impl Fn(&StudentRecord) -> String) -> String {
        if self.activities.is_empty() {
            return NO_STATISTICS.to_string();
        }

        let mut report = format!("Статистика отсутствующих\n\nДата: {}\n\n", format_date(self.date));
        for (index, activity) in self.activities.iter().enumerate() {
            report.push_str(&format!("[{}] - {}\n", format_time(activity.start_time()), activity.name()));
            for student in self
                .students
                .iter()
                .filter(|s| !s.statuses.get(index).copied().unwrap_or(true))
            {
                report.push_str(&display_name(student));
                report.push('\n');
            }
            report.push('\n');
        }
        report.trim_end().to_string()
    }
}

pub struct AttendanceHandler {
    group: Group,
    registry: Arc<ChatRegistry>,
    schedules: Arc<ScheduleCache>,
    names: Arc<DisplayNames>,
    day: Mutex<Option<DayRecord>>,
}

impl AttendanceHandler {
    pub fn new(
        group: Group,
        registry: Arc<ChatRegistry>,
        schedules: Arc<ScheduleCache>,
        names: Arc<DisplayNames>,
    ) -> Self {
        Self {
            group,
            registry,
            schedules,
            names,
            day: Mutex::new(None),
        }
    }

    /// Scheduled evening rollover. Skipped until both chats are registered.
    pub async fn on_daily_trigger(&self, today: NaiveDate) {
        if !self.registry.is_ready(self.group.name()) {
            log_group_event(self.group.name(), "daily rollover skipped", Some("chats not registered"));
            return;
        }
        self.rollover(today).await;
    }

    /// Closes the current day and opens the one after `today`.
    pub async fn rollover(&self, today: NaiveDate) {
        let mut day = self.day.lock().await;
        self.close_day(&mut day).await;
        self.open_next_day(&mut day, today).await;
    }

    /// Supervisor commands this handler reacts to.
    pub async fn handle_command(&self, command: &Command, today: NaiveDate) {
        match command {
            Command::Stat => self.send_report().await,
            Command::Close => {
                if self.registry.is_ready(self.group.name()) {
                    self.rollover(today).await;
                } else {
                    self.notify_supervisor(GROUP_CHAT_MISSING).await;
                }
            }
            _ => {}
        }
    }

    pub async fn send_report(&self) {
        let day = self.day.lock().await;
        let report = self.report(day.as_ref());
        self.notify_supervisor(&report).await;
    }

    /// Returns whether the answer belonged to this group's open poll.
    pub async fn handle_poll_answer(&self, answer: &PollAnswerEvent) -> bool {
        let mut day = self.day.lock().await;
        let recorded = day.as_mut().is_some_and(|day| day.record_answer(answer));
        if recorded {
            debug!(
                "[{}] poll answer from {} recorded: {:?}",
                self.group, answer.user_id, answer.option_ids
            );
        }
        recorded
    }

    pub async fn current_day(&self) -> Option<DayRecord> {
        self.day.lock().await.clone()
    }

    fn report(&self, day: Option<&DayRecord>) -> String {
        match day {
            Some(day) => day.report(|student| self.display_name(student)),
            None => NO_STATISTICS.to_string(),
        }
    }

    fn display_name(&self, student: &StudentRecord) -> String {
        self.names
            .get(student.user_id)
            .or_else(|| student.username.as_ref().map(|username| format!("@{}", username)))
            .unwrap_or_else(|| student.user_id.to_string())
    }

    async fn close_day(&self, day: &mut Option<DayRecord>) {
        let report = self.report(day.as_ref());
        self.notify_supervisor(&report).await;

        let Some(closed) = day.take() else {
            return;
        };
        log_group_event(self.group.name(), "day closed", Some(&format_date(closed.date)));

        let (Some(poll), Some(chat)) = (closed.poll, self.registry.client(self.group.name(), ChatRole::Group))
        else {
            return;
        };
        if !chat.stop_poll(poll.message_id).await {
            debug!("[{}] poll {} was already closed", self.group, poll.message_id);
        }
        if !chat.delete_message(poll.message_id).await {
            debug!("[{}] poll message {} stays in the chat", self.group, poll.message_id);
        }
    }

    async fn open_next_day(&self, day: &mut Option<DayRecord>, today: NaiveDate) {
        let Some(date) = today.succ_opt() else {
            return;
        };

        let activities = match self.schedules.get_schedule(self.group.name()).await {
            Ok(Some(schedule)) => schedule.day_activities(date),
            Ok(None) => {
                warn!("No schedule found for group {}", self.group);
                Vec::new()
            }
            Err(e) => {
                warn!("Schedule lookup for group {} failed: {}", self.group, e);
                Vec::new()
            }
        };

        let mut record = DayRecord::new(date, activities);
        if let (Some(request), Some(chat)) = (
            record.poll_request(),
            self.registry.client(self.group.name(), ChatRole::Group),
        ) {
            match chat.send_poll(&request).await {
                Ok(sent) => {
                    if let Err(e) = chat.pin_message(sent.message_id).await {
                        log_delivery_failure("pin_message", chat.chat_id(), &e.to_string());
                    }
                    record.poll = Some(sent);
                }
                Err(e) => log_delivery_failure("send_poll", chat.chat_id(), &e.to_string()),
            }
        }

        log_group_event(
            self.group.name(),
            "day opened",
            Some(&format!("{} with {} lessons", format_date(date), record.activities.len())),
        );
        *day = Some(record);
    }

    async fn notify_supervisor(&self, text: &str) {
        let Some(chat) = self.registry.client(self.group.name(), ChatRole::Supervisor) else {
            return;
        };
        if let Err(e) = chat.send_text(text, Keyboard::Keep).await {
            log_delivery_failure("send_text", chat.chat_id(), &e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::model::LessonType;
    use chrono::NaiveTime;

    fn lesson(name: &str, hour: u32, minute: u32) -> EducationalActivity {
        EducationalActivity::new(
            name,
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            "Иванов",
            "А-1",
            LessonType::Lecture,
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 2).unwrap()
    }

    fn open_day(activities: Vec<EducationalActivity>) -> DayRecord {
        let mut day = DayRecord::new(date(), activities);
        day.poll = Some(SentPoll {
            message_id: 7,
            poll_id: "poll-1".to_string(),
        });
        day
    }

    fn answer(user_id: i64, option_ids: Vec<usize>) -> PollAnswerEvent {
        PollAnswerEvent {
            poll_id: "poll-1".to_string(),
            user_id,
            username: Some(format!("user{}", user_id)),
            option_ids,
        }
    }

    #[test]
    fn test_poll_request_options() {
        let day = DayRecord::new(date(), vec![lesson("Физика", 9, 0), lesson("Химия", 10, 40)]);
        let poll = day.poll_request().unwrap();

        assert_eq!(poll.question, "Какие пары прогуливаешь 02.05.2025?");
        assert_eq!(poll.options, vec!["[09:00] Физика", "[10:40] Химия"]);
        assert!(!poll.is_anonymous);
        assert!(poll.allows_multiple_answers);
    }

    #[test]
    fn test_poll_request_single_lesson_gets_filler() {
        let day = DayRecord::new(date(), vec![lesson("Физика", 9, 0)]);
        let poll = day.poll_request().unwrap();
        assert_eq!(poll.options, vec!["[09:00] Физика".to_string(), ATTEND_ALL_OPTION.to_string()]);
    }

    #[test]
    fn test_poll_request_empty_and_overfull_days() {
        assert!(DayRecord::new(date(), Vec::new()).poll_request().is_none());

        let many = (0..12).map(|i| lesson(&format!("Пара {}", i), 8, i)).collect();
        let day = DayRecord::new(date(), many);
        assert_eq!(day.activities.len(), MAX_POLL_OPTIONS);
        assert_eq!(day.poll_request().unwrap().options.len(), MAX_POLL_OPTIONS);
    }

    #[test]
    fn test_repeated_answers_replace_previous() {
        let mut day = open_day(vec![lesson("Физика", 9, 0), lesson("Химия", 10, 40)]);

        assert!(day.record_answer(&answer(1, vec![0, 1])));
        assert!(day.record_answer(&answer(1, vec![1])));
        assert!(day.record_answer(&answer(1, vec![1])));

        assert_eq!(day.students.len(), 1);
        assert_eq!(day.students[0].statuses, vec![true, false]);
    }

    #[test]
    fn test_retracted_vote_restores_presence() {
        let mut day = open_day(vec![lesson("Физика", 9, 0)]);
        day.record_answer(&answer(1, vec![0]));
        day.record_answer(&answer(1, Vec::new()));
        assert_eq!(day.students[0].statuses, vec![true]);
    }

    #[test]
    fn test_filler_option_is_not_an_absence() {
        let mut day = open_day(vec![lesson("Физика", 9, 0)]);
        day.record_answer(&answer(1, vec![1]));
        assert_eq!(day.students[0].statuses, vec![true]);
    }

    #[test]
    fn test_foreign_poll_answer_is_ignored() {
        let mut day = open_day(vec![lesson("Физика", 9, 0)]);
        let mut foreign = answer(1, vec![0]);
        foreign.poll_id = "other".to_string();

        assert!(!day.record_answer(&foreign));
        assert!(day.students.is_empty());
    }

    #[test]
    fn test_report_lists_absent_students_per_lesson() {
        let mut day = open_day(vec![lesson("Физика", 9, 0), lesson("Химия", 10, 40)]);
        day.record_answer(&answer(1, vec![0]));
        day.record_answer(&answer(2, vec![0, 1]));
        day.record_answer(&answer(3, Vec::new()));

        let report = day.report(|s| format!("@{}", s.username.clone().unwrap_or_default()));
        assert_eq!(
            report,
            "Статистика отсутствующих\n\nДата: 02.05.2025\n\n\
             [09:00] - Физика\n@user1\n@user2\n\n\
             [10:40] - Химия\n@user2"
        );
    }

    #[test]
    fn test_report_without_lessons() {
        let day = open_day(Vec::new());
        assert_eq!(day.report(|_| String::new()), NO_STATISTICS);
    }
}
