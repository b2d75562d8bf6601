use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use crate::error::BotError;
use crate::schedule::calendar::Semester;
use crate::utils::datetime::format_time;
use crate::utils::lazy_regex;

/// Default length of a university lesson.
pub fn lesson_duration() -> Duration {
    Duration::minutes(90)
}

/// Study group identifier such as `ИКБО-01-22`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    name: String,
}

impl Group {
    /// Extracts the first `XXXX-NN-NN` token from `text`.
    pub fn parse(text: &str) -> Result<Self, BotError> {
        let re = lazy_regex!(r"\w\w\w\w-\d\d-\d\d");
        re.find(text)
            .map(|m| Group { name: m.as_str().to_string() })
            .ok_or_else(|| BotError::InvalidGroupName(text.trim().to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive name comparison, used when looking schedules up.
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    /// Normalized key for maps keyed by group.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonType {
    Lab,
    Lecture,
    Practice,
    AutonomousWork,
    Undefined,
}

impl LessonType {
    /// Maps the abbreviation found in the timetable's type column.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "ЛБ" | "ЛАБ" => LessonType::Lab,
            "Л" | "ЛК" | "ЛЕК" => LessonType::Lecture,
            "П" | "ПР" => LessonType::Practice,
            "СР" => LessonType::AutonomousWork,
            _ => LessonType::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LessonType::Lab => "lab",
            LessonType::Lecture => "lecture",
            LessonType::Practice => "practice",
            LessonType::AutonomousWork => "autonomous_work",
            LessonType::Undefined => "undefined",
        }
    }

    pub fn from_stored(value: &str) -> Self {
        match value {
            "lab" => LessonType::Lab,
            "lecture" => LessonType::Lecture,
            "practice" => LessonType::Practice,
            "autonomous_work" => LessonType::AutonomousWork,
            _ => LessonType::Undefined,
        }
    }
}

/// A named, timed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: Uuid,
    pub name: String,
    pub start_time: NaiveTime,
    pub duration: Duration,
}

impl Activity {
    pub fn new(name: impl Into<String>, start_time: NaiveTime, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_time,
            duration,
        }
    }
}

/// A lesson: an activity plus who teaches it, where, and in what form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EducationalActivity {
    pub activity: Activity,
    pub teacher: String,
    pub room: String,
    pub lesson_type: LessonType,
}

impl EducationalActivity {
    pub fn new(
        name: impl Into<String>,
        start_time: NaiveTime,
        teacher: impl Into<String>,
        room: impl Into<String>,
        lesson_type: LessonType,
    ) -> Self {
        Self {
            activity: Activity::new(name, start_time, lesson_duration()),
            teacher: teacher.into(),
            room: room.into(),
            lesson_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.activity.name
    }

    pub fn start_time(&self) -> NaiveTime {
        self.activity.start_time
    }

    /// `[HH:MM] name`, the form used for poll options and keyboards.
    pub fn label(&self) -> String {
        format!("[{}] {}", format_time(self.start_time()), self.name())
    }
}

/// Binds a lesson to the weekday and week numbers it occurs on.
#[derive(Debug, Clone)]
pub struct ActivityDescriber {
    pub activity: EducationalActivity,
    pub active_weeks: BTreeSet<u32>,
    pub weekday: Weekday,
}

impl ActivityDescriber {
    pub fn occurs_on(&self, date: NaiveDate, semester: &Semester) -> bool {
        if date.weekday() != self.weekday {
            return false;
        }
        u32::try_from(semester.week_number_of(date))
            .map(|week| self.active_weeks.contains(&week))
            .unwrap_or(false)
    }
}

/// Everything one group has over one semester.
#[derive(Debug, Clone)]
pub struct GroupSchedule {
    pub group: Group,
    pub semester: Semester,
    pub describers: Vec<ActivityDescriber>,
}

impl GroupSchedule {
    /// Lessons taking place on `date`, ordered by start time.
    pub fn day_activities(&self, date: NaiveDate) -> Vec<EducationalActivity> {
        let mut activities: Vec<EducationalActivity> = self
            .describers
            .iter()
            .filter(|describer| describer.occurs_on(date, &self.semester))
            .map(|describer| describer.activity.clone())
            .collect();
        activities.sort_by_key(|activity| activity.start_time());
        activities
    }
}
