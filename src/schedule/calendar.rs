use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemesterSeason {
    Autumn,
    Spring,
}

impl SemesterSeason {
    /// Timetable headers mention "осеннего семестра" for autumn; anything else is spring.
    pub fn from_header(header: &str) -> Self {
        if header.to_lowercase().contains("осеннего") {
            SemesterSeason::Autumn
        } else {
            SemesterSeason::Spring
        }
    }
}

/// Semester date range. Weeks are counted from the Monday on or before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semester {
    start: NaiveDate,
    end: NaiveDate,
}

impl Semester {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Autumn runs Sep 1 to Dec 31, spring Feb 1 to May 31 of `year`.
    pub fn for_season(season: SemesterSeason, year: i32) -> Option<Self> {
        let (start, end) = match season {
            SemesterSeason::Autumn => (
                NaiveDate::from_ymd_opt(year, 9, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            ),
            SemesterSeason::Spring => (
                NaiveDate::from_ymd_opt(year, 2, 1)?,
                NaiveDate::from_ymd_opt(year, 5, 31)?,
            ),
        };
        Some(Self::new(start, end))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn first_monday(&self) -> NaiveDate {
        self.start - Duration::days(i64::from(self.start.weekday().num_days_from_monday()))
    }

    /// One-based week index; the week containing `first_monday` is week 1.
    /// Dates before the semester yield zero or negative numbers.
    pub fn week_number_of(&self, date: NaiveDate) -> i64 {
        (date - self.first_monday()).num_days().div_euclid(7) + 1
    }

    pub fn week_count(&self) -> u32 {
        u32::try_from(self.week_number_of(self.end)).unwrap_or(0)
    }

    pub fn odd_weeks(&self) -> BTreeSet<u32> {
        (1..=self.week_count()).filter(|week| week % 2 == 1).collect()
    }

    pub fn even_weeks(&self) -> BTreeSet<u32> {
        (1..=self.week_count()).filter(|week| week % 2 == 0).collect()
    }
}
