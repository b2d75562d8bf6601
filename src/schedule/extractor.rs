use chrono::{NaiveTime, Weekday};
use tracing::{debug, warn};

use crate::schedule::calendar::{Semester, SemesterSeason};
use crate::schedule::cell_parser::{parse_slot, SlotCells, WeekQualifier};
use crate::schedule::model::{ActivityDescriber, EducationalActivity, Group, GroupSchedule, LessonType};
use crate::schedule::sheet::SheetGrid;
use crate::utils::lazy_regex;

const LESSON_LIMIT: u32 = 7;
const ROW_LIMIT: u32 = 100;
const GROUP_SEARCH_DEPTH: u32 = 20;

/// `(column, row)` of the title naming the semester.
const HEADER_CELL: (u32, u32) = (2, 1);
const GROUP_NAME_ROW: u32 = 2;
const DAY_COLUMN: u32 = 1;
const LESSON_COLUMN: u32 = 2;
const START_TIME_COLUMN: u32 = 3;
const PARITY_COLUMN: u32 = 5;

/// Band symbols as printed in the parity column; index 0 runs on even weeks.
const BANDS: [&str; 2] = ["II", "I"];

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Sun, "воскресенье"),
    (Weekday::Mon, "понедельник"),
    (Weekday::Tue, "вторник"),
    (Weekday::Wed, "среда"),
    (Weekday::Thu, "четверг"),
    (Weekday::Fri, "пятница"),
    (Weekday::Sat, "суббота"),
];

/// A timetable row identified by weekday, lesson slot and week band.
#[derive(Debug, Clone)]
struct SlotRow {
    row: u32,
    weekday: Weekday,
    band: usize,
    start_time: String,
}

/// Pulls group schedules out of timetable sheets laid out one group per column block.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleExtractor {
    year: i32,
}

impl ScheduleExtractor {
    /// `year` anchors the semester date range.
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    pub fn extract_sheet(&self, sheet: &dyn SheetGrid) -> Vec<GroupSchedule> {
        let (column, row) = HEADER_CELL;
        let season = SemesterSeason::from_header(&sheet.cell(column, row));
        let Some(semester) = Semester::for_season(season, self.year) else {
            warn!("Cannot build {:?} semester for year {}", season, self.year);
            return Vec::new();
        };

        let slots = index_slots(sheet);
        let mut schedules = Vec::new();
        let mut offset = 0;

        while let Some((column, group)) = find_group_column(sheet, offset) {
            let describers = slots
                .iter()
                .flat_map(|slot| slot_describers(sheet, slot, column, &semester))
                .collect::<Vec<_>>();
            debug!(
                "Sheet '{}': group {} at column {} with {} lessons",
                sheet.name(),
                group,
                column,
                describers.len()
            );
            schedules.push(GroupSchedule { group, semester, describers });
            offset = column;
        }

        schedules
    }
}

/// Looks at most `GROUP_SEARCH_DEPTH` columns past `offset` for a group name.
fn find_group_column(sheet: &dyn SheetGrid, offset: u32) -> Option<(u32, Group)> {
    let re = lazy_regex!(r"\w\w\w\w-\d\d-\d\d");
    (1..=GROUP_SEARCH_DEPTH)
        .map(|step| offset + step)
        .find_map(|column| {
            let text = sheet.cell(column, GROUP_NAME_ROW);
            if re.is_match(&text) {
                Group::parse(&text).ok().map(|group| (column, group))
            } else {
                None
            }
        })
}

/// Walks the left-hand columns once, carrying merged day/slot/time values down.
fn index_slots(sheet: &dyn SheetGrid) -> Vec<SlotRow> {
    let mut slots: Vec<(SlotRow, u32)> = Vec::new();
    let mut current_weekday: Option<Weekday> = None;
    let mut lesson = String::new();
    let mut start_time = String::new();

    for row in 1..=ROW_LIMIT {
        // Only a recognised day name moves the current day; notes in the column are ignored.
        if let Some(weekday) = weekday_from_label(&sheet.cell(DAY_COLUMN, row)) {
            current_weekday = Some(weekday);
        }
        carry(&mut lesson, sheet.cell(LESSON_COLUMN, row));
        carry(&mut start_time, sheet.cell(START_TIME_COLUMN, row));

        let Some(weekday) = current_weekday else {
            continue;
        };
        let Ok(slot) = lesson.parse::<u32>() else {
            continue;
        };
        if !(1..=LESSON_LIMIT).contains(&slot) {
            continue;
        }
        let parity = sheet.cell(PARITY_COLUMN, row);
        let Some(band) = BANDS.iter().position(|symbol| *symbol == parity.trim()) else {
            continue;
        };

        let duplicate = slots
            .iter()
            .any(|(seen, seen_slot)| seen.weekday == weekday && seen.band == band && *seen_slot == slot);
        if !duplicate {
            slots.push((
                SlotRow {
                    row,
                    weekday,
                    band,
                    start_time: start_time.clone(),
                },
                slot,
            ));
        }
    }

    slots.into_iter().map(|(slot, _)| slot).collect()
}

fn carry(current: &mut String, value: String) {
    let value = value.trim();
    if !value.is_empty() {
        *current = value.to_string();
    }
}

fn weekday_from_label(label: &str) -> Option<Weekday> {
    let label = label.trim().to_lowercase();
    WEEKDAYS
        .iter()
        .find(|(_, name)| *name == label)
        .map(|(weekday, _)| *weekday)
}

fn slot_describers(
    sheet: &dyn SheetGrid,
    slot: &SlotRow,
    column: u32,
    semester: &Semester,
) -> Vec<ActivityDescriber> {
    let subject = sheet.cell(column, slot.row);
    let lesson_type = sheet.cell(column + 1, slot.row);
    let teacher = sheet.cell(column + 2, slot.row);
    let room = sheet.cell(column + 3, slot.row);

    let entries = parse_slot(SlotCells {
        subject: &subject,
        lesson_type: &lesson_type,
        teacher: &teacher,
        room: &room,
    });
    if entries.is_empty() {
        return Vec::new();
    }

    let Some(start_time) = parse_start_time(&slot.start_time) else {
        warn!(
            "Sheet '{}': unreadable start time '{}' at row {}, skipping slot",
            sheet.name(),
            slot.start_time,
            slot.row
        );
        return Vec::new();
    };

    let band_weeks = if slot.band % 2 == 0 {
        semester.even_weeks()
    } else {
        semester.odd_weeks()
    };

    entries
        .into_iter()
        .map(|entry| {
            let active_weeks = match &entry.weeks {
                WeekQualifier::None => band_weeks.clone(),
                WeekQualifier::Excluding(excluded) => band_weeks.difference(excluded).copied().collect(),
                WeekQualifier::Including(included) => included.clone(),
            };
            ActivityDescriber {
                activity: EducationalActivity::new(
                    entry.name,
                    start_time,
                    entry.teacher,
                    entry.room,
                    LessonType::from_code(&entry.lesson_type_code),
                ),
                active_weeks,
                weekday: slot.weekday,
            }
        })
        .collect()
}

/// Accepts `9-00`, `09-00` and `9:00`.
pub fn parse_start_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    let (hours, minutes) = text.split_once('-').or_else(|| text.split_once(':'))?;
    NaiveTime::from_hms_opt(hours.trim().parse().ok()?, minutes.trim().parse().ok()?, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_time_formats() {
        assert_eq!(parse_start_time("9-00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_start_time("10-40"), NaiveTime::from_hms_opt(10, 40, 0));
        assert_eq!(parse_start_time("12:40"), NaiveTime::from_hms_opt(12, 40, 0));
        assert!(parse_start_time("").is_none());
        assert!(parse_start_time("noon").is_none());
        assert!(parse_start_time("25-00").is_none());
    }

    #[test]
    fn test_weekday_labels() {
        assert_eq!(weekday_from_label("понедельник"), Some(Weekday::Mon));
        assert_eq!(weekday_from_label("воскресенье"), Some(Weekday::Sun));
        assert_eq!(weekday_from_label("monday"), None);
    }
}
