//! Splits the four cells describing a timetable slot into individual subject
//! entries, resolving subgroup continuations and week qualifiers such as
//! `кр. 5,7-9 н.` (all weeks except) and `3-4 н.` (only these weeks).

use std::collections::BTreeSet;

use tracing::warn;

use crate::utils::lazy_regex;

/// Raw text of one slot: subject, type, teacher and room cells.
#[derive(Debug, Clone, Copy)]
pub struct SlotCells<'a> {
    pub subject: &'a str,
    pub lesson_type: &'a str,
    pub teacher: &'a str,
    pub room: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeekQualifier {
    /// Regular band weeks apply.
    None,
    /// Band weeks minus these.
    Excluding(BTreeSet<u32>),
    /// Exactly these weeks, regardless of band.
    Including(BTreeSet<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectEntry {
    pub name: String,
    pub lesson_type_code: String,
    pub teacher: String,
    pub room: String,
    pub weeks: WeekQualifier,
}

impl SubjectEntry {
    pub fn included(&self) -> Option<&BTreeSet<u32>> {
        match &self.weeks {
            WeekQualifier::Including(weeks) => Some(weeks),
            _ => None,
        }
    }

    pub fn excluded(&self) -> Option<&BTreeSet<u32>> {
        match &self.weeks {
            WeekQualifier::Excluding(weeks) => Some(weeks),
            _ => None,
        }
    }
}

pub fn parse_slot(cells: SlotCells<'_>) -> Vec<SubjectEntry> {
    if is_restricted(cells.subject) {
        return Vec::new();
    }

    let subjects = merge_subgroup_continuations(split_parts(cells.subject));
    let types = split_parts(cells.lesson_type);
    let teachers = split_parts(cells.teacher);
    let rooms = split_parts(cells.room);

    subjects
        .iter()
        .enumerate()
        .map(|(index, subject)| {
            let (name, weeks) = classify_subject(subject);
            SubjectEntry {
                name,
                lesson_type_code: lesson_type_code(&pick(&types, index)),
                teacher: pick(&teachers, index),
                room: pick(&rooms, index),
                weeks,
            }
        })
        .collect()
}

/// Placeholder rows and military training never produce lessons.
pub fn is_restricted(text: &str) -> bool {
    text.contains(".....") || text.contains("………") || text.contains("военная") || text.contains("Военная")
}

/// Triple spaces act as line breaks in some exported sheets.
fn split_parts(text: &str) -> Vec<String> {
    text.replace("   ", "\n")
        .split('\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_subgroup_marker(text: &str) -> bool {
    lazy_regex!(r"\d\s?п/?г").is_match(text)
}

fn has_week_qualifier(text: &str) -> bool {
    lazy_regex!(r"\d.*\s?н\. ").is_match(text)
}

/// A line carrying only a subgroup marker continues the subject above it.
fn merge_subgroup_continuations(parts: Vec<String>) -> Vec<String> {
    let mut merged = Vec::with_capacity(parts.len());
    let mut iter = parts.into_iter().peekable();

    while let Some(part) = iter.next() {
        let continues = iter.peek().is_some_and(|next| {
            !has_subgroup_marker(&part) && has_subgroup_marker(next) && !has_week_qualifier(next)
        });
        if continues {
            if let Some(next) = iter.next() {
                merged.push(format!("{part} {next}"));
                continue;
            }
        }
        merged.push(part);
    }

    merged
}

/// Separates the subject name from a leading week qualifier.
pub fn classify_subject(text: &str) -> (String, WeekQualifier) {
    let excluding = lazy_regex!(r"кр\.?\s?(?P<weeks>\d.*)\s?н\. (?P<name>.*)");
    let including = lazy_regex!(r"(?P<weeks>\d.*)\s?н\. (?P<name>.*)");

    if let Some(caps) = excluding.captures(text) {
        let weeks = parse_week_expression(caps.name("weeks").map_or("", |m| m.as_str()));
        let name = caps.name("name").map_or("", |m| m.as_str()).trim().to_string();
        return (name, WeekQualifier::Excluding(weeks));
    }

    if let Some(caps) = including.captures(text) {
        let weeks = parse_week_expression(caps.name("weeks").map_or("", |m| m.as_str()));
        let name = caps.name("name").map_or("", |m| m.as_str()).trim().to_string();
        return (name, WeekQualifier::Including(weeks));
    }

    (text.trim().to_string(), WeekQualifier::None)
}

/// Parses lists like `1,3,5-9` or `2. 4. 6` into week numbers.
pub fn parse_week_expression(expression: &str) -> BTreeSet<u32> {
    let normalized = expression.replace('.', ",");
    let normalized = lazy_regex!(r"\s?-\s?").replace_all(&normalized, "-");
    let normalized = lazy_regex!(r",+").replace_all(&normalized, ",");
    let normalized = normalized.replace(' ', ",");

    let mut weeks = BTreeSet::new();
    for term in normalized.split(',').map(str::trim).filter(|term| !term.is_empty()) {
        match parse_week_term(term) {
            Some(range) => weeks.extend(range),
            None => warn!("Skipping unparseable week term '{}' in '{}'", term, expression),
        }
    }
    weeks
}

fn parse_week_term(term: &str) -> Option<std::ops::RangeInclusive<u32>> {
    match term.split_once('-') {
        Some((from, to)) => {
            let from: u32 = from.trim().parse().ok()?;
            let to: u32 = to.trim().parse().ok()?;
            Some(from..=to)
        }
        None => {
            let week: u32 = term.parse().ok()?;
            Some(week..=week)
        }
    }
}

/// First token of the type cell, before any `/`.
fn lesson_type_code(text: &str) -> String {
    text.split_whitespace()
        .next()
        .and_then(|token| token.split('/').next())
        .unwrap_or("")
        .to_string()
}

/// Columns with fewer lines than subjects repeat their first line.
fn pick(parts: &[String], index: usize) -> String {
    parts
        .get(index)
        .or_else(|| parts.first())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells<'a>(subject: &'a str, lesson_type: &'a str, teacher: &'a str, room: &'a str) -> SlotCells<'a> {
        SlotCells { subject, lesson_type, teacher, room }
    }

    fn weeks(values: &[u32]) -> BTreeSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_plain_subject() {
        let entries = parse_slot(cells("Физика", "ЛК", "Иванов И.И.", "А-101"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Физика");
        assert_eq!(entries[0].lesson_type_code, "ЛК");
        assert_eq!(entries[0].teacher, "Иванов И.И.");
        assert_eq!(entries[0].room, "А-101");
        assert_eq!(entries[0].weeks, WeekQualifier::None);
    }

    #[test]
    fn test_excluding_weeks() {
        let entries = parse_slot(cells("кр.5,7-9н. Физика", "ЛК", "", ""));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Физика");
        assert_eq!(entries[0].excluded(), Some(&weeks(&[5, 7, 8, 9])));
        assert!(entries[0].included().is_none());
    }

    #[test]
    fn test_including_weeks() {
        let entries = parse_slot(cells("3-4н. Химия", "ПР", "", ""));
        assert_eq!(entries[0].name, "Химия");
        assert_eq!(entries[0].included(), Some(&weeks(&[3, 4])));
        assert!(entries[0].excluded().is_none());
    }

    #[test]
    fn test_restricted_cells_yield_nothing() {
        assert!(parse_slot(cells(".....", "", "", "")).is_empty());
        assert!(parse_slot(cells("………", "", "", "")).is_empty());
        assert!(parse_slot(cells("Военная подготовка", "", "", "")).is_empty());
        assert!(parse_slot(cells("", "", "", "")).is_empty());
    }

    #[test]
    fn test_subgroup_continuation_merges() {
        let entries = parse_slot(cells("Информатика\n1 п/г", "ЛАБ", "Петров", "Б-2"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Информатика 1 п/г");
    }

    #[test]
    fn test_multiple_subjects_pad_columns() {
        let entries = parse_slot(cells(
            "1,3н. Физика\n2,4н. Химия",
            "ЛК\nПР",
            "Иванов",
            "А-1\nА-2",
        ));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Физика");
        assert_eq!(entries[1].name, "Химия");
        assert_eq!(entries[1].lesson_type_code, "ПР");
        assert_eq!(entries[1].teacher, "Иванов");
        assert_eq!(entries[1].room, "А-2");
    }

    #[test]
    fn test_triple_space_splits_lines() {
        let entries = parse_slot(cells("Физика   Химия", "ЛК   ПР", "", ""));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "Химия");
        assert_eq!(entries[1].lesson_type_code, "ПР");
    }

    #[test]
    fn test_week_expression_normalization() {
        assert_eq!(parse_week_expression("1,3,5"), weeks(&[1, 3, 5]));
        assert_eq!(parse_week_expression("2. 4. 6"), weeks(&[2, 4, 6]));
        assert_eq!(parse_week_expression("5 - 8"), weeks(&[5, 6, 7, 8]));
        assert_eq!(parse_week_expression("1,,2 "), weeks(&[1, 2]));
        assert_eq!(parse_week_expression("1,x,3"), weeks(&[1, 3]));
        assert!(parse_week_expression("").is_empty());
    }

    #[test]
    fn test_lesson_type_code_takes_first_token() {
        assert_eq!(lesson_type_code("ЛК/ПР"), "ЛК");
        assert_eq!(lesson_type_code(" ПР доп"), "ПР");
        assert_eq!(lesson_type_code(""), "");
    }
}
