use chrono::{Datelike, NaiveDate, NaiveTime};


/// Formats a date the way chat users write it: `dd.mm.yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parses `dd.mm` or `dd.mm.yyyy` out of free text. A missing year falls back to
/// the year of `today`.
pub fn parse_day_month(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let re = lazy_regex!(r"(?P<day>\d\d)\.(?P<month>\d\d)(?:\.(?P<year>\d\d\d\d))?");
    let caps = re.captures(text)?;

    let day: u32 = caps.name("day")?.as_str().parse().ok()?;
    let month: u32 = caps.name("month")?.as_str().parse().ok()?;
    let year: i32 = match caps.name("year") {
        Some(year) => year.as_str().parse().ok()?,
        None => today.year(),
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a wall-clock time written as `HH:MM`.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_date_and_time() {
        assert_eq!(format_date(date(2025, 5, 2)), "02.05.2025");
        assert_eq!(format_time(NaiveTime::from_hms_opt(9, 5, 0).unwrap()), "09:05");
    }

    #[test]
    fn test_parse_day_month_defaults_year() {
        let today = date(2025, 3, 10);
        assert_eq!(parse_day_month("02.04", today), Some(date(2025, 4, 2)));
        assert_eq!(parse_day_month("02.04.2024", today), Some(date(2024, 4, 2)));
        assert_eq!(parse_day_month("на 15.05 пожалуйста", today), Some(date(2025, 5, 15)));
    }

    #[test]
    fn test_parse_day_month_rejects_garbage() {
        let today = date(2025, 3, 10);
        assert_eq!(parse_day_month("завтра", today), None);
        assert_eq!(parse_day_month("31.02", today), None);
        assert_eq!(parse_day_month("5.4", today), None);
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("19:00"), NaiveTime::from_hms_opt(19, 0, 0));
        assert_eq!(parse_clock_time(" 07:30 "), NaiveTime::from_hms_opt(7, 30, 0));
        assert!(parse_clock_time("25:00").is_none());
        assert!(parse_clock_time("evening").is_none());
    }
}
