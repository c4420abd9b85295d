use chrono::NaiveDate;

use crate::config::DateOrder;

const YEAR_FIRST_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DAY_FIRST_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST_FORMATS: [&str; 3] = ["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];

/// Whether the year is written out with four digits, first or last.
///
/// `%Y` also takes short years, which would read `1/2/24` as year 24.
fn has_full_year(date_part: &str) -> bool {
    let parts: Vec<&str> = date_part.split(|c| matches!(c, '-' | '/' | '.')).collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        && (parts[0].len() == 4 || parts[2].len() == 4)
}

/// Reads the calendar day out of a poll date.
///
/// Accepted shapes: `YYYY-MM-DD` and `YYYY/MM/DD`, `DD/MM/YYYY` or
/// `MM/DD/YYYY` depending on `order` (also with `-` or `.` separators), and
/// date-times whose date part is one of the above (`2024-03-01T10:00:00`,
/// `01/03/2024 10:00`). Days and months may omit the leading zero.
pub fn parse_calendar_date(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    // Drop a time part
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);
    if !has_full_year(date_part) {
        return None;
    }
    let ordered = match order {
        DateOrder::DayFirst => &DAY_FIRST_FORMATS,
        DateOrder::MonthFirst => &MONTH_FIRST_FORMATS,
    };
    YEAR_FIRST_FORMATS
        .iter()
        .chain(ordered.iter())
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}
