use chrono::{Datelike, Duration, Months, NaiveDate};

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Resolves an extracted date phrase against `today`. Month-day phrases
/// without a year roll over to next year once the date has passed.
pub fn resolve_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.trim().to_lowercase();

    match lower.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.checked_add_signed(Duration::days(1)),
        "next week" => return today.checked_add_signed(Duration::days(7)),
        "next month" => return today.checked_add_months(Months::new(1)),
        _ => {}
    }

    if lower.len() == 10 && lower.as_bytes()[4] == b'-' {
        if let Ok(date) = NaiveDate::parse_from_str(&lower, "%Y-%m-%d") {
            return Some(date);
        }
    }

    parse_numeric(&lower).or_else(|| parse_month_day(&lower, today))
}

/// `m/d/yy`, `m/d/yyyy`, or the same with dashes.
fn parse_numeric(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split(|c| c == '/' || c == '-').collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_month_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let mut words = text.split_whitespace();
    let month_name = words.next()?;
    let day_token = words.next()?;

    let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    let day: u32 = day_token
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()?;

    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year >= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_relative_phrases() {
        let today = day(2026, 1, 31);
        assert_eq!(resolve_date("Today", today), Some(today));
        assert_eq!(resolve_date("tomorrow", today), Some(day(2026, 2, 1)));
        assert_eq!(resolve_date("next week", today), Some(day(2026, 2, 7)));
        // clamps to the end of February
        assert_eq!(resolve_date("next month", today), Some(day(2026, 2, 28)));
    }

    #[test]
    fn test_absolute_formats() {
        let today = day(2026, 6, 1);
        assert_eq!(resolve_date("2026-07-04", today), Some(day(2026, 7, 4)));
        assert_eq!(resolve_date("12/25/2026", today), Some(day(2026, 12, 25)));
        assert_eq!(resolve_date("1-5-27", today), Some(day(2027, 1, 5)));
    }

    #[test]
    fn test_month_day_rolls_forward() {
        let today = day(2026, 6, 1);
        assert_eq!(resolve_date("July 4th", today), Some(day(2026, 7, 4)));
        assert_eq!(resolve_date("march 3", today), Some(day(2027, 3, 3)));
    }

    #[test]
    fn test_unparseable() {
        let today = day(2026, 6, 1);
        assert_eq!(resolve_date("someday", today), None);
        assert_eq!(resolve_date("13/45/2026", today), None);
        assert_eq!(resolve_date("february 30", today), None);
    }
}
