//! Human-readable date parsing.
//!
//! Parses strings like "2 days ago", "tomorrow", "in 1 week" into local
//! timestamps, relative to a caller-supplied `now`.

use chrono::{DateTime, Local, Months, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};

/// Parse a human-readable date relative to `now`.
///
/// Supports:
/// - RFC 3339: "2026-01-28T12:00:00Z"
/// - Local datetime: "2026-01-28 12:00:00" or "2026-01-28 12:00"
/// - Local date: "2026-01-28" (midnight)
/// - Relative past: "2 days ago", "1 week ago", "3 hours ago"
/// - Relative future: "in 2 days", "in 1 week"
/// - Named: "today", "yesterday", "tomorrow", "now"
///
/// Returns None if the string cannot be parsed.
pub fn parse_human_date(input: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local));
    }
    let input = input.to_lowercase();

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&input, format) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&input, "%Y-%m-%d") {
        return midnight(date);
    }

    // Named dates
    match input.as_str() {
        "now" => return Some(now),
        "today" => return midnight(now.date_naive()),
        "yesterday" => return midnight(now.date_naive().pred_opt()?),
        "tomorrow" => return midnight(now.date_naive().succ_opt()?),
        _ => {}
    }

    if let Some(rest) = input.strip_suffix(" ago") {
        let (num, unit) = split_amount(rest)?;
        return shift(now, unit, -num);
    }

    if let Some(rest) = input.strip_prefix("in ") {
        let (num, unit) = split_amount(rest)?;
        return shift(now, unit, num);
    }

    None
}

fn midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
}

/// Split "2 days" or "2days" into (2, "day").
fn split_amount(input: &str) -> Option<(i64, &str)> {
    let input = input.trim();
    let num_end = input.chars().take_while(|c| c.is_ascii_digit()).count();
    if num_end == 0 {
        return None;
    }
    let num: i64 = input[..num_end].parse().ok()?;
    let unit = input[num_end..].trim();
    let unit = unit.strip_suffix('s').unwrap_or(unit);
    if unit.is_empty() {
        return None;
    }
    Some((num, unit))
}

fn shift(now: DateTime<Local>, unit: &str, num: i64) -> Option<DateTime<Local>> {
    let fixed = match unit {
        "second" | "sec" => Some(TimeDelta::try_seconds(num)),
        "minute" | "min" => Some(TimeDelta::try_minutes(num)),
        "hour" | "hr" | "h" => Some(TimeDelta::try_hours(num)),
        _ => None,
    };
    if let Some(delta) = fixed {
        return now.checked_add_signed(delta?);
    }

    // Day-sized units move along the calendar, like review intervals do
    match unit {
        "day" | "d" => add_days(now, num),
        "week" | "wk" | "w" => add_days(now, num.checked_mul(7)?),
        "month" | "mon" => add_months(now, num),
        "year" | "yr" | "y" => add_months(now, num.checked_mul(12)?),
        _ => None,
    }
}

fn add_days(now: DateTime<Local>, days: i64) -> Option<DateTime<Local>> {
    let n = chrono::Days::new(days.unsigned_abs());
    if days >= 0 {
        now.checked_add_days(n)
    } else {
        now.checked_sub_days(n)
    }
}

fn add_months(now: DateTime<Local>, months: i64) -> Option<DateTime<Local>> {
    let n = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        now.checked_add_months(n)
    } else {
        now.checked_sub_months(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_local_datetime() {
        assert_eq!(
            parse_human_date("2026-01-28 12:00:00", noon()),
            Some(noon())
        );
        assert_eq!(parse_human_date("2026-01-28 12:00", noon()), Some(noon()));
    }

    #[test]
    fn test_date_only() {
        assert_eq!(
            parse_human_date("2026-01-28", noon()),
            Local.with_ymd_and_hms(2026, 1, 28, 0, 0, 0).earliest()
        );
    }

    #[test]
    fn test_rfc3339() {
        let parsed = parse_human_date("2026-01-28T12:00:00Z", noon()).unwrap();
        assert_eq!(parsed.timestamp(), 1_769_601_600);
    }

    #[test]
    fn test_named_dates() {
        assert_eq!(parse_human_date("now", noon()), Some(noon()));
        assert_eq!(
            parse_human_date("Tomorrow", noon()),
            Local.with_ymd_and_hms(2026, 1, 29, 0, 0, 0).earliest()
        );
        assert_eq!(
            parse_human_date("yesterday", noon()),
            Local.with_ymd_and_hms(2026, 1, 27, 0, 0, 0).earliest()
        );
    }

    #[test]
    fn test_relative() {
        assert_eq!(
            parse_human_date("in 3 days", noon()),
            Local.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).earliest()
        );
        assert_eq!(
            parse_human_date("2 weeks ago", noon()),
            Local.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).earliest()
        );
        assert_eq!(
            parse_human_date("in 1 month", noon()),
            Local.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).earliest()
        );
        assert_eq!(
            parse_human_date("30 minutes ago", noon()),
            Some(noon() - TimeDelta::minutes(30))
        );
        assert_eq!(
            parse_human_date("in 2d", noon()),
            Local.with_ymd_and_hms(2026, 1, 30, 12, 0, 0).earliest()
        );
    }

    #[test]
    fn test_out_of_range_amounts() {
        assert!(parse_human_date("in 3000000000000000 hours", noon()).is_none());
        assert!(parse_human_date("9223372036854775807 seconds ago", noon()).is_none());
        assert!(parse_human_date("in 99999999999 days", noon()).is_none());
        assert!(parse_human_date("in 99999999999999999999 minutes", noon()).is_none());
    }

    #[test]
    fn test_invalid() {
        assert!(parse_human_date("not a date", noon()).is_none());
        assert!(parse_human_date("in days", noon()).is_none());
        assert!(parse_human_date("3 fortnights ago", noon()).is_none());
    }
}
