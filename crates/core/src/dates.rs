use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

const KST_OFFSET_SECONDS: i32 = 9 * 3600;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일",
        r"(\d{2})년\s*(\d{1,2})월\s*(\d{1,2})일",
        r"(\d{4})-(\d{1,2})-(\d{1,2})",
        r"(\d{2})/(\d{1,2})/(\d{1,2})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid date regex"))
    .collect()
});

pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECONDS).expect("nine hours is a valid utc offset")
}

/// Absolute Korean or numeric date → calendar date. Two-digit years are 20xx.
pub fn parse_korean_date(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(text)?;
        let year_raw = captures.get(1)?.as_str();
        let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
        let day = captures.get(3)?.as_str().parse::<u32>().ok()?;
        let year = if year_raw.len() == 2 {
            2000 + year_raw.parse::<i32>().ok()?
        } else {
            year_raw.parse::<i32>().ok()?
        };
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Like [`parse_korean_date`] but also understands 오늘/내일/모레.
pub fn extract_date_from_input(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = parse_korean_date(text) {
        return Some(date);
    }

    if text.contains("오늘") {
        Some(today)
    } else if text.contains("내일") {
        Some(today + Duration::days(1))
    } else if text.contains("모레") {
        Some(today + Duration::days(2))
    } else {
        None
    }
}

/// ISO-8601 date-time; a missing offset is read as Korea Standard Time.
pub fn parse_event_time(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(|naive| kst().from_local_datetime(&naive).single())
}

pub fn validate_datetime(value: &str) -> bool {
    parse_event_time(value).is_some()
}
