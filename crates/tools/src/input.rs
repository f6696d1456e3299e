use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;
use tripmate_core::dates::parse_event_time;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolInputError {
    #[error("expected {expected} `;`-separated fields but got {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid datetime `{0}`, expected ISO-8601 such as 2025-06-20T11:00:00+09:00")]
    InvalidDateTime(String),
    #[error("event ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: String, end: String },
}

/// Splits a tool input on `;` and trims each field. The count must match.
pub fn fields(input: &str, expected: usize) -> Result<Vec<&str>, ToolInputError> {
    let parts = input.split(';').map(str::trim).collect::<Vec<_>>();
    if parts.len() != expected {
        return Err(ToolInputError::FieldCount {
            expected,
            found: parts.len(),
        });
    }
    Ok(parts)
}

pub fn non_empty<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ToolInputError> {
    if value.is_empty() {
        Err(ToolInputError::Empty(field))
    } else {
        Ok(value)
    }
}

pub fn date(value: &str) -> Result<NaiveDate, ToolInputError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ToolInputError::InvalidDate(value.to_string()))
}

pub fn time_range(
    start: &str,
    end: &str,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), ToolInputError> {
    let start_at =
        parse_event_time(start).ok_or_else(|| ToolInputError::InvalidDateTime(start.to_string()))?;
    let end_at =
        parse_event_time(end).ok_or_else(|| ToolInputError::InvalidDateTime(end.to_string()))?;
    if end_at < start_at {
        return Err(ToolInputError::EndBeforeStart {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok((start_at, end_at))
}
