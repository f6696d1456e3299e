use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tripmate_agents::{ToolContext, ToolHandler};
use tripmate_core::dates::kst;
use uuid::Uuid;

use crate::input::{self, ToolInputError};

const UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("event `{0}` not found")]
    NotFound(String),
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Events overlapping `[from, to]`, ordered by start.
    async fn events_between(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>>;

    async fn upcoming(&self, from: DateTime<FixedOffset>, limit: usize)
        -> Result<Vec<CalendarEvent>>;

    async fn insert(
        &self,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent>;

    async fn update(
        &self,
        id: &str,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Process-local calendar. Times are normalised to +09:00.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: RwLock<Vec<CalendarEvent>>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl CalendarService for MemoryCalendar {
    async fn events_between(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut events = self
            .events
            .read()
            .iter()
            .filter(|event| event.end >= from && event.start <= to)
            .cloned()
            .collect::<Vec<_>>();
        events.sort_by_key(|event| event.start);
        Ok(events)
    }

    async fn upcoming(
        &self,
        from: DateTime<FixedOffset>,
        limit: usize,
    ) -> Result<Vec<CalendarEvent>> {
        let mut events = self
            .events
            .read()
            .iter()
            .filter(|event| event.end >= from)
            .cloned()
            .collect::<Vec<_>>();
        events.sort_by_key(|event| event.start);
        events.truncate(limit);
        Ok(events)
    }

    async fn insert(
        &self,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent> {
        let event = CalendarEvent {
            id: Uuid::new_v4().simple().to_string(),
            title: title.to_string(),
            start: start.with_timezone(&kst()),
            end: end.with_timezone(&kst()),
        };
        self.events.write().push(event.clone());
        Ok(event)
    }

    async fn update(
        &self,
        id: &str,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent> {
        let mut events = self.events.write();
        let event = events
            .iter_mut()
            .find(|event| event.id == id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))?;
        event.title = title.to_string();
        event.start = start.with_timezone(&kst());
        event.end = end.with_timezone(&kst());
        Ok(event.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|event| event.id != id);
        if events.len() == before {
            return Err(CalendarError::NotFound(id.to_string()).into());
        }
        Ok(())
    }
}

pub(crate) fn now_kst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&kst())
}

async fn find_same_day(
    calendar: &dyn CalendarService,
    title: &str,
    date: NaiveDate,
) -> Result<Option<CalendarEvent>> {
    let zone = kst();
    let day_start = zone
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single();
    let day_end = NaiveTime::from_hms_opt(23, 59, 59)
        .and_then(|time| zone.from_local_datetime(&date.and_time(time)).single());
    let (Some(from), Some(to)) = (day_start, day_end) else {
        return Ok(None);
    };

    Ok(calendar
        .events_between(from, to)
        .await?
        .into_iter()
        .find(|event| event.title.trim() == title))
}

/// Creates an event, replacing one with the same title on the same day.
pub(crate) async fn create_event(calendar: &dyn CalendarService, input: &str) -> Result<String> {
    let parts = input::fields(input, 3)?;
    let title = input::non_empty(parts[0], "title")?;
    let (start, end) = match input::time_range(parts[1], parts[2]) {
        Ok(range) => range,
        Err(ToolInputError::InvalidDateTime(_)) => {
            return Ok(format!("❌ 잘못된 날짜 형식입니다: {}, {}", parts[1], parts[2]));
        }
        Err(error) => return Err(error.into()),
    };

    let local_start = start.with_timezone(&kst());
    let mut notes = String::new();
    if let Some(existing) = find_same_day(calendar, title, local_start.date_naive()).await? {
        calendar.delete(&existing.id).await?;
        info!(event_id = %existing.id, title, "replaced same-day event");
        notes.push_str(&format!("🔄 기존 '{title}' 일정을 교체했습니다.\n"));
    }

    let created = calendar.insert(title, start, end).await?;
    Ok(format!(
        "{notes}✅ '{}' 일정이 {}~{}에 성공적으로 등록되었습니다!",
        created.title,
        created.start.format("%m월 %d일 %H:%M"),
        created.end.format("%H:%M"),
    ))
}

pub struct CheckEventExists {
    calendar: Arc<dyn CalendarService>,
}

impl CheckEventExists {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for CheckEventExists {
    async fn invoke(&self, input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        let parts = input::fields(input, 2)?;
        let title = input::non_empty(parts[0], "title")?;
        let date = input::date(parts[1])?;

        Ok(match find_same_day(self.calendar.as_ref(), title, date).await? {
            Some(event) => format!("EXISTS:{}:{}", event.id, event.title),
            None => "NOT_EXISTS".to_string(),
        })
    }
}

pub struct CreateEvent {
    calendar: Arc<dyn CalendarService>,
}

impl CreateEvent {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for CreateEvent {
    async fn invoke(&self, input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        create_event(self.calendar.as_ref(), input).await
    }
}

pub struct ListEvents {
    calendar: Arc<dyn CalendarService>,
}

impl ListEvents {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for ListEvents {
    async fn invoke(&self, _input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        let events = self.calendar.upcoming(now_kst(), UPCOMING_LIMIT).await?;
        if events.is_empty() {
            return Ok("예정된 일정이 없습니다.".to_string());
        }

        Ok(events
            .iter()
            .map(|event| {
                format!(
                    "{} - {} (ID: {})",
                    event.start.to_rfc3339(),
                    event.title,
                    event.id
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

pub struct UpdateEvent {
    calendar: Arc<dyn CalendarService>,
}

impl UpdateEvent {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for UpdateEvent {
    async fn invoke(&self, input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        let parts = input::fields(input, 4)?;
        let id = input::non_empty(parts[0], "event id")?;
        let title = input::non_empty(parts[1], "title")?;
        let (start, end) = input::time_range(parts[2], parts[3])?;

        let updated = self.calendar.update(id, title, start, end).await?;
        Ok(format!("✅ '{}' 일정이 성공적으로 수정되었습니다!", updated.title))
    }
}

pub struct DeleteEvent {
    calendar: Arc<dyn CalendarService>,
}

impl DeleteEvent {
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl ToolHandler for DeleteEvent {
    async fn invoke(&self, input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        let id = input::non_empty(input.trim(), "event id")?;
        self.calendar.delete(id).await?;
        Ok("✅ 일정이 성공적으로 삭제되었습니다!".to_string())
    }
}
