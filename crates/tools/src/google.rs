use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use tripmate_core::dates::kst;

use crate::calendar::{CalendarError, CalendarEvent, CalendarService};

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const SEOUL: &str = "Asia/Seoul";
const UNTITLED: &str = "제목 없음";

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: ApiTime,
    end: ApiTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl ApiTime {
    fn resolve(&self) -> Option<DateTime<FixedOffset>> {
        if let Some(value) = &self.date_time {
            return DateTime::parse_from_rfc3339(value).ok();
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        kst().from_local_datetime(&date.and_time(NaiveTime::MIN)).single()
    }
}

impl ApiEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        let start = self.start.resolve()?;
        let end = self.end.resolve()?;
        Some(CalendarEvent {
            id: self.id,
            title: self
                .summary
                .filter(|summary| !summary.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            start: start.with_timezone(&kst()),
            end: end.with_timezone(&kst()),
        })
    }
}

/// Google Calendar v3 over REST, authorised as a service account.
pub struct GoogleCalendar {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(tokens: Arc<dyn TokenProvider>, calendar_id: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            tokens,
            calendar_id: calendar_id.into(),
        })
    }

    pub fn from_service_account_file(
        path: impl AsRef<Path>,
        calendar_id: impl Into<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let account = CustomServiceAccount::from_file(path)
            .with_context(|| format!("failed to load service account {}", path.display()))?;
        let calendar = Self::new(Arc::new(account), calendar_id)?;
        info!(calendar_id = %calendar.calendar_id, "google calendar backend enabled");
        Ok(calendar)
    }

    async fn send(&self, request: RequestBuilder, event_id: Option<&str>) -> Result<Response> {
        let token = self
            .tokens
            .token(&[CALENDAR_SCOPE])
            .await
            .context("service account token request failed")?;

        let response = request
            .bearer_auth(token.as_str())
            .send()
            .await
            .context("calendar request failed")?;

        let status = response.status();
        if let Some(id) = event_id {
            if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                return Err(CalendarError::NotFound(id.to_string()).into());
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt = body.chars().take(200).collect::<String>();
            anyhow::bail!("calendar api returned status {}: {}", status.as_u16(), excerpt);
        }
        Ok(response)
    }

    async fn list(&self, query: &[(&str, String)]) -> Result<Vec<CalendarEvent>> {
        let url = events_url(CALENDAR_API, &self.calendar_id, None)?;
        let request = self.http.get(url).query(query);
        let body: EventList = self
            .send(request, None)
            .await?
            .json()
            .await
            .context("calendar list parse failed")?;

        Ok(body
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.clone();
                let event = item.into_event();
                if event.is_none() {
                    warn!(event_id = %id, "skipping event without readable times");
                }
                event
            })
            .collect())
    }

    async fn read_event(response: Response) -> Result<CalendarEvent> {
        let event: ApiEvent = response
            .json()
            .await
            .context("calendar event parse failed")?;
        let id = event.id.clone();
        event
            .into_event()
            .ok_or_else(|| anyhow!("calendar event `{id}` has no readable times"))
    }
}

fn events_url(base: &str, calendar_id: &str, event_id: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(base).context("invalid calendar api url")?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("calendar api url cannot take a path"))?;
        segments.push("calendars").push(calendar_id).push("events");
        if let Some(id) = event_id {
            segments.push(id);
        }
    }
    Ok(url)
}

fn event_body(title: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Value {
    json!({
        "summary": title,
        "start": { "dateTime": start.to_rfc3339(), "timeZone": SEOUL },
        "end": { "dateTime": end.to_rfc3339(), "timeZone": SEOUL },
    })
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn events_between(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        self.list(&[
            ("timeMin", from.to_rfc3339()),
            ("timeMax", to.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ])
        .await
    }

    async fn upcoming(
        &self,
        from: DateTime<FixedOffset>,
        limit: usize,
    ) -> Result<Vec<CalendarEvent>> {
        self.list(&[
            ("timeMin", from.to_rfc3339()),
            ("maxResults", limit.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ])
        .await
    }

    async fn insert(
        &self,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent> {
        let url = events_url(CALENDAR_API, &self.calendar_id, None)?;
        let request = self.http.post(url).json(&event_body(title, start, end));
        let response = self.send(request, None).await?;
        Self::read_event(response).await
    }

    async fn update(
        &self,
        id: &str,
        title: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<CalendarEvent> {
        let url = events_url(CALENDAR_API, &self.calendar_id, Some(id))?;
        let request = self.http.patch(url).json(&event_body(title, start, end));
        let response = self.send(request, Some(id)).await?;
        Self::read_event(response).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = events_url(CALENDAR_API, &self.calendar_id, Some(id))?;
        self.send(self.http.delete(url), Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_escape_calendar_and_event_ids() {
        let url = events_url(CALENDAR_API, "team trips#kr", Some("abc123")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team%20trips%23kr/events/abc123"
        );
        let url = events_url(CALENDAR_API, "primary", None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );
    }

    #[test]
    fn body_pins_seoul_time_zone() {
        let start = DateTime::parse_from_rfc3339("2099-06-20T11:00:00+09:00").unwrap();
        let end = DateTime::parse_from_rfc3339("2099-06-20T12:30:00+09:00").unwrap();
        let body = event_body("경복궁 방문", start, end);
        assert_eq!(body["summary"], "경복궁 방문");
        assert_eq!(body["start"]["dateTime"], "2099-06-20T11:00:00+09:00");
        assert_eq!(body["end"]["timeZone"], "Asia/Seoul");
    }

    #[test]
    fn list_items_become_events() {
        let body: EventList = serde_json::from_value(json!({
            "kind": "calendar#events",
            "items": [
                {
                    "id": "e1",
                    "summary": "남산타워",
                    "start": { "dateTime": "2099-06-21T00:00:00Z" },
                    "end": { "dateTime": "2099-06-21T01:00:00Z" }
                },
                {
                    "id": "e2",
                    "start": { "date": "2099-06-22" },
                    "end": { "date": "2099-06-23" }
                },
                {
                    "id": "e3",
                    "summary": "깨진 일정",
                    "start": {},
                    "end": {}
                }
            ]
        }))
        .unwrap();

        let events = body
            .items
            .into_iter()
            .filter_map(ApiEvent::into_event)
            .collect::<Vec<_>>();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "남산타워");
        assert_eq!(events[0].start.to_rfc3339(), "2099-06-21T09:00:00+09:00");
        assert_eq!(events[1].title, UNTITLED);
        assert_eq!(events[1].start.to_rfc3339(), "2099-06-22T00:00:00+09:00");
    }

    #[test]
    fn missing_service_account_file_is_an_error() {
        let result = GoogleCalendar::from_service_account_file(
            "/nonexistent/tripmate-calendar-key.json",
            "primary",
        );
        assert!(result.is_err());
    }
}
