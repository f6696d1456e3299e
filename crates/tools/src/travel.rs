use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};
use tripmate_agents::{LlmClient, ToolContext, ToolHandler};
use tripmate_core::dates::extract_date_from_input;

use crate::calendar::{create_event, now_kst, CalendarService};

const FALLBACK_START: &str = "2025-06-20";

fn today() -> NaiveDate {
    now_kst().date_naive()
}

fn itinerary_prompt(request: &str, today: NaiveDate, start: Option<NaiveDate>) -> String {
    let start = start.map_or_else(|| "명시되지 않음".to_string(), |date| date.to_string());
    format!(
        r#"여행 계획 요청: {request}

**중요: 날짜 설정 규칙**
- 사용자가 "25년 6월 20일"이라고 했다면 반드시 "2025-06-20"으로 해석
- 현재 날짜: {today}
- 사용자 지정 시작 날짜: {start}

아래 형식에 따라 한국어로 상세한 여행 일정표를 만들어 주세요:
- 날짜별로 일정 구분 (Day1, Day2, ...)
- 각 일정마다 정확한 시간, 장소, 활동 포함
- 각 이벤트 별로 한 줄씩 표현해주세요

출력 예시:
Day1 (2025-06-20):
 - 09:00~10:00 : 서울역 도착 및 호텔 체크인
 - 11:00~12:30 : 경복궁 방문

Day2 (2025-06-21):
 - 09:00~10:00 : 남산타워 관람

**응답은 반드시 일반 텍스트로만 제공하세요. JSON이나 특수 구조는 사용하지 마세요.**"#
    )
}

fn event_lines_prompt(
    plan: &str,
    request: &str,
    today: NaiveDate,
    start: Option<NaiveDate>,
) -> String {
    let start_hint = start.map_or_else(|| "계획에서 추출".to_string(), |date| date.to_string());
    let fallback = start.map_or_else(|| FALLBACK_START.to_string(), |date| date.to_string());
    format!(
        r#"다음 여행 계획을 분석하여 각 일정을 캘린더 이벤트로 변환해주세요:

{plan}

**중요: 날짜 변환 규칙**
- 현재 날짜: {today}
- 사용자가 지정한 시작 날짜: {start_hint}
- "25년" = "2025년"으로 해석
- 사용자가 "{request}"라고 했다면, 명시된 날짜를 정확히 사용
- 모든 날짜는 정확히 YYYY-MM-DD 형식으로 변환
- 시간대는 반드시 +09:00 (한국 시간) 사용

각 일정마다 다음 형식으로 출력하세요:
제목;시작시간;종료시간

예시:
경복궁 방문;2025-06-20T11:00:00+09:00;2025-06-20T12:30:00+09:00

각 줄마다 하나의 이벤트만 작성하고, 다른 설명은 포함하지 마세요.
날짜가 불명확한 경우 {fallback}부터 시작하세요."#
    )
}

/// Day-by-day itinerary from the model.
pub struct PlanTrip {
    llm: Arc<dyn LlmClient>,
}

impl PlanTrip {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ToolHandler for PlanTrip {
    async fn invoke(&self, input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        let today = today();
        let start = extract_date_from_input(input, today);
        let plan = self
            .llm
            .complete(&itinerary_prompt(input, today, start))
            .await
            .context("itinerary generation failed")?;

        Ok(match start {
            Some(date) => format!("📅 시작 날짜: {date}\n\n{}", plan.trim()),
            None => plan.trim().to_string(),
        })
    }
}

/// Books every line of the latest travel plan into the calendar.
pub struct CreateCalendarFromPlan {
    llm: Arc<dyn LlmClient>,
    calendar: Arc<dyn CalendarService>,
}

impl CreateCalendarFromPlan {
    pub fn new(llm: Arc<dyn LlmClient>, calendar: Arc<dyn CalendarService>) -> Self {
        Self { llm, calendar }
    }
}

#[async_trait]
impl ToolHandler for CreateCalendarFromPlan {
    async fn invoke(&self, input: &str, ctx: &ToolContext<'_>) -> Result<String> {
        let Some(plan) = ctx.latest_travel_plan() else {
            return Ok(
                "❌ 먼저 여행 계획을 생성해주세요. 예: '서울 2박 3일 여행 계획 짜줘'".to_string(),
            );
        };

        let today = today();
        let start = extract_date_from_input(input, today);
        let lines = self
            .llm
            .complete(&event_lines_prompt(plan, input, today, start))
            .await
            .context("plan parsing failed")?;

        let mut results = Vec::new();
        if let Some(date) = start {
            if !lines.contains(&date.to_string()) {
                warn!(%date, "requested start date missing from parsed events");
                results.push(format!("⚠️ 사용자 지정 날짜({date})가 반영되지 않았습니다."));
            }
        }

        let mut created = 0usize;
        for line in lines.lines().map(str::trim) {
            if line.matches(';').count() != 2 {
                continue;
            }
            match create_event(self.calendar.as_ref(), line).await {
                Ok(result) => {
                    created += 1;
                    results.push(result);
                }
                Err(error) => results.push(format!("❌ 이벤트 생성 실패: {line} - {error:#}")),
            }
        }

        if created == 0 && results.iter().all(|line| line.starts_with("⚠️")) {
            return Ok(format!(
                "❌ 캘린더 이벤트 생성에 실패했습니다.\n파싱 결과: {}",
                lines.trim()
            ));
        }

        info!(created, "calendar populated from plan");
        let start_label = start.map_or_else(|| "계획 기준".to_string(), |date| date.to_string());
        Ok(format!(
            "🗓️ 캘린더 예약 완료 (시작일: {start_label}):\n{}",
            results.join("\n")
        ))
    }
}
