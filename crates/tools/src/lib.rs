pub mod calendar;
pub mod google;
pub mod input;
pub mod search;
pub mod share;
pub mod travel;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use tripmate_agents::{LlmClient, RegistryError, RuntimeConfig, ToolDescriptor, ToolRegistry};
use tripmate_core::policy::{
    CHECK_EVENT_EXISTS, CREATE_CALENDAR_FROM_PLAN, CREATE_EVENT_TOOL, DEBUG_SHARE_STATUS,
    DELETE_EVENT_TOOL, LIST_EVENTS_TOOL, PLAN_TRIP_TOOL, SEARCH_PLACE, SHARE_GIST_TOOL,
    SHARE_TRAVEL_PLAN_GIST, UPDATE_EVENT_TOOL,
};

pub use calendar::{CalendarEvent, CalendarService, MemoryCalendar};
pub use google::GoogleCalendar;
pub use input::ToolInputError;
pub use search::{PlaceResult, PlaceSearch, SerperSearch};
pub use share::{GistDraft, GistPublisher, GitHubGists};

use calendar::{CheckEventExists, CreateEvent, DeleteEvent, ListEvents, UpdateEvent};
use search::SearchPlace;
use share::{DebugShareStatus, ShareGist, ShareTravelPlanGist};
use travel::{CreateCalendarFromPlan, PlanTrip};

/// External services the standard tools run against.
#[derive(Clone)]
pub struct ToolBackends {
    pub llm: Arc<dyn LlmClient>,
    pub calendar: Arc<dyn CalendarService>,
    pub search: Arc<dyn PlaceSearch>,
    pub gists: Arc<dyn GistPublisher>,
    pub credentials: Vec<(&'static str, bool)>,
}

impl ToolBackends {
    pub fn from_config(config: &RuntimeConfig, llm: Arc<dyn LlmClient>) -> Result<Self> {
        Ok(Self {
            llm,
            calendar: calendar_backend(config),
            search: Arc::new(SerperSearch::new(config.serper_api_key.clone())?),
            gists: Arc::new(GitHubGists::new(config.github_token.clone())?),
            credentials: config.credential_status(),
        })
    }
}

/// Google Calendar when both a service account key and a calendar id are
/// configured, otherwise a process-local calendar.
pub fn calendar_backend(config: &RuntimeConfig) -> Arc<dyn CalendarService> {
    let (Some(key_path), Some(calendar_id)) = (&config.google_credentials, &config.calendar_id)
    else {
        return Arc::new(MemoryCalendar::new());
    };
    match GoogleCalendar::from_service_account_file(key_path, calendar_id.clone()) {
        Ok(calendar) => Arc::new(calendar),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "google calendar unavailable, using local calendar");
            Arc::new(MemoryCalendar::new())
        }
    }
}

/// All tools, in the order the agent sees them.
pub fn standard_registry(backends: &ToolBackends) -> Result<ToolRegistry, RegistryError> {
    let ToolBackends {
        llm,
        calendar,
        search,
        gists,
        credentials,
    } = backends;

    let tools = [
        ToolDescriptor::new(
            SEARCH_PLACE,
            "장소를 웹에서 검색합니다. 입력: 검색어",
            SearchPlace::new(search.clone()),
        ),
        ToolDescriptor::new(
            PLAN_TRIP_TOOL,
            "날짜별 여행 일정표를 생성합니다. 입력: 여행 요청 문장 (시작 날짜 포함 가능)",
            PlanTrip::new(llm.clone()),
        ),
        ToolDescriptor::new(
            CREATE_CALENDAR_FROM_PLAN,
            "이전 여행 계획을 캘린더에 자동 예약합니다. 입력: 사용자 요청 (시작 날짜 포함 가능)",
            CreateCalendarFromPlan::new(llm.clone(), calendar.clone()),
        ),
        ToolDescriptor::new(
            CREATE_EVENT_TOOL,
            "일정을 생성합니다. 같은 날 같은 제목의 일정은 교체됩니다. 입력: 제목;시작시간;종료시간",
            CreateEvent::new(calendar.clone()),
        ),
        ToolDescriptor::new(
            CHECK_EVENT_EXISTS,
            "특정 제목과 날짜의 일정이 있는지 확인합니다. 입력: 제목;날짜(YYYY-MM-DD)",
            CheckEventExists::new(calendar.clone()),
        ),
        ToolDescriptor::new(
            LIST_EVENTS_TOOL,
            "앞으로의 일정을 최대 10개까지 조회합니다. 입력: 없음",
            ListEvents::new(calendar.clone()),
        ),
        ToolDescriptor::new(
            UPDATE_EVENT_TOOL,
            "일정을 수정합니다. 입력: 이벤트ID;새 제목;새 시작시간;새 종료시간",
            UpdateEvent::new(calendar.clone()),
        ),
        ToolDescriptor::new(
            DELETE_EVENT_TOOL,
            "일정을 삭제합니다. 입력: 이벤트ID",
            DeleteEvent::new(calendar.clone()),
        ),
        ToolDescriptor::new(
            SHARE_GIST_TOOL,
            "GitHub Gist를 생성합니다. 입력: 파일명;내용;설명 (형식이 아니면 최근 여행 계획을 저장)",
            ShareGist::new(gists.clone()),
        ),
        ToolDescriptor::new(
            SHARE_TRAVEL_PLAN_GIST,
            "현재 여행 계획을 Gist에 저장합니다. 입력: 없음",
            ShareTravelPlanGist::new(gists.clone()),
        ),
        ToolDescriptor::new(
            DEBUG_SHARE_STATUS,
            "공유 기능 설정 상태를 점검합니다. 입력: 없음",
            DebugShareStatus::new(gists.clone(), credentials.clone()),
        ),
    ];

    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool)?;
    }
    Ok(registry)
}
