use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::models::Intent;

pub const SEARCH_PLACE: &str = "search_place";
pub const PLAN_TRIP_TOOL: &str = "plan_trip_tool";
pub const CREATE_CALENDAR_FROM_PLAN: &str = "create_calendar_from_plan";
pub const CREATE_EVENT_TOOL: &str = "create_event_tool";
pub const CHECK_EVENT_EXISTS: &str = "check_event_exists";
pub const LIST_EVENTS_TOOL: &str = "list_events_tool";
pub const UPDATE_EVENT_TOOL: &str = "update_event_tool";
pub const DELETE_EVENT_TOOL: &str = "delete_event_tool";
pub const SHARE_GIST_TOOL: &str = "share_gist_tool";
pub const SHARE_TRAVEL_PLAN_GIST: &str = "share_travel_plan_gist";
pub const DEBUG_SHARE_STATUS: &str = "debug_share_status";

static STANDARD: Lazy<ToolPolicy> = Lazy::new(|| {
    ToolPolicy::from_entries([
        (Intent::PlanTrip, vec![SEARCH_PLACE, PLAN_TRIP_TOOL]),
        (
            Intent::BookCalendar,
            vec![
                CREATE_CALENDAR_FROM_PLAN,
                CREATE_EVENT_TOOL,
                CHECK_EVENT_EXISTS,
            ],
        ),
        (
            Intent::SharePlan,
            vec![
                SHARE_TRAVEL_PLAN_GIST,
                SHARE_GIST_TOOL,
                DEBUG_SHARE_STATUS,
            ],
        ),
        (Intent::SearchPlace, vec![SEARCH_PLACE]),
        (
            Intent::ManageEvent,
            vec![
                LIST_EVENTS_TOOL,
                UPDATE_EVENT_TOOL,
                DELETE_EVENT_TOOL,
                CHECK_EVENT_EXISTS,
            ],
        ),
    ])
});

pub trait NamedTool {
    fn tool_name(&self) -> &str;
}

impl NamedTool for &str {
    fn tool_name(&self) -> &str {
        self
    }
}

impl NamedTool for String {
    fn tool_name(&self) -> &str {
        self.as_str()
    }
}

/// Intent → permitted tool names. `Other` never needs an entry: it is
/// fail-open. Any other intent without an entry is fail-closed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolPolicy {
    allowed: BTreeMap<Intent, Vec<String>>,
}

impl ToolPolicy {
    pub fn standard() -> &'static ToolPolicy {
        &STANDARD
    }

    pub fn from_entries<I, N, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Intent, N)>,
        N: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = entries
            .into_iter()
            .map(|(intent, names)| (intent, names.into_iter().map(Into::into).collect()))
            .collect();
        Self { allowed }
    }

    pub fn allowed_names(&self, intent: Intent) -> &[String] {
        self.allowed
            .get(&intent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the registry entries the intent may use, in registry order.
    pub fn filter<T>(&self, intent: Intent, registry: &[T]) -> Vec<T>
    where
        T: NamedTool + Clone,
    {
        if intent == Intent::Other {
            return registry.to_vec();
        }

        let allowed = self
            .allowed_names(intent)
            .iter()
            .map(String::as_str)
            .collect::<HashSet<_>>();
        let mut seen = HashSet::new();

        registry
            .iter()
            .filter(|tool| allowed.contains(tool.tool_name()))
            .filter(|tool| seen.insert(tool.tool_name().to_string()))
            .cloned()
            .collect()
    }
}

pub fn filter_tools<T>(intent: Intent, registry: &[T]) -> Vec<T>
where
    T: NamedTool + Clone,
{
    ToolPolicy::standard().filter(intent, registry)
}
