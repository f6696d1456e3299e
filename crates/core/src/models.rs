use std::fmt;

use serde::{Deserialize, Serialize};

/// Purpose of a user request. Declaration order doubles as the tie-break
/// priority used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    PlanTrip,
    BookCalendar,
    SharePlan,
    SearchPlace,
    ManageEvent,
    Other,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::PlanTrip,
        Intent::BookCalendar,
        Intent::SharePlan,
        Intent::SearchPlace,
        Intent::ManageEvent,
        Intent::Other,
    ];

    pub fn as_label(self) -> &'static str {
        match self {
            Self::PlanTrip => "PLAN_TRIP",
            Self::BookCalendar => "BOOK_CALENDAR",
            Self::SharePlan => "SHARE_PLAN",
            Self::SearchPlace => "SEARCH_PLACE",
            Self::ManageEvent => "MANAGE_EVENT",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().replace('-', "_").as_str() {
            "PLAN_TRIP" | "PLAN" | "TRIP" => Some(Self::PlanTrip),
            "BOOK_CALENDAR" | "BOOK" | "CALENDAR" => Some(Self::BookCalendar),
            "SHARE_PLAN" | "SHARE" => Some(Self::SharePlan),
            "SEARCH_PLACE" | "SEARCH" => Some(Self::SearchPlace),
            "MANAGE_EVENT" | "MANAGE" => Some(Self::ManageEvent),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
