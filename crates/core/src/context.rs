use serde::{Deserialize, Serialize};

use crate::models::{ConversationTurn, Role};

const TRAVEL_PLAN_MARKERS: [&str; 8] = [
    "day1",
    "day 1",
    "첫날",
    "첫째날",
    "1일차",
    "여행 계획",
    "일정",
    "스케줄",
];

const TRAVEL_PLAN_EXCLUSIONS: [&str; 2] = ["캘린더", "예약"];

/// Append-only turn log owned by the caller. Dispatch and tools only read it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    turns: Vec<ConversationTurn>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ConversationTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ConversationTurn::assistant(content));
    }

    /// Drops the oldest turns so at most `max_turns` remain.
    pub fn retain_recent(&mut self, max_turns: usize) {
        let excess = self.turns.len().saturating_sub(max_turns);
        self.turns.drain(..excess);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Newest assistant turn that reads like an itinerary and not like a
    /// booking confirmation.
    pub fn latest_travel_plan(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .filter(|turn| turn.role == Role::Assistant)
            .map(|turn| turn.content.as_str())
            .find(|content| is_travel_plan(content))
    }
}

pub fn is_travel_plan(content: &str) -> bool {
    let lower = content.to_lowercase();
    contains_any(&lower, &TRAVEL_PLAN_MARKERS) && !contains_any(&lower, &TRAVEL_PLAN_EXCLUSIONS)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_newest_plan() {
        let mut context = ConversationContext::new();
        context.push_assistant("Day1: 경복궁");
        context.push_user("부산으로 바꿔줘");
        context.push_assistant("DAY1: 해운대\nDay2: 광안리");
        assert_eq!(context.latest_travel_plan(), Some("DAY1: 해운대\nDay2: 광안리"));
    }

    #[test]
    fn skips_booking_confirmations_and_user_turns() {
        let mut context = ConversationContext::new();
        context.push_assistant("1일차: 전주 한옥마을");
        context.push_assistant("🗓️ 캘린더 예약 완료: 일정 3건");
        context.push_user("여행 계획 공유해줘");
        assert_eq!(context.latest_travel_plan(), Some("1일차: 전주 한옥마을"));
    }

    #[test]
    fn retain_recent_keeps_the_newest_turns() {
        let mut context = ConversationContext::new();
        for n in 0..5 {
            context.push_user(format!("질문 {n}"));
        }
        context.retain_recent(2);
        assert_eq!(context.len(), 2);
        assert_eq!(context.turns()[0].content, "질문 3");

        context.retain_recent(10);
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn absent_when_nothing_qualifies() {
        let mut context = ConversationContext::new();
        context.push_assistant("안녕하세요! AI 여행 플래너입니다.");
        assert_eq!(context.latest_travel_plan(), None);
        assert_eq!(ConversationContext::new().latest_travel_plan(), None);
    }
}
