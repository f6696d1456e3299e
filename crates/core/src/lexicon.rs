use crate::models::Intent;

/// Keyword signals for one intent. Primary hits weigh three times a
/// secondary hit.
#[derive(Debug, Clone, Copy)]
pub struct KeywordGroup {
    pub intent: Intent,
    pub primary: &'static [&'static str],
    pub secondary: &'static [&'static str],
}

pub const PRIMARY_WEIGHT: u32 = 3;
pub const SECONDARY_WEIGHT: u32 = 1;

/// Substring that forces the share intent forward, and how much it adds.
pub const SHARE_OVERRIDE_KEYWORD: &str = "공유";
pub const SHARE_OVERRIDE_BONUS: u32 = 5;

pub static LEXICON: [KeywordGroup; 5] = [
    KeywordGroup {
        intent: Intent::PlanTrip,
        primary: &["계획 짜", "일정 짜", "여행 추천", "코스 추천"],
        secondary: &["여행지", "여행 계획", "코스", "루트"],
    },
    KeywordGroup {
        intent: Intent::BookCalendar,
        primary: &[
            "캘린더 예약",
            "일정 등록",
            "캘린더에 추가",
            "스케줄 등록",
            "예약해줘",
        ],
        secondary: &["캘린더", "예약", "등록해줘"],
    },
    KeywordGroup {
        intent: Intent::SharePlan,
        primary: &["공유해줘", "gist 만들어줘", "저장해줘", "링크 생성"],
        secondary: &["공유", "gist", "저장", "링크"],
    },
    KeywordGroup {
        intent: Intent::SearchPlace,
        primary: &["검색해줘", "찾아줘", "알려줘"],
        secondary: &["검색", "찾아", "맛집", "관광지"],
    },
    KeywordGroup {
        intent: Intent::ManageEvent,
        primary: &["일정 목록", "캘린더 확인", "일정 조회"],
        secondary: &["수정", "삭제", "변경", "확인"],
    },
];

impl KeywordGroup {
    /// `normalized` must already be case-folded.
    pub fn primary_hits(&self, normalized: &str) -> u32 {
        count_hits(normalized, self.primary)
    }

    pub fn secondary_hits(&self, normalized: &str) -> u32 {
        count_hits(normalized, self.secondary)
    }

    pub fn score(&self, normalized: &str) -> u32 {
        PRIMARY_WEIGHT * self.primary_hits(normalized)
            + SECONDARY_WEIGHT * self.secondary_hits(normalized)
    }
}

pub fn group_for(intent: Intent) -> Option<&'static KeywordGroup> {
    LEXICON.iter().find(|group| group.intent == intent)
}

fn count_hits(input: &str, needles: &[&str]) -> u32 {
    needles.iter().filter(|needle| input.contains(*needle)).count() as u32
}
