mod common;

use tripmate_agents::{TurnStatus, GENERIC_FAILURE_MESSAGE};
use tripmate_core::{ConversationContext, Intent};

use common::harness;

const ITINERARY: &str =
    "Day1 (2099-06-20):\n - 10:00~12:00 : 해운대 산책\n - 13:00~14:00 : 돼지국밥 점심";

#[tokio::test]
async fn plan_then_book_then_share() {
    let h = harness();
    let mut conversation = ConversationContext::new();

    // plan
    h.llm.push("일정을 만들어야 합니다.\nAction: plan_trip_tool\nAction Input: 부산 2박 3일");
    h.llm.push(ITINERARY);
    h.llm.push(&format!("Final Answer: {ITINERARY}"));

    let text = "부산 2박 3일 여행 계획 짜줘";
    let reply = h.agent.handle_turn(text, &conversation).await;
    assert_eq!(reply.intent, Intent::PlanTrip);
    assert_eq!(reply.status, TurnStatus::Completed);
    assert_eq!(reply.allowed_tools, vec!["search_place", "plan_trip_tool"]);
    assert_eq!(reply.reply, ITINERARY);
    conversation.push_user(text);
    conversation.push_assistant(reply.reply);

    // book
    h.llm.push("Action: create_calendar_from_plan\nAction Input: \"99년 6월 20일 시작\"");
    h.llm.push(
        "해운대 산책;2099-06-20T10:00:00+09:00;2099-06-20T12:00:00+09:00\n돼지국밥 점심;2099-06-20T13:00:00+09:00;2099-06-20T14:00:00+09:00",
    );
    h.llm.push("Final Answer: ✅ 캘린더 예약 완료");

    let text = "99년 6월 20일 시작으로 캘린더 예약해줘";
    let reply = h.agent.handle_turn(text, &conversation).await;
    assert_eq!(reply.intent, Intent::BookCalendar);
    assert_eq!(reply.reply, "✅ 캘린더 예약 완료");
    assert_eq!(h.calendar.len(), 2);

    let prompts = h.llm.prompts();
    let booking_prompt = &prompts[3];
    assert!(booking_prompt.contains("현재 대화 컨텍스트: Day1 (2099-06-20)"));
    assert!(booking_prompt.contains("📋 **여행 계획**\nDay1 (2099-06-20)"));
    assert!(prompts[4].contains("다음 여행 계획을 분석하여"));
    conversation.push_user(text);
    conversation.push_assistant(reply.reply);

    // share, with the model straying outside its tools first
    h.llm.push(
        "Action: create_event_tool\nAction Input: 몰래;2099-06-21T10:00:00+09:00;2099-06-21T11:00:00+09:00",
    );
    h.llm.push("Action: share_travel_plan_gist\nAction Input: 없음");
    h.llm.push("✅ 공유 완료! https://gist.github.com/tripmate/test");

    let text = "여행 계획 공유해줘";
    let reply = h.agent.handle_turn(text, &conversation).await;
    assert_eq!(reply.intent, Intent::SharePlan);
    assert_eq!(reply.status, TurnStatus::Recovered);
    assert_eq!(reply.reply, "✅ 공유 완료! https://gist.github.com/tripmate/test");
    assert_eq!(h.calendar.len(), 2);

    let published = h.gists.published.lock();
    assert_eq!(published.len(), 1);
    assert!(published[0].content.contains("해운대 산책"));
    assert!(h
        .llm
        .prompts()
        .iter()
        .any(|prompt| prompt.contains("create_event_tool is not a valid tool")));

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.turns_total, 3);
    assert_eq!(snapshot.completed_total, 2);
    assert_eq!(snapshot.recovered_total, 1);
    assert_eq!(snapshot.tool_calls_total, 3);
    assert_eq!(h.llm.remaining(), 0);
}

#[tokio::test]
async fn model_outage_returns_generic_message() {
    let h = harness();
    let reply = h
        .agent
        .handle_turn("제주 관광지 찾아줘", &ConversationContext::new())
        .await;

    assert_eq!(reply.intent, Intent::SearchPlace);
    assert_eq!(reply.status, TurnStatus::Failed);
    assert_eq!(reply.reply, GENERIC_FAILURE_MESSAGE);
    assert!(!reply.reply.contains("scripted"));
}

#[tokio::test]
async fn search_turn_uses_place_results() {
    let h = harness();
    h.llm.push("Action: search_place\nAction Input: 제주 흑돼지");
    h.llm.push("Final Answer: 제주 흑돼지 추천 식당을 찾았어요.");

    let reply = h
        .agent
        .handle_turn("제주 흑돼지 맛집 찾아줘", &ConversationContext::new())
        .await;

    assert_eq!(reply.reply, "제주 흑돼지 추천 식당을 찾았어요.");
    assert!(h.llm.prompts()[1]
        .contains("Observation: • 제주 흑돼지 추천 (현지인 맛집) – https://example.com/place"));
}
