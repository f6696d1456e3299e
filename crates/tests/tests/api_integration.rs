mod common;

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tripmate_agents::GENERIC_FAILURE_MESSAGE;
use tripmate_api::{build_router, ApiState, SessionStore};

use common::{harness, Harness};

fn app_with_sessions(h: &Harness, max_sessions: usize) -> Router {
    let sessions = SessionStore::new(max_sessions, Duration::from_secs(1800));
    build_router(ApiState::new(h.agent.clone(), h.metrics.clone(), sessions))
}

fn app(h: &Harness) -> Router {
    app_with_sessions(h, 8)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_registered_tools() {
    let h = harness();
    let response = app(&h)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["tools"], 11);
}

#[tokio::test]
async fn classify_returns_scores_and_tools() {
    let h = harness();
    let response = app(&h)
        .oneshot(post_json(
            "/v1/classify",
            json!({ "text": "여행 계획 짜서 공유해줘" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["intent"], "SHARE_PLAN");
    assert_eq!(payload["scores"], json!({ "PLAN_TRIP": 4, "SHARE_PLAN": 9 }));
    assert_eq!(
        payload["allowed_tools"],
        json!(["share_gist_tool", "share_travel_plan_gist", "debug_share_status"])
    );
}

#[tokio::test]
async fn chat_keeps_session_history() {
    let h = harness();
    let app = app(&h);

    h.llm.push("Final Answer: 안녕하세요! 어디로 떠나고 싶으세요?");
    let first = app
        .clone()
        .oneshot(post_json(
            "/v1/chat",
            json!({ "session_id": "s-1", "text": "안녕" }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = read_json(first).await;
    assert_eq!(first["intent"], "OTHER");
    assert_eq!(first["status"], "completed");
    assert_eq!(first["turns"], 2);
    assert_eq!(first["allowed_tools"].as_array().unwrap().len(), 11);

    h.llm.push("Final Answer: 제주를 추천해요.");
    let second = app
        .oneshot(post_json(
            "/v1/chat",
            json!({ "session_id": "s-1", "text": "여행 추천해줘" }),
        ))
        .await
        .unwrap();
    let second = read_json(second).await;
    assert_eq!(second["session_id"], "s-1");
    assert_eq!(second["intent"], "PLAN_TRIP");
    assert_eq!(second["reply"], "제주를 추천해요.");
    assert_eq!(second["turns"], 4);

    let prompts = h.llm.prompts();
    assert!(prompts[1].contains("사용자: 안녕\n어시스턴트: 안녕하세요! 어디로 떠나고 싶으세요?"));
}

#[tokio::test]
async fn chat_assigns_session_when_missing() {
    let h = harness();
    h.llm.push("Final Answer: 네!");
    let response = app(&h)
        .oneshot(post_json("/v1/chat", json!({ "text": "안녕" })))
        .await
        .unwrap();
    let payload = read_json(response).await;
    assert_eq!(payload["session_id"].as_str().unwrap().len(), 36);
}

#[tokio::test]
async fn anonymous_chats_never_exhaust_the_session_cap() {
    let h = harness();
    let app = app_with_sessions(&h, 2);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        h.llm.push("Final Answer: 네!");
        let response = app
            .clone()
            .oneshot(post_json("/v1/chat", json!({ "text": "안녕" })))
            .await
            .unwrap();
        statuses.push(response.status());
    }
    assert_eq!(statuses, vec![StatusCode::OK; 3]);

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(read_json(health).await["sessions"], 2);
}

#[tokio::test]
async fn chat_hides_model_errors() {
    let h = harness();
    let response = app(&h)
        .oneshot(post_json("/v1/chat", json!({ "text": "부산 맛집 찾아줘" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "failed");
    assert_eq!(payload["reply"], GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn chat_rejects_blank_text_and_bad_session_ids() {
    let h = harness();
    let app = app(&h);

    let blank = app
        .clone()
        .oneshot(post_json("/v1/chat", json!({ "text": "   " })))
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(blank).await["error"], "empty_text");

    let bad_session = app
        .oneshot(post_json(
            "/v1/chat",
            json!({ "session_id": "x".repeat(200), "text": "안녕" }),
        ))
        .await
        .unwrap();
    assert_eq!(bad_session.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.llm.prompts().len(), 0);
}

#[tokio::test]
async fn metrics_count_turn_outcomes() {
    let h = harness();
    let app = app(&h);

    h.llm.push("그냥 문장입니다");
    app.clone()
        .oneshot(post_json("/v1/chat", json!({ "text": "안녕" })))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json("/v1/chat", json!({ "text": "안녕" })))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/v1/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let payload = read_json(response).await;
    assert_eq!(payload["turns_total"], 2);
    assert_eq!(payload["recovered_total"], 1);
    assert_eq!(payload["failed_total"], 1);
}
