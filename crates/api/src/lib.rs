mod sessions;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tripmate_agents::{client_from_config, ReactExecutor, RuntimeConfig, TripAgent, TurnStatus};
use tripmate_core::{classify_detailed, Intent, IntentScores};
use tripmate_observability::{MetricsSnapshot, TurnMetrics};
use tripmate_tools::{standard_registry, ToolBackends};
use uuid::Uuid;

pub use crate::sessions::{SessionStore, SharedConversation};

const MAX_TEXT_CHARS: usize = 4_000;
const MAX_SESSION_ID_LEN: usize = 128;
const DEFAULT_MAX_SESSIONS: usize = 10_000;
const DEFAULT_SESSION_IDLE_SECONDS: u64 = 30 * 60;
const MAX_STORED_TURNS: usize = 40;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<TripAgent>,
    pub metrics: Arc<TurnMetrics>,
    pub sessions: SessionStore,
}

impl ApiState {
    pub fn new(agent: Arc<TripAgent>, metrics: Arc<TurnMetrics>, sessions: SessionStore) -> Self {
        Self {
            agent,
            metrics,
            sessions,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    tools: usize,
    sessions: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    intent: Intent,
    reply: String,
    status: TurnStatus,
    allowed_tools: Vec<String>,
    turns: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassifyRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    intent: Intent,
    scores: IntentScores,
    allowed_tools: Vec<String>,
}

/// Wires the agent from the process environment.
pub fn build_app(config: &RuntimeConfig) -> Result<Router> {
    let metrics = TurnMetrics::shared();
    let llm = client_from_config(config).context("failed to initialize model client")?;
    let backends = ToolBackends::from_config(config, llm.clone())
        .context("failed to initialize tool backends")?;
    let registry = standard_registry(&backends).context("failed to register tools")?;
    let executor = ReactExecutor::new(llm).with_metrics(metrics.clone());

    let agent = Arc::new(TripAgent::new(
        Arc::new(registry),
        Arc::new(executor),
        config.limits,
        metrics.clone(),
    ));

    let max_sessions = env::var("TRIPMATE_MAX_SESSIONS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_SESSIONS);
    let idle_seconds = env::var("TRIPMATE_SESSION_IDLE_SECONDS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SESSION_IDLE_SECONDS);
    let sessions = SessionStore::new(max_sessions, Duration::from_secs(idle_seconds));

    Ok(build_router(ApiState::new(agent, metrics, sessions)))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/classify", post(classify))
        .route("/v1/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        tools: state.agent.registry().len(),
        sessions: state.sessions.len(),
    })
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let text = request.text.trim();
    if let Err(response) = validate_text(text) {
        return response;
    }

    let session_id = match request.session_id.as_deref().map(str::trim) {
        Some(id) if id.is_empty() || id.len() > MAX_SESSION_ID_LEN => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_session_id",
                "session_id must be 1-128 characters",
            );
        }
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let Some(conversation) = state.sessions.get_or_create(&session_id) else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "session_capacity",
            "every session is busy, retry later",
        );
    };

    let mut conversation = conversation.lock().await;
    let reply = state.agent.handle_turn(text, &conversation).await;
    conversation.push_user(text);
    conversation.push_assistant(reply.reply.clone());
    conversation.retain_recent(MAX_STORED_TURNS);

    info!(
        session_id = %session_id,
        intent = %reply.intent,
        turns = conversation.len(),
        "chat turn stored"
    );

    Json(ChatResponse {
        session_id,
        intent: reply.intent,
        reply: reply.reply,
        status: reply.status,
        allowed_tools: reply.allowed_tools,
        turns: conversation.len(),
    })
    .into_response()
}

async fn classify(
    State(state): State<ApiState>,
    Json(request): Json<ClassifyRequest>,
) -> Response {
    let text = request.text.trim();
    if let Err(response) = validate_text(text) {
        return response;
    }

    let classification = classify_detailed(text);
    let allowed_tools = state
        .agent
        .registry()
        .allowed_for(state.agent.policy(), classification.intent)
        .iter()
        .map(|tool| tool.name().to_string())
        .collect();

    Json(ClassifyResponse {
        intent: classification.intent,
        scores: classification.scores,
        allowed_tools,
    })
    .into_response()
}

async fn metrics(State(state): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

fn validate_text(text: &str) -> Result<(), Response> {
    if text.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "empty_text",
            "text must not be empty",
        ));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "text_too_long",
            "text must be at most 4000 characters",
        ));
    }
    Ok(())
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}
