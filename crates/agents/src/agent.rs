use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};
use tripmate_core::{
    classify_detailed, compose_system_prompt, fill_context, sanitize_input, sanitize_response,
    Classification, ConversationContext, Intent, ToolPolicy,
};
use tripmate_observability::TurnMetrics;

use crate::executor::{AgentExecutor, AgentOutcome, AgentRequest, ExecutionLimits};
use crate::tools::{ToolDescriptor, ToolRegistry};

/// Shown to the user for any failure that is not a recoverable parse error.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "⚠️ 요청을 처리하는 중 문제가 발생했어요. 잠시 후 다시 시도해주세요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    Recovered,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub intent: Intent,
    pub reply: String,
    pub status: TurnStatus,
    pub allowed_tools: Vec<String>,
}

/// Classification plus everything built from it, before the agent runs.
#[derive(Debug, Clone)]
pub struct TurnPlan {
    pub classification: Classification,
    pub tools: Vec<ToolDescriptor>,
    pub system_prompt: String,
    pub input: String,
}

impl TurnPlan {
    pub fn intent(&self) -> Intent {
        self.classification.intent
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }
}

#[derive(Clone)]
pub struct TripAgent {
    registry: Arc<ToolRegistry>,
    policy: ToolPolicy,
    executor: Arc<dyn AgentExecutor>,
    limits: ExecutionLimits,
    metrics: Arc<TurnMetrics>,
}

impl TripAgent {
    pub fn new(
        registry: Arc<ToolRegistry>,
        executor: Arc<dyn AgentExecutor>,
        limits: ExecutionLimits,
        metrics: Arc<TurnMetrics>,
    ) -> Self {
        Self {
            registry,
            policy: ToolPolicy::standard().clone(),
            executor,
            limits,
            metrics,
        }
    }

    pub fn with_policy(mut self, policy: ToolPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &ToolPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &TurnMetrics {
        &self.metrics
    }

    pub fn plan_turn(&self, text: &str, conversation: &ConversationContext) -> TurnPlan {
        let classification = classify_detailed(text);
        let tools = self
            .registry
            .allowed_for(&self.policy, classification.intent);
        let tool_names = tools.iter().map(ToolDescriptor::name).collect::<Vec<_>>();

        let travel_plan = conversation.latest_travel_plan();
        let system_prompt = fill_context(
            &compose_system_prompt(classification.intent, &tool_names),
            travel_plan,
        );

        let sanitized = sanitize_input(text);
        let input = match travel_plan {
            Some(plan) => format!("📋 **여행 계획**\n{plan}\n\n현재 요청: {sanitized}"),
            None => format!("현재 요청: {sanitized}"),
        };

        TurnPlan {
            classification,
            tools,
            system_prompt,
            input,
        }
    }

    #[instrument(skip_all, fields(turn = conversation.len()))]
    pub async fn handle_turn(&self, text: &str, conversation: &ConversationContext) -> TurnReply {
        let started = Instant::now();
        self.metrics.inc_turn();

        let plan = self.plan_turn(text, conversation);
        let intent = plan.intent();
        let allowed_tools = plan.tool_names();

        let request = AgentRequest {
            intent,
            system_prompt: plan.system_prompt,
            tools: plan.tools,
            conversation,
            input: plan.input,
            limits: self.limits,
        };

        let (reply, status) = match self.executor.execute(request).await {
            AgentOutcome::Success(raw) => {
                self.metrics.inc_completed();
                (sanitize_response(&raw), TurnStatus::Completed)
            }
            AgentOutcome::ParseFailure(payload) => {
                self.metrics.inc_recovered();
                (sanitize_response(&payload), TurnStatus::Recovered)
            }
            AgentOutcome::ExecutionFailure(failure) => {
                self.metrics.inc_failed();
                warn!(intent = %intent, error = %failure, "agent execution failed");
                (GENERIC_FAILURE_MESSAGE.to_string(), TurnStatus::Failed)
            }
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            intent = %intent,
            tools = allowed_tools.len(),
            status = ?status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn handled"
        );

        TurnReply {
            intent,
            reply,
            status,
            allowed_tools,
        }
    }
}
