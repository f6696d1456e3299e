use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tripmate_core::{ConversationContext, Intent};

use crate::tools::ToolDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_iterations: usize,
    pub timeout: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Everything the executor gets for one turn. `tools` is already filtered.
#[derive(Debug)]
pub struct AgentRequest<'a> {
    pub intent: Intent,
    pub system_prompt: String,
    pub tools: Vec<ToolDescriptor>,
    pub conversation: &'a ConversationContext,
    pub input: String,
    pub limits: ExecutionLimits,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    #[error("agent timed out after {0:?}")]
    Timeout(Duration),
    #[error("model call failed: {0}")]
    Upstream(String),
    #[error("agent stopped: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Success(String),
    /// The model answered in a shape the executor could not read; the
    /// payload is the raw text, still wrapped in its failure marker.
    ParseFailure(String),
    ExecutionFailure(ExecutionFailure),
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, request: AgentRequest<'_>) -> AgentOutcome;
}
