pub mod agent;
pub mod config;
pub mod executor;
pub mod llm;
pub mod react;
pub mod tools;

pub use agent::{TripAgent, TurnPlan, TurnReply, TurnStatus, GENERIC_FAILURE_MESSAGE};
pub use config::{OpenAiConfig, RuntimeConfig};
pub use executor::{AgentExecutor, AgentOutcome, AgentRequest, ExecutionFailure, ExecutionLimits};
pub use llm::{client_from_config, LlmClient, OpenAiClient, UnconfiguredLlm};
pub use react::ReactExecutor;
pub use tools::{RegistryError, ToolContext, ToolDescriptor, ToolHandler, ToolRegistry};
