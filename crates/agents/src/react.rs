//! Thought/Action/Observation loop over a plain text-completion model.
//!
//! The executor only ever sees the tools handed to it in the request, so a
//! model that names anything else gets an observation back instead of a call.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use tripmate_core::Role;
use tripmate_observability::TurnMetrics;

use crate::executor::{AgentExecutor, AgentOutcome, AgentRequest, ExecutionFailure};
use crate::llm::LlmClient;
use crate::tools::ToolContext;

pub const FINAL_ANSWER: &str = "Final Answer:";
pub const PARSE_FAILURE_PREFIX: &str = "Could not parse LLM output:";

const OBSERVATION_STOP: &str = "\nObservation:";
const HISTORY_TURNS: usize = 10;

static ACTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)")
        .expect("valid action regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Finish(String),
    Act {
        tool: String,
        input: String,
        log: String,
    },
}

pub struct ReactExecutor {
    llm: Arc<dyn LlmClient>,
    metrics: Option<Arc<TurnMetrics>>,
}

impl ReactExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<TurnMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn run(&self, request: &AgentRequest<'_>) -> AgentOutcome {
        let mut scratchpad = String::new();

        for iteration in 0..request.limits.max_iterations {
            let prompt = render_prompt(request, &scratchpad);
            let raw = match self.llm.complete(&prompt).await {
                Ok(raw) => raw,
                Err(error) => {
                    return AgentOutcome::ExecutionFailure(ExecutionFailure::Upstream(
                        format!("{error:#}"),
                    ))
                }
            };
            let text = truncate_at_observation(&raw);

            match parse_step(text) {
                Some(Step::Finish(answer)) => return AgentOutcome::Success(answer),
                Some(Step::Act { tool, input, log }) => {
                    info!(iteration, tool = %tool, "agent tool call");
                    let observation = self.call_tool(request, &tool, &input).await;
                    scratchpad.push_str(&format!("{log}\nObservation: {observation}\nThought: "));
                }
                None => {
                    warn!(iteration, "agent output could not be parsed");
                    return AgentOutcome::ParseFailure(format!(
                        "{PARSE_FAILURE_PREFIX} {}",
                        text.trim()
                    ));
                }
            }
        }

        debug!("iteration budget spent, asking for a final answer");
        scratchpad.push_str(
            "\n\n더 이상 도구를 사용할 수 없습니다. 지금까지의 관찰만으로 최종 답을 작성하세요.\nFinal Answer: ",
        );
        let prompt = render_prompt(request, &scratchpad);
        match self.llm.complete(&prompt).await {
            Ok(raw) => {
                let text = truncate_at_observation(&raw);
                let answer = match text.rsplit_once(FINAL_ANSWER) {
                    Some((_, answer)) => answer,
                    None => text,
                };
                AgentOutcome::Success(answer.trim().to_string())
            }
            Err(error) => {
                AgentOutcome::ExecutionFailure(ExecutionFailure::Upstream(format!("{error:#}")))
            }
        }
    }

    async fn call_tool(&self, request: &AgentRequest<'_>, name: &str, input: &str) -> String {
        let Some(tool) = request.tools.iter().find(|tool| tool.name() == name) else {
            let names = request
                .tools
                .iter()
                .map(|tool| tool.name())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(tool = %name, intent = %request.intent, "model asked for a tool outside the allowed set");
            return format!("{name} is not a valid tool, try one of [{names}].");
        };

        if let Some(metrics) = &self.metrics {
            metrics.add_tool_calls(1);
        }
        let ctx = ToolContext::new(request.conversation);
        match tool.invoke(input, &ctx).await {
            Ok(output) => output,
            Err(error) => format!("❌ {name} 실행 실패: {error:#}"),
        }
    }
}

#[async_trait]
impl AgentExecutor for ReactExecutor {
    async fn execute(&self, request: AgentRequest<'_>) -> AgentOutcome {
        let timeout = request.limits.timeout;
        match tokio::time::timeout(timeout, self.run(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => AgentOutcome::ExecutionFailure(ExecutionFailure::Timeout(timeout)),
        }
    }
}

fn render_prompt(request: &AgentRequest<'_>, scratchpad: &str) -> String {
    let tool_lines = request
        .tools
        .iter()
        .map(|tool| format!("{}: {}", tool.name(), tool.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = request
        .tools
        .iter()
        .map(|tool| tool.name())
        .collect::<Vec<_>>()
        .join(", ");

    let turns = request.conversation.turns();
    let history = turns
        .iter()
        .skip(turns.len().saturating_sub(HISTORY_TURNS))
        .map(|turn| match turn.role {
            Role::User => format!("사용자: {}", turn.content),
            Role::Assistant => format!("어시스턴트: {}", turn.content),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{system}\n\n사용할 수 있는 도구:\n{tool_lines}\n\n다음 형식을 사용하세요:\n\nQuestion: 답해야 할 입력 질문\nThought: 무엇을 할지 항상 생각하세요\nAction: 수행할 행동, [{tool_names}] 중 하나\nAction Input: 행동에 대한 입력\nObservation: 행동의 결과\n... (Thought/Action/Action Input/Observation은 여러 번 반복될 수 있습니다)\nThought: 이제 최종 답을 알겠습니다\nFinal Answer: 원래 질문에 대한 최종 답\n\n대화 기록:\n{history}\n\nQuestion: {input}\nThought: {scratchpad}",
        system = request.system_prompt,
        input = request.input,
    )
}

fn truncate_at_observation(raw: &str) -> &str {
    match raw.split_once(OBSERVATION_STOP) {
        Some((head, _)) => head,
        None => raw,
    }
}

fn parse_step(text: &str) -> Option<Step> {
    let includes_answer = text.contains(FINAL_ANSWER);

    if let Some(captures) = ACTION_PATTERN.captures(text) {
        if includes_answer {
            return None;
        }
        let tool = captures.get(1)?.as_str().trim().to_string();
        let input = captures
            .get(2)?
            .as_str()
            .trim()
            .trim_matches('"')
            .trim()
            .to_string();
        if tool.is_empty() {
            return None;
        }
        return Some(Step::Act {
            tool,
            input,
            log: text.trim().to_string(),
        });
    }

    let (_, answer) = text.rsplit_once(FINAL_ANSWER)?;
    Some(Step::Finish(answer.trim().to_string()))
}
