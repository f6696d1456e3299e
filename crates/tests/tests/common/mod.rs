#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tripmate_agents::{ExecutionLimits, LlmClient, ReactExecutor, TripAgent};
use tripmate_observability::TurnMetrics;
use tripmate_tools::{
    standard_registry, GistDraft, GistPublisher, MemoryCalendar, PlaceResult, PlaceSearch,
    ToolBackends,
};

/// Replays canned completions in order and keeps every prompt it saw.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn push(&self, reply: &str) {
        self.replies.lock().push_back(reply.to_string());
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

pub struct FixedSearch;

#[async_trait]
impl PlaceSearch for FixedSearch {
    async fn search(&self, query: &str) -> Result<Vec<PlaceResult>> {
        Ok(vec![PlaceResult {
            title: format!("{query} 추천"),
            snippet: "현지인 맛집".to_string(),
            link: "https://example.com/place".to_string(),
        }])
    }
}

#[derive(Default)]
pub struct RecordingGists {
    pub published: Mutex<Vec<GistDraft>>,
}

#[async_trait]
impl GistPublisher for RecordingGists {
    fn is_configured(&self) -> bool {
        true
    }

    async fn publish(&self, draft: &GistDraft) -> Result<String> {
        self.published.lock().push(draft.clone());
        Ok("https://gist.github.com/tripmate/test".to_string())
    }
}

pub struct Harness {
    pub llm: Arc<ScriptedLlm>,
    pub calendar: Arc<MemoryCalendar>,
    pub gists: Arc<RecordingGists>,
    pub metrics: Arc<TurnMetrics>,
    pub agent: Arc<TripAgent>,
}

pub fn harness() -> Harness {
    let llm = Arc::new(ScriptedLlm::default());
    let calendar = Arc::new(MemoryCalendar::new());
    let gists = Arc::new(RecordingGists::default());
    let metrics = TurnMetrics::shared();

    let backends = ToolBackends {
        llm: llm.clone(),
        calendar: calendar.clone(),
        search: Arc::new(FixedSearch),
        gists: gists.clone(),
        credentials: vec![("GITHUB_TOKEN", true), ("SERPER_API_KEY", true)],
    };
    let registry = standard_registry(&backends).expect("standard tools register");
    let executor = ReactExecutor::new(llm.clone()).with_metrics(metrics.clone());
    let agent = Arc::new(TripAgent::new(
        Arc::new(registry),
        Arc::new(executor),
        ExecutionLimits::default(),
        metrics.clone(),
    ));

    Harness {
        llm,
        calendar,
        gists,
        metrics,
        agent,
    }
}
