use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::{OpenAiConfig, RuntimeConfig};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Text completion over the OpenAI Responses API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "input": [
                {
                    "role": "user",
                    "content": [
                        { "type": "input_text", "text": prompt }
                    ]
                }
            ]
        });

        let response = self
            .http
            .post(format!("{}/responses", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(self.config.api_key.as_str())
            .json(&payload)
            .send()
            .await
            .context("model request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model returned status {}: {}", status.as_u16(), body);
        }

        let body: Value = response.json().await.context("model response parse failed")?;
        extract_output_text(&body)
            .filter(|value| !value.trim().is_empty())
            .context("model output text missing")
    }
}

/// Used when no model credentials are configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredLlm;

#[async_trait]
impl LlmClient for UnconfiguredLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("TRIPMATE_OPENAI_API_KEY is not configured")
    }
}

pub fn client_from_config(config: &RuntimeConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match &config.openai {
        Some(openai) => Arc::new(OpenAiClient::new(openai.clone())?),
        None => Arc::new(UnconfiguredLlm),
    };
    Ok(client)
}

fn extract_output_text(payload: &Value) -> Option<String> {
    if let Some(value) = payload.get("output_text").and_then(Value::as_str) {
        return Some(value.to_string());
    }

    let chunks = payload
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|content| content.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|content| content.get("text").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_output_text_shortcut() {
        let body = json!({ "output_text": "Final Answer: 안녕하세요" });
        assert_eq!(
            extract_output_text(&body).as_deref(),
            Some("Final Answer: 안녕하세요")
        );
    }

    #[test]
    fn joins_output_text_chunks() {
        let body = json!({
            "output": [
                { "type": "reasoning", "content": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "Thought: 검색" },
                    { "type": "refusal", "text": "skip" },
                    { "type": "output_text", "text": "Action: search_place" }
                ]}
            ]
        });
        assert_eq!(
            extract_output_text(&body).as_deref(),
            Some("Thought: 검색\n\nAction: search_place")
        );
        assert_eq!(extract_output_text(&json!({ "output": [] })), None);
    }

    #[tokio::test]
    async fn missing_credentials_fail_per_call() {
        let client = client_from_config(&RuntimeConfig::default()).unwrap();
        let error = client.complete("안녕").await.unwrap_err();
        assert!(error.to_string().contains("TRIPMATE_OPENAI_API_KEY"));
    }
}
