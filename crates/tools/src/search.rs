use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tripmate_agents::{ToolContext, ToolHandler};
use tripmate_core::sanitize_input;

use crate::input;

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const MAX_RESULTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaceResult {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    pub link: String,
}

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<PlaceResult>>;
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<PlaceResult>,
}

/// Web search through serper.dev, localised to Korea.
#[derive(Clone)]
pub struct SerperSearch {
    http: Client,
    api_key: Option<String>,
}

impl SerperSearch {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, api_key })
    }
}

#[async_trait]
impl PlaceSearch for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<PlaceResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .context("SERPER_API_KEY is not configured")?;

        let response = self
            .http
            .post(SERPER_ENDPOINT)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "gl": "kr", "hl": "ko" }))
            .send()
            .await
            .context("search request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("search returned status {}", status.as_u16());
        }

        let body: SerperResponse = response
            .json()
            .await
            .context("search response parse failed")?;
        Ok(body.organic)
    }
}

pub struct SearchPlace {
    search: Arc<dyn PlaceSearch>,
}

impl SearchPlace {
    pub fn new(search: Arc<dyn PlaceSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl ToolHandler for SearchPlace {
    async fn invoke(&self, input: &str, _ctx: &ToolContext<'_>) -> Result<String> {
        let query = sanitize_input(input);
        let query = input::non_empty(query.trim(), "query")?;

        let results = self.search.search(query).await?;
        if results.is_empty() {
            return Ok(format!("'{query}'에 대한 검색 결과가 없습니다."));
        }

        Ok(results
            .iter()
            .take(MAX_RESULTS)
            .map(|item| format!("• {} ({}) – {}", item.title, item.snippet, item.link))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tripmate_core::ConversationContext;

    use super::*;

    struct FixedSearch {
        results: Vec<PlaceResult>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PlaceSearch for FixedSearch {
        async fn search(&self, query: &str) -> Result<Vec<PlaceResult>> {
            self.queries.lock().push(query.to_string());
            Ok(self.results.clone())
        }
    }

    fn place(n: usize) -> PlaceResult {
        PlaceResult {
            title: format!("맛집 {n}"),
            snippet: format!("설명 {n}"),
            link: format!("https://example.com/{n}"),
        }
    }

    #[tokio::test]
    async fn keeps_top_three_results() {
        let search = Arc::new(FixedSearch {
            results: (1..=5).map(place).collect(),
            queries: Mutex::new(Vec::new()),
        });
        let conversation = ConversationContext::new();

        let output = SearchPlace::new(search.clone())
            .invoke("\"부산; 맛집\"", &ToolContext::new(&conversation))
            .await
            .unwrap();

        assert_eq!(
            output,
            "• 맛집 1 (설명 1) – https://example.com/1\n• 맛집 2 (설명 2) – https://example.com/2\n• 맛집 3 (설명 3) – https://example.com/3"
        );
        assert_eq!(search.queries.lock()[0], "부산 맛집");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let search = Arc::new(FixedSearch {
            results: Vec::new(),
            queries: Mutex::new(Vec::new()),
        });
        let conversation = ConversationContext::new();
        let result = SearchPlace::new(search)
            .invoke(" ;; ", &ToolContext::new(&conversation))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let error = SerperSearch::new(None)
            .unwrap()
            .search("제주")
            .await
            .unwrap_err();
        assert!(error.to_string().contains("SERPER_API_KEY"));
    }

    #[test]
    fn organic_results_tolerate_missing_snippets() {
        let body: SerperResponse = serde_json::from_str(
            r#"{"organic":[{"title":"해운대","link":"https://example.com"}],"searchParameters":{}}"#,
        )
        .unwrap();
        assert_eq!(body.organic[0].snippet, "");
    }
}
