use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::info;
use tripmate_agents::{ToolContext, ToolHandler};
use tripmate_core::classify_intent;

use crate::calendar::now_kst;

const GITHUB_API: &str = "https://api.github.com";
const MISSING_TOKEN: &str = "❌ GITHUB_TOKEN 환경 변수가 설정되지 않았습니다.";
const MISSING_PLAN: &str = "❌ 저장할 여행 계획을 찾을 수 없습니다.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistDraft {
    pub filename: String,
    pub content: String,
    pub description: String,
}

impl GistDraft {
    /// Draft for a travel plan, named after the current Korean time.
    pub fn travel_plan(plan: &str, description: &str) -> Self {
        Self {
            filename: format!("travel_plan_{}.md", now_kst().format("%Y%m%d_%H%M%S")),
            content: plan.to_string(),
            description: description.to_string(),
        }
    }
}

#[async_trait]
pub trait GistPublisher: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Publishes a public gist and returns its html url.
    async fn publish(&self, draft: &GistDraft) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct CreatedGist {
    html_url: String,
}

#[derive(Clone)]
pub struct GitHubGists {
    http: Client,
    token: Option<String>,
}

impl GitHubGists {
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("tripmate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, token })
    }
}

#[async_trait]
impl GistPublisher for GitHubGists {
    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    async fn publish(&self, draft: &GistDraft) -> Result<String> {
        let token = self
            .token
            .as_deref()
            .context("GITHUB_TOKEN is not configured")?;

        let mut files = Map::new();
        files.insert(draft.filename.clone(), json!({ "content": draft.content }));
        let payload = json!({
            "description": draft.description,
            "public": true,
            "files": files,
        });

        let response = self
            .http
            .post(format!("{GITHUB_API}/gists"))
            .header("Authorization", format!("token {token}"))
            .header("Accept", "application/vnd.github.v3+json")
            .json(&payload)
            .send()
            .await
            .context("gist request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt = body.chars().take(200).collect::<String>();
            anyhow::bail!("gist creation failed (status {}): {}", status.as_u16(), excerpt);
        }

        let created: CreatedGist = response.json().await.context("gist response parse failed")?;
        Ok(created.html_url)
    }
}

async fn publish_and_report(gists: &dyn GistPublisher, draft: GistDraft) -> Result<String> {
    let url = gists.publish(&draft).await?;
    info!(filename = %draft.filename, "gist published");
    Ok(format!(
        "✅ Gist 생성 완료!\n🔗 URL: {url}\n📄 파일명: {}\n📊 크기: {}문자",
        draft.filename,
        draft.content.chars().count()
    ))
}

/// `filename;content;description`. Anything else shares the latest plan.
pub struct ShareGist {
    gists: Arc<dyn GistPublisher>,
}

impl ShareGist {
    pub fn new(gists: Arc<dyn GistPublisher>) -> Self {
        Self { gists }
    }
}

#[async_trait]
impl ToolHandler for ShareGist {
    async fn invoke(&self, input: &str, ctx: &ToolContext<'_>) -> Result<String> {
        if !self.gists.is_configured() {
            return Ok(MISSING_TOKEN.to_string());
        }

        let mut parts = input.splitn(3, ';').map(str::trim);
        let draft = match (parts.next(), parts.next(), parts.next()) {
            (Some(filename), Some(content), Some(description)) if !filename.is_empty() => {
                GistDraft {
                    filename: filename.to_string(),
                    content: content.to_string(),
                    description: description.to_string(),
                }
            }
            _ => match ctx.latest_travel_plan() {
                Some(plan) => GistDraft::travel_plan(plan, "AI로 생성된 여행 계획"),
                None => return Ok(MISSING_PLAN.to_string()),
            },
        };

        publish_and_report(self.gists.as_ref(), draft).await
    }
}

pub struct ShareTravelPlanGist {
    gists: Arc<dyn GistPublisher>,
}

impl ShareTravelPlanGist {
    pub fn new(gists: Arc<dyn GistPublisher>) -> Self {
        Self { gists }
    }
}

#[async_trait]
impl ToolHandler for ShareTravelPlanGist {
    async fn invoke(&self, _input: &str, ctx: &ToolContext<'_>) -> Result<String> {
        let Some(plan) = ctx.latest_travel_plan() else {
            return Ok(format!("{MISSING_PLAN} 먼저 여행 계획을 생성해주세요."));
        };
        if !self.gists.is_configured() {
            return Ok(MISSING_TOKEN.to_string());
        }

        let draft = GistDraft::travel_plan(plan, "AI 여행 플래너로 생성된 여행 계획");
        publish_and_report(self.gists.as_ref(), draft).await
    }
}

/// Reports sharing prerequisites. Never prints credential values.
pub struct DebugShareStatus {
    gists: Arc<dyn GistPublisher>,
    credentials: Vec<(&'static str, bool)>,
}

impl DebugShareStatus {
    pub fn new(gists: Arc<dyn GistPublisher>, credentials: Vec<(&'static str, bool)>) -> Self {
        Self { gists, credentials }
    }
}

fn presence(present: bool) -> &'static str {
    if present {
        "설정됨"
    } else {
        "❌ 미설정"
    }
}

#[async_trait]
impl ToolHandler for DebugShareStatus {
    async fn invoke(&self, _input: &str, ctx: &ToolContext<'_>) -> Result<String> {
        let mut lines = vec![
            format!("GitHub Token: {}", presence(self.gists.is_configured())),
            format!(
                "여행 계획: {}",
                if ctx.latest_travel_plan().is_some() {
                    "발견됨"
                } else {
                    "❌ 없음"
                }
            ),
            format!("'공유해줘' 인텐트: {}", classify_intent("공유해줘")),
        ];
        lines.extend(
            self.credentials
                .iter()
                .map(|(name, present)| format!("{name}: {}", presence(*present))),
        );
        Ok(lines.join("\n"))
    }
}
