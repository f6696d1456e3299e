use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::executor::ExecutionLimits;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub limits: ExecutionLimits,
    pub openai: Option<OpenAiConfig>,
    pub serper_api_key: Option<String>,
    pub github_token: Option<String>,
    pub calendar_id: Option<String>,
    pub google_credentials: Option<String>,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let limits = limits_from_values(
            env::var("TRIPMATE_MAX_ITERATIONS").ok().as_deref(),
            env::var("TRIPMATE_EXECUTION_TIMEOUT_SECONDS").ok().as_deref(),
        );

        let openai = non_empty_var("TRIPMATE_OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: non_empty_var("TRIPMATE_OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: non_empty_var("TRIPMATE_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        });

        Self {
            limits,
            openai,
            serper_api_key: non_empty_var("SERPER_API_KEY"),
            github_token: non_empty_var("GITHUB_TOKEN"),
            calendar_id: non_empty_var("CALENDAR_ID"),
            google_credentials: non_empty_var("GOOGLE_APPLICATION_CREDENTIALS"),
        }
    }

    /// Which integration credentials are present, for diagnostics only.
    pub fn credential_status(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("GITHUB_TOKEN", self.github_token.is_some()),
            ("GOOGLE_APPLICATION_CREDENTIALS", self.google_credentials.is_some()),
            ("CALENDAR_ID", self.calendar_id.is_some()),
            ("SERPER_API_KEY", self.serper_api_key.is_some()),
        ]
    }
}

/// Unparseable or non-positive values fall back to the defaults.
fn limits_from_values(
    max_iterations: Option<&str>,
    timeout_seconds: Option<&str>,
) -> ExecutionLimits {
    let defaults = ExecutionLimits::default();
    ExecutionLimits {
        max_iterations: positive::<usize>(max_iterations).unwrap_or(defaults.max_iterations),
        timeout: positive::<u64>(timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}

fn positive<T>(value: Option<&str>) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    value?
        .trim()
        .parse::<T>()
        .ok()
        .filter(|parsed| *parsed > T::default())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
