use std::env;

use anyhow::Result;
use tripmate_agents::RuntimeConfig;
use tripmate_api::build_app;
use tripmate_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("tripmate_api");

    let config = RuntimeConfig::from_env();
    let bind = env::var("TRIPMATE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(
        bind = %bind,
        model_configured = config.openai.is_some(),
        max_iterations = config.limits.max_iterations,
        "tripmate api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
