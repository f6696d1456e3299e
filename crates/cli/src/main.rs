use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tripmate_agents::{
    client_from_config, ExecutionLimits, ReactExecutor, RuntimeConfig, ToolRegistry, TripAgent,
};
use tripmate_core::{
    classify_detailed, compose_system_prompt, fill_context, ConversationContext, Intent,
    ToolPolicy,
};
use tripmate_observability::{init_tracing, TurnMetrics};
use tripmate_tools::{standard_registry, ToolBackends};

#[derive(Debug, Parser)]
#[command(name = "tripmate")]
#[command(about = "Intent-routed travel assistant")]
struct Cli {
    /// Takes precedence over TRIPMATE_MAX_ITERATIONS.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Takes precedence over TRIPMATE_EXECUTION_TIMEOUT_SECONDS.
    #[arg(long)]
    timeout_seconds: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive conversation on stdin.
    Chat,
    /// Print the intent and score map for a message.
    Classify { text: String },
    /// List the tools an intent may use.
    Tools {
        #[arg(long, value_parser = parse_intent)]
        intent: Intent,
    },
    /// Print the system prompt composed for an intent.
    Prompt {
        #[arg(long, value_parser = parse_intent)]
        intent: Intent,
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct ToolListing<'a> {
    intent: Intent,
    tools: Vec<ToolLine<'a>>,
}

#[derive(Debug, Serialize)]
struct ToolLine<'a> {
    name: &'a str,
    description: &'a str,
}

fn parse_intent(value: &str) -> Result<Intent, String> {
    Intent::parse(value).ok_or_else(|| {
        let labels = Intent::ALL.map(Intent::as_label).join(", ");
        format!("unknown intent `{value}`, expected one of {labels}")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("tripmate_cli");
    let cli = Cli::parse();

    let mut config = RuntimeConfig::from_env();
    config.limits = limits_from_flags(config.limits, cli.max_iterations, cli.timeout_seconds);

    match cli.command {
        Command::Chat => run_chat(&config).await?,
        Command::Classify { text } => {
            println!("{}", serde_json::to_string_pretty(&classify_detailed(&text))?);
        }
        Command::Tools { intent } => {
            let registry = build_registry(&config)?;
            let allowed = registry.allowed_for(ToolPolicy::standard(), intent);
            let listing = ToolListing {
                intent,
                tools: allowed
                    .iter()
                    .map(|tool| ToolLine {
                        name: tool.name(),
                        description: tool.description(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Command::Prompt { intent, context } => {
            let registry = build_registry(&config)?;
            let allowed = registry.allowed_for(ToolPolicy::standard(), intent);
            let names = allowed.iter().map(|tool| tool.name()).collect::<Vec<_>>();
            let prompt = compose_system_prompt(intent, &names);
            println!("{}", fill_context(&prompt, context.as_deref()));
        }
    }

    Ok(())
}

fn limits_from_flags(
    defaults: ExecutionLimits,
    max_iterations: Option<usize>,
    timeout_seconds: Option<u64>,
) -> ExecutionLimits {
    ExecutionLimits {
        max_iterations: max_iterations
            .filter(|value| *value > 0)
            .unwrap_or(defaults.max_iterations),
        timeout: timeout_seconds
            .filter(|value| *value > 0)
            .map(std::time::Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}

fn build_registry(config: &RuntimeConfig) -> Result<ToolRegistry> {
    let llm = client_from_config(config)?;
    let backends = ToolBackends::from_config(config, llm)?;
    standard_registry(&backends).context("failed to register tools")
}

async fn run_chat(config: &RuntimeConfig) -> Result<()> {
    let metrics = TurnMetrics::shared();
    let llm = client_from_config(config)?;
    let backends = ToolBackends::from_config(config, llm.clone())?;
    let registry = standard_registry(&backends).context("failed to register tools")?;
    let agent = TripAgent::new(
        Arc::new(registry),
        Arc::new(ReactExecutor::new(llm).with_metrics(metrics.clone())),
        config.limits,
        metrics,
    );

    if config.openai.is_none() {
        eprintln!("TRIPMATE_OPENAI_API_KEY is not set; every turn will fail.");
    }
    println!("Tripmate chat mode. type 'exit' to quit.");

    let mut conversation = ConversationContext::new();
    conversation.push_assistant("안녕하세요! AI 여행 플래너입니다.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent.handle_turn(message, &conversation).await;
        conversation.push_user(message);
        conversation.push_assistant(reply.reply.clone());

        println!("\n[{}] {}\n", reply.intent, reply.reply);
    }

    let snapshot = agent.metrics().snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_intent_aliases() {
        assert_eq!(parse_intent("share"), Ok(Intent::SharePlan));
        assert_eq!(parse_intent("book-calendar"), Ok(Intent::BookCalendar));
        assert!(parse_intent("weather").unwrap_err().contains("PLAN_TRIP"));
    }

    #[test]
    fn flags_override_only_when_positive() {
        let defaults = ExecutionLimits::default();
        let limits = limits_from_flags(defaults, Some(5), Some(0));
        assert_eq!(limits.max_iterations, 5);
        assert_eq!(limits.timeout, Duration::from_secs(30));
    }

    #[test]
    fn limit_flags_never_read_the_environment() {
        std::env::set_var("TRIPMATE_MAX_ITERATIONS", "abc");
        let cli = Cli::try_parse_from(["tripmate", "classify", "부산 여행"]).unwrap();
        assert_eq!(cli.max_iterations, None);
        assert_eq!(cli.timeout_seconds, None);

        let cli =
            Cli::try_parse_from(["tripmate", "--max-iterations", "3", "classify", "x"]).unwrap();
        assert_eq!(cli.max_iterations, Some(3));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
