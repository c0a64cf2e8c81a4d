//! CLI command definitions.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use vitrine_agents::{register_default_agents, HttpTransport};
use vitrine_core::{AgentFactory, AgentRegistry, CoreResult, Orchestrator, Settings};

pub mod agents;
pub mod fetch;
pub mod serve;

/// Vitrine - product listings through pluggable workflow agents
#[derive(Parser)]
#[command(name = "vitrine")]
#[command(version, about = "Vitrine - product listings through pluggable workflow agents")]
#[command(long_about = r#"
Vitrine fetches product listings through a Langflow workflow, extracts the
embedded product list and normalizes it into product records.

COMMANDS:
  serve   → Run the HTTP API (/fetch-data, /agents, /health)
  fetch   → Run the pipeline once and print the report as JSON
  agents  → Print the registered agents as JSON

CONFIGURATION:
  Settings are read from the environment (and a .env file if present):
  LANGFLOW_FETCHER_API_URL, LANGFLOW_FORMATTER_API_URL, DEFAULT_SCRAPE_URL,
  REQUEST_TIMEOUT, MAX_RETRIES, RETRY_DELAY, VITRINE_DEFAULT_FETCHER,
  VITRINE_DEFAULT_PROCESSOR, VITRINE_DEFAULT_FORMATTER

EXIT CODES:
  0 - Success
  1 - General error
  2 - Configuration error
  3 - Pipeline failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(serve::ServeArgs),

    /// Run the pipeline once and print the result
    Fetch(fetch::FetchArgs),

    /// List registered agents
    Agents(agents::AgentsArgs),
}

/// Workflow endpoint overrides shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct EndpointArgs {
    /// Workflow URL used by fetch agents
    #[arg(long)]
    pub fetcher_api_url: Option<String>,

    /// Workflow URL used by the formatter agent
    #[arg(long)]
    pub formatter_api_url: Option<String>,
}

impl EndpointArgs {
    /// Load settings from the environment and apply these overrides.
    pub fn settings(&self) -> CoreResult<Settings> {
        let mut settings = Settings::from_env()?;
        if let Some(url) = &self.fetcher_api_url {
            settings = settings.with_fetcher_api_url(url.clone());
        }
        if let Some(url) = &self.formatter_api_url {
            settings = settings.with_formatter_api_url(url.clone());
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Build an orchestrator with the default agents over HTTP.
pub fn build_orchestrator(settings: Settings) -> Orchestrator {
    info!("Workflow endpoint: {}", settings.fetcher_api_url);
    let mut registry = AgentRegistry::new(Arc::new(settings));
    register_default_agents(&mut registry, Arc::new(HttpTransport::new()));
    Orchestrator::new(AgentFactory::new(Arc::new(registry)))
}
