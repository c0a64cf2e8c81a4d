//! Serve command - Run the HTTP API.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;
use vitrine_server::{AppStateInner, ServerConfig};

use super::{build_orchestrator, EndpointArgs};

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "VITRINE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "VITRINE_PORT", default_value_t = 5000)]
    pub port: u16,

    #[command(flatten)]
    pub endpoints: EndpointArgs,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let settings = args.endpoints.settings()?;
    info!(
        "Default agents: fetcher={} processor={} formatter={:?}",
        settings.agents.fetcher, settings.agents.processor, settings.agents.formatter
    );

    let state = Arc::new(AppStateInner::new(build_orchestrator(settings)));
    let config = ServerConfig {
        host: args.host,
        port: args.port,
    };

    vitrine_server::serve(config, state).await?;
    Ok(())
}
