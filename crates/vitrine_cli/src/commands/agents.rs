//! Agents command - List registered agents.

use anyhow::Result;
use clap::Args;

use super::{build_orchestrator, EndpointArgs};

#[derive(Args)]
pub struct AgentsArgs {
    #[command(flatten)]
    pub endpoints: EndpointArgs,
}

pub async fn execute(args: AgentsArgs) -> Result<()> {
    let orchestrator = build_orchestrator(args.endpoints.settings()?);
    let catalog = orchestrator.list_available_agents();
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}
