//! Fetch command - Run the pipeline once.

use anyhow::Result;
use clap::Args;
use tracing::info;
use vitrine_core::PipelineRequest;

use super::{build_orchestrator, EndpointArgs};

#[derive(Args)]
pub struct FetchArgs {
    /// Page to collect products from (defaults to DEFAULT_SCRAPE_URL)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Fetch agent identifier
    #[arg(long)]
    pub fetcher: Option<String>,

    /// Processor agent identifier
    #[arg(long)]
    pub processor: Option<String>,

    /// Formatter agent identifier
    #[arg(long)]
    pub formatter: Option<String>,

    /// Print only the product list instead of the full report
    #[arg(long)]
    pub products_only: bool,

    #[command(flatten)]
    pub endpoints: EndpointArgs,
}

pub async fn execute(args: FetchArgs) -> Result<()> {
    let orchestrator = build_orchestrator(args.endpoints.settings()?);

    let request = PipelineRequest {
        source: args.source,
        fetcher: args.fetcher,
        processor: args.processor,
        formatter: args.formatter,
    };

    let report = orchestrator.run(request).await?;
    info!(
        "Collected {} product(s) from {} in {} ms",
        report.products.len(),
        report.plan.source,
        report.duration_ms
    );

    let output = if args.products_only {
        serde_json::to_string_pretty(&report.products)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", output);
    Ok(())
}
