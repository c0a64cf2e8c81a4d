//! Registration of the built-in agents.

use std::sync::Arc;

use tracing::info;
use vitrine_core::{Agent, AgentOptions, AgentRegistry, ConfigurableAgent};

use crate::langflow::{LangflowFetcher, LangflowFormatter, LangflowProcessor};
use crate::transport::WorkflowTransport;

pub const LANGFLOW_FETCHER: &str = "langflow_fetcher";
pub const LANGFLOW_PROCESSOR: &str = "langflow_processor";
pub const LANGFLOW_FORMATTER: &str = "langflow_formatter";
pub const AMAZON_FETCHER: &str = "coletor_dados_amazon_fetcher";
pub const AMAZON_PROCESSOR: &str = "coletor_dados_amazon_processor";

/// Fill in identity parameters the caller did not supply.
fn specialized(options: &AgentOptions, name: &str, description: &str) -> AgentOptions {
    let mut options = options.clone();
    options
        .params
        .entry("name".to_string())
        .or_insert_with(|| name.to_string());
    options
        .params
        .entry("description".to_string())
        .or_insert_with(|| description.to_string());
    options
}

/// Register the generic Langflow agents and the Amazon collector factories.
///
/// Every workflow-backed agent posts through `transport`.
pub fn register_default_agents(registry: &mut AgentRegistry, transport: Arc<dyn WorkflowTransport>) {
    let generic_fetch = Arc::clone(&transport);
    registry.register_factory(LANGFLOW_FETCHER, move |options| {
        Ok(Box::new(LangflowFetcher::with_transport(options, Arc::clone(&generic_fetch))?) as Box<dyn Agent>)
    });
    registry.register_type::<LangflowProcessor>(LANGFLOW_PROCESSOR);
    let format_transport = Arc::clone(&transport);
    registry.register_factory(LANGFLOW_FORMATTER, move |options| {
        Ok(Box::new(LangflowFormatter::with_transport(options, Arc::clone(&format_transport))?) as Box<dyn Agent>)
    });

    let fetch_transport = Arc::clone(&transport);
    registry.register_factory(AMAZON_FETCHER, move |options| {
        let options = specialized(
            options,
            "ColetorDadosAmazon - Busca",
            "Agent specialized in fetching Amazon product data",
        );
        Ok(Box::new(LangflowFetcher::with_transport(&options, Arc::clone(&fetch_transport))?) as Box<dyn Agent>)
    });

    registry.register_factory(AMAZON_PROCESSOR, |options| {
        let options = specialized(
            options,
            "ColetorDadosAmazon - Processamento",
            "Agent specialized in processing Amazon product data",
        );
        Ok(Box::new(LangflowProcessor::from_options(&options)?) as Box<dyn Agent>)
    });

    info!("Default agents registered: {:?}", registry.list_types());
}
