//! Extraction of the product list from a fetch envelope.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info};
use vitrine_core::envelope::{self, preview, render_path, LeafError, ENVELOPE_TEXT};
use vitrine_core::{
    Agent, AgentData, AgentError, AgentKind, AgentOptions, AgentResult, ConfigurableAgent, Processor, RawProduct,
};

pub const DEFAULT_NAME: &str = "Langflow Processor";
pub const DEFAULT_DESCRIPTION: &str = "Generic agent that extracts products from a Langflow response";

/// Reads `outputs[0].outputs[0].results.text.data.text` from a fetch envelope.
///
/// The leaf may be a list of mappings or a JSON string holding one.
#[derive(Debug, Clone)]
pub struct LangflowProcessor {
    name: String,
    description: String,
}

impl LangflowProcessor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    fn extract(&self, text: &str) -> AgentResult<Vec<RawProduct>> {
        let envelope: Value = serde_json::from_str(text).map_err(|e| {
            error!("Failed to decode response JSON: {}", e);
            debug!("Invalid response: {}", preview(text, 500));
            AgentError::parse(&self.name, e.to_string())
        })?;

        let leaf = envelope::walk(&envelope, ENVELOPE_TEXT).map_err(|miss| {
            error!("Unexpected response structure at '{}': {}", miss.path, miss.message);
            debug!("Response structure: {}", preview(&envelope.to_string(), 200));
            AgentError::structural(&self.name, miss.path, miss.message)
        })?;

        envelope::records_from_leaf(leaf).map_err(|e| {
            error!("Product list could not be read: {}", e);
            match e {
                LeafError::Parse(msg) => AgentError::parse(&self.name, msg),
                LeafError::Shape(msg) => AgentError::structural(&self.name, render_path(ENVELOPE_TEXT), msg),
            }
        })
    }
}

impl Default for LangflowProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, DEFAULT_DESCRIPTION)
    }
}

impl ConfigurableAgent for LangflowProcessor {
    fn from_options(options: &AgentOptions) -> AgentResult<Self> {
        Ok(Self::new(
            options.param("name").unwrap_or(DEFAULT_NAME),
            options.param("description").unwrap_or(DEFAULT_DESCRIPTION),
        ))
    }
}

impl Agent for LangflowProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Processor
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn as_processor(&self) -> Option<&dyn Processor> {
        Some(self)
    }
}

#[async_trait]
impl Processor for LangflowProcessor {
    async fn transform(&self, data: AgentData) -> AgentResult<Vec<RawProduct>> {
        let text = match data {
            AgentData::Text(text) => text,
            other => {
                error!("Processor expects raw text, got {}", other.shape());
                return Err(AgentError::invalid_input(
                    &self.name,
                    format!("expected raw text, got {}", other.shape()),
                ));
            }
        };
        if text.trim().is_empty() {
            error!("Empty data received for processing");
            return Err(AgentError::invalid_input(&self.name, "empty input"));
        }

        let products = self.extract(&text)?;
        info!("Extracted {} product(s)", products.len());
        Ok(products)
    }
}
