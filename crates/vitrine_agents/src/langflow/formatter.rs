//! Formatting agent: a second workflow call that normalizes product records.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use vitrine_core::envelope::{self, preview, FORMATTER_STRATEGIES};
use vitrine_core::{
    Agent, AgentData, AgentError, AgentKind, AgentOptions, AgentResult, Processor, RawProduct,
};

use crate::client::WorkflowClient;
use crate::transport::WorkflowTransport;

pub const DEFAULT_NAME: &str = "Langflow Formatter";
pub const DEFAULT_DESCRIPTION: &str = "Agent that formats processed products through a Langflow workflow";

const ENVELOPE_DUMP_LIMIT: usize = 10_000;

/// Posts processed data to the formatting workflow and extracts the result.
#[derive(Debug, Clone)]
pub struct LangflowFormatter {
    name: String,
    description: String,
    client: WorkflowClient,
}

impl LangflowFormatter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, client: WorkflowClient) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            client,
        }
    }

    /// Build from options using the given transport.
    ///
    /// Fails when neither an `api_url` parameter nor a formatter endpoint
    /// in the settings is available.
    pub fn with_transport(options: &AgentOptions, transport: Arc<dyn WorkflowTransport>) -> AgentResult<Self> {
        let name = options.param("name").unwrap_or(DEFAULT_NAME);
        let client = WorkflowClient::from_options(
            name,
            options,
            options.settings.formatter_api_url.as_deref(),
            transport,
        )?;
        Ok(Self::new(
            name,
            options.param("description").unwrap_or(DEFAULT_DESCRIPTION),
            client,
        ))
    }

    fn input_text(&self, data: AgentData) -> AgentResult<String> {
        match data {
            AgentData::Records(records) if records.is_empty() => {
                error!("Empty data received for formatting");
                Err(AgentError::invalid_input(&self.name, "empty record list"))
            }
            AgentData::Records(records) => {
                info!("Serializing {} record(s) for formatting", records.len());
                serde_json::to_string(&records).map_err(|e| AgentError::invalid_input(&self.name, e.to_string()))
            }
            AgentData::Text(text) if text.trim().is_empty() => {
                error!("Text received for formatting is blank");
                Err(AgentError::invalid_input(&self.name, "blank text"))
            }
            AgentData::Text(text) => {
                if serde_json::from_str::<Value>(&text).is_ok() {
                    info!("Formatting a JSON string");
                } else {
                    info!("Formatting raw text");
                    debug!("Raw text: {}", preview(&text, 200));
                }
                Ok(text)
            }
        }
    }
}

impl Agent for LangflowFormatter {
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
impl Processor for LangflowFormatter {
    async fn transform(&self, data: AgentData) -> AgentResult<Vec<RawProduct>> {
        let text = self.input_text(data)?;
        let body = self.client.post_json(json!({"inputs": {"text": text}})).await?;

        let response: Value =
            serde_json::from_str(&body).map_err(|e| AgentError::parse(&self.name, e.to_string()))?;

        match envelope::extract_with(FORMATTER_STRATEGIES, &response) {
            Some((strategy, products)) => {
                info!("Formatted {} product(s) via {}", products.len(), strategy);
                Ok(products)
            }
            None => {
                error!("No extraction strategy matched the formatter response");
                error!("Full response: {}", preview(&response.to_string(), ENVELOPE_DUMP_LIMIT));
                Err(AgentError::structural(
                    &self.name,
                    "$",
                    "no product list found in formatter response",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use vitrine_core::Settings;

    fn formatter(mock: &MockTransport) -> LangflowFormatter {
        let settings = Settings::default()
            .with_formatter_api_url("http://langflow.test/format")
            .with_retry(2, 0);
        let options = AgentOptions::new(Arc::new(settings));
        LangflowFormatter::with_transport(&options, Arc::new(mock.clone())).unwrap()
    }

    fn record(value: Value) -> RawProduct {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_records_are_serialized_into_inputs_text() {
        let mock = MockTransport::new().respond_json(&json!({"produtos": [{"nome": "A", "preço": 1.5}]}));
        let products = formatter(&mock)
            .transform(AgentData::Records(vec![record(json!({"titulo": "a"}))]))
            .await
            .unwrap();

        assert_eq!(products[0]["nome"], "A");
        let requests = mock.requests();
        assert_eq!(requests[0].url, "http://langflow.test/format");
        assert_eq!(requests[0].body["inputs"]["text"], r#"[{"titulo":"a"}]"#);
        assert!(requests[0].body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_raw_text_forwarded_verbatim() {
        let reply = json!({"outputs": [{"outputs": [{"results": {"text": {"data": {"text": "[{\"nome\":\"X\"}]"}}}}]}]});
        let mock = MockTransport::new().respond_json(&reply);
        let products = formatter(&mock)
            .transform(AgentData::Text("plain words, not json".to_string()))
            .await
            .unwrap();

        assert_eq!(products[0]["nome"], "X");
        assert_eq!(mock.requests()[0].body["inputs"]["text"], "plain words, not json");
    }

    #[tokio::test]
    async fn test_no_strategy_matches() {
        let mock = MockTransport::new().respond_json(&json!({"different_key": "value"}));
        let err = formatter(&mock)
            .transform(AgentData::Text("[]".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Structural { .. }));
    }

    #[tokio::test]
    async fn test_empty_inputs_make_no_call() {
        let mock = MockTransport::new();
        let agent = formatter(&mock);
        assert!(agent.transform(AgentData::Records(Vec::new())).await.is_err());
        assert!(agent.transform(AgentData::Text("  ".to_string())).await.is_err());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_json_reply_is_parse_error() {
        let mock = MockTransport::new().respond(200, "oops");
        let err = formatter(&mock)
            .transform(AgentData::Text("[]".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Parse { .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_requires_endpoint() {
        let options = AgentOptions::new(Arc::new(Settings::default()));
        let err = LangflowFormatter::with_transport(&options, Arc::new(MockTransport::new())).unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
