//! Fetch agent backed by a Langflow workflow.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};
use vitrine_core::envelope::preview;
use vitrine_core::{Agent, AgentError, AgentKind, AgentOptions, AgentResult, Fetcher};

use crate::client::WorkflowClient;
use crate::transport::WorkflowTransport;
use crate::url::format_for_reader;

pub const DEFAULT_NAME: &str = "Langflow Fetcher";
pub const DEFAULT_DESCRIPTION: &str = "Generic agent that fetches data through a Langflow workflow";

/// Sends the reader-proxied source URL to a workflow and returns its raw JSON reply.
#[derive(Debug, Clone)]
pub struct LangflowFetcher {
    name: String,
    description: String,
    client: WorkflowClient,
}

impl LangflowFetcher {
    pub fn new(name: impl Into<String>, description: impl Into<String>, client: WorkflowClient) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            client,
        }
    }

    /// Build from options using the given transport.
    pub fn with_transport(options: &AgentOptions, transport: Arc<dyn WorkflowTransport>) -> AgentResult<Self> {
        let name = options.param("name").unwrap_or(DEFAULT_NAME);
        let client = WorkflowClient::from_options(
            name,
            options,
            Some(options.settings.fetcher_api_url.as_str()),
            transport,
        )?;
        Ok(Self::new(
            name,
            options.param("description").unwrap_or(DEFAULT_DESCRIPTION),
            client,
        ))
    }

    pub fn client(&self) -> &WorkflowClient {
        &self.client
    }
}

impl Agent for LangflowFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Fetcher
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn as_fetcher(&self) -> Option<&dyn Fetcher> {
        Some(self)
    }
}

#[async_trait]
impl Fetcher for LangflowFetcher {
    async fn fetch(&self, source: &str) -> AgentResult<String> {
        info!("Fetcher received source: {}", source);
        let source = source.trim();
        if source.is_empty() {
            error!("Invalid source: {:?}", source);
            return Err(AgentError::invalid_input(&self.name, "source must be a non-empty string"));
        }

        let formatted = format_for_reader(source);
        let payload = json!({
            "input_value": formatted,
            "output_type": "text",
            "input_type": "text",
        });

        let body = self.client.post_json(payload).await?;
        if body.contains("r.jina.ai") {
            warn!("Response still contains the reader prefix: {}", preview(&body, 200));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use vitrine_core::Settings;

    fn fetcher(mock: &MockTransport) -> LangflowFetcher {
        let settings = Settings::default().with_retry(3, 0);
        let options = AgentOptions::new(Arc::new(settings));
        LangflowFetcher::with_transport(&options, Arc::new(mock.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_reader_url() {
        let mock = MockTransport::new().respond(200, r#"{"outputs": []}"#);
        let body = fetcher(&mock).fetch("example.com").await.unwrap();

        assert_eq!(body, r#"{"outputs": []}"#);
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, Settings::default().fetcher_api_url);
        assert_eq!(requests[0].body["input_value"], "https://r.jina.ai/https://example.com");
        assert_eq!(requests[0].body["output_type"], "text");
        assert_eq!(requests[0].body["input_type"], "text");
    }

    #[tokio::test]
    async fn test_blank_source_makes_no_call() {
        let mock = MockTransport::new();
        let err = fetcher(&mock).fetch("   ").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput { .. }));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_timeouts_exhaust() {
        let mock = MockTransport::new().respond(504, "");
        let err = fetcher(&mock).fetch("https://shop.example").await.unwrap_err();
        assert!(matches!(err, AgentError::Transient { attempts: 3, .. }));
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn test_options_override_identity() {
        let options = AgentOptions::new(Arc::new(Settings::default()))
            .with_param("name", "Custom")
            .with_param("api_url", "http://other/run");
        let agent = LangflowFetcher::with_transport(&options, Arc::new(MockTransport::new())).unwrap();
        assert_eq!(agent.name(), "Custom");
        assert_eq!(agent.description(), DEFAULT_DESCRIPTION);
        assert_eq!(agent.client().url(), "http://other/run");
        assert!(agent.as_fetcher().is_some());
        assert!(agent.as_processor().is_none());
    }
}
