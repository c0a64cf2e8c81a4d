//! Agent capability contracts.
//!
//! Every agent exposes identity metadata through [`Agent`] and at most one
//! behaviour: [`Fetcher`] turns a source into raw text, [`Processor`] turns
//! raw text or structured records into a flat list of product mappings.
//!
//! Agents are resolved by string identifier at runtime, so the orchestrator
//! cannot know the concrete type. [`Agent::as_fetcher`] and
//! [`Agent::as_processor`] are the runtime capability probe used at that one
//! dynamic boundary; everything else is checked by the compiler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{AgentError, AgentResult};

/// A loosely-typed product mapping as returned by the upstream workflow.
pub type RawProduct = serde_json::Map<String, serde_json::Value>;

/// Capability an agent provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Fetcher,
    Processor,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Fetcher => "fetcher",
            AgentKind::Processor => "processor",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable description of a registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub description: String,
}

impl AgentDescriptor {
    /// Describe an agent instance registered under `id`.
    pub fn of(id: impl Into<String>, agent: &dyn Agent) -> Self {
        Self {
            id: id.into(),
            name: agent.name().to_string(),
            kind: agent.kind(),
            description: agent.description().to_string(),
        }
    }
}

/// Data flowing between pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentData {
    /// Raw text, usually a JSON envelope or a JSON-encoded list.
    Text(String),
    /// Already-extracted product mappings.
    Records(Vec<RawProduct>),
}

impl AgentData {
    pub fn is_empty(&self) -> bool {
        match self {
            AgentData::Text(text) => text.trim().is_empty(),
            AgentData::Records(records) => records.is_empty(),
        }
    }

    /// Short label for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            AgentData::Text(_) => "text",
            AgentData::Records(_) => "records",
        }
    }
}

impl From<String> for AgentData {
    fn from(text: String) -> Self {
        AgentData::Text(text)
    }
}

impl From<Vec<RawProduct>> for AgentData {
    fn from(records: Vec<RawProduct>) -> Self {
        AgentData::Records(records)
    }
}

/// Construction options handed to registered agent types and factories.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Process-wide settings
    pub settings: Arc<Settings>,
    /// Per-call overrides (`api_url`, `name`, `description`, `timeout`, `max_retries`)
    pub params: HashMap<String, String>,
}

impl AgentOptions {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            params: HashMap::new(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a non-empty parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Get a parameter parsed as an unsigned integer.
    pub fn param_u64(&self, key: &str) -> AgentResult<Option<u64>> {
        match self.param(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
                AgentError::Configuration(format!("parameter '{}' must be an integer, got '{}'", key, raw))
            }),
        }
    }
}

/// Identity shared by all agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Human-readable agent name.
    fn name(&self) -> &str;

    /// Capability this agent was built for.
    fn kind(&self) -> AgentKind;

    /// Free-form description.
    fn description(&self) -> &str;

    /// Probe for the fetch capability.
    fn as_fetcher(&self) -> Option<&dyn Fetcher> {
        None
    }

    /// Probe for the transform capability.
    fn as_processor(&self) -> Option<&dyn Processor> {
        None
    }

    /// Run whichever capability this agent provides.
    ///
    /// Fetchers only accept text input.
    async fn process(&self, input: AgentData) -> AgentResult<AgentData> {
        if let Some(fetcher) = self.as_fetcher() {
            return match input {
                AgentData::Text(source) => fetcher.fetch(&source).await.map(AgentData::Text),
                other => Err(AgentError::invalid_input(
                    self.name(),
                    format!("expected text source, got {}", other.shape()),
                )),
            };
        }
        if let Some(processor) = self.as_processor() {
            return processor.transform(input).await.map(AgentData::Records);
        }
        Err(AgentError::CapabilityMismatch {
            id: self.name().to_string(),
            expected: self.kind(),
        })
    }
}

/// Turns a source identifier into raw text from an external system.
#[async_trait]
pub trait Fetcher: Agent {
    async fn fetch(&self, source: &str) -> AgentResult<String>;
}

/// Turns raw text or records into a flat list of product mappings.
#[async_trait]
pub trait Processor: Agent {
    async fn transform(&self, data: AgentData) -> AgentResult<Vec<RawProduct>>;
}
