//! Pipeline orchestration.
//!
//! One run resolves agent identifiers, builds the agents through the
//! factory, and sequences fetch -> process -> (format) -> records. Any stage
//! failure aborts the run as a whole; partial record lists are never
//! returned.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentData, AgentKind, RawProduct};
use crate::config::Settings;
use crate::envelope::{self, LeafError};
use crate::error::{AgentError, PipelineError};
use crate::factory::AgentFactory;
use crate::product::Product;
use crate::registry::AgentCatalog;

/// Caller-supplied choices for one run. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub source: Option<String>,
    pub fetcher: Option<String>,
    pub processor: Option<String>,
    pub formatter: Option<String>,
}

impl PipelineRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn fetcher(mut self, id: impl Into<String>) -> Self {
        self.fetcher = Some(id.into());
        self
    }

    pub fn processor(mut self, id: impl Into<String>) -> Self {
        self.processor = Some(id.into());
        self
    }

    pub fn formatter(mut self, id: impl Into<String>) -> Self {
        self.formatter = Some(id.into());
        self
    }
}

/// Agent identifiers and source a run actually used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    pub source: String,
    pub fetcher: String,
    pub processor: String,
    pub formatter: Option<String>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub plan: ResolvedPlan,
    pub products: Vec<Product>,
    /// Non-fatal observations (default source substituted, envelope unwrapped, ...)
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Sequences fetch, process and format agents for a single request.
///
/// Holds only configuration; every run builds fresh agents.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    factory: AgentFactory,
    settings: Arc<Settings>,
}

impl Orchestrator {
    pub fn new(factory: AgentFactory) -> Self {
        let settings = Arc::clone(factory.registry().settings());
        info!("Agent orchestrator initialized");
        Self { factory, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fill in defaults for anything the request leaves out.
    pub fn plan(&self, request: &PipelineRequest, warnings: &mut Vec<String>) -> ResolvedPlan {
        let defaults = &self.settings.agents;
        let pick = |choice: &Option<String>| {
            choice
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        };

        let source = match request.source.as_deref() {
            Some(source) if !source.trim().is_empty() => source.trim().to_string(),
            Some(blank) => {
                let default = self.settings.default_scrape_url.clone();
                error!("Invalid source received by orchestrator: {:?}", blank);
                warn!("Using default source: {}", default);
                warnings.push(format!("invalid source {:?}; using default {}", blank, default));
                default
            }
            None => {
                info!("No source given, using default: {}", self.settings.default_scrape_url);
                self.settings.default_scrape_url.clone()
            }
        };

        ResolvedPlan {
            source,
            fetcher: pick(&request.fetcher).unwrap_or_else(|| defaults.fetcher.clone()),
            processor: pick(&request.processor).unwrap_or_else(|| defaults.processor.clone()),
            formatter: pick(&request.formatter).or_else(|| defaults.formatter.clone()),
        }
    }

    /// Run the full pipeline and report which stage failed, if any.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let mut warnings = Vec::new();

        let plan = self.plan(&request, &mut warnings);
        info!(
            run_id = %run_id,
            "Starting pipeline: source={} fetcher={} processor={} formatter={:?}",
            plan.source, plan.fetcher, plan.processor, plan.formatter
        );

        let records = self.fetch_and_process_data(&plan, &mut warnings).await?;
        let products: Vec<Product> = records.iter().map(Product::from_raw).collect();
        info!(run_id = %run_id, "Processed {} product(s)", products.len());

        Ok(PipelineReport {
            run_id,
            plan,
            products,
            warnings,
            started_at,
            completed_at: Utc::now(),
            duration_ms: timer.elapsed().as_millis() as u64,
        })
    }

    /// Run the pipeline, collapsing any failure into an empty list.
    pub async fn fetch_and_process_products(&self, request: PipelineRequest) -> Vec<Product> {
        match self.run(request).await {
            Ok(report) => report.products,
            Err(e) => {
                error!("Pipeline aborted at {} stage: {}", e.stage(), e);
                Vec::new()
            }
        }
    }

    /// Fetch, process and optionally format, returning raw product mappings.
    pub async fn fetch_and_process_data(
        &self,
        plan: &ResolvedPlan,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<RawProduct>, PipelineError> {
        info!("Using fetch agent: {}", plan.fetcher);
        info!("Using process agent: {}", plan.processor);

        let fetcher_agent = self.build(&plan.fetcher, "fetcher", AgentKind::Fetcher)?;
        let processor_agent = self.build(&plan.processor, "processor", AgentKind::Processor)?;
        let formatter_agent = match &plan.formatter {
            Some(id) => {
                info!("Using format agent: {}", id);
                Some(self.build(id, "formatter", AgentKind::Processor)?)
            }
            None => None,
        };

        let fetcher = fetcher_agent
            .as_fetcher()
            .ok_or_else(|| mismatch("fetcher", &plan.fetcher, AgentKind::Fetcher))?;
        let processor = processor_agent
            .as_processor()
            .ok_or_else(|| mismatch("processor", &plan.processor, AgentKind::Processor))?;

        let raw = fetcher.fetch(&plan.source).await.map_err(|e| {
            error!("Fetch failed: {}", e);
            PipelineError::FetchFailed(e)
        })?;
        if raw.trim().is_empty() {
            error!("Fetch returned an empty body");
            return Err(PipelineError::FetchFailed(AgentError::parse(
                fetcher_agent.name(),
                "empty response body",
            )));
        }

        let processed = processor
            .transform(AgentData::Text(raw))
            .await
            .map_err(|e| {
                error!("Process failed: {}", e);
                PipelineError::ProcessFailed(e)
            })?;
        if processed.is_empty() {
            info!("Processor returned no products");
            warnings.push("no products extracted".to_string());
            return Ok(processed);
        }

        let next = unwrap_envelope(processed, warnings);

        match (&formatter_agent, &plan.formatter) {
            (Some(agent), Some(id)) => {
                let formatter = agent
                    .as_processor()
                    .ok_or_else(|| mismatch("formatter", id, AgentKind::Processor))?;
                formatter.transform(next).await.map_err(|e| {
                    error!("Format failed: {}", e);
                    PipelineError::FormatFailed(e)
                })
            }
            _ => into_records(next, processor_agent.name()).map_err(PipelineError::ProcessFailed),
        }
    }

    /// Agents available for selection, grouped by capability.
    pub fn list_available_agents(&self) -> AgentCatalog {
        self.factory.registry().catalog()
    }

    fn build(&self, id: &str, role: &'static str, expected: AgentKind) -> Result<Box<dyn Agent>, PipelineError> {
        let agent = self.factory.try_create(id).map_err(|reason| {
            error!("{} agent '{}' not found or invalid: {}", role, id, reason);
            PipelineError::AgentUnavailable {
                role,
                id: id.to_string(),
                reason,
            }
        })?;

        let capable = match expected {
            AgentKind::Fetcher => agent.as_fetcher().is_some(),
            AgentKind::Processor => agent.as_processor().is_some(),
        };
        if !capable {
            error!("{} agent '{}' does not provide the {} capability", role, id, expected);
            return Err(mismatch(role, id, expected));
        }
        Ok(agent)
    }
}

fn mismatch(role: &'static str, id: &str, expected: AgentKind) -> PipelineError {
    PipelineError::AgentUnavailable {
        role,
        id: id.to_string(),
        reason: AgentError::CapabilityMismatch {
            id: id.to_string(),
            expected,
        },
    }
}

/// Unwrap a lone record that is really an undecoded component output.
fn unwrap_envelope(processed: Vec<RawProduct>, warnings: &mut Vec<String>) -> AgentData {
    if let [single] = processed.as_slice() {
        if let Some(inner) = envelope::unwrap_component_text(single) {
            warn!("Processor returned an undecoded envelope; unwrapping results.text.data.text");
            warnings.push("unwrapped nested envelope".to_string());
            return match inner {
                serde_json::Value::String(text) => AgentData::Text(text),
                other => match envelope::records_from_array(&other) {
                    Ok(records) => AgentData::Records(records),
                    Err(_) => AgentData::Text(other.to_string()),
                },
            };
        }
    }
    AgentData::Records(processed)
}

/// Materialize stage output as records when no formatter runs.
fn into_records(data: AgentData, agent: &str) -> Result<Vec<RawProduct>, AgentError> {
    match data {
        AgentData::Records(records) => Ok(records),
        AgentData::Text(text) => envelope::decode_records(&text).map_err(|e| match e {
            LeafError::Parse(msg) => AgentError::parse(agent, msg),
            LeafError::Shape(msg) => AgentError::structural(agent, "results.text.data.text", msg),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Fetcher, Processor};
    use crate::error::AgentResult;
    use crate::registry::AgentRegistry;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct ScriptedFetcher {
        body: AgentResult<String>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Agent for ScriptedFetcher {
        fn name(&self) -> &str {
            "scripted-fetcher"
        }

        fn kind(&self) -> AgentKind {
            AgentKind::Fetcher
        }

        fn description(&self) -> &str {
            "Returns a scripted body"
        }

        fn as_fetcher(&self) -> Option<&dyn Fetcher> {
            Some(self)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, source: &str) -> AgentResult<String> {
            self.seen.lock().push(source.to_string());
            self.body.clone()
        }
    }

    /// Returns the records found at `results.text.data.text`, or the parsed
    /// list itself, mimicking a lenient processor.
    struct JsonListProcessor;

    #[async_trait]
    impl Agent for JsonListProcessor {
        fn name(&self) -> &str {
            "json-list"
        }

        fn kind(&self) -> AgentKind {
            AgentKind::Processor
        }

        fn description(&self) -> &str {
            "Parses a JSON list"
        }

        fn as_processor(&self) -> Option<&dyn Processor> {
            Some(self)
        }
    }

    #[async_trait]
    impl Processor for JsonListProcessor {
        async fn transform(&self, data: AgentData) -> AgentResult<Vec<RawProduct>> {
            match data {
                AgentData::Text(text) => envelope::decode_records(&text)
                    .map_err(|e| AgentError::parse("json-list", e.to_string())),
                AgentData::Records(records) => Ok(records),
            }
        }
    }

    /// Upper-cases every `titulo`, to prove the formatter output supersedes.
    struct UpperFormatter {
        inputs: Arc<Mutex<Vec<AgentData>>>,
    }

    #[async_trait]
    impl Agent for UpperFormatter {
        fn name(&self) -> &str {
            "upper"
        }

        fn kind(&self) -> AgentKind {
            AgentKind::Processor
        }

        fn description(&self) -> &str {
            "Upper-cases titles"
        }

        fn as_processor(&self) -> Option<&dyn Processor> {
            Some(self)
        }
    }

    #[async_trait]
    impl Processor for UpperFormatter {
        async fn transform(&self, data: AgentData) -> AgentResult<Vec<RawProduct>> {
            self.inputs.lock().push(data.clone());
            let records = match data {
                AgentData::Records(records) => records,
                AgentData::Text(text) => envelope::decode_records(&text)
                    .map_err(|e| AgentError::parse("upper", e.to_string()))?,
            };
            Ok(records
                .into_iter()
                .map(|mut r| {
                    if let Some(serde_json::Value::String(t)) = r.get("titulo").cloned() {
                        r.insert("titulo".to_string(), json!(t.to_uppercase()));
                    }
                    r
                })
                .collect())
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        sources: Arc<Mutex<Vec<String>>>,
        formatter_inputs: Arc<Mutex<Vec<AgentData>>>,
    }

    fn harness(body: AgentResult<String>) -> Harness {
        let settings = Arc::new(Settings {
            default_scrape_url: "https://default.example".to_string(),
            ..Settings::default()
        });
        let sources = Arc::new(Mutex::new(Vec::new()));
        let formatter_inputs = Arc::new(Mutex::new(Vec::new()));

        let mut registry = AgentRegistry::new(settings);
        let seen = Arc::clone(&sources);
        registry.register_factory("fetch", move |_| {
            Ok(Box::new(ScriptedFetcher {
                body: body.clone(),
                seen: Arc::clone(&seen),
            }) as Box<dyn Agent>)
        });
        registry.register_factory("process", |_| Ok(Box::new(JsonListProcessor) as Box<dyn Agent>));
        let inputs = Arc::clone(&formatter_inputs);
        registry.register_factory("format", move |_| {
            Ok(Box::new(UpperFormatter {
                inputs: Arc::clone(&inputs),
            }) as Box<dyn Agent>)
        });

        Harness {
            orchestrator: Orchestrator::new(AgentFactory::new(Arc::new(registry))),
            sources,
            formatter_inputs,
        }
    }

    fn request() -> PipelineRequest {
        PipelineRequest::new()
            .source("https://shop.example")
            .fetcher("fetch")
            .processor("process")
    }

    #[tokio::test]
    async fn test_fetch_process_materialize() {
        let h = harness(Ok(r#"[{"titulo":"P1","preco":10.0}]"#.to_string()));
        let report = h.orchestrator.run(request()).await.unwrap();

        assert_eq!(report.products, vec![Product::new("P1", 10.0)]);
        assert_eq!(report.plan.formatter, None);
        assert_eq!(h.sources.lock().as_slice(), ["https://shop.example".to_string()]);
    }

    #[tokio::test]
    async fn test_default_source_substituted() {
        let h = harness(Ok("[]".to_string()));
        let report = h
            .orchestrator
            .run(request().source("   "))
            .await
            .unwrap();

        assert_eq!(report.plan.source, "https://default.example");
        assert_eq!(h.sources.lock().as_slice(), ["https://default.example".to_string()]);
        assert!(report.warnings.iter().any(|w| w.contains("invalid source")));
        assert!(report.products.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_agent_aborts() {
        let h = harness(Ok("[]".to_string()));
        let err = h
            .orchestrator
            .run(request().fetcher("nope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AgentUnavailable { role: "fetcher", reason: AgentError::Unregistered(_), .. }
        ));
        assert!(h.sources.lock().is_empty());
    }

    #[tokio::test]
    async fn test_capability_mismatch_aborts() {
        let h = harness(Ok("[]".to_string()));
        let err = h
            .orchestrator
            .run(request().fetcher("process"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AgentUnavailable { reason: AgentError::CapabilityMismatch { .. }, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty_products() {
        let h = harness(Err(AgentError::Transient {
            agent: "scripted-fetcher".to_string(),
            attempts: 3,
            message: "504".to_string(),
        }));
        let err = h.orchestrator.run(request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::FetchFailed(_)));

        assert!(h.orchestrator.fetch_and_process_products(request()).await.is_empty());
    }

    #[tokio::test]
    async fn test_process_failure() {
        let h = harness(Ok("not json".to_string()));
        let err = h.orchestrator.run(request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ProcessFailed(AgentError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_formatter_output_supersedes() {
        let h = harness(Ok(r#"[{"titulo":"p1","preco":"R$ 5,50"}]"#.to_string()));
        let report = h
            .orchestrator
            .run(request().formatter("format"))
            .await
            .unwrap();

        assert_eq!(report.products, vec![Product::new("P1", 5.5)]);
        assert_eq!(h.formatter_inputs.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_undecoded_envelope_is_unwrapped_before_formatting() {
        let inner = r#"[{"titulo":"a"},{"titulo":"b"}]"#;
        let body = json!([{"results": {"text": {"data": {"text": inner}}}}]).to_string();
        let h = harness(Ok(body));

        let report = h
            .orchestrator
            .run(request().formatter("format"))
            .await
            .unwrap();

        assert_eq!(
            h.formatter_inputs.lock().as_slice(),
            [AgentData::Text(inner.to_string())]
        );
        assert_eq!(report.products.len(), 2);
        assert_eq!(report.products[1].name, "B");
        assert!(report.warnings.iter().any(|w| w.contains("unwrapped")));
    }

    #[tokio::test]
    async fn test_undecoded_envelope_without_formatter() {
        let body = json!([{"results": {"text": {"data": {"text": "[{\"titulo\":\"a\"}]"}}}}]).to_string();
        let h = harness(Ok(body));
        let report = h.orchestrator.run(request()).await.unwrap();
        assert_eq!(report.products, vec![Product::new("a", 0.0)]);
    }

    #[test]
    fn test_plan_uses_configured_formatter() {
        let settings = Arc::new(Settings::default().with_default_formatter("format"));
        let orchestrator = Orchestrator::new(AgentFactory::new(Arc::new(AgentRegistry::new(settings))));
        let mut warnings = Vec::new();

        let plan = orchestrator.plan(&PipelineRequest::new().source("x"), &mut warnings);
        assert_eq!(plan.formatter.as_deref(), Some("format"));

        let plan = orchestrator.plan(&PipelineRequest::new().source("x").formatter("other"), &mut warnings);
        assert_eq!(plan.formatter.as_deref(), Some("other"));
    }

    #[test]
    fn test_missing_source_is_not_a_warning() {
        let h = harness(Ok("[]".to_string()));
        let mut warnings = Vec::new();
        let plan = h.orchestrator.plan(&PipelineRequest::new(), &mut warnings);

        assert_eq!(plan.source, "https://default.example");
        assert!(warnings.is_empty());

        let plan = h.orchestrator.plan(&PipelineRequest::new().source(""), &mut warnings);
        assert_eq!(plan.source, "https://default.example");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_plan_uses_defaults() {
        let h = harness(Ok("[]".to_string()));
        let mut warnings = Vec::new();
        let plan = h.orchestrator.plan(&PipelineRequest::new().source("x"), &mut warnings);
        assert_eq!(plan.fetcher, "coletor_dados_amazon_fetcher");
        assert_eq!(plan.processor, "coletor_dados_amazon_processor");
        assert_eq!(plan.formatter, None);
        assert!(warnings.is_empty());
    }
}
