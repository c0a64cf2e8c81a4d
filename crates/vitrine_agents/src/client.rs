//! Workflow client with bounded retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use vitrine_core::envelope::preview;
use vitrine_core::{AgentError, AgentOptions, AgentResult};

use crate::transport::{TransportError, WorkflowRequest, WorkflowTransport};

/// Browser-like user agent sent with every workflow call.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const BODY_PREVIEW: usize = 500;
const STRUCTURE_PREVIEW: usize = 200;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Headers sent on every attempt.
pub fn request_headers() -> Vec<(String, String)> {
    [
        ("Content-Type", "application/json"),
        ("User-Agent", USER_AGENT),
        ("Cache-Control", "no-cache, no-store, must-revalidate"),
        ("Pragma", "no-cache"),
        ("Expires", "0"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Current time as fractional epoch seconds.
fn timestamp() -> String {
    let micros = Utc::now().timestamp_micros();
    format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
}

/// Posts JSON payloads to one workflow endpoint.
#[derive(Clone)]
pub struct WorkflowClient {
    agent: String,
    url: String,
    timeout: Duration,
    policy: RetryPolicy,
    transport: Arc<dyn WorkflowTransport>,
}

impl std::fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("agent", &self.agent)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .finish()
    }
}

impl WorkflowClient {
    pub fn new(
        agent: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
        policy: RetryPolicy,
        transport: Arc<dyn WorkflowTransport>,
    ) -> Self {
        Self {
            agent: agent.into(),
            url: url.into(),
            timeout,
            policy,
            transport,
        }
    }

    /// Build a client from agent options.
    ///
    /// `api_url`, `timeout`, `max_retries` and `retry_delay` parameters
    /// override the settings; `fallback_url` is used when no `api_url`
    /// parameter is given.
    pub fn from_options(
        agent: &str,
        options: &AgentOptions,
        fallback_url: Option<&str>,
        transport: Arc<dyn WorkflowTransport>,
    ) -> AgentResult<Self> {
        let settings = &options.settings;
        let url = options
            .param("api_url")
            .or(fallback_url)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AgentError::Configuration(format!("no workflow URL configured for {}", agent)))?;

        let timeout = options
            .param_u64("timeout")?
            .map(Duration::from_secs)
            .unwrap_or_else(|| settings.timeout());
        let max_attempts = match options.param_u64("max_retries")? {
            Some(n) => u32::try_from(n)
                .map_err(|_| AgentError::Configuration(format!("max_retries out of range: {}", n)))?,
            None => settings.max_retries,
        };
        if max_attempts == 0 {
            return Err(AgentError::Configuration("max_retries must be at least 1".to_string()));
        }
        let delay = options
            .param_u64("retry_delay")?
            .map(Duration::from_secs)
            .unwrap_or_else(|| settings.retry_delay());

        Ok(Self::new(
            agent,
            url,
            timeout,
            RetryPolicy::new(max_attempts, delay),
            transport,
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// POST `payload`, retrying transient failures.
    ///
    /// Every attempt carries a fresh `timestamp` field. Returns the raw body
    /// of the first 2xx response, which must be valid JSON.
    pub async fn post_json(&self, payload: Value) -> AgentResult<String> {
        info!("Request payload: {}", preview(&payload.to_string(), BODY_PREVIEW));

        let attempts = self.policy.max_attempts;
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=attempts {
            if attempt > 1 {
                info!("Waiting {:?} before the next attempt", self.policy.delay);
                tokio::time::sleep(self.policy.delay).await;
            }
            info!("Attempt {} of {} to {}", attempt, attempts, self.url);

            let request = WorkflowRequest {
                url: self.url.clone(),
                body: stamped(&payload),
                headers: request_headers(),
                timeout: self.timeout,
            };

            match self.transport.post(&request).await {
                Ok(response) if response.status == 504 => {
                    warn!("Gateway timeout (504) on attempt {}", attempt);
                    last_failure = "gateway timeout (504)".to_string();
                }
                Ok(response) if !response.is_success() => {
                    warn!(
                        "HTTP {} on attempt {}: {}",
                        response.status,
                        attempt,
                        preview(&response.body, BODY_PREVIEW)
                    );
                    last_failure = format!("HTTP status {}", response.status);
                }
                Ok(response) => {
                    info!("Status code: {}", response.status);
                    return self.accept(response.body);
                }
                Err(TransportError::Timeout(after)) => {
                    warn!("Timeout after {:?} on attempt {}", after, attempt);
                    last_failure = format!("timed out after {:?}", after);
                }
                Err(e) => {
                    error!("Request to workflow API failed: {}", e);
                    last_failure = e.to_string();
                }
            }
        }

        error!("Maximum number of attempts reached for {}", self.url);
        Err(AgentError::Transient {
            agent: self.agent.clone(),
            attempts,
            message: last_failure,
        })
    }

    fn accept(&self, body: String) -> AgentResult<String> {
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => {
                info!("JSON response received");
                info!("Response structure: {}", preview(&value.to_string(), STRUCTURE_PREVIEW));
                info!("Response body: {}", preview(&body, BODY_PREVIEW));
                Ok(body)
            }
            Err(e) => {
                error!("Response is not valid JSON: {}", preview(&body, BODY_PREVIEW));
                Err(AgentError::parse(&self.agent, e.to_string()))
            }
        }
    }
}

fn stamped(payload: &Value) -> Value {
    let mut body = payload.clone();
    match body.as_object_mut() {
        Some(map) => {
            map.insert("timestamp".to_string(), json!(timestamp()));
            body
        }
        None => body,
    }
}
