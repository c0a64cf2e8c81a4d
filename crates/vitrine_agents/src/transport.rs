//! Workflow transport trait and the `reqwest` implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures below the HTTP status level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(String),
}

/// One POST to a workflow endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub url: String,
    /// JSON payload sent as the request body
    pub body: Value,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl WorkflowRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a workflow response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub status: u16,
    pub body: String,
}

impl WorkflowResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends workflow requests.
///
/// Non-2xx statuses are returned as responses, not errors; retry decisions
/// belong to the caller.
#[async_trait]
pub trait WorkflowTransport: Send + Sync {
    async fn post(&self, request: &WorkflowRequest) -> TransportResult<WorkflowResponse>;
}

/// Transport backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkflowTransport for HttpTransport {
    async fn post(&self, request: &WorkflowRequest) -> TransportResult<WorkflowResponse> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Request(e.to_string())
            }
        };

        let response = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .json(&request.body)
            .headers(header_map(&request.headers)?)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status().as_u16();
        debug!("POST {} -> {}", request.url, status);
        let body = response.text().await.map_err(classify)?;

        Ok(WorkflowResponse { status, body })
    }
}

/// Collapse header pairs into a map; a repeated name keeps its last value.
fn header_map(headers: &[(String, String)]) -> TransportResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Request(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Request(format!("invalid value for header {}: {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_success_range() {
        assert!(WorkflowResponse::ok("{}").is_success());
        assert!(WorkflowResponse::new(204, "").is_success());
        assert!(!WorkflowResponse::new(504, "").is_success());
        assert!(!WorkflowResponse::new(302, "").is_success());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = WorkflowRequest {
            url: "http://localhost".to_string(),
            body: json!({}),
            headers: vec![("Cache-Control".to_string(), "no-cache".to_string())],
            timeout: Duration::from_secs(1),
        };
        assert_eq!(request.header("cache-control"), Some("no-cache"));
        assert_eq!(request.header("Pragma"), None);
    }

    #[test]
    fn test_header_map_keeps_one_value_per_name() {
        let headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
        ];
        let map = header_map(&headers).unwrap();

        assert_eq!(map.get_all("content-type").iter().count(), 1);
        assert_eq!(map["content-type"], "application/json");
        assert_eq!(map["pragma"], "no-cache");
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let headers = vec![("bad header".to_string(), "x".to_string())];
        assert!(matches!(header_map(&headers), Err(TransportError::Request(_))));
    }
}
