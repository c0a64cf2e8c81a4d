//! Runtime settings.
//!
//! Settings are read once at startup (environment, optionally seeded from a
//! `.env` file) and shared immutably behind an `Arc` afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

pub const ENV_FETCHER_API_URL: &str = "LANGFLOW_FETCHER_API_URL";
pub const ENV_FORMATTER_API_URL: &str = "LANGFLOW_FORMATTER_API_URL";
pub const ENV_DEFAULT_SCRAPE_URL: &str = "DEFAULT_SCRAPE_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "RETRY_DELAY";
pub const ENV_DEFAULT_FETCHER: &str = "VITRINE_DEFAULT_FETCHER";
pub const ENV_DEFAULT_PROCESSOR: &str = "VITRINE_DEFAULT_PROCESSOR";
pub const ENV_DEFAULT_FORMATTER: &str = "VITRINE_DEFAULT_FORMATTER";

/// Agent identifiers used when a request does not name one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefaults {
    pub fetcher: String,
    pub processor: String,
    /// Formatting is optional; `None` skips the stage.
    pub formatter: Option<String>,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            fetcher: "coletor_dados_amazon_fetcher".to_string(),
            processor: "coletor_dados_amazon_processor".to_string(),
            formatter: None,
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Workflow endpoint called by fetch agents
    pub fetcher_api_url: String,
    /// Workflow endpoint called by the formatter agent
    pub formatter_api_url: Option<String>,
    /// Source used when a request carries none
    pub default_scrape_url: String,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
    /// Total attempts per remote call
    pub max_retries: u32,
    /// Delay between attempts in seconds
    pub retry_delay: u64,
    pub agents: AgentDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetcher_api_url: "http://localhost:7860/api/v1/run/coletor-dados".to_string(),
            formatter_api_url: None,
            default_scrape_url: "https://www.amazon.com.br/gp/bestsellers".to_string(),
            request_timeout: 60,
            max_retries: 3,
            retry_delay: 5,
            agents: AgentDefaults::default(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment, seeding it from `.env` if present.
    pub fn from_env() -> CoreResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let settings = Self {
            fetcher_api_url: get(ENV_FETCHER_API_URL).unwrap_or(defaults.fetcher_api_url),
            formatter_api_url: get(ENV_FORMATTER_API_URL),
            default_scrape_url: get(ENV_DEFAULT_SCRAPE_URL).unwrap_or(defaults.default_scrape_url),
            request_timeout: parse_number(ENV_REQUEST_TIMEOUT, get(ENV_REQUEST_TIMEOUT))?
                .unwrap_or(defaults.request_timeout),
            max_retries: parse_number(ENV_MAX_RETRIES, get(ENV_MAX_RETRIES))?
                .unwrap_or(defaults.max_retries),
            retry_delay: parse_number(ENV_RETRY_DELAY, get(ENV_RETRY_DELAY))?
                .unwrap_or(defaults.retry_delay),
            agents: AgentDefaults {
                fetcher: get(ENV_DEFAULT_FETCHER).unwrap_or(defaults.agents.fetcher),
                processor: get(ENV_DEFAULT_PROCESSOR).unwrap_or(defaults.agents.processor),
                formatter: get(ENV_DEFAULT_FORMATTER),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants that the agents rely on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_retries == 0 {
            return Err(CoreError::Config(format!("{} must be at least 1", ENV_MAX_RETRIES)));
        }
        if self.fetcher_api_url.trim().is_empty() {
            return Err(CoreError::Config(format!("{} must not be empty", ENV_FETCHER_API_URL)));
        }
        if matches!(&self.formatter_api_url, Some(url) if url.trim().is_empty()) {
            return Err(CoreError::Config(format!("{} must not be empty", ENV_FORMATTER_API_URL)));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn with_fetcher_api_url(mut self, url: impl Into<String>) -> Self {
        self.fetcher_api_url = url.into();
        self
    }

    pub fn with_formatter_api_url(mut self, url: impl Into<String>) -> Self {
        self.formatter_api_url = Some(url.into());
        self
    }

    pub fn with_default_formatter(mut self, id: impl Into<String>) -> Self {
        self.agents.formatter = Some(id.into());
        self
    }

    pub fn with_retry(mut self, max_retries: u32, retry_delay: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: Option<String>) -> CoreResult<Option<T>> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| CoreError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_reads_values() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_FETCHER_API_URL, "http://flow/run/a"),
            (ENV_FORMATTER_API_URL, "http://flow/run/b"),
            (ENV_REQUEST_TIMEOUT, "30"),
            (ENV_MAX_RETRIES, "5"),
            (ENV_RETRY_DELAY, "0"),
            (ENV_DEFAULT_FORMATTER, "langflow_formatter"),
        ]))
        .unwrap();

        assert_eq!(settings.fetcher_api_url, "http://flow/run/a");
        assert_eq!(settings.formatter_api_url.as_deref(), Some("http://flow/run/b"));
        assert_eq!(settings.request_timeout, 30);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.retry_delay(), Duration::ZERO);
        assert_eq!(settings.agents.formatter.as_deref(), Some("langflow_formatter"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = Settings::from_lookup(lookup(&[(ENV_MAX_RETRIES, "many")])).unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_RETRIES));
    }

    #[test]
    fn test_rejects_zero_retries() {
        assert!(Settings::from_lookup(lookup(&[(ENV_MAX_RETRIES, "0")])).is_err());
    }
}
