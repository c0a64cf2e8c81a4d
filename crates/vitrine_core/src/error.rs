//! Error types for the core module.

use thiserror::Error;

use crate::agent::AgentKind;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while loading configuration or running a pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Failure reasons reported by agents.
///
/// Agents never panic across their public methods; every failure is one of
/// these variants so callers can tell a bad source from an exhausted retry
/// budget from an upstream shape change.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Invalid input for agent {agent}: {message}")]
    InvalidInput { agent: String, message: String },

    #[error("Agent type not registered: {0}")]
    Unregistered(String),

    #[error("Failed to construct agent {id}: {message}")]
    Construction { id: String, message: String },

    #[error("Agent {id} does not provide the {expected} capability")]
    CapabilityMismatch { id: String, expected: AgentKind },

    #[error("Transient failure in {agent} after {attempts} attempt(s): {message}")]
    Transient {
        agent: String,
        attempts: u32,
        message: String,
    },

    #[error("Unexpected response structure in {agent} at '{path}': {message}")]
    Structural {
        agent: String,
        path: String,
        message: String,
    },

    #[error("Failed to parse response in {agent}: {message}")]
    Parse { agent: String, message: String },

    #[error("Agent configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Create an invalid input error.
    pub fn invalid_input(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Create a construction error.
    pub fn construction(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a structural error for the given path.
    pub fn structural(
        agent: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Structural {
            agent: agent.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            agent: agent.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Pipeline stage that aborted a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Agent '{id}' not available for role {role}: {reason}")]
    AgentUnavailable {
        role: &'static str,
        id: String,
        reason: AgentError,
    },

    #[error("Fetch failed: {0}")]
    FetchFailed(AgentError),

    #[error("Process failed: {0}")]
    ProcessFailed(AgentError),

    #[error("Format failed: {0}")]
    FormatFailed(AgentError),
}

impl PipelineError {
    /// The agent failure underlying this abort.
    pub fn reason(&self) -> &AgentError {
        match self {
            Self::AgentUnavailable { reason, .. } => reason,
            Self::FetchFailed(e) | Self::ProcessFailed(e) | Self::FormatFailed(e) => e,
        }
    }

    /// Short stage label used in logs and API responses.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::AgentUnavailable { .. } => "resolve",
            Self::FetchFailed(_) => "fetch",
            Self::ProcessFailed(_) => "process",
            Self::FormatFailed(_) => "format",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        let transient = AgentError::Transient {
            agent: "fetcher".to_string(),
            attempts: 3,
            message: "504".to_string(),
        };
        assert!(transient.is_retryable());
        assert!(!AgentError::structural("processor", "outputs[0]", "missing").is_retryable());
        assert!(!AgentError::parse("processor", "eof").is_retryable());
    }

    #[test]
    fn test_pipeline_error_exposes_reason() {
        let err = PipelineError::ProcessFailed(AgentError::parse("processor", "bad json"));
        assert_eq!(err.stage(), "process");
        assert!(matches!(err.reason(), AgentError::Parse { .. }));
        assert!(err.to_string().starts_with("Process failed"));
    }
}
