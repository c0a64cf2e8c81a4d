//! # vitrine_agents
//!
//! Workflow-backed agents for Vitrine.
//!
//! - [`transport`]: the [`WorkflowTransport`] seam and its `reqwest` implementation
//! - [`client`]: JSON POST with cache busting and fixed-delay retry
//! - [`url`]: reader-proxy URL normalization
//! - [`langflow`]: fetch, processor and formatter agents
//! - [`mock`]: scripted transport for tests

pub mod client;
pub mod defaults;
pub mod langflow;
pub mod mock;
pub mod transport;
pub mod url;

pub use client::{RetryPolicy, WorkflowClient, USER_AGENT};
pub use defaults::register_default_agents;
pub use langflow::{LangflowFetcher, LangflowFormatter, LangflowProcessor};
pub use mock::MockTransport;
pub use transport::{HttpTransport, TransportError, TransportResult, WorkflowRequest, WorkflowResponse, WorkflowTransport};
pub use url::format_for_reader;
