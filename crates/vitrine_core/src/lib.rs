//! # vitrine_core
//!
//! Agent contracts and pipeline orchestration for Vitrine.
//!
//! Product listings are gathered by chaining pluggable agents: a fetcher
//! retrieves raw text for a source, a processor extracts product mappings
//! from it, and an optional formatter normalizes them. Agents are looked up
//! by string identifier in an [`AgentRegistry`] populated at startup.
//!
//! # Architecture
//!
//! - **Agents**: [`Agent`] identity plus a [`Fetcher`] or [`Processor`] capability
//! - **Registry**: maps identifiers to agent types or factory closures
//! - **Factory**: stateless facade used by callers that only need instances
//! - **Orchestrator**: runs fetch -> process -> format for one request
//! - **Envelope**: named strategies for digging records out of workflow responses
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vitrine_core::{AgentFactory, AgentRegistry, Orchestrator, PipelineRequest, Settings};
//!
//! let settings = Arc::new(Settings::from_env()?);
//! let mut registry = AgentRegistry::new(settings);
//! registry.register_factory("my_fetcher", |options| build_fetcher(options));
//!
//! let orchestrator = Orchestrator::new(AgentFactory::new(Arc::new(registry)));
//! let products = orchestrator
//!     .fetch_and_process_products(PipelineRequest::new().source("https://shop.example"))
//!     .await;
//! ```

pub mod agent;
pub mod config;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod orchestrator;
pub mod product;
pub mod registry;

pub use agent::{Agent, AgentData, AgentDescriptor, AgentKind, AgentOptions, Fetcher, Processor, RawProduct};
pub use config::{AgentDefaults, Settings};
pub use error::{AgentError, AgentResult, CoreError, CoreResult, PipelineError};
pub use factory::AgentFactory;
pub use orchestrator::{Orchestrator, PipelineReport, PipelineRequest, ResolvedPlan};
pub use product::{parse_price, Product, ProductStatistics};
pub use registry::{AgentCatalog, AgentFactoryFn, AgentRegistry, ConfigurableAgent};
