//! Agent registry for managing agent construction strategies.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, AgentDescriptor, AgentKind, AgentOptions};
use crate::config::Settings;
use crate::error::{AgentError, AgentResult};

/// An agent type that can be built from [`AgentOptions`].
pub trait ConfigurableAgent: Agent + Sized + 'static {
    fn from_options(options: &AgentOptions) -> AgentResult<Self>;
}

/// Zero-configuration constructor closure.
pub type AgentFactoryFn = Arc<dyn Fn(&AgentOptions) -> AgentResult<Box<dyn Agent>> + Send + Sync>;

type TypeConstructor = fn(&AgentOptions) -> AgentResult<Box<dyn Agent>>;

fn construct<A: ConfigurableAgent>(options: &AgentOptions) -> AgentResult<Box<dyn Agent>> {
    Ok(Box::new(A::from_options(options)?))
}

/// A registered agent type.
#[derive(Clone, Copy)]
struct TypeEntry {
    type_name: &'static str,
    construct: TypeConstructor,
}

/// Agents grouped by capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCatalog {
    pub fetchers: Vec<AgentDescriptor>,
    pub processors: Vec<AgentDescriptor>,
}

/// A registry of agent construction strategies.
///
/// Identifiers map to either a constructible agent type or a factory
/// closure. When an identifier has both, the factory wins. The registry is
/// populated once at startup and then shared read-only behind an `Arc`.
pub struct AgentRegistry {
    settings: Arc<Settings>,
    types: HashMap<String, TypeEntry>,
    factories: HashMap<String, AgentFactoryFn>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new(settings: Arc<Settings>) -> Self {
        info!("Agent registry initialized");
        Self {
            settings,
            types: HashMap::new(),
            factories: HashMap::new(),
        }
    }

    /// Settings handed to every constructed agent.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Register a constructible agent type.
    ///
    /// An existing type under the same identifier is replaced.
    pub fn register_type<A: ConfigurableAgent>(&mut self, id: impl Into<String>) {
        let id = id.into();
        let type_name = std::any::type_name::<A>();
        let entry = TypeEntry {
            type_name,
            construct: construct::<A>,
        };
        if let Some(previous) = self.types.insert(id.clone(), entry) {
            warn!(
                "Replacing agent type for '{}' ({} -> {})",
                id, previous.type_name, type_name
            );
        }
        info!("Agent type '{}' registered as '{}'", type_name, id);
    }

    /// Register a factory closure.
    ///
    /// An existing factory under the same identifier is replaced.
    pub fn register_factory<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&AgentOptions) -> AgentResult<Box<dyn Agent>> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.insert(id.clone(), Arc::new(factory)).is_some() {
            warn!("Replacing agent factory for '{}'", id);
        }
        info!("Agent factory registered as '{}'", id);
    }

    /// Check if an identifier is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id) || self.types.contains_key(id)
    }

    /// Build an agent for `id`.
    ///
    /// Factories take precedence over types. Construction failures are
    /// reported as [`AgentError::Construction`].
    pub fn resolve(&self, id: &str, params: &HashMap<String, String>) -> AgentResult<Box<dyn Agent>> {
        let options = AgentOptions::new(Arc::clone(&self.settings)).with_params(params.clone());

        if let Some(factory) = self.factories.get(id) {
            debug!("Creating agent '{}' from factory", id);
            return factory(&options).map_err(|e| {
                error!("Error creating agent '{}' from factory: {}", id, e);
                wrap_construction(id, e)
            });
        }

        if let Some(entry) = self.types.get(id) {
            debug!("Creating agent '{}' from type {}", id, entry.type_name);
            return (entry.construct)(&options).map_err(|e| {
                error!("Error creating agent '{}' from type {}: {}", id, entry.type_name, e);
                wrap_construction(id, e)
            });
        }

        error!("No agent registered for type '{}'", id);
        Err(AgentError::Unregistered(id.to_string()))
    }

    /// All identifiers known to the registry.
    pub fn list_types(&self) -> BTreeSet<String> {
        self.types
            .keys()
            .chain(self.factories.keys())
            .cloned()
            .collect()
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.list_types().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.factories.is_empty()
    }

    /// Describe the agent registered under `id` by building it once.
    pub fn describe(&self, id: &str) -> AgentResult<AgentDescriptor> {
        let agent = self.resolve(id, &HashMap::new())?;
        Ok(AgentDescriptor::of(id, agent.as_ref()))
    }

    /// Describe every constructible agent, grouped by capability.
    ///
    /// Agents that cannot be built with the current settings are skipped.
    pub fn catalog(&self) -> AgentCatalog {
        let mut catalog = AgentCatalog::default();
        for id in self.list_types() {
            match self.describe(&id) {
                Ok(descriptor) => match descriptor.kind {
                    AgentKind::Fetcher => catalog.fetchers.push(descriptor),
                    AgentKind::Processor => catalog.processors.push(descriptor),
                },
                Err(e) => debug!("Skipping '{}' in catalog: {}", id, e),
            }
        }
        catalog
    }
}

fn wrap_construction(id: &str, error: AgentError) -> AgentError {
    match error {
        AgentError::Construction { .. } => error,
        other => AgentError::construction(id, other.to_string()),
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
