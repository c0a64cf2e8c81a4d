//! Stateless facade over the agent registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::warn;

use crate::agent::Agent;
use crate::error::AgentResult;
use crate::registry::AgentRegistry;

/// Creates agents by identifier.
///
/// Holds no state of its own; it only decouples callers from the concrete
/// registry they were given.
#[derive(Debug, Clone)]
pub struct AgentFactory {
    registry: Arc<AgentRegistry>,
}

impl AgentFactory {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Create an agent, returning `None` if it cannot be built.
    pub fn create(&self, id: &str) -> Option<Box<dyn Agent>> {
        self.create_with(id, &HashMap::new())
    }

    /// Create an agent with construction parameters, returning `None` if it cannot be built.
    pub fn create_with(&self, id: &str, params: &HashMap<String, String>) -> Option<Box<dyn Agent>> {
        match self.registry.resolve(id, params) {
            Ok(agent) => Some(agent),
            Err(e) => {
                warn!("Agent '{}' could not be created: {}", id, e);
                None
            }
        }
    }

    /// Create an agent, keeping the failure reason.
    pub fn try_create(&self, id: &str) -> AgentResult<Box<dyn Agent>> {
        self.registry.resolve(id, &HashMap::new())
    }

    /// All identifiers the registry knows.
    pub fn list_types(&self) -> BTreeSet<String> {
        self.registry.list_types()
    }
}
