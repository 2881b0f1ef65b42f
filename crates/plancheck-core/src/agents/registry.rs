//! Agent type registry -- the set of executor names a plan may reference.

use std::collections::BTreeSet;
use std::io;

use tracing::debug;

use super::source::AgentTypeSource;

/// Agent types that are always available, regardless of the team directory.
pub const BUILT_IN_AGENT_TYPES: &[&str] = &[
    "general-purpose",
    "Bash",
    "Explore",
    "Plan",
    "statusline-setup",
    "claude-code-guide",
    "meta-agent",
];

/// Immutable set of valid agent type names.
///
/// # Example
///
/// ```
/// use plancheck_core::agents::{AgentTypeRegistry, InMemoryAgentTypes};
///
/// let registry = AgentTypeRegistry::discover(&InMemoryAgentTypes::new(["builder"])).unwrap();
/// assert!(registry.is_valid("builder"));
/// assert!(registry.is_valid("general-purpose"));
/// assert!(!registry.is_valid("wizard"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTypeRegistry {
    available: BTreeSet<String>,
}

impl AgentTypeRegistry {
    /// A registry holding only the built-in agent types.
    pub fn builtin() -> Self {
        Self {
            available: BUILT_IN_AGENT_TYPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// The built-in agent types plus everything `source` lists.
    pub fn discover(source: &dyn AgentTypeSource) -> io::Result<Self> {
        let discovered = source.list_available_types()?;
        debug!(discovered = discovered.len(), "discovered agent types");
        let mut registry = Self::builtin();
        registry.available.extend(discovered);
        Ok(registry)
    }

    /// Return `true` if `name` is a known agent type. Matching is exact.
    pub fn is_valid(&self, name: &str) -> bool {
        self.available.contains(name)
    }

    /// All known agent type names, sorted.
    pub fn available(&self) -> &BTreeSet<String> {
        &self.available
    }

    /// Number of known agent types.
    pub fn len(&self) -> usize {
        self.available.len()
    }

    /// Return `true` if no agent types are known.
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl Default for AgentTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
