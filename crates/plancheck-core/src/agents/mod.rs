//! Executor (agent) types a task may declare in its `**Agent Type**:` field.
//!
//! The set of valid names is the union of a fixed built-in list and the
//! names discovered from an [`AgentTypeSource`], usually a directory of
//! agent definition files (one `<name>.md` per agent).
//!
//! ```text
//! TeamDirectory(".claude/agents/team")
//!     |  list_available_types()
//!     v
//! AgentTypeRegistry = BUILT_IN_AGENT_TYPES ∪ discovered
//!     |  is_valid("builder")
//!     v
//! pipeline::checks::AgentTypesExist
//! ```

pub mod registry;
pub mod source;

pub use registry::{AgentTypeRegistry, BUILT_IN_AGENT_TYPES};
pub use source::{AgentTypeSource, InMemoryAgentTypes, TeamDirectory};
