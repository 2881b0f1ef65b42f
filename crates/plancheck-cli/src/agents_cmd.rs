//! `plancheck agents`: list the agent types a plan may use.

use anyhow::{Context, Result};

use plancheck_core::agents::{AgentTypeRegistry, BUILT_IN_AGENT_TYPES, TeamDirectory};

use crate::config::PlancheckConfig;

pub fn run_agents(config: &PlancheckConfig) -> Result<()> {
    let source = TeamDirectory::new(&config.team_dir);
    let registry = AgentTypeRegistry::discover(&source).with_context(|| {
        format!(
            "failed to list agent definitions in {}",
            config.team_dir.display()
        )
    })?;

    for name in registry.available() {
        let origin = if BUILT_IN_AGENT_TYPES.contains(&name.as_str()) {
            "built-in"
        } else {
            "team"
        };
        println!("{name:<24} {origin}");
    }
    Ok(())
}
