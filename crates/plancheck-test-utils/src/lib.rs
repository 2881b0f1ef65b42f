//! Shared fixtures for plancheck integration tests.
//!
//! - [`PlanBuilder`] composes plan markdown in the layout the parser reads.
//! - [`TestWorkspace`] is a temporary project directory with helpers for
//!   plans, agent definitions and reference documents.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// Default plan directory inside a workspace.
pub const SPECS_DIR: &str = "specs";
/// Default agent definition directory inside a workspace.
pub const TEAM_DIR: &str = ".claude/agents/team";
/// Default reference document directory inside a workspace.
pub const REFS_DIR: &str = ".claude/refs";

/// One `### N. <title>` task block.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    title: String,
    id: Option<String>,
    depends_on: Option<String>,
    agent_type: Option<String>,
    stack: Option<String>,
}

impl TaskSpec {
    /// A task with an ID, no dependencies, the `general-purpose` agent
    /// and a routable stack.
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            title: title.to_string(),
            id: Some(id.to_string()),
            depends_on: None,
            agent_type: Some("general-purpose".to_string()),
            stack: Some("Java Spring Boot".to_string()),
        }
    }

    /// Raw `**Depends On**:` value, e.g. `"T1, T2"`.
    pub fn depends_on(mut self, value: &str) -> Self {
        self.depends_on = Some(value.to_string());
        self
    }

    pub fn agent(mut self, agent_type: &str) -> Self {
        self.agent_type = Some(agent_type.to_string());
        self
    }

    pub fn stack(mut self, stack: &str) -> Self {
        self.stack = Some(stack.to_string());
        self
    }

    /// Omit the `**Task ID**:` line.
    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// Omit the `**Stack**:` line.
    pub fn without_stack(mut self) -> Self {
        self.stack = None;
        self
    }

    /// Omit the `**Agent Type**:` line.
    pub fn without_agent(mut self) -> Self {
        self.agent_type = None;
        self
    }

    fn render(&self, position: usize, out: &mut String) {
        out.push_str(&format!("### {position}. {}\n", self.title));
        if let Some(id) = &self.id {
            out.push_str(&format!("- **Task ID**: {id}\n"));
        }
        if let Some(deps) = &self.depends_on {
            out.push_str(&format!("- **Depends On**: {deps}\n"));
        }
        if let Some(agent) = &self.agent_type {
            out.push_str(&format!("- **Agent Type**: {agent}\n"));
        }
        if let Some(stack) = &self.stack {
            out.push_str(&format!("- **Stack**: {stack}\n"));
        }
        out.push_str("- Implement the change.\n\n");
    }
}

/// Builds plan markdown.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    title: String,
    existing_files: Vec<String>,
    new_files: Vec<String>,
    tasks: Vec<TaskSpec>,
    criteria: Option<Vec<String>>,
}

impl PlanBuilder {
    /// An empty plan with two acceptance criteria.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            existing_files: Vec::new(),
            new_files: Vec::new(),
            tasks: Vec::new(),
            criteria: Some(vec![
                "- [ ] The build succeeds".to_string(),
                "- [ ] All tests pass".to_string(),
            ]),
        }
    }

    pub fn existing_file(mut self, path: &str) -> Self {
        self.existing_files.push(path.to_string());
        self
    }

    pub fn new_file(mut self, path: &str) -> Self {
        self.new_files.push(path.to_string());
        self
    }

    pub fn task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    /// Replace the acceptance criteria lines.
    pub fn criteria(mut self, lines: &[&str]) -> Self {
        self.criteria = Some(lines.iter().map(|l| (*l).to_string()).collect());
        self
    }

    /// Leave out the `## Acceptance Criteria` section entirely.
    pub fn without_criteria(mut self) -> Self {
        self.criteria = None;
        self
    }

    pub fn build(&self) -> String {
        let mut out = format!("# Plan: {}\n\n## Objective\nDeliver {}.\n\n", self.title, self.title);

        if !self.existing_files.is_empty() || !self.new_files.is_empty() {
            out.push_str("## Relevant Files\n\n");
            for path in &self.existing_files {
                out.push_str(&format!("- `{path}` - existing code\n"));
            }
            if !self.new_files.is_empty() {
                out.push_str("\n### New Files\n\n");
                for path in &self.new_files {
                    out.push_str(&format!("- `{path}` - to be created\n"));
                }
            }
            out.push('\n');
        }

        out.push_str("## Step by Step Tasks\n\n");
        for (i, task) in self.tasks.iter().enumerate() {
            task.render(i + 1, &mut out);
        }

        if let Some(criteria) = &self.criteria {
            out.push_str("## Acceptance Criteria\n\n");
            for line in criteria {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }

        out.push_str("## Notes\nNothing else.\n");
        out
    }
}

/// A temporary project directory. Removed on drop.
#[derive(Debug)]
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp workspace"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent directory");
        }
        std::fs::write(&path, content).expect("failed to write workspace file");
        path
    }

    /// Write a plan into the specs directory.
    pub fn write_plan(&self, name: &str, content: &str) -> PathBuf {
        self.write(&format!("{SPECS_DIR}/{name}"), content)
    }

    /// Create the specs directory without any plan in it.
    pub fn create_specs_dir(&self) -> PathBuf {
        let path = self.dir.path().join(SPECS_DIR);
        std::fs::create_dir_all(&path).expect("failed to create specs directory");
        path
    }

    /// Add an agent definition file for `name`.
    pub fn add_agent(&self, name: &str) -> PathBuf {
        self.write(&format!("{TEAM_DIR}/{name}.md"), &format!("# {name}\n"))
    }

    /// Add a reference document for `source`.
    pub fn add_reference(&self, source: &str, content: &str) -> PathBuf {
        self.write(&format!("{REFS_DIR}/{source}.md"), content)
    }

    /// Set the modification time of `path` to `age` ago.
    pub fn set_age(&self, path: &Path, age: Duration) {
        let file = std::fs::File::options()
            .write(true)
            .open(path)
            .expect("failed to open file for mtime update");
        file.set_modified(SystemTime::now() - age)
            .expect("failed to set modification time");
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
