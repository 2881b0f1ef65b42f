//! Validation pipeline: parse a plan once, run every structural check,
//! and turn the collected findings into a single verdict.
//!
//! Checks never short-circuit. A plan passes only when no check reports
//! anything, and a failing verdict lists every finding in check order.

pub mod checks;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::agents::{AgentTypeRegistry, AgentTypeSource};
use crate::document::{PlanDocument, parse_plan};
use crate::graph::GraphIssue;
use crate::router::ContextRouter;

pub use checks::{CheckContext, MIN_CRITERIA_LINES, PlanCheck, default_checks};

/// A structural finding in a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("File not found: `{path}` (listed in Relevant Files)")]
    FileNotFound { path: String },

    #[error("Task #{position} has no Task ID")]
    MissingTaskId { position: usize },

    #[error("Duplicate Task ID: `{id}` (tasks #{first} and #{duplicate})")]
    DuplicateTaskId {
        id: String,
        first: usize,
        duplicate: usize,
    },

    #[error("Task `{task}` depends on `{dependency}` which doesn't exist")]
    DanglingDependency { task: String, dependency: String },

    #[error("Circular dependency: {}", .cycle.join(" → "))]
    CircularDependency { cycle: Vec<String> },

    #[error(
        "Task `{task}` uses Agent Type `{agent_type}` which doesn't exist (available: {})",
        .available.join(", ")
    )]
    UnknownAgentType {
        task: String,
        agent_type: String,
        available: Vec<String>,
    },

    #[error("Acceptance Criteria section is missing")]
    AcceptanceCriteriaMissing,

    #[error("Acceptance Criteria section is empty")]
    AcceptanceCriteriaEmpty,

    #[error("Acceptance Criteria has fewer than 2 items ({lines} found); add verifiable criteria")]
    AcceptanceCriteriaTooShort { lines: usize },

    #[error(
        "Task `{task}` has no **Stack** field, so context routing cannot load coding standards for it"
    )]
    MissingStack { task: String },

    #[error("Task `{task}` Stack \"{stack}\" doesn't match any routing keywords. Use: {hint}")]
    UnroutableStack {
        task: String,
        stack: String,
        hint: String,
    },
}

impl From<GraphIssue> for PlanError {
    fn from(issue: GraphIssue) -> Self {
        match issue {
            GraphIssue::MissingTaskId { position } => Self::MissingTaskId { position },
            GraphIssue::DuplicateTaskId {
                id,
                first,
                duplicate,
            } => Self::DuplicateTaskId {
                id,
                first,
                duplicate,
            },
            GraphIssue::DanglingDependency { task, dependency } => {
                Self::DanglingDependency { task, dependency }
            }
            GraphIssue::CircularDependency { cycle } => Self::CircularDependency { cycle },
        }
    }
}

/// Failures that prevent validation from running at all.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cannot read plan file {}: {source}", .path.display())]
    DocumentUnreadable { path: PathBuf, source: io::Error },

    #[error("failed to list agent types: {0}")]
    AgentDiscovery(#[source] io::Error),
}

/// The outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// The document that was validated.
    pub path: PathBuf,
    /// Number of tasks found in the document.
    pub tasks_validated: usize,
    /// Number of checks that ran.
    pub checks_run: usize,
    /// Every finding, in check order.
    pub errors: Vec<PlanError>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Render the report as a pass/fail verdict.
    pub fn verdict(&self) -> Verdict {
        let path = self.path.display();
        if self.passed() {
            return Verdict::Pass {
                message: format!(
                    "Plan '{path}' passed all {} structural checks ({} tasks validated)",
                    self.checks_run, self.tasks_validated
                ),
            };
        }

        let list = self
            .errors
            .iter()
            .map(|e| format!("  - {e}"))
            .collect::<Vec<_>>()
            .join("\n");
        Verdict::Fail {
            reason: format!(
                "PLAN VALIDATION FAILED: {} error(s) in '{path}'.\n\n\
                 ERRORS:\n{list}\n\n\
                 ACTION REQUIRED: Fix the errors above in the plan file before proceeding.",
                self.errors.len()
            ),
        }
    }
}

/// A pass/fail decision with its user-facing text.
///
/// Serializes as the hook protocol object:
/// `{"result":"continue","message":...}` or `{"result":"block","reason":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum Verdict {
    #[serde(rename = "continue")]
    Pass { message: String },
    #[serde(rename = "block")]
    Fail { reason: String },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Pass { message } => message,
            Self::Fail { reason } => reason,
        }
    }
}

/// Runs the structural checks against plan documents.
pub struct ValidationPipeline {
    registry: AgentTypeRegistry,
    router: ContextRouter,
    project_root: PathBuf,
    checks: Vec<Box<dyn PlanCheck>>,
}

impl ValidationPipeline {
    /// A pipeline running [`default_checks`], resolving file paths
    /// against the current directory.
    pub fn new(registry: AgentTypeRegistry, router: ContextRouter) -> Self {
        Self {
            registry,
            router,
            project_root: PathBuf::from("."),
            checks: default_checks(),
        }
    }

    /// Build a pipeline whose registry is discovered from `agents`.
    pub fn discover(
        agents: &dyn AgentTypeSource,
        router: ContextRouter,
    ) -> Result<Self, PipelineError> {
        let registry = AgentTypeRegistry::discover(agents).map_err(PipelineError::AgentDiscovery)?;
        Ok(Self::new(registry, router))
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Replace the check list.
    pub fn with_checks(mut self, checks: Vec<Box<dyn PlanCheck>>) -> Self {
        self.checks = checks;
        self
    }

    /// Run every check against an already parsed document.
    pub fn validate(&self, plan: &PlanDocument, path: &Path) -> ValidationReport {
        let ctx = CheckContext {
            project_root: &self.project_root,
            registry: &self.registry,
            router: &self.router,
        };

        let mut errors = Vec::new();
        for check in &self.checks {
            let found = check.check(plan, &ctx);
            if !found.is_empty() {
                warn!(check = check.name(), errors = found.len(), "check failed");
            }
            errors.extend(found);
        }

        let report = ValidationReport {
            path: path.to_path_buf(),
            tasks_validated: plan.tasks.len(),
            checks_run: self.checks.len(),
            errors,
        };
        if report.passed() {
            info!(path = %path.display(), tasks = report.tasks_validated, "plan passed");
        } else {
            warn!(path = %path.display(), errors = report.errors.len(), "plan failed");
        }
        report
    }

    /// Read, parse and validate the document at `path`.
    pub fn validate_file(&self, path: &Path) -> Result<ValidationReport, PipelineError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| PipelineError::DocumentUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let plan = parse_plan(&content);
        info!(
            path = %path.display(),
            files = plan.existing_files.len(),
            new_files = plan.new_files.len(),
            tasks = plan.tasks.len(),
            "parsed plan"
        );
        Ok(self.validate(&plan, path))
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let checks: Vec<&str> = self.checks.iter().map(|c| c.name()).collect();
        f.debug_struct("ValidationPipeline")
            .field("registry", &self.registry)
            .field("project_root", &self.project_root)
            .field("checks", &checks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Task;

    fn pipeline() -> ValidationPipeline {
        ValidationPipeline::new(AgentTypeRegistry::builtin(), ContextRouter::builtin())
    }

    fn valid_task(position: usize, id: &str, deps: &[&str]) -> Task {
        Task {
            position,
            title: format!("Task {id}"),
            id: Some(id.to_string()),
            depends_on: deps.iter().map(|d| (*d).to_string()).collect(),
            agent_type: Some("general-purpose".to_string()),
            stack: Some("Java Spring Boot".to_string()),
        }
    }

    fn valid_plan() -> PlanDocument {
        PlanDocument {
            tasks: vec![valid_task(1, "T1", &[]), valid_task(2, "T2", &["T1"])],
            acceptance_criteria: Some("- [ ] compiles\n- [ ] tests pass".to_string()),
            ..PlanDocument::default()
        }
    }

    #[test]
    fn valid_plan_passes() {
        let report = pipeline().validate(&valid_plan(), Path::new("specs/plan.md"));
        assert!(report.passed(), "{:?}", report.errors);
        assert_eq!(
            report.verdict(),
            Verdict::Pass {
                message: "Plan 'specs/plan.md' passed all 7 structural checks (2 tasks validated)"
                    .into()
            }
        );
    }

    #[test]
    fn errors_accumulate_in_check_order() {
        let mut plan = valid_plan();
        plan.acceptance_criteria = None;
        plan.tasks[0].depends_on = vec!["T2".into()];
        plan.tasks[1].stack = None;
        plan.tasks.push(valid_task(3, "T1", &["T9"]));

        let report = pipeline().validate(&plan, Path::new("plan.md"));
        let messages: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Duplicate Task ID: `T1` (tasks #1 and #3)",
                "Task `T1` depends on `T9` which doesn't exist",
                "Circular dependency: T1 → T2 → T1",
                "Acceptance Criteria section is missing",
                "Task `T2` has no **Stack** field, so context routing cannot load coding standards for it",
            ]
        );
    }

    #[test]
    fn failing_verdict_lists_every_error() {
        let mut plan = valid_plan();
        plan.tasks[1].id = Some("T1".into());
        plan.acceptance_criteria = Some(String::new());

        let verdict = pipeline().validate(&plan, Path::new("specs/p.md")).verdict();
        assert!(!verdict.is_pass());
        assert_eq!(
            verdict.text(),
            "PLAN VALIDATION FAILED: 2 error(s) in 'specs/p.md'.\n\n\
             ERRORS:\n  - Duplicate Task ID: `T1` (tasks #1 and #2)\n  \
             - Acceptance Criteria section is empty\n\n\
             ACTION REQUIRED: Fix the errors above in the plan file before proceeding."
        );
    }

    #[test]
    fn verdict_serializes_as_hook_payload() {
        let pass = serde_json::to_value(Verdict::Pass {
            message: "ok".into(),
        })
        .unwrap();
        assert_eq!(pass, serde_json::json!({"result": "continue", "message": "ok"}));

        let fail = serde_json::to_string(&Verdict::Fail {
            reason: "bad".into(),
        })
        .unwrap();
        assert_eq!(fail, r#"{"result":"block","reason":"bad"}"#);
    }

    #[test]
    fn custom_check_list() {
        let pipeline = pipeline().with_checks(vec![Box::new(checks::UniqueTaskIds)]);
        let report = pipeline.validate(&PlanDocument::default(), Path::new("p.md"));
        assert!(report.passed());
        assert_eq!(report.checks_run, 1);
    }

    #[test]
    fn unreadable_document_is_a_pipeline_error() {
        let err = pipeline()
            .validate_file(Path::new("/nonexistent/plan.md"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::DocumentUnreadable { .. }));
        assert!(err.to_string().starts_with("Cannot read plan file /nonexistent/plan.md"));
    }

    #[test]
    fn graph_issues_keep_their_message() {
        let issue = GraphIssue::DanglingDependency {
            task: "a".into(),
            dependency: "b".into(),
        };
        assert_eq!(issue.to_string(), PlanError::from(issue.clone()).to_string());
    }
}
