//! The structural checks, one type per check.
//!
//! Each check looks at the whole document and returns every problem it
//! finds. Checks never depend on each other's results.

use std::path::Path;

use crate::agents::AgentTypeRegistry;
use crate::discovery::resolve_under;
use crate::document::PlanDocument;
use crate::graph;
use crate::router::ContextRouter;

use super::PlanError;

/// Minimum number of non-empty lines in the acceptance criteria section.
pub const MIN_CRITERIA_LINES: usize = 2;

/// Shared, read-only collaborators available to every check.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Relative paths in the document resolve against this directory.
    pub project_root: &'a Path,
    pub registry: &'a AgentTypeRegistry,
    pub router: &'a ContextRouter,
}

/// A single structural check over a plan document.
pub trait PlanCheck: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    fn check(&self, plan: &PlanDocument, ctx: &CheckContext<'_>) -> Vec<PlanError>;
}

/// The standard checks, in the order their findings are reported.
pub fn default_checks() -> Vec<Box<dyn PlanCheck>> {
    vec![
        Box::new(RelevantFilesExist),
        Box::new(UniqueTaskIds),
        Box::new(DependencyReferences),
        Box::new(NoCircularDependencies),
        Box::new(AgentTypesExist),
        Box::new(AcceptanceCriteriaPresent),
        Box::new(StackRoutes),
    ]
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Every existing file listed under Relevant Files must be on disk. New
/// files are exempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevantFilesExist;

impl PlanCheck for RelevantFilesExist {
    fn name(&self) -> &'static str {
        "files exist"
    }

    fn check(&self, plan: &PlanDocument, ctx: &CheckContext<'_>) -> Vec<PlanError> {
        plan.existing_files
            .iter()
            .filter(|f| !plan.new_files.contains(f))
            .filter(|f| !resolve_under(ctx.project_root, Path::new(f.as_str())).exists())
            .map(|f| PlanError::FileNotFound { path: f.clone() })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Task graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueTaskIds;

impl PlanCheck for UniqueTaskIds {
    fn name(&self) -> &'static str {
        "unique ids"
    }

    fn check(&self, plan: &PlanDocument, _ctx: &CheckContext<'_>) -> Vec<PlanError> {
        graph::check_unique_ids(&plan.tasks)
            .into_iter()
            .map(PlanError::from)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyReferences;

impl PlanCheck for DependencyReferences {
    fn name(&self) -> &'static str {
        "dependency refs"
    }

    fn check(&self, plan: &PlanDocument, _ctx: &CheckContext<'_>) -> Vec<PlanError> {
        graph::check_references(&plan.tasks)
            .into_iter()
            .map(PlanError::from)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCircularDependencies;

impl PlanCheck for NoCircularDependencies {
    fn name(&self) -> &'static str {
        "cycles"
    }

    fn check(&self, plan: &PlanDocument, _ctx: &CheckContext<'_>) -> Vec<PlanError> {
        graph::check_cycles(&plan.tasks)
            .into_iter()
            .map(PlanError::from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct AgentTypesExist;

impl PlanCheck for AgentTypesExist {
    fn name(&self) -> &'static str {
        "agent types"
    }

    fn check(&self, plan: &PlanDocument, ctx: &CheckContext<'_>) -> Vec<PlanError> {
        plan.tasks
            .iter()
            .filter_map(|task| {
                let agent_type = task.agent_type.as_deref()?;
                if ctx.registry.is_valid(agent_type) {
                    return None;
                }
                Some(PlanError::UnknownAgentType {
                    task: task.label(),
                    agent_type: agent_type.to_string(),
                    available: ctx.registry.available().iter().cloned().collect(),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Acceptance criteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptanceCriteriaPresent;

impl PlanCheck for AcceptanceCriteriaPresent {
    fn name(&self) -> &'static str {
        "criteria"
    }

    fn check(&self, plan: &PlanDocument, _ctx: &CheckContext<'_>) -> Vec<PlanError> {
        let Some(criteria) = plan.acceptance_criteria.as_deref() else {
            return vec![PlanError::AcceptanceCriteriaMissing];
        };
        let lines = criteria.lines().filter(|l| !l.trim().is_empty()).count();
        match lines {
            0 => vec![PlanError::AcceptanceCriteriaEmpty],
            n if n < MIN_CRITERIA_LINES => vec![PlanError::AcceptanceCriteriaTooShort { lines: n }],
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stack routing
// ---------------------------------------------------------------------------

/// Every task declares a stack, and the stack routes to documentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackRoutes;

impl PlanCheck for StackRoutes {
    fn name(&self) -> &'static str {
        "stack field"
    }

    fn check(&self, plan: &PlanDocument, ctx: &CheckContext<'_>) -> Vec<PlanError> {
        let mut errors = Vec::new();
        for task in &plan.tasks {
            let Some(stack) = task.stack.as_deref() else {
                errors.push(PlanError::MissingStack { task: task.label() });
                continue;
            };
            if !ctx.router.route(stack).is_routed() {
                errors.push(PlanError::UnroutableStack {
                    task: task.label(),
                    stack: stack.to_string(),
                    hint: ctx.router.table().hint_text(),
                });
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::InMemoryAgentTypes;
    use crate::document::Task;

    struct Fixture {
        registry: AgentTypeRegistry,
        router: ContextRouter,
        root: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: AgentTypeRegistry::discover(&InMemoryAgentTypes::new(["builder"]))
                    .unwrap(),
                router: ContextRouter::builtin(),
                root: tempfile::TempDir::new().unwrap(),
            }
        }

        fn ctx(&self) -> CheckContext<'_> {
            CheckContext {
                project_root: self.root.path(),
                registry: &self.registry,
                router: &self.router,
            }
        }
    }

    fn task(position: usize, id: &str) -> Task {
        Task {
            position,
            id: Some(id.to_string()),
            stack: Some("Java".to_string()),
            ..Task::default()
        }
    }

    #[test]
    fn default_order_is_fixed() {
        let names: Vec<&str> = default_checks().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "files exist",
                "unique ids",
                "dependency refs",
                "cycles",
                "agent types",
                "criteria",
                "stack field"
            ]
        );
    }

    #[test]
    fn missing_existing_files_are_reported() {
        let fx = Fixture::new();
        std::fs::write(fx.root.path().join("present.rs"), "").unwrap();
        let plan = PlanDocument {
            existing_files: vec!["present.rs".into(), "absent.rs".into(), "shared.rs".into()],
            new_files: vec!["shared.rs".into(), "brand-new.rs".into()],
            ..PlanDocument::default()
        };
        let errors = RelevantFilesExist.check(&plan, &fx.ctx());
        assert_eq!(
            errors,
            vec![PlanError::FileNotFound {
                path: "absent.rs".into()
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "File not found: `absent.rs` (listed in Relevant Files)"
        );
    }

    #[test]
    fn unknown_agent_type_lists_available() {
        let fx = Fixture::new();
        let mut known = task(1, "T1");
        known.agent_type = Some("builder".into());
        let mut unknown = task(2, "T2");
        unknown.agent_type = Some("wizard".into());
        let plan = PlanDocument {
            tasks: vec![known, unknown, task(3, "T3")],
            ..PlanDocument::default()
        };

        let errors = AgentTypesExist.check(&plan, &fx.ctx());
        assert_eq!(errors.len(), 1);
        let message = errors[0].to_string();
        assert!(message.starts_with("Task `T2` uses Agent Type `wizard` which doesn't exist"));
        assert!(message.contains("available: Bash, Explore, Plan, builder,"));
    }

    #[test]
    fn acceptance_criteria_variants() {
        let fx = Fixture::new();
        let check = |criteria: Option<&str>| {
            let plan = PlanDocument {
                acceptance_criteria: criteria.map(str::to_string),
                ..PlanDocument::default()
            };
            AcceptanceCriteriaPresent.check(&plan, &fx.ctx())
        };

        assert_eq!(check(None), vec![PlanError::AcceptanceCriteriaMissing]);
        assert_eq!(check(Some("")), vec![PlanError::AcceptanceCriteriaEmpty]);
        assert_eq!(
            check(Some("- [ ] builds")),
            vec![PlanError::AcceptanceCriteriaTooShort { lines: 1 }]
        );
        assert_eq!(
            check(Some("- [ ] builds\n\n")),
            vec![PlanError::AcceptanceCriteriaTooShort { lines: 1 }]
        );
        assert!(check(Some("- [ ] builds\n- [ ] tests pass")).is_empty());
    }

    #[test]
    fn stack_must_exist_and_route() {
        let fx = Fixture::new();
        let mut no_stack = task(2, "T2");
        no_stack.stack = None;
        let mut unroutable = task(3, "T3");
        unroutable.stack = Some("Rust".into());
        let plan = PlanDocument {
            tasks: vec![task(1, "T1"), no_stack, unroutable],
            ..PlanDocument::default()
        };

        let errors = StackRoutes.check(&plan, &fx.ctx());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], PlanError::MissingStack { task: "T2".into() });
        assert!(errors[0].to_string().contains("has no **Stack** field"));
        assert!(
            errors[1]
                .to_string()
                .starts_with("Task `T3` Stack \"Rust\" doesn't match any routing keywords. Use: Java, ")
        );
    }

    #[test]
    fn graph_checks_report_independently() {
        let fx = Fixture::new();
        let mut a = task(1, "A");
        a.depends_on = vec!["B".into(), "T9".into()];
        let mut b = task(2, "B");
        b.depends_on = vec!["A".into()];
        let plan = PlanDocument {
            tasks: vec![a, b],
            ..PlanDocument::default()
        };

        assert!(UniqueTaskIds.check(&plan, &fx.ctx()).is_empty());
        assert_eq!(DependencyReferences.check(&plan, &fx.ctx()).len(), 1);
        assert_eq!(
            NoCircularDependencies.check(&plan, &fx.ctx()),
            vec![PlanError::CircularDependency {
                cycle: vec!["A".into(), "B".into(), "A".into()]
            }]
        );
    }
}
