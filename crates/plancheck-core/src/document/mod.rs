//! Plan documents: the typed record parsed out of a markdown plan.
//!
//! A plan document is built fresh for every validation run from a single
//! markdown file and is never mutated afterwards. Missing or malformed
//! fields are represented as absent values; the structural checks in
//! [`crate::pipeline`] turn them into user-facing errors.

pub mod parser;

pub use parser::parse_plan;

/// Values that mean "no value" in a labelled field (compared
/// case-insensitively after trimming).
pub const EMPTY_SENTINELS: &[&str] = &["none", "-", "n/a", ""];

/// Return `true` if `value` is one of the [`EMPTY_SENTINELS`].
pub fn is_empty_value(value: &str) -> bool {
    let value = value.trim();
    EMPTY_SENTINELS
        .iter()
        .any(|sentinel| value.eq_ignore_ascii_case(sentinel))
}

/// A parsed plan document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanDocument {
    /// Paths listed under `## Relevant Files` that must already exist.
    pub existing_files: Vec<String>,
    /// Paths listed under `### New Files`; exempt from the existence check.
    pub new_files: Vec<String>,
    /// Tasks in document order.
    pub tasks: Vec<Task>,
    /// Text of the `## Acceptance Criteria` section, trimmed. `None` when the
    /// section heading does not appear at all.
    pub acceptance_criteria: Option<String>,
}

impl PlanDocument {
    /// Task IDs in document order, skipping tasks without one.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().filter_map(|t| t.id.as_deref())
    }
}

/// A single `### N. <title>` subdivision of the `## Step by Step Tasks`
/// section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    /// 1-based position of the task within the document.
    pub position: usize,
    /// Heading text after the `N.` prefix.
    pub title: String,
    /// Value of `**Task ID**:`, if present and non-empty.
    pub id: Option<String>,
    /// Values of `**Depends On**:`; empty when absent or a sentinel.
    pub depends_on: Vec<String>,
    /// Value of `**Agent Type**:`, if present and non-empty.
    pub agent_type: Option<String>,
    /// Value of `**Stack**:`; `None` when absent or a sentinel.
    pub stack: Option<String>,
}

impl Task {
    /// A short label for messages: the task ID, or `#N` when it has none.
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("#{}", self.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_case_insensitive() {
        for value in ["none", "None", "NONE", "-", "n/a", "N/A", "", "   "] {
            assert!(is_empty_value(value), "{value:?} should be empty");
        }
        assert!(!is_empty_value("T1"));
        assert!(!is_empty_value("nonesuch"));
    }

    #[test]
    fn label_falls_back_to_position() {
        let task = Task {
            position: 3,
            ..Task::default()
        };
        assert_eq!(task.label(), "#3");

        let task = Task {
            position: 3,
            id: Some("build-api".into()),
            ..Task::default()
        };
        assert_eq!(task.label(), "build-api");
    }
}
