//! Task dependency graph: identifier uniqueness, referential integrity and
//! cycle detection.
//!
//! Edges point from a task to the tasks it depends on. The three checks are
//! independent and each reports its own issues:
//! - every task has an ID and no ID is declared twice (the first
//!   declaration is authoritative);
//! - every `Depends On` entry names a declared task;
//! - the graph is acyclic. Detection stops at the first cycle found.

use std::collections::HashMap;

use thiserror::Error;

use crate::document::Task;

/// A structural problem in the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphIssue {
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

    /// The ordered cycle, with the first node repeated at the end.
    #[error("Circular dependency: {}", .cycle.join(" → "))]
    CircularDependency { cycle: Vec<String> },
}

/// Report every task without an ID and every repeated ID, in task order.
pub fn check_unique_ids(tasks: &[Task]) -> Vec<GraphIssue> {
    let mut issues = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for task in tasks {
        let Some(id) = task.id.as_deref() else {
            issues.push(GraphIssue::MissingTaskId {
                position: task.position,
            });
            continue;
        };
        match first_seen.get(id) {
            Some(&first) => issues.push(GraphIssue::DuplicateTaskId {
                id: id.to_string(),
                first,
                duplicate: task.position,
            }),
            None => {
                first_seen.insert(id, task.position);
            }
        }
    }

    issues
}

/// Report every dependency that names an undeclared task.
pub fn check_references(tasks: &[Task]) -> Vec<GraphIssue> {
    let graph = DependencyGraph::build(tasks);
    let mut issues = Vec::new();

    for task in tasks {
        for dep in &task.depends_on {
            if !graph.contains(dep) {
                issues.push(GraphIssue::DanglingDependency {
                    task: task.label(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    issues
}

/// Report the first dependency cycle, if any.
pub fn check_cycles(tasks: &[Task]) -> Vec<GraphIssue> {
    DependencyGraph::build(tasks)
        .find_cycle()
        .map(|cycle| GraphIssue::CircularDependency { cycle })
        .into_iter()
        .collect()
}

/// Run all three graph checks and concatenate their issues.
pub fn validate_graph(tasks: &[Task]) -> Vec<GraphIssue> {
    let mut issues = check_unique_ids(tasks);
    issues.extend(check_references(tasks));
    issues.extend(check_cycles(tasks));
    issues
}

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Finished,
}

/// Adjacency map `id -> depends_on` over tasks that have an ID.
///
/// When an ID is declared more than once, the first declaration's edges
/// are used.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    /// Node IDs in first-declaration order; traversal follows this order.
    order: Vec<&'a str>,
    edges: HashMap<&'a str, &'a [String]>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the adjacency map from parsed tasks.
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut order = Vec::new();
        let mut edges = HashMap::new();
        for task in tasks {
            if let Some(id) = task.id.as_deref() {
                if !edges.contains_key(id) {
                    edges.insert(id, task.depends_on.as_slice());
                    order.push(id);
                }
            }
        }
        Self { order, edges }
    }

    /// Return `true` if `id` is a node of the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Depth-first search with three-state coloring. Returns the first
    /// cycle closed, as the path from the re-entered node back to itself
    /// (e.g. `["a", "b", "c", "a"]`). Edges to unknown nodes are skipped.
    ///
    /// The search keeps its own stack of `(node, next edge)` frames, so
    /// dependency chains of any length are walked without recursion.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut color: HashMap<&'a str, Color> =
            self.order.iter().map(|id| (*id, Color::Unvisited)).collect();

        for &root in &self.order {
            if color[root] != Color::Unvisited {
                continue;
            }
            color.insert(root, Color::InProgress);
            let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                let deps: &'a [String] = self.edges[node];
                let Some(dep) = deps.get(next) else {
                    color.insert(node, Color::Finished);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let dep = dep.as_str();
                match color.get(dep).copied() {
                    None | Some(Color::Finished) => {}
                    Some(Color::InProgress) => {
                        let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|(n, _)| (*n).to_string()).collect();
                        cycle.push(dep.to_string());
                        return Some(cycle);
                    }
                    Some(Color::Unvisited) => {
                        color.insert(dep, Color::InProgress);
                        stack.push((dep, 0));
                    }
                }
            }
        }
        None
    }
}
