//! Line-oriented parser for markdown plan documents.
//!
//! Recognizes three level-2 sections:
//! - `## Relevant Files`: bullet items with backtick-quoted paths. Items
//!   under a nested `### New Files` heading are new files; items under a
//!   later level-3 heading are ignored.
//! - `## Step by Step Tasks`: subdivided by `### N. <title>` headings, each
//!   carrying `**Task ID**:`, `**Depends On**:`, `**Agent Type**:` and
//!   `**Stack**:` fields.
//! - `## Acceptance Criteria`: free text up to the next level-2 heading.
//!
//! Lines inside fenced code blocks never change state. The parser never
//! fails; anything it cannot recognize is simply absent from the result.

use tracing::info;

use super::{PlanDocument, Task, is_empty_value};

const RELEVANT_FILES: &str = "Relevant Files";
const NEW_FILES: &str = "New Files";
const TASKS: &str = "Step by Step Tasks";
const ACCEPTANCE_CRITERIA: &str = "Acceptance Criteria";

const TASK_ID: &str = "Task ID";
const DEPENDS_ON: &str = "Depends On";
const AGENT_TYPE: &str = "Agent Type";
const STACK: &str = "Stack";

/// Which part of the `## Relevant Files` section we are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilesPart {
    Existing,
    New,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Outside,
    RelevantFiles(FilesPart),
    Tasks,
    AcceptanceCriteria,
}

/// A task under construction. Each field is taken from its first
/// occurrence only, so we track which labels have been seen.
#[derive(Debug, Default)]
struct TaskDraft {
    task: Task,
    seen_id: bool,
    seen_depends_on: bool,
    seen_agent_type: bool,
    seen_stack: bool,
}

impl TaskDraft {
    fn new(position: usize, title: &str) -> Self {
        Self {
            task: Task {
                position,
                title: title.to_string(),
                ..Task::default()
            },
            ..Self::default()
        }
    }

    fn apply_line(&mut self, line: &str) {
        if !self.seen_id {
            if let Some(value) = field_value(line, TASK_ID) {
                self.seen_id = true;
                self.task.id = non_empty(value);
            }
        }
        if !self.seen_depends_on {
            if let Some(value) = field_value(line, DEPENDS_ON) {
                self.seen_depends_on = true;
                self.task.depends_on = parse_dependencies(value);
            }
        }
        if !self.seen_agent_type {
            if let Some(value) = field_value(line, AGENT_TYPE) {
                self.seen_agent_type = true;
                self.task.agent_type = non_empty(value);
            }
        }
        if !self.seen_stack {
            if let Some(value) = field_value(line, STACK) {
                self.seen_stack = true;
                self.task.stack = if is_empty_value(value) {
                    None
                } else {
                    Some(value.to_string())
                };
            }
        }
    }
}

#[derive(Debug)]
struct Parser {
    block: Block,
    in_fence: bool,
    doc: PlanDocument,
    current: Option<TaskDraft>,
    criteria: Option<Vec<String>>,
}

impl Parser {
    fn new() -> Self {
        Self {
            block: Block::Outside,
            in_fence: false,
            doc: PlanDocument::default(),
            current: None,
            criteria: None,
        }
    }

    fn feed(&mut self, line: &str) {
        if line.trim_start().starts_with("```") {
            self.in_fence = !self.in_fence;
            self.push_criteria(line);
            return;
        }
        if self.in_fence {
            self.push_criteria(line);
            return;
        }

        if let Some(title) = heading(line, 2) {
            self.enter_section(title);
            return;
        }

        if let Some(title) = heading(line, 3) {
            match self.block {
                Block::RelevantFiles(part) => {
                    let next = if title.eq_ignore_ascii_case(NEW_FILES) {
                        FilesPart::New
                    } else if part == FilesPart::Existing {
                        FilesPart::Existing
                    } else {
                        FilesPart::Trailing
                    };
                    self.block = Block::RelevantFiles(next);
                    return;
                }
                Block::Tasks => {
                    if let Some(task_title) = numbered_title(title) {
                        self.finish_task();
                        let position = self.doc.tasks.len() + 1;
                        self.current = Some(TaskDraft::new(position, task_title));
                        return;
                    }
                }
                Block::AcceptanceCriteria | Block::Outside => {}
            }
        }

        match self.block {
            Block::RelevantFiles(FilesPart::Existing) => {
                if let Some(path) = bullet_path(line) {
                    self.doc.existing_files.push(path.to_string());
                }
            }
            Block::RelevantFiles(FilesPart::New) => {
                if let Some(path) = bullet_path(line) {
                    self.doc.new_files.push(path.to_string());
                }
            }
            Block::Tasks => {
                if let Some(draft) = self.current.as_mut() {
                    draft.apply_line(line);
                }
            }
            Block::AcceptanceCriteria => self.push_criteria(line),
            Block::RelevantFiles(FilesPart::Trailing) | Block::Outside => {}
        }
    }

    fn enter_section(&mut self, title: &str) {
        self.finish_task();
        self.block = if title.eq_ignore_ascii_case(RELEVANT_FILES) {
            Block::RelevantFiles(FilesPart::Existing)
        } else if title.eq_ignore_ascii_case(TASKS) {
            Block::Tasks
        } else if title.eq_ignore_ascii_case(ACCEPTANCE_CRITERIA) {
            // Only the first acceptance criteria section counts.
            if self.criteria.is_none() {
                self.criteria = Some(Vec::new());
                Block::AcceptanceCriteria
            } else {
                Block::Outside
            }
        } else {
            Block::Outside
        };
    }

    fn push_criteria(&mut self, line: &str) {
        if self.block == Block::AcceptanceCriteria {
            if let Some(lines) = self.criteria.as_mut() {
                lines.push(line.to_string());
            }
        }
    }

    fn finish_task(&mut self) {
        if let Some(draft) = self.current.take() {
            self.doc.tasks.push(draft.task);
        }
    }

    fn finish(mut self) -> PlanDocument {
        self.finish_task();
        self.doc.acceptance_criteria = self
            .criteria
            .map(|lines| lines.join("\n").trim().to_string());
        self.doc
    }
}

/// Parse markdown plan text into a [`PlanDocument`].
pub fn parse_plan(content: &str) -> PlanDocument {
    let mut parser = Parser::new();
    for line in content.lines() {
        parser.feed(line);
    }
    let doc = parser.finish();
    info!(
        existing_files = doc.existing_files.len(),
        new_files = doc.new_files.len(),
        tasks = doc.tasks.len(),
        "parsed plan document"
    );
    doc
}

// ---------------------------------------------------------------------------
// Line helpers
// ---------------------------------------------------------------------------

/// If `line` is an ATX heading of exactly `level`, return its trimmed text.
fn heading(line: &str, level: usize) -> Option<&str> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes != level {
        return None;
    }
    let rest = &line[level..];
    if rest.starts_with(' ') || rest.starts_with('\t') {
        Some(rest.trim())
    } else {
        None
    }
}

/// `"3. Build the API"` -> `Some("Build the API")`.
fn numbered_title(title: &str) -> Option<&str> {
    let digits = title.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = title[digits..].strip_prefix('.')?;
    if rest.is_empty() {
        return Some("");
    }
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// `` - `src/main.rs` - entry point `` -> `Some("src/main.rs")`.
fn bullet_path(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('`')?;
    let end = rest.find('`')?;
    let path = &rest[..end];
    if path.is_empty() { None } else { Some(path) }
}

/// Find `**<label>**:` anywhere in `line` and return the unquoted value.
fn field_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let marker = format!("**{label}**:");
    let start = line.find(&marker)? + marker.len();
    Some(unquote(&line[start..]))
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches(|c| c == '`' || c == '"').trim()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_dependencies(value: &str) -> Vec<String> {
    if is_empty_value(value) {
        return Vec::new();
    }
    let mut deps: Vec<String> = Vec::new();
    for dep in value.split(',').map(unquote) {
        if is_empty_value(dep) || deps.iter().any(|d| d == dep) {
            continue;
        }
        deps.push(dep.to_string());
    }
    deps
}
