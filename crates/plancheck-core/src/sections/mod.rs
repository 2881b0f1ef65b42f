//! Reference documentation lookup for routed section identifiers.
//!
//! A section identifier `source#name` resolves to the file
//! `<refs_dir>/<source>.md`, inside which sections are delimited by HTML
//! comment markers:
//!
//! ```text
//! <!-- section:basics -->
//! ...content...
//! <!-- /section:basics -->
//! ```
//!
//! A name may be marked more than once in a file; the pieces are joined
//! with a blank line.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::router::split_section_id;

const OPEN_PREFIX: &str = "<!-- section:";
const MARKER_SUFFIX: &str = " -->";

/// Rendered when no section could be loaded.
pub const NO_SECTIONS: &str = "No sections loaded.";

/// Parse every marked section in `content`, keyed by section name.
pub fn parse_sections(content: &str) -> HashMap<String, String> {
    let mut sections: HashMap<String, String> = HashMap::new();
    let mut cursor = 0;

    while let Some(found) = content[cursor..].find(OPEN_PREFIX) {
        let name_start = cursor + found + OPEN_PREFIX.len();
        let rest = &content[name_start..];
        let name_len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(rest.len(), |(i, _)| i);
        let name = &rest[..name_len];

        if name.is_empty() || !rest[name_len..].starts_with(MARKER_SUFFIX) {
            cursor = name_start;
            continue;
        }

        let body_start = name_start + name_len + MARKER_SUFFIX.len();
        let close = format!("<!-- /section:{name}{MARKER_SUFFIX}");
        let Some(body_len) = content[body_start..].find(&close) else {
            cursor = body_start;
            continue;
        };

        let body = content[body_start..body_start + body_len].trim();
        sections
            .entry(name.to_string())
            .and_modify(|existing| {
                existing.push_str("\n\n");
                existing.push_str(body);
            })
            .or_insert_with(|| body.to_string());

        cursor = body_start + body_len + close.len();
    }

    sections
}

/// One section successfully resolved to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSection {
    pub source: String,
    pub name: String,
    pub content: String,
}

impl LoadedSection {
    /// The `source#name` identifier this section was requested by.
    pub fn id(&self) -> String {
        format!("{}#{}", self.source, self.name)
    }
}

/// Result of a bulk load: the sections found, in request order, plus how
/// many were asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSections {
    pub sections: Vec<LoadedSection>,
    pub requested: usize,
}

impl LoadedSections {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total characters of loaded content.
    pub fn total_chars(&self) -> usize {
        self.sections.iter().map(|s| s.content.chars().count()).sum()
    }

    /// Rough token count (four characters per token).
    pub fn approx_tokens(&self) -> usize {
        self.total_chars() / 4
    }

    /// One-line HTML comment summarizing the load.
    pub fn stats_line(&self) -> String {
        format!(
            "<!-- Loaded {}/{} sections, ~{} tokens -->",
            self.len(),
            self.requested,
            self.approx_tokens()
        )
    }

    /// Render the loaded sections as markdown.
    pub fn format_context(&self) -> String {
        if self.sections.is_empty() {
            return NO_SECTIONS.to_string();
        }
        self.sections
            .iter()
            .map(|s| format!("## Reference: {} / {}\n\n{}", s.source, s.name, s.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

/// A directory of reference documents.
#[derive(Debug, Clone)]
pub struct SectionLibrary {
    refs_dir: PathBuf,
}

impl SectionLibrary {
    pub fn new(refs_dir: impl Into<PathBuf>) -> Self {
        Self {
            refs_dir: refs_dir.into(),
        }
    }

    pub fn refs_dir(&self) -> &Path {
        &self.refs_dir
    }

    /// Path of the reference file for `source`.
    pub fn source_path(&self, source: &str) -> PathBuf {
        self.refs_dir.join(format!("{source}.md"))
    }

    /// Parse the reference file for `source`. A missing file yields `None`.
    pub fn read_source(&self, source: &str) -> io::Result<Option<HashMap<String, String>>> {
        match std::fs::read_to_string(self.source_path(source)) {
            Ok(content) => Ok(Some(parse_sections(&content))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load one section. Missing files, missing sections and empty
    /// sections all yield `None`.
    pub fn load_section(&self, source: &str, name: &str) -> io::Result<Option<String>> {
        Ok(self
            .read_source(source)?
            .and_then(|mut sections| sections.remove(name))
            .filter(|content| !content.is_empty()))
    }

    /// Load every identifier in `ids`, skipping the ones that cannot be
    /// resolved. Each source file is read at most once; repeated
    /// identifiers are loaded once.
    pub fn load<S: AsRef<str>>(&self, ids: &[S]) -> LoadedSections {
        let mut cache: HashMap<String, Option<HashMap<String, String>>> = HashMap::new();
        let mut loaded = LoadedSections {
            sections: Vec::new(),
            requested: ids.len(),
        };

        for id in ids {
            let id = id.as_ref();
            let Some((source, name)) = split_section_id(id) else {
                debug!(id, "skipping malformed section identifier");
                continue;
            };
            if loaded.sections.iter().any(|s| s.id() == id) {
                continue;
            }

            let parsed = cache.entry(source.to_string()).or_insert_with(|| {
                self.read_source(source).unwrap_or_else(|e| {
                    warn!(source, error = %e, "failed to read reference file");
                    None
                })
            });

            let Some(sections) = parsed else {
                debug!(source, "reference file not found");
                continue;
            };
            match sections.get(name) {
                Some(content) if !content.is_empty() => loaded.sections.push(LoadedSection {
                    source: source.to_string(),
                    name: name.to_string(),
                    content: content.clone(),
                }),
                _ => debug!(id, "section not found"),
            }
        }

        debug!(
            loaded = loaded.len(),
            requested = loaded.requested,
            "loaded reference sections"
        );
        loaded
    }
}
