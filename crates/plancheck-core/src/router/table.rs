//! The routing table: keyword rules plus the post-processing settings the
//! router applies after matching.
//!
//! The default table is defined in `routes.toml` and embedded in the binary
//! at compile time. Alternative tables can be loaded from disk; they go
//! through the same validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Separator between the source document and the section name in a
/// section identifier (`java-patterns#basics`).
pub const SECTION_SEPARATOR: char = '#';

/// Errors raised while loading a routing table.
#[derive(Debug, Error)]
pub enum RoutingTableError {
    #[error("failed to read routing table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("routing table is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid section identifier `{section}` in {context} (expected `source#section`)")]
    InvalidSection { section: String, context: String },

    #[error("routing rule `{section}` has no keywords")]
    EmptyKeywords { section: String },

    #[error("max_sections must be at least 1")]
    ZeroMaxSections,
}

/// One keyword rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutingRule {
    /// Section identifier this rule routes to (`source#section`).
    pub section: String,
    /// Higher priorities sort first.
    pub priority: u32,
    /// Literal substrings matched against the normalized input, in order.
    pub keywords: Vec<String>,
}

impl RoutingRule {
    /// The first keyword that occurs in `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|kw| text.contains(kw))
    }
}

/// Suppression of one stack family's matches when the input carries no
/// token that identifies that stack unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Disambiguation {
    /// Sources starting with this prefix are suppressed.
    pub suppressed_prefix: String,
    /// Any of these in the input keeps the suppressed family.
    pub anchors: Vec<String>,
}

/// A testing section added when the input talks about tests in a given
/// ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestingEcosystem {
    pub section: String,
    pub anchors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TestingAugmentation {
    /// Tokens marking the input as test-related.
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub ecosystems: Vec<TestingEcosystem>,
}

fn default_max_sections() -> usize {
    6
}

fn default_companion_priority() -> u32 {
    1
}

fn default_testing_priority() -> u32 {
    5
}

/// Immutable routing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutingTable {
    /// Upper bound on the number of sections in a route result.
    #[serde(default = "default_max_sections")]
    pub max_sections: usize,
    /// Synthetic priority given to companion sections.
    #[serde(default = "default_companion_priority")]
    pub companion_priority: u32,
    /// Synthetic priority given to test augmentation sections.
    #[serde(default = "default_testing_priority")]
    pub testing_priority: u32,
    /// Example stack values shown to authors whose stack did not route.
    #[serde(default)]
    pub hint: Vec<String>,
    pub rules: Vec<RoutingRule>,
    /// Source name -> default section of that source.
    #[serde(default)]
    pub companions: BTreeMap<String, String>,
    #[serde(default)]
    pub disambiguation: Option<Disambiguation>,
    #[serde(default)]
    pub testing: TestingAugmentation,
}

/// The embedded routing table TOML.
static ROUTES_TOML: &str = include_str!("routes.toml");

impl RoutingTable {
    /// Load the embedded routing table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. The table ships with the
    /// binary and is covered by tests, so a built binary always has a valid
    /// one.
    pub fn builtin() -> Self {
        Self::from_toml_str(ROUTES_TOML).expect("embedded routes.toml is invalid")
    }

    /// Parse and validate a routing table. Keywords and anchors are
    /// lower-cased.
    pub fn from_toml_str(content: &str) -> Result<Self, RoutingTableError> {
        let mut table: RoutingTable = toml::from_str(content)?;
        table.normalize();
        table.validate()?;
        Ok(table)
    }

    /// Read a routing table from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, RoutingTableError> {
        let content = std::fs::read_to_string(path).map_err(|source| RoutingTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// The companion (default) section for a source, if one is nominated.
    pub fn companion_for(&self, source: &str) -> Option<&str> {
        self.companions.get(source).map(String::as_str)
    }

    /// Comma-separated stack examples for error messages.
    pub fn hint_text(&self) -> String {
        self.hint.join(", ")
    }

    fn normalize(&mut self) {
        fn lower_all(words: &mut [String]) {
            for word in words {
                *word = word.to_lowercase();
            }
        }

        for rule in &mut self.rules {
            lower_all(&mut rule.keywords);
        }
        if let Some(d) = &mut self.disambiguation {
            lower_all(&mut d.anchors);
        }
        lower_all(&mut self.testing.indicators);
        for eco in &mut self.testing.ecosystems {
            lower_all(&mut eco.anchors);
        }
    }

    fn validate(&self) -> Result<(), RoutingTableError> {
        if self.max_sections == 0 {
            return Err(RoutingTableError::ZeroMaxSections);
        }
        for rule in &self.rules {
            check_section_id(&rule.section, "rules")?;
            if rule.keywords.iter().all(|k| k.is_empty()) {
                return Err(RoutingTableError::EmptyKeywords {
                    section: rule.section.clone(),
                });
            }
        }
        for section in self.companions.values() {
            check_section_id(section, "companions")?;
        }
        for eco in &self.testing.ecosystems {
            check_section_id(&eco.section, "testing.ecosystems")?;
        }
        Ok(())
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Split a section identifier into `(source, section)`.
pub fn split_section_id(id: &str) -> Option<(&str, &str)> {
    let (source, section) = id.split_once(SECTION_SEPARATOR)?;
    if source.is_empty() || section.is_empty() {
        return None;
    }
    Some((source, section))
}

/// The source part of a section identifier (everything before `#`).
pub fn source_of(id: &str) -> &str {
    id.split_once(SECTION_SEPARATOR).map_or(id, |(source, _)| source)
}

fn check_section_id(section: &str, context: &str) -> Result<(), RoutingTableError> {
    match split_section_id(section) {
        Some(_) => Ok(()),
        None => Err(RoutingTableError::InvalidSection {
            section: section.to_string(),
            context: context.to_string(),
        }),
    }
}
