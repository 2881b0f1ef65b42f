//! Keyword router: free text in, an ordered list of documentation section
//! identifiers out.
//!
//! Routing is a pure function of the input text and the [`RoutingTable`].
//! The pipeline is:
//!
//! 1. normalize (lower-case, collapse whitespace);
//! 2. match every rule, keeping the first keyword hit per rule;
//! 3. rank by priority (table order breaks ties) and drop repeated sections;
//! 4. suppress the ambiguous stack family when nothing anchors it;
//! 5. add companion sections for every source present;
//! 6. add the ecosystem testing section for test-related input, never for
//!    a family suppressed in step 4;
//! 7. re-rank and cap at [`RoutingTable::max_sections`].
//!
//! Rule keywords match as substrings. Disambiguation and ecosystem anchors
//! match as whole words: `java` anchors `java 21` or `java-based` but not
//! `javascript`.

pub mod table;

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use table::{RoutingRule, RoutingTable, RoutingTableError, source_of, split_section_id};

/// Reasoning reported for blank input.
pub const REASON_EMPTY_INPUT: &str = "empty input";

/// Reasoning reported when no rule matched.
pub const REASON_NO_MATCH: &str = "no routing keyword matched";

/// Outcome of routing one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Section identifiers, highest priority first.
    pub sections: Vec<String>,
    /// Human-readable justification.
    pub reasoning: String,
}

impl RouteResult {
    fn unrouted(reasoning: &str) -> Self {
        Self {
            sections: Vec::new(),
            reasoning: reasoning.to_string(),
        }
    }

    /// Return `true` if at least one section was selected.
    pub fn is_routed(&self) -> bool {
        !self.sections.is_empty()
    }
}

/// A ranked candidate section. `keyword` is `None` for sections added by
/// post-processing rather than by a keyword hit.
#[derive(Debug, Clone, Copy)]
struct Hit<'t> {
    section: &'t str,
    priority: u32,
    keyword: Option<&'t str>,
}

/// Routes free text through a shared [`RoutingTable`].
#[derive(Debug, Clone)]
pub struct ContextRouter {
    table: Arc<RoutingTable>,
}

impl ContextRouter {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// A router over the embedded table.
    pub fn builtin() -> Self {
        Self::new(RoutingTable::builtin())
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Route `text` to documentation sections.
    pub fn route(&self, text: &str) -> RouteResult {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return RouteResult::unrouted(REASON_EMPTY_INPUT);
        }

        let mut hits = self.match_rules(&normalized);
        if hits.is_empty() {
            debug!(input = %normalized, "no routing rule matched");
            return RouteResult::unrouted(REASON_NO_MATCH);
        }

        hits.sort_by_key(|h| Reverse(h.priority));
        let mut seen = HashSet::new();
        hits.retain(|h| seen.insert(h.section));

        let suppressed = self.disambiguate(&normalized, &mut hits);
        self.add_companions(&mut hits);
        self.add_testing_sections(&normalized, suppressed, &mut hits);

        hits.sort_by_key(|h| Reverse(h.priority));
        hits.truncate(self.table.max_sections);

        let mut keywords: Vec<&str> = Vec::new();
        for kw in hits.iter().filter_map(|h| h.keyword) {
            if !keywords.contains(&kw) {
                keywords.push(kw);
            }
        }

        RouteResult {
            sections: hits.iter().map(|h| h.section.to_string()).collect(),
            reasoning: format!("matched keywords: {}", keywords.join(", ")),
        }
    }

    fn match_rules<'t>(&'t self, normalized: &str) -> Vec<Hit<'t>> {
        self.table
            .rules
            .iter()
            .filter_map(|rule| {
                let keyword = rule.first_match(normalized)?;
                debug!(section = %rule.section, keyword, priority = rule.priority, "routing hit");
                Some(Hit {
                    section: &rule.section,
                    priority: rule.priority,
                    keyword: Some(keyword),
                })
            })
            .collect()
    }

    /// Drop the suppressed family when another family matched and no
    /// anchor word for the suppressed family is present. Returns the
    /// suppressed source prefix when the family was ruled out.
    fn disambiguate<'t>(&'t self, normalized: &str, hits: &mut Vec<Hit<'_>>) -> Option<&'t str> {
        let rule = self.table.disambiguation.as_ref()?;
        let prefix = rule.suppressed_prefix.as_str();
        let in_family = |h: &Hit<'_>| source_of(h.section).starts_with(prefix);

        let other_family = hits.iter().any(|h| !in_family(h));
        if !other_family || contains_any_word(normalized, &rule.anchors) {
            return None;
        }

        let before = hits.len();
        hits.retain(|h| !in_family(h));
        if hits.len() != before {
            debug!(
                prefix,
                dropped = before - hits.len(),
                "suppressed unanchored matches"
            );
        }
        Some(prefix)
    }

    fn add_companions<'t>(&'t self, hits: &mut Vec<Hit<'t>>) {
        let mut sources: Vec<&str> = Vec::new();
        for hit in hits.iter() {
            let source = source_of(hit.section);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        for source in sources {
            let Some(companion) = self.table.companion_for(source) else {
                continue;
            };
            if !hits.iter().any(|h| h.section == companion) {
                hits.push(Hit {
                    section: companion,
                    priority: self.table.companion_priority,
                    keyword: None,
                });
            }
        }
    }

    fn add_testing_sections<'t>(
        &'t self,
        normalized: &str,
        suppressed: Option<&str>,
        hits: &mut Vec<Hit<'t>>,
    ) {
        let testing = &self.table.testing;
        if !contains_any(normalized, &testing.indicators) {
            return;
        }
        for eco in &testing.ecosystems {
            if suppressed.is_some_and(|prefix| source_of(&eco.section).starts_with(prefix)) {
                continue;
            }
            if contains_any_word(normalized, &eco.anchors)
                && !hits.iter().any(|h| h.section == eco.section)
            {
                hits.push(Hit {
                    section: &eco.section,
                    priority: self.table.testing_priority,
                    keyword: None,
                });
            }
        }
    }
}

impl Default for ContextRouter {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lower-case `text` and collapse runs of whitespace into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn contains_any(text: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| text.contains(n.as_str()))
}

fn contains_any_word(text: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| contains_word(text, n))
}

/// Return `true` if `needle` occurs in `text` with no letter directly
/// before or after it. Digits and punctuation count as boundaries, so
/// `junit` is found in `junit5`.
fn contains_word(text: &str, needle: &str) -> bool {
    text.match_indices(needle).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let after = text[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
    })
}
