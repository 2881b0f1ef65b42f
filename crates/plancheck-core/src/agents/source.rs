//! Providers of discovered agent type names.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// Something that can list agent type names.
///
/// The trait is object-safe so the registry can be built from a
/// `&dyn AgentTypeSource`, which lets tests substitute an in-memory fake.
pub trait AgentTypeSource {
    /// Return every agent type name this source knows about.
    fn list_available_types(&self) -> io::Result<BTreeSet<String>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn AgentTypeSource) {}
};

/// A directory of agent definition files.
///
/// Each regular file with the configured extension contributes one name:
/// its file stem. A missing directory yields an empty set.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    dir: PathBuf,
    extension: String,
}

impl TeamDirectory {
    /// The extension agent definitions are written in.
    pub const DEFAULT_EXTENSION: &str = "md";

    /// Scan `dir` for `*.md` definitions.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: Self::DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Override the definition file extension (with or without the dot).
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// The scanned directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AgentTypeSource for TeamDirectory {
    fn list_available_types(&self) -> io::Result<BTreeSet<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e),
        };

        let mut names = BTreeSet::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.extension);
            if !matches_ext {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }
        Ok(names)
    }
}

/// A fixed set of names, for tests and for callers that already know the
/// available agents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentTypes {
    names: BTreeSet<String>,
}

impl InMemoryAgentTypes {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl AgentTypeSource for InMemoryAgentTypes {
    fn list_available_types(&self) -> io::Result<BTreeSet<String>> {
        Ok(self.names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let source = TeamDirectory::new(tmp.path().join("does-not-exist"));
        assert!(source.list_available_types().unwrap().is_empty());
    }

    #[test]
    fn lists_markdown_stems_only() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("builder.md"), "# builder").unwrap();
        std::fs::write(tmp.path().join("validator.md"), "# validator").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(tmp.path().join("nested.md")).unwrap();

        let names = TeamDirectory::new(tmp.path()).list_available_types().unwrap();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["builder", "validator"]);
    }

    #[test]
    fn custom_extension() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("builder.md"), "").unwrap();
        std::fs::write(tmp.path().join("reviewer.yaml"), "").unwrap();

        let names = TeamDirectory::new(tmp.path())
            .with_extension(".yaml")
            .list_available_types()
            .unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["reviewer"]);
    }

    #[test]
    fn in_memory_source_returns_its_names() {
        let source = InMemoryAgentTypes::new(["a", "b"]);
        assert_eq!(source.list_available_types().unwrap().len(), 2);
    }
}
