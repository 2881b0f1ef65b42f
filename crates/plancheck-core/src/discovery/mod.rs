//! Plan document selection.
//!
//! A plan is either named explicitly or picked from a directory. When
//! scanning, candidates are the union of
//! - files the [`ChangeProbe`] reports as added or modified, and
//! - files whose modification time falls inside the recency window.
//!
//! The newest candidate wins. Ties break on path order.

pub mod git;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use git::{CHANGED_STATUSES, ChangeProbe, GitStatusProbe, ProbeOutcome, parse_porcelain};

/// Errors raised while selecting a plan document.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Plan file not found: {}", .path.display())]
    ExplicitNotFound { path: PathBuf },

    #[error("No recent plan file found in {}/*{extension}", .directory.display())]
    NoCandidates {
        directory: PathBuf,
        extension: String,
    },

    #[error("failed to read plan directory {}: {source}", .path.display())]
    DirectoryUnreadable { path: PathBuf, source: io::Error },
}

impl DiscoveryError {
    /// The blocking reason reported to the caller for outcomes that must
    /// stop the workflow. Other discovery failures return `None`.
    pub fn block_reason(&self) -> Option<String> {
        match self {
            Self::ExplicitNotFound { .. } => Some(self.to_string()),
            Self::NoCandidates { directory, .. } => Some(format!(
                "{self}.\n\nACTION REQUIRED: Create a plan file in {}/ first.",
                directory.display()
            )),
            Self::DirectoryUnreadable { .. } => None,
        }
    }
}

/// Where and how to look for plan documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Directory scanned for plans, relative to the project root.
    pub directory: PathBuf,
    /// File name suffix, always with a leading dot.
    pub extension: String,
    /// Recency window in minutes.
    pub max_age_minutes: u64,
}

impl ScanConfig {
    pub const DEFAULT_DIRECTORY: &str = "specs";
    pub const DEFAULT_EXTENSION: &str = ".md";
    pub const DEFAULT_MAX_AGE_MINUTES: u64 = 5;

    pub fn new(directory: impl Into<PathBuf>, extension: &str, max_age_minutes: u64) -> Self {
        Self {
            directory: directory.into(),
            extension: normalize_extension(extension),
            max_age_minutes,
        }
    }

    fn max_age(&self) -> chrono::Duration {
        let minutes = self.max_age_minutes.min(u64::from(u32::MAX));
        chrono::Duration::minutes(minutes as i64)
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.extension))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_DIRECTORY,
            Self::DEFAULT_EXTENSION,
            Self::DEFAULT_MAX_AGE_MINUTES,
        )
    }
}

/// Ensure an extension carries exactly one leading dot (`md` -> `.md`).
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    format!(".{trimmed}")
}

/// A file eligible for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

impl Candidate {
    fn stat(path: PathBuf) -> io::Result<Self> {
        let modified = modified_at(&path)?;
        Ok(Self { path, modified })
    }
}

/// Pick the newest candidate; among equally new ones, the smallest path.
pub fn newest(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().max_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| b.path.cmp(&a.path))
    })
}

/// Files directly inside `dir` whose name ends with the configured
/// extension and whose modification time is at most `max_age` before
/// `now`. A missing directory yields no files.
pub fn recent_files(
    dir: &Path,
    scan: &ScanConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Candidate>, DiscoveryError> {
    let unreadable = |source: io::Error| DiscoveryError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(unreadable(e)),
    };

    let max_age = scan.max_age();
    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(unreadable)?.path();
        if !path.is_file() || !scan.matches(&path) {
            continue;
        }
        match Candidate::stat(path) {
            Ok(candidate) if now - candidate.modified <= max_age => found.push(candidate),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "skipping unreadable plan candidate"),
        }
    }
    Ok(found)
}

/// Selects the plan document for a validation run.
pub struct DocumentLocator {
    root: PathBuf,
    scan: ScanConfig,
    probe: Box<dyn ChangeProbe>,
}

impl DocumentLocator {
    pub fn new(root: impl Into<PathBuf>, scan: ScanConfig, probe: Box<dyn ChangeProbe>) -> Self {
        Self {
            root: root.into(),
            scan,
            probe,
        }
    }

    /// Resolve the plan to validate. An explicit path, when given, must
    /// name an existing file; otherwise the scan directory is searched.
    pub async fn locate(&self, explicit: Option<&Path>) -> Result<PathBuf, DiscoveryError> {
        if let Some(path) = explicit {
            let path = self.resolve(path);
            if path.is_file() {
                return Ok(path);
            }
            return Err(DiscoveryError::ExplicitNotFound { path });
        }

        let candidates = self.candidates(Utc::now()).await?;
        match newest(&candidates) {
            Some(chosen) => {
                info!(
                    path = %chosen.path.display(),
                    candidates = candidates.len(),
                    "selected plan document"
                );
                Ok(chosen.path.clone())
            }
            None => Err(DiscoveryError::NoCandidates {
                directory: self.scan.directory.clone(),
                extension: self.scan.extension.clone(),
            }),
        }
    }

    /// All candidates, de-duplicated by path.
    pub async fn candidates(&self, now: DateTime<Utc>) -> Result<Vec<Candidate>, DiscoveryError> {
        let mut candidates = self.changed_candidates().await;
        for recent in recent_files(&self.resolve(&self.scan.directory), &self.scan, now)? {
            if !candidates.iter().any(|c| c.path == recent.path) {
                candidates.push(recent);
            }
        }
        debug!(count = candidates.len(), "plan candidates");
        Ok(candidates)
    }

    async fn changed_candidates(&self) -> Vec<Candidate> {
        let outcome = self.probe.changed_files(&self.scan.directory).await;
        let paths = match outcome {
            ProbeOutcome::Completed(paths) => paths,
            other => {
                warn!(probe = self.probe.name(), outcome = %other, "change probe degraded");
                return Vec::new();
            }
        };

        let mut found: Vec<Candidate> = Vec::new();
        for path in paths {
            if !self.scan.matches(&path) {
                continue;
            }
            let path = self.resolve(&path);
            if !path.is_file() || found.iter().any(|c| c.path == path) {
                continue;
            }
            match Candidate::stat(path) {
                Ok(candidate) => found.push(candidate),
                Err(e) => debug!(error = %e, "skipping unreadable changed file"),
            }
        }
        found
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        resolve_under(&self.root, path)
    }
}

impl std::fmt::Debug for DocumentLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLocator")
            .field("root", &self.root)
            .field("scan", &self.scan)
            .field("probe", &self.probe.name())
            .finish()
    }
}

/// Join `path` onto `root` unless `root` is the current directory or
/// `path` is already absolute.
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || root.as_os_str().is_empty() || root == Path::new(".") {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Modification time of `path` as UTC.
pub fn modified_at(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified: SystemTime = std::fs::metadata(path)?.modified()?;
    Ok(modified.into())
}
