//! Version-control change probe.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Porcelain status codes that count as "added or modified".
pub const CHANGED_STATUSES: &[&str] = &["??", "A ", " A", "AM", " M", "M "];

/// Result of a best-effort external query.
///
/// Callers distinguish a query that ran and found nothing from one that
/// could not run at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T> {
    /// The query ran to completion.
    Completed(T),
    /// The tool ran but reported an error.
    Failed(String),
    /// The tool did not finish within the allotted time.
    TimedOut(Duration),
    /// The tool could not be started.
    Unavailable(String),
}

impl<T> fmt::Display for ProbeOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(_) => f.write_str("completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs()),
            Self::Unavailable(reason) => write!(f, "unavailable: {reason}"),
        }
    }
}

/// Reports files under a directory that have uncommitted additions or
/// modifications.
///
/// Returned paths are relative to the directory the probe runs in.
#[async_trait]
pub trait ChangeProbe: Send + Sync {
    /// Short name for log output.
    fn name(&self) -> &str;

    async fn changed_files(&self, dir: &Path) -> ProbeOutcome<Vec<PathBuf>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn ChangeProbe) {}
};

/// Runs `git status --porcelain <dir>/`.
#[derive(Debug, Clone)]
pub struct GitStatusProbe {
    program: String,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl GitStatusProbe {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "git".to_string(),
            working_dir: None,
            timeout,
        }
    }

    /// Run git in `dir` instead of the process working directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Use a different executable. Mostly useful in tests.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for GitStatusProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ChangeProbe for GitStatusProbe {
    fn name(&self) -> &str {
        "git-status"
    }

    async fn changed_files(&self, dir: &Path) -> ProbeOutcome<Vec<PathBuf>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("status")
            .arg("--porcelain")
            .arg(format!("{}/", dir.display()))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(working_dir) = &self.working_dir {
            cmd.current_dir(working_dir);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => return ProbeOutcome::TimedOut(self.timeout),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProbeOutcome::Unavailable(format!("{} not found", self.program));
            }
            Ok(Err(e)) => return ProbeOutcome::Unavailable(e.to_string()),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return ProbeOutcome::Failed(if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            });
        }

        ProbeOutcome::Completed(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extract the paths of added or modified entries from
/// `git status --porcelain` output.
pub fn parse_porcelain(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| {
            let status = line.get(..2)?;
            if !CHANGED_STATUSES.contains(&status) {
                return None;
            }
            let path = line.get(3..)?.trim();
            let path = path
                .strip_prefix('"')
                .and_then(|p| p.strip_suffix('"'))
                .unwrap_or(path);
            (!path.is_empty()).then(|| PathBuf::from(path))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accepted_statuses() {
        let output = "\
?? specs/new-plan.md
A  specs/added.md
 M specs/edited.md
AM specs/partial.md
 D specs/deleted.md
R  specs/old.md -> specs/renamed.md
M  specs/staged.md
";
        let paths = parse_porcelain(output);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("specs/new-plan.md"),
                PathBuf::from("specs/added.md"),
                PathBuf::from("specs/edited.md"),
                PathBuf::from("specs/partial.md"),
                PathBuf::from("specs/staged.md"),
            ]
        );
    }

    #[test]
    fn unquotes_paths_with_spaces() {
        assert_eq!(
            parse_porcelain("?? \"specs/my plan.md\"\n"),
            vec![PathBuf::from("specs/my plan.md")]
        );
    }

    #[test]
    fn ignores_short_and_empty_lines() {
        assert!(parse_porcelain("\n??\nM \n").is_empty());
    }

    #[test]
    fn outcome_display() {
        let timed_out: ProbeOutcome<()> = ProbeOutcome::TimedOut(Duration::from_secs(5));
        assert_eq!(timed_out.to_string(), "timed out after 5s");
        assert_eq!(
            ProbeOutcome::<()>::Unavailable("no git".into()).to_string(),
            "unavailable: no git"
        );
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let probe = GitStatusProbe::default().with_program("plancheck-no-such-git-binary");
        let outcome = probe.changed_files(Path::new("specs")).await;
        assert!(
            matches!(outcome, ProbeOutcome::Unavailable(_)),
            "got {outcome:?}"
        );
    }

    #[tokio::test]
    async fn outside_a_repository_fails_or_is_unavailable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let probe = GitStatusProbe::default().in_dir(tmp.path());
        let outcome = probe.changed_files(Path::new("specs")).await;
        assert!(
            !matches!(outcome, ProbeOutcome::Completed(_)),
            "got {outcome:?}"
        );
    }
}
