//! Configuration for plancheck.
//!
//! Settings come from an optional TOML file at
//! `~/.config/plancheck/config.toml` and are resolved per setting with the
//! chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use plancheck_core::discovery::{GitStatusProbe, ScanConfig};
use plancheck_core::router::{ContextRouter, RoutingTable};

pub const ENV_DIRECTORY: &str = "PLANCHECK_DIRECTORY";
pub const ENV_EXTENSION: &str = "PLANCHECK_EXTENSION";
pub const ENV_MAX_AGE: &str = "PLANCHECK_MAX_AGE";
pub const ENV_FILE: &str = "PLANCHECK_FILE";
pub const ENV_TEAM_DIR: &str = "PLANCHECK_TEAM_DIR";
pub const ENV_ROUTES: &str = "PLANCHECK_ROUTES";
pub const ENV_REFS_DIR: &str = "PLANCHECK_REFS_DIR";
pub const ENV_GIT_TIMEOUT: &str = "PLANCHECK_GIT_TIMEOUT";

pub const DEFAULT_TEAM_DIR: &str = ".claude/agents/team";
pub const DEFAULT_REFS_DIR: &str = ".claude/refs";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub agents: AgentsSection,
    #[serde(default)]
    pub router: RouterSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    pub directory: Option<PathBuf>,
    pub extension: Option<String>,
    pub max_age_minutes: Option<u64>,
    pub git_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentsSection {
    pub team_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    /// Routing table file replacing the embedded one.
    pub table: Option<PathBuf>,
    pub refs_dir: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the plancheck config directory: `$XDG_CONFIG_HOME/plancheck` or
/// `~/.config/plancheck`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("plancheck");
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("plancheck")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read
// -----------------------------------------------------------------------

/// Load the config file at `path`. A missing file is `Ok(None)`; an
/// unreadable or malformed one is an error.
pub fn load_config_from(path: &Path) -> Result<Option<ConfigFile>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    let config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

pub fn load_config() -> Result<Option<ConfigFile>> {
    load_config_from(&config_path())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub directory: Option<PathBuf>,
    pub extension: Option<String>,
    pub max_age: Option<u64>,
    pub file: Option<PathBuf>,
    pub team_dir: Option<PathBuf>,
    pub routes: Option<PathBuf>,
    pub refs_dir: Option<PathBuf>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlancheckConfig {
    pub scan: ScanConfig,
    /// Validate this file instead of scanning.
    pub file: Option<PathBuf>,
    pub team_dir: PathBuf,
    pub routes: Option<PathBuf>,
    pub refs_dir: PathBuf,
    pub git_timeout: Duration,
}

impl PlancheckConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();
        Self::resolve_with(cli, file)
    }

    fn resolve_with(cli: &CliOverrides, file: ConfigFile) -> Result<Self> {
        let directory = cli
            .directory
            .clone()
            .or_else(|| env_string(ENV_DIRECTORY).map(PathBuf::from))
            .or(file.scan.directory)
            .unwrap_or_else(|| PathBuf::from(ScanConfig::DEFAULT_DIRECTORY));

        let extension = cli
            .extension
            .clone()
            .or_else(|| env_string(ENV_EXTENSION))
            .or(file.scan.extension)
            .unwrap_or_else(|| ScanConfig::DEFAULT_EXTENSION.to_string());

        let max_age = match cli.max_age {
            Some(minutes) => minutes,
            None => env_parsed(ENV_MAX_AGE)?
                .or(file.scan.max_age_minutes)
                .unwrap_or(ScanConfig::DEFAULT_MAX_AGE_MINUTES),
        };

        let git_timeout_secs = env_parsed(ENV_GIT_TIMEOUT)?
            .or(file.scan.git_timeout_secs)
            .unwrap_or(GitStatusProbe::DEFAULT_TIMEOUT.as_secs());

        let file_override = cli
            .file
            .clone()
            .or_else(|| env_string(ENV_FILE).map(PathBuf::from));

        let team_dir = cli
            .team_dir
            .clone()
            .or_else(|| env_string(ENV_TEAM_DIR).map(PathBuf::from))
            .or(file.agents.team_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEAM_DIR));

        let routes = cli
            .routes
            .clone()
            .or_else(|| env_string(ENV_ROUTES).map(PathBuf::from))
            .or(file.router.table);

        let refs_dir = cli
            .refs_dir
            .clone()
            .or_else(|| env_string(ENV_REFS_DIR).map(PathBuf::from))
            .or(file.router.refs_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REFS_DIR));

        Ok(Self {
            scan: ScanConfig::new(directory, &extension, max_age),
            file: file_override,
            team_dir,
            routes,
            refs_dir,
            git_timeout: Duration::from_secs(git_timeout_secs.max(1)),
        })
    }

    /// Build the router from the configured table, or the embedded one.
    pub fn router(&self) -> Result<ContextRouter> {
        let table = match &self.routes {
            Some(path) => RoutingTable::from_path(path)
                .with_context(|| format!("failed to load routing table {}", path.display()))?,
            None => RoutingTable::builtin(),
        };
        Ok(ContextRouter::new(table))
    }
}

/// A non-empty environment variable.
fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}"))
        })
        .transpose()
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: &[&str] = &[
        ENV_DIRECTORY,
        ENV_EXTENSION,
        ENV_MAX_AGE,
        ENV_FILE,
        ENV_TEAM_DIR,
        ENV_ROUTES,
        ENV_REFS_DIR,
        ENV_GIT_TIMEOUT,
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn clear_env() {
        for var in ALL_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_env();

        let config =
            PlancheckConfig::resolve_with(&CliOverrides::default(), ConfigFile::default()).unwrap();
        assert_eq!(config.scan, ScanConfig::default());
        assert_eq!(config.file, None);
        assert_eq!(config.team_dir, PathBuf::from(".claude/agents/team"));
        assert_eq!(config.refs_dir, PathBuf::from(".claude/refs"));
        assert_eq!(config.routes, None);
        assert_eq!(config.git_timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let _lock = lock_env();
        clear_env();

        let file: ConfigFile = toml::from_str(
            r#"
[scan]
directory = "plans"
extension = "plan.md"
max_age_minutes = 30
git_timeout_secs = 2

[agents]
team_dir = "agents"
"#,
        )
        .unwrap();
        let config = PlancheckConfig::resolve_with(&CliOverrides::default(), file).unwrap();
        assert_eq!(config.scan.directory, PathBuf::from("plans"));
        assert_eq!(config.scan.extension, ".plan.md");
        assert_eq!(config.scan.max_age_minutes, 30);
        assert_eq!(config.git_timeout, Duration::from_secs(2));
        assert_eq!(config.team_dir, PathBuf::from("agents"));
    }

    #[test]
    fn env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var(ENV_DIRECTORY, "env-specs") };
        unsafe { std::env::set_var(ENV_MAX_AGE, "15") };

        let file: ConfigFile = toml::from_str("[scan]\ndirectory = \"file-specs\"\n").unwrap();
        let config = PlancheckConfig::resolve_with(&CliOverrides::default(), file).unwrap();
        assert_eq!(config.scan.directory, PathBuf::from("env-specs"));
        assert_eq!(config.scan.max_age_minutes, 15);

        clear_env();
    }

    #[test]
    fn cli_flag_overrides_all() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var(ENV_DIRECTORY, "env-specs") };
        unsafe { std::env::set_var(ENV_FILE, "env-plan.md") };

        let cli = CliOverrides {
            directory: Some("cli-specs".into()),
            file: Some("cli-plan.md".into()),
            max_age: Some(1),
            ..CliOverrides::default()
        };
        let config = PlancheckConfig::resolve_with(&cli, ConfigFile::default()).unwrap();
        assert_eq!(config.scan.directory, PathBuf::from("cli-specs"));
        assert_eq!(config.file, Some(PathBuf::from("cli-plan.md")));
        assert_eq!(config.scan.max_age_minutes, 1);

        clear_env();
    }

    #[test]
    fn empty_env_var_is_ignored() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var(ENV_FILE, "") };
        let config =
            PlancheckConfig::resolve_with(&CliOverrides::default(), ConfigFile::default()).unwrap();
        assert_eq!(config.file, None);

        clear_env();
    }

    #[test]
    fn invalid_numeric_env_var_is_an_error() {
        let _lock = lock_env();
        clear_env();

        unsafe { std::env::set_var(ENV_MAX_AGE, "soon") };
        let err = PlancheckConfig::resolve_with(&CliOverrides::default(), ConfigFile::default())
            .unwrap_err();
        assert!(err.to_string().contains("PLANCHECK_MAX_AGE"), "{err}");

        clear_env();
    }

    #[test]
    fn missing_config_file_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(
            load_config_from(&tmp.path().join("config.toml"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[scan\ndirectory = 1").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));

        std::fs::write(&path, "[scan]\nunknown_key = 1\n").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn router_uses_override_table() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("routes.toml");
        std::fs::write(
            &path,
            "[[rules]]\nsection = \"docs#intro\"\npriority = 1\nkeywords = [\"intro\"]\n",
        )
        .unwrap();

        let config = PlancheckConfig {
            routes: Some(path),
            ..builtin_config()
        };
        let result = config.router().unwrap().route("intro");
        assert_eq!(result.sections, vec!["docs#intro"]);

        let missing = PlancheckConfig {
            routes: Some(tmp.path().join("missing.toml")),
            ..builtin_config()
        };
        assert!(missing.router().is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("plancheck/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }

    fn builtin_config() -> PlancheckConfig {
        PlancheckConfig {
            scan: ScanConfig::default(),
            file: None,
            team_dir: DEFAULT_TEAM_DIR.into(),
            routes: None,
            refs_dir: DEFAULT_REFS_DIR.into(),
            git_timeout: Duration::from_secs(5),
        }
    }
}
