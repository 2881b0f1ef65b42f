mod agents_cmd;
mod config;
mod route_cmd;
mod validate_cmd;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use config::{CliOverrides, PlancheckConfig};

#[derive(Parser)]
#[command(
    name = "plancheck",
    version,
    about = "Structural validator and documentation router for markdown task plans"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the newest plan and print a hook verdict as JSON
    Validate(ValidateArgs),
    /// Route free text to documentation sections
    Route {
        /// Text to route (read from stdin when omitted)
        text: Option<String>,
        /// Routing table replacing the embedded one
        #[arg(long)]
        routes: Option<PathBuf>,
    },
    /// Route free text and print the matching reference sections
    Context {
        /// Text to route (read from stdin when omitted)
        text: Option<String>,
        /// Directory holding the reference documents
        #[arg(long)]
        refs_dir: Option<PathBuf>,
        /// Routing table replacing the embedded one
        #[arg(long)]
        routes: Option<PathBuf>,
    },
    /// List the agent types plans may use
    Agents {
        /// Directory with agent definition files
        #[arg(long)]
        team_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct ValidateArgs {
    /// Directory to scan for the newest plan file (default: specs)
    #[arg(short, long)]
    directory: Option<PathBuf>,
    /// File extension to match (default: .md)
    #[arg(short, long)]
    extension: Option<String>,
    /// Maximum file age in minutes (default: 5)
    #[arg(long)]
    max_age: Option<u64>,
    /// Plan file to validate, bypassing directory scanning
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Directory with agent definition files (default: .claude/agents/team)
    #[arg(long)]
    team_dir: Option<PathBuf>,
    /// Routing table replacing the embedded one
    #[arg(long)]
    routes: Option<PathBuf>,
}

impl From<ValidateArgs> for CliOverrides {
    fn from(args: ValidateArgs) -> Self {
        Self {
            directory: args.directory,
            extension: args.extension,
            max_age: args.max_age,
            file: args.file,
            team_dir: args.team_dir,
            routes: args.routes,
            refs_dir: None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => {
            let verdict = validate_cmd::run_validate(&args.into()).await;
            println!("{}", serde_json::to_string(&verdict)?);
            std::process::exit(validate_cmd::exit_code(&verdict));
        }
        Commands::Route { text, routes } => {
            let config = PlancheckConfig::resolve(&CliOverrides {
                routes,
                ..CliOverrides::default()
            })?;
            route_cmd::run_route(&config, text)?;
        }
        Commands::Context {
            text,
            refs_dir,
            routes,
        } => {
            let config = PlancheckConfig::resolve(&CliOverrides {
                refs_dir,
                routes,
                ..CliOverrides::default()
            })?;
            route_cmd::run_context(&config, text)?;
        }
        Commands::Agents { team_dir } => {
            let config = PlancheckConfig::resolve(&CliOverrides {
                team_dir,
                ..CliOverrides::default()
            })?;
            agents_cmd::run_agents(&config)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn validate_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "plancheck",
            "validate",
            "-d",
            "plans",
            "-e",
            "txt",
            "--max-age",
            "10",
            "-f",
            "plans/a.txt",
            "--team-dir",
            "agents",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        let overrides = CliOverrides::from(args);
        assert_eq!(overrides.directory, Some(PathBuf::from("plans")));
        assert_eq!(overrides.extension.as_deref(), Some("txt"));
        assert_eq!(overrides.max_age, Some(10));
        assert_eq!(overrides.file, Some(PathBuf::from("plans/a.txt")));
        assert_eq!(overrides.team_dir, Some(PathBuf::from("agents")));
    }

    #[test]
    fn route_text_is_optional() {
        let cli = Cli::try_parse_from(["plancheck", "route"]).unwrap();
        assert!(matches!(cli.command, Commands::Route { text: None, .. }));
    }
}
