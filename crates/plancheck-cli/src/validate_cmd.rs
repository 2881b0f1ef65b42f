//! `plancheck validate`: the hook entry point.
//!
//! Prints exactly one JSON object on stdout and reports the exit code the
//! caller should use: 0 to continue, 1 to block. Any failure of the
//! validator itself is turned into a `continue` so a validator defect
//! never blocks the surrounding workflow.

use std::io::{IsTerminal, Read};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, warn};

use plancheck_core::agents::TeamDirectory;
use plancheck_core::discovery::{DocumentLocator, GitStatusProbe};
use plancheck_core::pipeline::{ValidationPipeline, Verdict};

use crate::config::{CliOverrides, PlancheckConfig};

/// Run validation and return the verdict to print.
pub async fn run_validate(overrides: &CliOverrides) -> Verdict {
    drain_stdin();
    match evaluate(overrides).await {
        Ok(verdict) => verdict,
        Err(e) => {
            error!(error = %format!("{e:#}"), "validator failed, allowing through");
            Verdict::Pass {
                message: format!("Validation error (allowing through): {e:#}"),
            }
        }
    }
}

/// Exit code for a verdict.
pub fn exit_code(verdict: &Verdict) -> i32 {
    if verdict.is_pass() { 0 } else { 1 }
}

async fn evaluate(overrides: &CliOverrides) -> Result<Verdict> {
    let config = PlancheckConfig::resolve(overrides)?;
    let root = Path::new(".");

    let probe = GitStatusProbe::new(config.git_timeout);
    let locator = DocumentLocator::new(root, config.scan.clone(), Box::new(probe));
    let path = match locator.locate(config.file.as_deref()).await {
        Ok(path) => path,
        Err(e) => match e.block_reason() {
            Some(reason) => {
                warn!(error = %e, "no plan to validate");
                return Ok(Verdict::Fail { reason });
            }
            None => return Err(e).context("failed to locate plan document"),
        },
    };

    let pipeline = ValidationPipeline::discover(
        &TeamDirectory::new(&config.team_dir),
        config.router()?,
    )?
    .with_project_root(root);
    let report = pipeline.validate_file(&path)?;
    Ok(report.verdict())
}

/// The hook payload on stdin carries nothing we need, but it must be
/// consumed so the writer does not see a broken pipe.
fn drain_stdin() {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return;
    }
    let mut sink = Vec::new();
    if let Err(e) = stdin.lock().read_to_end(&mut sink) {
        warn!(error = %e, "failed to read stdin");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(
            exit_code(&Verdict::Pass {
                message: String::new()
            }),
            0
        );
        assert_eq!(
            exit_code(&Verdict::Fail {
                reason: String::new()
            }),
            1
        );
    }
}
