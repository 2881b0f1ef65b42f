//! `plancheck route` and `plancheck context`.

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result, bail};

use plancheck_core::sections::SectionLibrary;

use crate::config::PlancheckConfig;

/// Printed by `context` when routing selects nothing.
const NO_SECTIONS_REQUESTED: &str = "No sections requested.";

/// Route `text` (or stdin) and print the result as JSON.
pub fn run_route(config: &PlancheckConfig, text: Option<String>) -> Result<()> {
    let text = input_text(text)?;
    let result = config.router()?.route(&text);
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// Route `text` (or stdin), load the selected sections from the reference
/// directory and print them as markdown.
pub fn run_context(config: &PlancheckConfig, text: Option<String>) -> Result<()> {
    let text = input_text(text)?;
    let result = config.router()?.route(&text);
    if !result.is_routed() {
        println!("{NO_SECTIONS_REQUESTED}");
        return Ok(());
    }

    let loaded = SectionLibrary::new(&config.refs_dir).load(&result.sections);
    println!("{}", loaded.stats_line());
    println!();
    println!("{}", loaded.format_context());
    Ok(())
}

fn input_text(arg: Option<String>) -> Result<String> {
    if let Some(text) = arg {
        return Ok(text);
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("no text given; pass it as an argument or pipe it on stdin");
    }
    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("failed to read text from stdin")?;
    Ok(text)
}
