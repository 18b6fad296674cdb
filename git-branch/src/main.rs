//! Enforce postconditions on a git branch in a checked out repository.
//!
//! Reads a specification (TOML or JSON), evaluates it, and prints the JSON
//! report on stdout. Exit codes are listed in [`git_branch::exit_codes`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use git_branch::apply::apply;
use git_branch::core::spec::decode;
use git_branch::exit_codes;
use git_branch::io::config::{load_config, load_spec};
use git_branch::logging;

#[derive(Parser)]
#[command(
    name = "git-branch",
    version,
    about = "Enforce postconditions on a git branch"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a specification and print the JSON report.
    Apply {
        /// Specification file (`.json` for JSON, TOML otherwise).
        spec: PathBuf,
        /// Report what would change without running mutating commands.
        #[arg(long)]
        check: bool,
        /// Tool configuration (TOML). Defaults apply if the file is missing.
        #[arg(long, default_value = "git-branch.toml")]
        config: PathBuf,
    },
    /// Decode a specification and list its postconditions without running git.
    Plan {
        /// Specification file (`.json` for JSON, TOML otherwise).
        spec: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Apply {
            spec,
            check,
            config,
        } => cmd_apply(spec, check, config),
        Command::Plan { spec } => cmd_plan(spec),
    }
}

fn cmd_apply(spec_path: PathBuf, check: bool, config_path: PathBuf) -> Result<i32> {
    let cfg = load_config(&config_path)?;
    let spec = load_spec(&spec_path)?;
    let runner = cfg.runner();
    let report = apply(&spec, check, Some(&cfg.git_command), &runner);

    let payload = serde_json::to_string_pretty(&report).context("serialize report")?;
    println!("{payload}");

    Ok(match report.kind {
        None => exit_codes::OK,
        Some("config") => exit_codes::INVALID,
        Some(_) => exit_codes::FAILED,
    })
}

fn cmd_plan(spec_path: PathBuf) -> Result<i32> {
    let spec = load_spec(&spec_path)?;
    let declared = decode(&spec)?;
    for d in &declared {
        println!("{} {}", d.mode.as_str(), d.explainer());
    }
    Ok(exit_codes::OK)
}
