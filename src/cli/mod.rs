//! CLI argument parsing for mediatask.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mediatask: template rendering, condition evaluation, and task pipelines
/// for generated media.
///
/// Data contexts are JSON or YAML documents. Use `-` to read one from stdin.
#[derive(Parser, Debug)]
#[command(name = "mediatask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for mediatask.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a template against a data context.
    ///
    /// Placeholders are `{{path|pipe|pipe}}`. Missing values render empty.
    Render(RenderArgs),

    /// Evaluate a condition tree against a data context.
    ///
    /// Prints `true` or `false`.
    Eval(EvalArgs),

    /// Run a pipeline config against a data context.
    ///
    /// Executes tasks in order, gating each on its condition, and prints a
    /// per-task summary.
    Run(RunArgs),

    /// Validate a pipeline config without running it.
    ///
    /// Reports configuration errors and unknown pipe names.
    Check(CheckArgs),

    /// List the built-in template pipes.
    Pipes,
}

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Template text, or `@path` to read it from a file.
    pub template: String,

    /// Data context file (JSON or YAML), or `-` for stdin.
    #[arg(short, long)]
    pub data: Option<PathBuf>,
}

/// Arguments for the `eval` command.
#[derive(Parser, Debug)]
pub struct EvalArgs {
    /// Condition JSON, or `@path` to read it from a file (JSON or YAML).
    pub condition: String,

    /// Data context file (JSON or YAML), or `-` for stdin.
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Exit with status 5 when the condition is false.
    #[arg(long)]
    pub exit_status: bool,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Pipeline config (YAML).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Data context file (JSON or YAML), or `-` for stdin.
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Plan the run without invoking models, post-processors, or exports.
    #[arg(long)]
    pub dry_run: bool,

    /// Append run events to this NDJSON file.
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Print the final data context as JSON after the summary.
    #[arg(long)]
    pub print_context: bool,

    /// Write the final data context as JSON to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Pipeline config (YAML).
    #[arg(short, long)]
    pub config: PathBuf,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
