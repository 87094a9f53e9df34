//! Command implementations for mediatask.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the input helpers they share.

mod check;
mod eval;
mod pipes;
mod render;
mod run;

use crate::cli::Command;
use crate::error::{MediaTaskError, Result};
use serde_json::{Value, json};
use std::io::Read;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Render(args) => render::cmd_render(args),
        Command::Eval(args) => eval::cmd_eval(args),
        Command::Run(args) => run::cmd_run(args),
        Command::Check(args) => check::cmd_check(args),
        Command::Pipes => pipes::cmd_pipes(),
    }
}

/// Load a data context. No path means an empty object; `-` reads stdin.
pub(crate) fn read_data(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(json!({}));
    };

    let text = read_input(path)?;
    parse_document(&text).map_err(|e| {
        MediaTaskError::UserError(format!(
            "failed to parse data '{}' as JSON or YAML: {}",
            path.display(),
            e
        ))
    })
}

/// Resolve an inline argument: `@path` reads the file, anything else is taken
/// literally.
pub(crate) fn read_inline_or_file(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => read_input(Path::new(path)),
        None => Ok(arg.to_string()),
    }
}

/// Parse text as JSON, falling back to YAML.
pub(crate) fn parse_document(text: &str) -> std::result::Result<Value, serde_yaml::Error> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) => serde_yaml::from_str(text),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(|e| {
            MediaTaskError::UserError(format!("failed to read stdin: {}", e))
        })?;
        return Ok(buf);
    }

    std::fs::read_to_string(path).map_err(|e| {
        MediaTaskError::UserError(format!("failed to read '{}': {}", path.display(), e))
    })
}
