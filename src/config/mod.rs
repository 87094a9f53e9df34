//! Pipeline configuration.
//!
//! This module defines the `Config` struct loaded from a pipeline YAML file:
//! the ordered task list, reusable sub-workflows, external commands for models
//! and post-processors, and export targets. Parsing is forward-compatible
//! (unknown fields are ignored), optional fields have defaults, and
//! `Config::validate` checks references and condition shapes once at load
//! time.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{CommandSpec, ExportKind, ExportTarget, TaskAction, TaskSpec};
