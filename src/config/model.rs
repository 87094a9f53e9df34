//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a media task pipeline.
///
/// This struct represents the contents of a pipeline YAML file.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Run settings
    // =========================================================================
    /// Keep running later tasks after one fails.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Maximum nesting of sub-workflows.
    #[serde(default = "default_max_workflow_depth")]
    pub max_workflow_depth: u32,

    // =========================================================================
    // External commands
    // =========================================================================
    /// Model commands keyed by name, used by `invoke_model` tasks.
    #[serde(default)]
    pub models: BTreeMap<String, CommandSpec>,

    /// Post-processor commands keyed by name, used by `post_process` tasks.
    #[serde(default)]
    pub post_processors: BTreeMap<String, CommandSpec>,

    // =========================================================================
    // Tasks
    // =========================================================================
    /// Reusable task lists keyed by name, used by `sub_workflow` tasks.
    #[serde(default)]
    pub workflows: BTreeMap<String, Vec<TaskSpec>>,

    /// Export targets keyed by name, used by `export` tasks.
    #[serde(default)]
    pub exports: BTreeMap<String, ExportTarget>,

    /// Top-level tasks, run in order for each media item.
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            max_workflow_depth: default_max_workflow_depth(),
            models: BTreeMap::new(),
            post_processors: BTreeMap::new(),
            workflows: BTreeMap::new(),
            exports: BTreeMap::new(),
            tasks: Vec::new(),
        }
    }
}
