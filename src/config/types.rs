//! Configuration types and defaults.
//!
//! This module defines the task, command, and export types that make up a
//! pipeline config, plus default value functions used by serde.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::condition::ConditionNode;

/// One step of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Name shown in reports and the run log. Unique within its task list.
    pub name: String,

    /// Optional gate. Absent or `null` means the task always runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<ConditionNode>,

    /// What the task does.
    pub action: TaskAction,
}

/// Action performed by a task.
///
/// Serialized with a `type` tag:
///
/// ```yaml
/// action: { type: template, template: "{{tags|snakecase}}", target: slug }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskAction {
    /// Render `template` and store the text at `target`.
    Template { template: String, target: String },

    /// Copy the value at `from` to `to`.
    Copy { from: String, to: String },

    /// Run a configured model command.
    InvokeModel {
        model: String,
        /// Input name to template; rendered before the call.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        inputs: BTreeMap<String, String>,
        /// Where to store the model's output, if anywhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    /// Run a configured post-processor command.
    PostProcess {
        processor: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        inputs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    /// Run a named task list from `workflows` against the same context.
    SubWorkflow { workflow: String },

    /// Deliver the media item through a named export target.
    Export { target: String },
}

impl TaskAction {
    /// Short action name used in reports and events.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskAction::Template { .. } => "template",
            TaskAction::Copy { .. } => "copy",
            TaskAction::InvokeModel { .. } => "invoke_model",
            TaskAction::PostProcess { .. } => "post_process",
            TaskAction::SubWorkflow { .. } => "sub_workflow",
            TaskAction::Export { .. } => "export",
        }
    }

    /// Whether the action reaches outside the process (skipped on dry runs).
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            TaskAction::InvokeModel { .. }
                | TaskAction::PostProcess { .. }
                | TaskAction::Export { .. }
        )
    }

    /// Template strings carried directly by this action.
    pub fn templates(&self) -> Vec<&str> {
        match self {
            TaskAction::Template { template, .. } => vec![template.as_str()],
            TaskAction::InvokeModel { inputs, .. } | TaskAction::PostProcess { inputs, .. } => {
                inputs.values().map(String::as_str).collect()
            }
            TaskAction::Copy { .. } | TaskAction::SubWorkflow { .. } | TaskAction::Export { .. } => {
                Vec::new()
            }
        }
    }
}

/// An external command used for models and post-processors.
///
/// `command` is a template rendered against the data context (with rendered
/// inputs available under `inputs`), then split with shell-words rules. It is
/// executed directly, never through a shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    pub command: String,

    /// Kill the command after this many seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra environment variables for the command.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self {
            command: String::new(),
            timeout_seconds: default_timeout_seconds(),
            environment: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// How an export is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// Copy the file into a local folder (default).
    #[default]
    Folder,
    /// POST the file to a URL. Delivery is supplied by the embedding application.
    Http,
}

/// A named export destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportTarget {
    pub kind: ExportKind,

    /// Folder path (folder exports) or URL (http exports). Template.
    pub destination: String,

    /// Output file name. Template. Empty keeps the source file name.
    pub filename: String,

    /// Path of the file being exported. Template.
    #[serde(default = "default_export_source")]
    pub source: String,

    /// Only export when the source file name matches one of these globs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_globs: Vec<String>,

    /// Replace an existing file instead of picking a free name.
    pub overwrite: bool,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for ExportTarget {
    fn default() -> Self {
        Self {
            kind: ExportKind::default(),
            destination: String::new(),
            filename: String::new(),
            source: default_export_source(),
            include_globs: Vec::new(),
            overwrite: false,
            extra: BTreeMap::new(),
        }
    }
}

impl ExportTarget {
    /// Template strings carried by this target.
    pub fn templates(&self) -> [&str; 3] {
        [
            self.destination.as_str(),
            self.filename.as_str(),
            self.source.as_str(),
        ]
    }
}

// Default value functions for serde
pub(crate) fn default_timeout_seconds() -> u64 {
    300
}
pub(crate) fn default_export_source() -> String {
    "{{file}}".to_string()
}
pub(crate) fn default_max_workflow_depth() -> u32 {
    8
}
