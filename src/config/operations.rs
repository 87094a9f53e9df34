//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::{CommandSpec, ExportKind, ExportTarget, TaskAction, TaskSpec};
use crate::error::{MediaTaskError, Result};
use crate::template::TemplateEngine;
use globset::Glob;
use std::collections::HashSet;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(MediaTaskError::UserError)` - The file could not be read
    /// * `Err(MediaTaskError::ConfigError)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            MediaTaskError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| MediaTaskError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            MediaTaskError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and references.
    ///
    /// Validation rules:
    /// - `max_workflow_depth` must be positive
    /// - commands must be non-empty with a positive timeout
    /// - folder exports need a destination; `include_globs` must compile
    /// - task names are non-empty and unique within their list
    /// - conditions are well-formed
    /// - tasks reference configured models, post-processors, workflows, exports
    /// - sub-workflows do not reference each other in a cycle
    pub fn validate(&self) -> Result<()> {
        if self.max_workflow_depth == 0 {
            return Err(MediaTaskError::ConfigError(
                "max_workflow_depth must be greater than 0".to_string(),
            ));
        }

        for (name, spec) in &self.models {
            validate_command("models", name, spec)?;
        }
        for (name, spec) in &self.post_processors {
            validate_command("post_processors", name, spec)?;
        }
        for (name, target) in &self.exports {
            validate_export(name, target)?;
        }

        self.validate_tasks("tasks", &self.tasks)?;
        for (name, tasks) in &self.workflows {
            self.validate_tasks(&format!("workflows.{}", name), tasks)?;
        }

        self.check_workflow_cycles()
    }

    fn validate_tasks(&self, scope: &str, tasks: &[TaskSpec]) -> Result<()> {
        let mut seen = HashSet::new();

        for (i, task) in tasks.iter().enumerate() {
            if task.name.trim().is_empty() {
                return Err(MediaTaskError::ConfigError(format!(
                    "{}[{}]: task name must be non-empty",
                    scope, i
                )));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(MediaTaskError::ConfigError(format!(
                    "{}: duplicate task name '{}'",
                    scope, task.name
                )));
            }

            let fail = |msg: String| {
                MediaTaskError::ConfigError(format!("{}: task '{}': {}", scope, task.name, msg))
            };

            if let Some(when) = &task.when {
                when.validate().map_err(|e| fail(e.to_string()))?;
            }

            match &task.action {
                TaskAction::Template { target, .. } => {
                    check_path("target", target).map_err(fail)?;
                }
                TaskAction::Copy { from, to } => {
                    check_path("from", from).map_err(fail)?;
                    check_path("to", to).map_err(fail)?;
                }
                TaskAction::InvokeModel { model, target, .. } => {
                    if !self.models.contains_key(model) {
                        return Err(fail(format!("unknown model '{}'", model)));
                    }
                    if let Some(target) = target {
                        check_path("target", target).map_err(fail)?;
                    }
                }
                TaskAction::PostProcess {
                    processor, target, ..
                } => {
                    if !self.post_processors.contains_key(processor) {
                        return Err(fail(format!("unknown post-processor '{}'", processor)));
                    }
                    if let Some(target) = target {
                        check_path("target", target).map_err(fail)?;
                    }
                }
                TaskAction::SubWorkflow { workflow } => {
                    if !self.workflows.contains_key(workflow) {
                        return Err(fail(format!("unknown workflow '{}'", workflow)));
                    }
                }
                TaskAction::Export { target } => {
                    if !self.exports.contains_key(target) {
                        return Err(fail(format!("unknown export target '{}'", target)));
                    }
                }
            }
        }

        Ok(())
    }

    fn check_workflow_cycles(&self) -> Result<()> {
        fn visit<'a>(
            config: &'a Config,
            name: &'a str,
            stack: &mut Vec<&'a str>,
            done: &mut HashSet<&'a str>,
        ) -> Result<()> {
            if done.contains(name) {
                return Ok(());
            }
            if let Some(pos) = stack.iter().position(|n| *n == name) {
                let mut cycle = stack[pos..].to_vec();
                cycle.push(name);
                return Err(MediaTaskError::ConfigError(format!(
                    "sub-workflow cycle: {}",
                    cycle.join(" -> ")
                )));
            }

            stack.push(name);
            if let Some(tasks) = config.workflows.get(name) {
                for task in tasks {
                    if let TaskAction::SubWorkflow { workflow } = &task.action {
                        visit(config, workflow, stack, done)?;
                    }
                }
            }
            stack.pop();
            done.insert(name);
            Ok(())
        }

        let mut done = HashSet::new();
        for name in self.workflows.keys() {
            visit(self, name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    /// Unknown pipe names used anywhere in the config.
    ///
    /// Unknown pipes pass values through at render time, so these are
    /// reported as warnings rather than validation errors.
    pub fn template_warnings(&self, engine: &TemplateEngine) -> Vec<String> {
        let mut templates: Vec<(String, &str)> = Vec::new();

        for task in &self.tasks {
            for t in task.action.templates() {
                templates.push((format!("task '{}'", task.name), t));
            }
        }
        for (workflow, tasks) in &self.workflows {
            for task in tasks {
                for t in task.action.templates() {
                    templates.push((format!("workflow '{}' task '{}'", workflow, task.name), t));
                }
            }
        }
        for (name, target) in &self.exports {
            for t in target.templates() {
                templates.push((format!("export '{}'", name), t));
            }
        }
        for (name, spec) in &self.models {
            templates.push((format!("model '{}'", name), spec.command.as_str()));
        }
        for (name, spec) in &self.post_processors {
            templates.push((format!("post-processor '{}'", name), spec.command.as_str()));
        }

        templates
            .into_iter()
            .flat_map(|(location, template)| {
                engine
                    .unknown_pipes(template)
                    .into_iter()
                    .map(move |pipe| format!("{}: unknown pipe '{}'", location, pipe))
            })
            .collect()
    }
}

fn validate_command(section: &str, name: &str, spec: &CommandSpec) -> Result<()> {
    if spec.command.trim().is_empty() {
        return Err(MediaTaskError::ConfigError(format!(
            "{}.{}: command must be non-empty",
            section, name
        )));
    }
    if spec.timeout_seconds == 0 {
        return Err(MediaTaskError::ConfigError(format!(
            "{}.{}: timeout_seconds must be greater than 0",
            section, name
        )));
    }
    Ok(())
}

fn validate_export(name: &str, target: &ExportTarget) -> Result<()> {
    if target.destination.trim().is_empty() {
        let what = match target.kind {
            ExportKind::Folder => "destination folder",
            ExportKind::Http => "destination URL",
        };
        return Err(MediaTaskError::ConfigError(format!(
            "exports.{}: {} must be non-empty",
            name, what
        )));
    }
    if target.source.trim().is_empty() {
        return Err(MediaTaskError::ConfigError(format!(
            "exports.{}: source must be non-empty",
            name
        )));
    }
    for pattern in &target.include_globs {
        Glob::new(pattern).map_err(|e| {
            MediaTaskError::ConfigError(format!(
                "exports.{}: invalid include glob '{}': {}",
                name, pattern, e
            ))
        })?;
    }
    Ok(())
}

/// A data path written or read by a task must have no empty segments.
fn check_path(field: &str, path: &str) -> std::result::Result<(), String> {
    if path.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(format!("{} '{}' is not a valid data path", field, path));
    }
    Ok(())
}
