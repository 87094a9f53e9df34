//! The pipeline runner.

use super::actions::{ActionRequest, ActionRunner, CommandActionRunner};
use super::outcome::{PipelineReport, TaskOutcome, TaskStatus};
use crate::condition::evaluate_condition;
use crate::config::{Config, ExportKind, TaskAction, TaskSpec};
use crate::error::{MediaTaskError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::export::{ExportDelivery, FolderDelivery, plan_export};
use crate::notify::{Notifier, NotifyLevel, TracingNotifier};
use crate::template::TemplateEngine;
use crate::value::{resolve_path, set_path};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// How a task ended, before it is recorded.
enum Step {
    Completed(Option<String>),
    Skipped(String),
}

/// Mutable state of one run.
struct RunState {
    context: Value,
    outcomes: Vec<TaskOutcome>,
    halted: bool,
    event_log_error: Option<String>,
}

/// Runs a config's tasks against a data context.
///
/// ```no_run
/// use mediatask::config::Config;
/// use mediatask::pipeline::PipelineRunner;
/// use serde_json::json;
///
/// let config = Config::load("pipeline.yaml")?;
/// let report = PipelineRunner::new(&config)
///     .dry_run(true)
///     .run(&json!({"file": "/renders/0001.png"}));
/// println!("{}", report.summary());
/// # Ok::<(), mediatask::error::MediaTaskError>(())
/// ```
pub struct PipelineRunner<'a> {
    config: &'a Config,
    engine: TemplateEngine,
    actions: Option<Box<dyn ActionRunner + 'a>>,
    folder_delivery: Box<dyn ExportDelivery + 'a>,
    http_delivery: Option<Box<dyn ExportDelivery + 'a>>,
    notifier: &'a dyn Notifier,
    event_log: Option<EventLog>,
    dry_run: bool,
}

impl<'a> PipelineRunner<'a> {
    /// Runner with the built-in pipes, command-backed actions, folder
    /// delivery, no HTTP delivery, and a tracing notifier.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            engine: TemplateEngine::new(),
            actions: None,
            folder_delivery: Box::new(FolderDelivery),
            http_delivery: None,
            notifier: &TracingNotifier,
            event_log: None,
            dry_run: false,
        }
    }

    pub fn with_engine(mut self, engine: TemplateEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the command-backed model and post-processor runner.
    pub fn with_actions(mut self, actions: impl ActionRunner + 'a) -> Self {
        self.actions = Some(Box::new(actions));
        self
    }

    pub fn with_folder_delivery(mut self, delivery: impl ExportDelivery + 'a) -> Self {
        self.folder_delivery = Box::new(delivery);
        self
    }

    /// Delivery used for `http` export targets.
    pub fn with_http_delivery(mut self, delivery: impl ExportDelivery + 'a) -> Self {
        self.http_delivery = Some(Box::new(delivery));
        self
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.event_log = Some(log);
        self
    }

    /// Plan without side effects: models, post-processors, and exports are
    /// recorded as skipped. Template and copy tasks still run.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run every top-level task against a copy of `data`.
    ///
    /// Task failures are reported in the [`PipelineReport`]. A run log that
    /// cannot be written does not stop the run; the first append error is
    /// kept in [`PipelineReport::event_log_error`].
    pub fn run(&self, data: &Value) -> PipelineReport {
        let default_actions;
        let actions: &dyn ActionRunner = match &self.actions {
            Some(actions) => &**actions,
            None => {
                default_actions = CommandActionRunner::new(self.config, self.engine.clone());
                &default_actions
            }
        };

        let mut state = RunState {
            context: data.clone(),
            outcomes: Vec::new(),
            halted: false,
            event_log_error: None,
        };

        self.log(
            &mut state,
            Event::new(EventAction::RunStarted).with_details(json!({
                "tasks": self.config.tasks.len(),
                "dry_run": self.dry_run,
            })),
        );
        self.run_tasks(&self.config.tasks, "", 0, actions, &mut state);

        let finished = Event::new(EventAction::RunFinished).with_details(json!({
            "completed": count_status(&state.outcomes, TaskStatus::Completed),
            "skipped": count_status(&state.outcomes, TaskStatus::Skipped),
            "failed": count_status(&state.outcomes, TaskStatus::Failed),
            "stopped_early": state.halted,
        }));
        self.log(&mut state, finished);

        PipelineReport {
            outcomes: state.outcomes,
            context: state.context,
            stopped_early: state.halted,
            dry_run: self.dry_run,
            event_log_error: state.event_log_error,
        }
    }

    fn run_tasks(
        &self,
        tasks: &[TaskSpec],
        prefix: &str,
        depth: u32,
        actions: &dyn ActionRunner,
        state: &mut RunState,
    ) {
        for task in tasks {
            if state.halted {
                break;
            }

            let name = if prefix.is_empty() {
                task.name.clone()
            } else {
                format!("{}/{}", prefix, task.name)
            };
            let kind = task.action.kind();

            if !evaluate_condition(task.when.as_ref(), &state.context) {
                let step = Step::Skipped("condition not met".to_string());
                self.record(state, &name, kind, Ok(step));
                continue;
            }

            if self.dry_run && task.action.has_side_effects() {
                let step = Step::Skipped(format!("dry run: {} not performed", kind));
                self.record(state, &name, kind, Ok(step));
                continue;
            }

            tracing::debug!(task = %name, action = kind, "running task");

            let result = match &task.action {
                TaskAction::SubWorkflow { workflow } => {
                    self.run_sub_workflow(workflow, &name, depth, actions, state)
                }
                action => self.perform(action, actions, state),
            };
            self.record(state, &name, kind, result);
        }
    }

    fn run_sub_workflow(
        &self,
        workflow: &str,
        name: &str,
        depth: u32,
        actions: &dyn ActionRunner,
        state: &mut RunState,
    ) -> Result<Step> {
        if depth + 1 > self.config.max_workflow_depth {
            return Err(MediaTaskError::ActionFailed(format!(
                "sub-workflow '{}' exceeds max_workflow_depth ({})",
                workflow, self.config.max_workflow_depth
            )));
        }
        let tasks = self.config.workflows.get(workflow).ok_or_else(|| {
            MediaTaskError::ActionFailed(format!("unknown workflow '{}'", workflow))
        })?;

        let failed_before = count_status(&state.outcomes, TaskStatus::Failed);
        self.run_tasks(tasks, name, depth + 1, actions, state);
        let failed = count_status(&state.outcomes, TaskStatus::Failed) - failed_before;

        if failed > 0 {
            Err(MediaTaskError::ActionFailed(format!(
                "sub-workflow '{}' had {} failed task(s)",
                workflow, failed
            )))
        } else {
            Ok(Step::Completed(None))
        }
    }

    fn perform(
        &self,
        action: &TaskAction,
        actions: &dyn ActionRunner,
        state: &mut RunState,
    ) -> Result<Step> {
        let context = &mut state.context;
        match action {
            TaskAction::Template { template, target } => {
                let rendered = self.engine.render(template, context);
                store(context, target, Value::String(rendered))?;
                Ok(Step::Completed(None))
            }
            TaskAction::Copy { from, to } => match resolve_path(context, from).cloned() {
                Some(value) => {
                    store(context, to, value)?;
                    Ok(Step::Completed(None))
                }
                None => {
                    tracing::warn!(from = %from, "copy source is missing; skipping");
                    Ok(Step::Skipped(format!("'{}' is missing", from)))
                }
            },
            TaskAction::InvokeModel {
                model,
                inputs,
                target,
            } => {
                let inputs = self.render_inputs(inputs, context);
                let value = actions.invoke_model(&ActionRequest {
                    name: model,
                    inputs: &inputs,
                    context: &*context,
                })?;
                if let Some(target) = target {
                    store(context, target, value)?;
                }
                Ok(Step::Completed(None))
            }
            TaskAction::PostProcess {
                processor,
                inputs,
                target,
            } => {
                let inputs = self.render_inputs(inputs, context);
                let value = actions.post_process(&ActionRequest {
                    name: processor,
                    inputs: &inputs,
                    context: &*context,
                })?;
                if let Some(target) = target {
                    store(context, target, value)?;
                }
                Ok(Step::Completed(None))
            }
            TaskAction::Export { target } => self.export(target, state),
            TaskAction::SubWorkflow { workflow } => Err(MediaTaskError::ActionFailed(format!(
                "sub-workflow '{}' cannot run outside a task list",
                workflow
            ))),
        }
    }

    fn export(&self, name: &str, state: &mut RunState) -> Result<Step> {
        let target = self.config.exports.get(name).ok_or_else(|| {
            MediaTaskError::ExportFailed(format!("unknown export target '{}'", name))
        })?;

        let plan = plan_export(&self.engine, name, target, &state.context)?;
        if let Some(reason) = &plan.skipped {
            return Ok(Step::Skipped(reason.clone()));
        }

        let delivery = match plan.kind {
            ExportKind::Folder => &*self.folder_delivery,
            ExportKind::Http => self.http_delivery.as_deref().ok_or_else(|| {
                MediaTaskError::ExportFailed(format!(
                    "export '{}': no HTTP delivery is configured",
                    name
                ))
            })?,
        };
        let receipt = delivery.deliver(&plan)?;

        store(
            &mut state.context,
            &format!("exports.{}", name),
            Value::String(receipt.location.clone()),
        )?;
        self.notifier.notify(
            NotifyLevel::Success,
            &format!("exported '{}' to {}", name, receipt.location),
        );
        self.log(
            state,
            Event::new(EventAction::ExportDelivered)
                .with_task(name)
                .with_details(json!({
                    "source": plan.source.display().to_string(),
                    "location": receipt.location,
                })),
        );

        Ok(Step::Completed(Some(receipt.location)))
    }

    fn render_inputs(
        &self,
        inputs: &BTreeMap<String, String>,
        context: &Value,
    ) -> BTreeMap<String, String> {
        inputs
            .iter()
            .map(|(key, template)| (key.clone(), self.engine.render(template, context)))
            .collect()
    }

    fn record(
        &self,
        state: &mut RunState,
        name: &str,
        kind: &'static str,
        result: Result<Step>,
    ) {
        let (status, message) = match result {
            Ok(Step::Completed(note)) => (TaskStatus::Completed, note),
            Ok(Step::Skipped(reason)) => (TaskStatus::Skipped, Some(reason)),
            Err(e) => {
                self.notifier
                    .notify(NotifyLevel::Error, &format!("task '{}' failed: {}", name, e));
                if !self.config.continue_on_error {
                    state.halted = true;
                }
                (TaskStatus::Failed, Some(e.to_string()))
            }
        };

        tracing::debug!(task = %name, %status, "task finished");

        let action = match status {
            TaskStatus::Completed => EventAction::TaskCompleted,
            TaskStatus::Skipped => EventAction::TaskSkipped,
            TaskStatus::Failed => EventAction::TaskFailed,
        };
        let mut details = json!({ "action": kind });
        if let Some(message) = &message {
            details["message"] = json!(message);
        }
        self.log(state, Event::new(action).with_task(name).with_details(details));

        state
            .outcomes
            .push(TaskOutcome::new(name, kind, status, message));
    }

    /// Append to the run log. Failures are warned about once and kept.
    fn log(&self, state: &mut RunState, event: Event) {
        let Some(log) = &self.event_log else {
            return;
        };
        if let Err(e) = log.append(&event)
            && state.event_log_error.is_none()
        {
            tracing::warn!(path = %log.path().display(), error = %e, "cannot append to run log");
            state.event_log_error = Some(e.to_string());
        }
    }
}

fn store(context: &mut Value, path: &str, value: Value) -> Result<()> {
    if set_path(context, path, value) {
        Ok(())
    } else {
        Err(MediaTaskError::ActionFailed(format!(
            "cannot write '{}': a parent value is not an object",
            path
        )))
    }
}

fn count_status(outcomes: &[TaskOutcome], status: TaskStatus) -> usize {
    outcomes.iter().filter(|o| o.status == status).count()
}
