//! Tests for the pipeline runner.

use super::*;
use crate::config::Config;
use crate::error::{MediaTaskError, Result};
use crate::events::{EventAction, EventLog};
use crate::exit_codes;
use crate::export::{DeliveryReceipt, ExportDelivery, ExportPlan};
use crate::notify::{NotifyLevel, RecordingNotifier, SilentNotifier};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Returns canned outputs and remembers every call.
#[derive(Default)]
struct StubActions {
    outputs: BTreeMap<String, Value>,
    failing: Vec<String>,
    calls: RefCell<Vec<(String, BTreeMap<String, String>)>>,
}

impl StubActions {
    fn with_output(mut self, name: &str, value: Value) -> Self {
        self.outputs.insert(name.to_string(), value);
        self
    }

    fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    fn call(&self, request: &ActionRequest<'_>) -> Result<Value> {
        self.calls
            .borrow_mut()
            .push((request.name.to_string(), request.inputs.clone()));
        if self.failing.iter().any(|n| n == request.name) {
            return Err(MediaTaskError::ActionFailed(format!(
                "'{}' blew up",
                request.name
            )));
        }
        Ok(self.outputs.get(request.name).cloned().unwrap_or(Value::Null))
    }

    fn call_names(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl ActionRunner for StubActions {
    fn invoke_model(&self, request: &ActionRequest<'_>) -> Result<Value> {
        self.call(request)
    }

    fn post_process(&self, request: &ActionRequest<'_>) -> Result<Value> {
        self.call(request)
    }
}

/// Accepts every plan without touching the network.
#[derive(Default)]
struct RecordingDelivery {
    plans: Mutex<Vec<ExportPlan>>,
}

impl ExportDelivery for RecordingDelivery {
    fn deliver(&self, plan: &ExportPlan) -> Result<DeliveryReceipt> {
        self.plans.lock().unwrap().push(plan.clone());
        Ok(DeliveryReceipt {
            location: format!("{}/{}", plan.destination, plan.filename),
        })
    }
}

fn statuses(report: &PipelineReport) -> Vec<(&str, TaskStatus)> {
    report
        .outcomes
        .iter()
        .map(|o| (o.name.as_str(), o.status))
        .collect()
}

#[test]
fn test_template_results_feed_later_tasks() {
    let config = Config::from_yaml(
        r#"
tasks:
  - name: slug
    action: { type: template, template: "{{tags|snakecase}}", target: slug }
  - name: title
    action: { type: template, template: "{{slug|uppercase}}-{{seed}}", target: meta.title }
"#,
    )
    .unwrap();
    let data = json!({"tags": ["red", "fox"], "seed": 7});

    let report = PipelineRunner::new(&config).run(&data);

    assert!(report.is_success());
    assert_eq!(report.context["slug"], "red_fox");
    assert_eq!(report.context["meta"]["title"], "RED_FOX-7");
    // Input is never mutated
    assert!(data.get("slug").is_none());
}

#[test]
fn test_conditions_gate_tasks() {
    let config = Config::from_yaml(
        r#"
tasks:
  - name: mark
    action: { type: template, template: "yes", target: flags.portrait }
  - name: when-portrait
    when: { and: [ { where: { flags: portrait }, equals: { value: "yes" } } ] }
    action: { type: template, template: "tall", target: shape }
  - name: when-landscape
    when: { or: [ { where: { data: kind }, equals: { value: landscape } } ] }
    action: { type: template, template: "wide", target: shape }
"#,
    )
    .unwrap();
    let data = json!({"data": {"kind": "portrait"}});

    let report = PipelineRunner::new(&config).run(&data);

    assert_eq!(
        statuses(&report),
        vec![
            ("mark", TaskStatus::Completed),
            ("when-portrait", TaskStatus::Completed),
            ("when-landscape", TaskStatus::Skipped),
        ]
    );
    assert_eq!(report.context["shape"], "tall");
    assert_eq!(
        report.outcome("when-landscape").unwrap().message.as_deref(),
        Some("condition not met")
    );
}

#[test]
fn test_malformed_condition_built_in_code_skips_task() {
    let mut config = Config::from_yaml(
        r#"
tasks:
  - name: gated
    action: { type: template, template: "x", target: out }
"#,
    )
    .unwrap();
    config.tasks[0].when = Some(crate::condition::ConditionNode::from_value(&json!(
        {"where": {"data": "kind"}}
    )));

    let report = PipelineRunner::new(&config).run(&json!({}));
    assert_eq!(report.outcomes[0].status, TaskStatus::Skipped);
    assert!(report.context.get("out").is_none());
}

#[test]
fn test_copy_and_missing_source() {
    let config = Config::from_yaml(
        r#"
tasks:
  - name: keep-seed
    action: { type: copy, from: params.seed, to: outputs.seed }
  - name: keep-missing
    action: { type: copy, from: params.cfg, to: outputs.cfg }
"#,
    )
    .unwrap();

    let report = PipelineRunner::new(&config)
        .run(&json!({"params": {"seed": 1234}}));

    assert!(report.is_success());
    assert_eq!(report.context["outputs"]["seed"], 1234);
    let missing = report.outcome("keep-missing").unwrap();
    assert_eq!(missing.status, TaskStatus::Skipped);
    assert_eq!(missing.message.as_deref(), Some("'params.cfg' is missing"));
}

#[test]
fn test_model_inputs_rendered_and_output_stored() {
    let config = Config::from_yaml(
        r#"
models:
  captioner: { command: "caption {{file}}" }
post_processors:
  upscale: { command: "upscale {{file}}" }
tasks:
  - name: caption
    action:
      type: invoke_model
      model: captioner
      inputs: { prompt: "{{tags|join-by-spaces}}" }
      target: outputs.caption
  - name: upscale
    action: { type: post_process, processor: upscale, inputs: { scale: "2" } }
"#,
    )
    .unwrap();
    let actions = StubActions::default()
        .with_output("captioner", json!("a red fox"))
        .with_output("upscale", json!({"ignored": true}));

    let report = PipelineRunner::new(&config)
        .with_actions(&actions)
        .run(&json!({"file": "a.png", "tags": ["red", "fox"]}));

    assert!(report.is_success());
    assert_eq!(report.context["outputs"]["caption"], "a red fox");
    assert!(report.context.get("ignored").is_none());

    let calls = actions.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "captioner");
    assert_eq!(calls[0].1["prompt"], "red fox");
    assert_eq!(calls[1].1["scale"], "2");
}

#[test]
fn test_failure_stops_the_run() {
    let config = Config::from_yaml(
        r#"
models:
  captioner: { command: "caption" }
tasks:
  - name: caption
    action: { type: invoke_model, model: captioner }
  - name: after
    action: { type: template, template: "x", target: after }
"#,
    )
    .unwrap();
    let actions = StubActions::default().failing("captioner");
    let notifier = RecordingNotifier::new();

    let report = PipelineRunner::new(&config)
        .with_actions(&actions)
        .with_notifier(&notifier)
        .run(&json!({}));

    assert!(!report.is_success());
    assert!(report.stopped_early);
    assert_eq!(statuses(&report), vec![("caption", TaskStatus::Failed)]);
    assert!(
        report.outcomes[0]
            .message
            .as_deref()
            .unwrap()
            .contains("'captioner' blew up")
    );
    assert_eq!(
        report.failure().unwrap().exit_code(),
        exit_codes::ACTION_FAILURE
    );

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, NotifyLevel::Error);
    assert!(messages[0].1.contains("task 'caption' failed"));
}

#[test]
fn test_continue_on_error_runs_remaining_tasks() {
    let config = Config::from_yaml(
        r#"
continue_on_error: true
models:
  captioner: { command: "caption" }
tasks:
  - name: caption
    action: { type: invoke_model, model: captioner }
  - name: after
    action: { type: template, template: "x", target: after }
"#,
    )
    .unwrap();
    let actions = StubActions::default().failing("captioner");

    let report = PipelineRunner::new(&config)
        .with_actions(&actions)
        .run(&json!({}));

    assert!(!report.stopped_early);
    assert_eq!(
        statuses(&report),
        vec![
            ("caption", TaskStatus::Failed),
            ("after", TaskStatus::Completed)
        ]
    );
    assert_eq!(report.context["after"], "x");
}

#[test]
fn test_sub_workflow_shares_context_and_prefixes_names() {
    let config = Config::from_yaml(
        r#"
workflows:
  tidy:
    - name: lower
      action: { type: template, template: "{{tags|lowercase|join-by-spaces}}", target: tag_line }
tasks:
  - name: cleanup
    action: { type: sub_workflow, workflow: tidy }
  - name: use-it
    action: { type: template, template: "[{{tag_line}}]", target: label }
"#,
    )
    .unwrap();

    let report = PipelineRunner::new(&config)
        .run(&json!({"tags": ["Red", "FOX"]}));

    assert_eq!(
        statuses(&report),
        vec![
            ("cleanup/lower", TaskStatus::Completed),
            ("cleanup", TaskStatus::Completed),
            ("use-it", TaskStatus::Completed),
        ]
    );
    assert_eq!(report.context["label"], "[red fox]");
}

#[test]
fn test_sub_workflow_failure_fails_parent() {
    let config = Config::from_yaml(
        r#"
models:
  m: { command: "m" }
workflows:
  inner:
    - name: boom
      action: { type: invoke_model, model: m }
tasks:
  - name: outer
    action: { type: sub_workflow, workflow: inner }
"#,
    )
    .unwrap();
    let actions = StubActions::default().failing("m");

    let report = PipelineRunner::new(&config)
        .with_actions(&actions)
        .run(&json!({}));

    assert_eq!(
        statuses(&report),
        vec![
            ("outer/boom", TaskStatus::Failed),
            ("outer", TaskStatus::Failed)
        ]
    );
}

#[test]
fn test_sub_workflow_depth_limit() {
    let config = Config::from_yaml(
        r#"
max_workflow_depth: 1
workflows:
  first:
    - name: go-deeper
      action: { type: sub_workflow, workflow: second }
  second:
    - name: leaf
      action: { type: template, template: "x", target: reached }
tasks:
  - name: start
    action: { type: sub_workflow, workflow: first }
"#,
    )
    .unwrap();

    let report = PipelineRunner::new(&config).run(&json!({}));

    assert!(report.context.get("reached").is_none());
    let deeper = report.outcome("start/go-deeper").unwrap();
    assert_eq!(deeper.status, TaskStatus::Failed);
    assert!(
        deeper
            .message
            .as_deref()
            .unwrap()
            .contains("exceeds max_workflow_depth (1)")
    );
    assert_eq!(report.outcome("start").unwrap().status, TaskStatus::Failed);
}

#[test]
fn test_dry_run_skips_side_effects() {
    let config = Config::from_yaml(
        r#"
models:
  captioner: { command: "caption" }
exports:
  archive: { destination: /nonexistent/out }
tasks:
  - name: slug
    action: { type: template, template: "{{seed}}", target: slug }
  - name: caption
    action: { type: invoke_model, model: captioner, target: caption }
  - name: archive
    action: { type: export, target: archive }
"#,
    )
    .unwrap();
    let actions = StubActions::default();

    let report = PipelineRunner::new(&config)
        .with_actions(&actions)
        .dry_run(true)
        .run(&json!({"seed": 5, "file": "/renders/a.png"}));

    assert!(report.dry_run);
    assert!(report.is_success());
    assert_eq!(report.context["slug"], "5");
    assert!(actions.call_names().is_empty());
    assert_eq!(
        report.outcome("archive").unwrap().message.as_deref(),
        Some("dry run: export not performed")
    );
}

fn export_config(extra: &str) -> Config {
    Config::from_yaml(&format!(
        r#"
exports:
  archive:
    destination: "{{{{out}}}}/{{{{workflow}}}}"
    filename: "{{{{tags|snakecase}}}}_{{{{seed}}}}"
    {}
tasks:
  - name: archive
    action: {{ type: export, target: archive }}
  - name: announce
    action: {{ type: template, template: "saved to {{{{exports.archive}}}}", target: note }}
"#,
        extra
    ))
    .unwrap()
}

#[test]
fn test_folder_export_delivers_and_records_location() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("0001.png");
    fs::write(&source, b"png").unwrap();
    let out = temp.path().join("gallery");

    let config = export_config("");
    let notifier = RecordingNotifier::new();
    let data = json!({
        "file": source.display().to_string(),
        "out": out.display().to_string(),
        "workflow": "portraits",
        "tags": ["red", "fox"],
        "seed": 42,
    });

    let report = PipelineRunner::new(&config)
        .with_notifier(&notifier)
        .run(&data);

    assert!(report.is_success(), "{:?}", report.outcomes);
    let expected = out.join("portraits").join("red_fox_42.png");
    assert_eq!(fs::read(&expected).unwrap(), b"png");
    assert_eq!(
        report.context["exports"]["archive"],
        expected.display().to_string()
    );
    assert_eq!(
        report.context["note"],
        format!("saved to {}", expected.display())
    );
    assert!(
        notifier
            .messages()
            .iter()
            .any(|(level, msg)| *level == NotifyLevel::Success && msg.contains("red_fox_42.png"))
    );
}

#[test]
fn test_export_include_globs_skip() {
    let config = export_config(r#"include_globs: ["*.webp"]"#);
    let data = json!({"file": "/renders/0001.png", "out": "/tmp", "workflow": "w", "seed": 1});

    let report = PipelineRunner::new(&config).run(&data);

    let archive = report.outcome("archive").unwrap();
    assert_eq!(archive.status, TaskStatus::Skipped);
    assert!(archive.message.as_deref().unwrap().contains("include globs"));
}

#[test]
fn test_export_failure_maps_to_export_exit_code() {
    let temp = TempDir::new().unwrap();
    let config = export_config("");
    let data = json!({
        "file": temp.path().join("missing.png").display().to_string(),
        "out": temp.path().display().to_string(),
        "workflow": "w",
        "seed": 1,
    });

    let report = PipelineRunner::new(&config).run(&data);

    assert_eq!(report.outcome("archive").unwrap().status, TaskStatus::Failed);
    assert_eq!(
        report.failure().unwrap().exit_code(),
        exit_codes::EXPORT_FAILURE
    );
}

#[test]
fn test_http_export_requires_delivery() {
    let config = Config::from_yaml(
        r#"
exports:
  hook: { kind: http, destination: "https://example.com/upload", filename: "{{seed}}" }
tasks:
  - name: push
    action: { type: export, target: hook }
"#,
    )
    .unwrap();
    let data = json!({"file": "/renders/a.png", "seed": 9});

    let report = PipelineRunner::new(&config).run(&data);
    let push = report.outcome("push").unwrap();
    assert_eq!(push.status, TaskStatus::Failed);
    assert!(
        push.message
            .as_deref()
            .unwrap()
            .contains("no HTTP delivery is configured")
    );

    let delivery = RecordingDelivery::default();
    let report = PipelineRunner::new(&config)
        .with_http_delivery(&delivery)
        .run(&data);

    assert!(report.is_success());
    assert_eq!(
        report.context["exports"]["hook"],
        "https://example.com/upload/9.png"
    );
    let plans = delivery.plans.lock().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].filename, "9.png");
}

#[test]
fn test_event_log_records_run() {
    let temp = TempDir::new().unwrap();
    let log = EventLog::new(temp.path().join("run.ndjson"));
    let config = Config::from_yaml(
        r#"
tasks:
  - name: a
    action: { type: template, template: "x", target: a }
  - name: b
    when: { or: [] }
    action: { type: template, template: "y", target: b }
"#,
    )
    .unwrap();

    PipelineRunner::new(&config)
        .with_event_log(log.clone())
        .run(&json!({}));

    let actions: Vec<EventAction> = log.read_all().unwrap().iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            EventAction::RunStarted,
            EventAction::TaskCompleted,
            EventAction::TaskSkipped,
            EventAction::RunFinished,
        ]
    );
    let events = log.read_all().unwrap();
    assert_eq!(events[1].task.as_deref(), Some("a"));
    assert_eq!(events[1].details["action"], "template");
    assert_eq!(events[3].details["completed"], 1);
}

#[test]
fn test_unwritable_event_log_does_not_stop_run() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    fs::write(&blocker, b"file").unwrap();
    let log = EventLog::new(blocker.join("run.ndjson"));
    let config = Config::from_yaml(
        r#"
tasks:
  - name: first
    action: { type: template, template: "one", target: first }
  - name: second
    action: { type: template, template: "{{first}}-two", target: second }
"#,
    )
    .unwrap();

    let report = PipelineRunner::new(&config)
        .with_notifier(&SilentNotifier)
        .with_event_log(log)
        .run(&json!({}));

    assert!(report.is_success());
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.context["second"], "one-two");
    assert!(report.event_log_error.is_some());
}
