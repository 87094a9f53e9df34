//! Implementation of the `mediatask run` command.

use super::read_data;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{MediaTaskError, Result};
use crate::events::EventLog;
use crate::fs::atomic_write;
use crate::notify::TracingNotifier;
use crate::pipeline::{PipelineReport, PipelineRunner, TaskStatus};
use crate::template::TemplateEngine;

/// Run a pipeline and print a per-task summary.
///
/// Exit code 3 when a task action failed, 4 when the first failure was an
/// export.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let data = read_data(args.data.as_deref())?;

    let engine = TemplateEngine::new();
    for warning in config.template_warnings(&engine) {
        eprintln!("Warning: {}", warning);
    }

    let notifier = TracingNotifier;
    let mut runner = PipelineRunner::new(&config)
        .with_engine(engine)
        .with_notifier(&notifier)
        .dry_run(args.dry_run);
    if let Some(path) = &args.events {
        runner = runner.with_event_log(EventLog::new(path));
    }

    let report = runner.run(&data);
    print_report(&report);
    if let Some(err) = &report.event_log_error {
        eprintln!("Warning: run log is incomplete: {}", err);
    }

    if args.print_context || args.output.is_some() {
        let json = serde_json::to_string_pretty(&report.context).map_err(|e| {
            MediaTaskError::UserError(format!("failed to serialize context: {}", e))
        })?;
        if args.print_context {
            println!("{}", json);
        }
        if let Some(path) = &args.output {
            atomic_write(path, format!("{}\n", json).as_bytes()).map_err(|e| {
                MediaTaskError::UserError(format!(
                    "failed to write context to '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
    }

    match report.failure() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn print_report(report: &PipelineReport) {
    if report.dry_run {
        println!("Dry run: no models, post-processors, or exports were invoked.");
    }

    for outcome in &report.outcomes {
        let marker = match outcome.status {
            TaskStatus::Completed => "ok",
            TaskStatus::Skipped => "skip",
            TaskStatus::Failed => "FAIL",
        };
        match &outcome.message {
            Some(message) => println!(
                "  [{:<4}] {} ({}): {}",
                marker, outcome.name, outcome.action, message
            ),
            None => println!("  [{:<4}] {} ({})", marker, outcome.name, outcome.action),
        }
    }

    println!();
    println!("{}", report.summary());
    if report.stopped_early {
        println!("Run stopped at the first failure (set continue_on_error to keep going).");
    }
}
