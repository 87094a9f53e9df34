//! Per-task outcomes and the run report.

use crate::error::MediaTaskError;
use serde::Serialize;
use serde_json::Value;

/// Final state of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Skipped,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    /// Task name. Tasks inside sub-workflows are prefixed: `parent/child`.
    pub name: String,
    /// Action kind, e.g. `template` or `export`.
    pub action: &'static str,
    pub status: TaskStatus,
    /// Skip reason, failure message, or a short note (export location).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskOutcome {
    pub(crate) fn new(
        name: impl Into<String>,
        action: &'static str,
        status: TaskStatus,
        message: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            action,
            status,
            message,
        }
    }
}

/// Result of running a pipeline against one data context.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Outcomes in execution order.
    pub outcomes: Vec<TaskOutcome>,
    /// Working context after the last task ran.
    pub context: Value,
    /// The run stopped at a failed task instead of reaching the end.
    pub stopped_early: bool,
    pub dry_run: bool,
    /// First failure to append to the run log. Later events were dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log_error: Option<String>,
}

impl PipelineReport {
    /// True when no task failed.
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == TaskStatus::Failed)
    }

    /// Error describing the run's failures, if any.
    ///
    /// An export failure maps to [`MediaTaskError::ExportFailed`] when it is
    /// the first failure; anything else maps to
    /// [`MediaTaskError::ActionFailed`].
    pub fn failure(&self) -> Option<MediaTaskError> {
        let first = self.failed().next()?;
        let count = self.count(TaskStatus::Failed);
        let msg = format!("{} task(s) failed, first was '{}'", count, first.name);

        if first.action == "export" {
            Some(MediaTaskError::ExportFailed(msg))
        } else {
            Some(MediaTaskError::ActionFailed(msg))
        }
    }

    /// One-line tally, e.g. `3 completed, 1 skipped, 0 failed`.
    pub fn summary(&self) -> String {
        format!(
            "{} completed, {} skipped, {} failed",
            self.count(TaskStatus::Completed),
            self.count(TaskStatus::Skipped),
            self.count(TaskStatus::Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use serde_json::json;

    fn report(outcomes: Vec<TaskOutcome>) -> PipelineReport {
        PipelineReport {
            outcomes,
            context: json!({}),
            stopped_early: false,
            dry_run: false,
            event_log_error: None,
        }
    }

    #[test]
    fn empty_report_is_success() {
        let report = report(Vec::new());
        assert!(report.is_success());
        assert!(report.failure().is_none());
        assert_eq!(report.summary(), "0 completed, 0 skipped, 0 failed");
    }

    #[test]
    fn skipped_tasks_do_not_fail_the_run() {
        let report = report(vec![
            TaskOutcome::new("a", "template", TaskStatus::Completed, None),
            TaskOutcome::new("b", "copy", TaskStatus::Skipped, Some("missing".into())),
        ]);
        assert!(report.is_success());
        assert_eq!(report.summary(), "1 completed, 1 skipped, 0 failed");
        assert_eq!(report.outcome("b").unwrap().status, TaskStatus::Skipped);
    }

    #[test]
    fn failure_maps_first_failed_action() {
        let report = report(vec![
            TaskOutcome::new("ship", "export", TaskStatus::Failed, Some("boom".into())),
            TaskOutcome::new("caption", "invoke_model", TaskStatus::Failed, None),
        ]);
        let err = report.failure().unwrap();
        assert_eq!(err.exit_code(), exit_codes::EXPORT_FAILURE);
        assert!(err.to_string().contains("2 task(s) failed, first was 'ship'"));

        let report = PipelineReport {
            outcomes: report.outcomes.into_iter().rev().collect(),
            ..report
        };
        assert_eq!(report.failure().unwrap().exit_code(), exit_codes::ACTION_FAILURE);
    }

    #[test]
    fn status_serializes_snake_case() {
        let outcome = TaskOutcome::new("a", "copy", TaskStatus::Skipped, None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert!(json.get("message").is_none());
    }
}
