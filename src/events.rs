//! Run log for pipeline executions.
//!
//! This module implements an append-only run log. Events are stored in NDJSON
//! format (one JSON object per line) in a file chosen by the caller, for
//! example with `mediatask run --events run.ndjson`.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: What happened (run_started, task_completed, export_delivered, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `task`: Optional task name for task-specific events
//! - `details`: Freeform object with action-specific details
//!
//! # Usage
//!
//! ```no_run
//! use mediatask::events::{Event, EventAction, EventLog};
//! use serde_json::json;
//!
//! let log = EventLog::new("run.ndjson");
//! let event = Event::new(EventAction::TaskCompleted)
//!     .with_task("caption")
//!     .with_details(json!({"action": "invoke_model"}));
//! log.append(&event)?;
//! # Ok::<(), mediatask::error::MediaTaskError>(())
//! ```

use crate::error::{MediaTaskError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Pipeline run started
    RunStarted,
    /// Task action finished
    TaskCompleted,
    /// Task condition was false, or the action was not performed
    TaskSkipped,
    /// Task action returned an error
    TaskFailed,
    /// Export target received the file
    ExportDelivered,
    /// Pipeline run finished
    RunFinished,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::RunStarted => write!(f, "run_started"),
            EventAction::TaskCompleted => write!(f, "task_completed"),
            EventAction::TaskSkipped => write!(f, "task_skipped"),
            EventAction::TaskFailed => write!(f, "task_failed"),
            EventAction::ExportDelivered => write!(f, "export_delivered"),
            EventAction::RunFinished => write!(f, "run_finished"),
        }
    }
}

/// An event record for the run log.
///
/// Events are serialized as single-line JSON objects and appended to
/// the log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who ran the pipeline (e.g., `user@HOST`).
    pub actor: String,

    /// Optional task name for task-specific events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            task: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the task name for this event.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            MediaTaskError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// An NDJSON file that events are appended to.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event as one JSON line.
    ///
    /// The file and its parent directory are created if they don't exist.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Event was successfully appended
    /// * `Err(MediaTaskError::UserError)` - Serialization or write failed
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| {
                MediaTaskError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                MediaTaskError::UserError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            MediaTaskError::UserError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            MediaTaskError::UserError(format!(
                "failed to sync events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Read every event back, in order.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            MediaTaskError::UserError(format!(
                "failed to read events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    MediaTaskError::UserError(format!(
                        "invalid event on line {} of '{}': {}",
                        i + 1,
                        self.path.display(),
                        e
                    ))
                })
            })
            .collect()
    }
}
