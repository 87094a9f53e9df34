//! Task pipeline execution.
//!
//! A pipeline is the ordered `tasks` list of a [`Config`](crate::config::Config).
//! [`PipelineRunner`] walks it against a working copy of the data context:
//!
//! 1. Evaluate the task's `when` condition; false skips the task.
//! 2. Dispatch the action. Template and copy actions run in-process; models,
//!    post-processors, and exports go through the [`ActionRunner`] and
//!    [`ExportDelivery`](crate::export::ExportDelivery) seams.
//! 3. Write produced values back into the context so later tasks (and their
//!    conditions) can see them.
//!
//! Every task yields a [`TaskOutcome`]; the run yields a [`PipelineReport`].

mod actions;
mod outcome;
mod runner;

#[cfg(test)]
mod tests;

pub use actions::{ActionRequest, ActionRunner, CommandActionRunner};
pub use outcome::{PipelineReport, TaskOutcome, TaskStatus};
pub use runner::PipelineRunner;
