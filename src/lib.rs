//! Mediatask: templates, conditions, and task pipelines for generated media.
//!
//! The library is organised around three pieces:
//!
//! - [`template`] renders `{{path|pipe}}` templates against a JSON data context
//! - [`condition`] evaluates persisted and/or/leaf condition trees
//! - [`pipeline`] runs configured tasks (templates, copies, model calls,
//!   post-processors, sub-workflows, exports) gated by those conditions
//!
//! The `mediatask` binary exposes them through the [`cli`] and [`commands`]
//! modules.

pub mod cli;
pub mod commands;
pub mod condition;
pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod export;
pub mod fs;
pub mod notify;
pub mod pipeline;
pub mod template;
pub mod value;
