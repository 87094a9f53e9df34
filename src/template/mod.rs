//! Template engine for export filenames, destinations, and task values.
//!
//! Templates embed `{{path|pipe|pipe}}` placeholders in literal text:
//!
//! ```text
//! {{workflow}}/{{tags|lowercase|snakecase}}_{{seed}}
//! ```
//!
//! - `path` is a dot-separated lookup into the data context (`a.b.c`)
//! - each pipe is a named transformation applied left to right
//! - everything outside `{{...}}` is copied verbatim
//!
//! Rendering is total: missing fields become the empty string, unknown pipes
//! are logged and skipped, and malformed placeholders stay literal text.

mod engine;
mod pipes;

pub use engine::{Placeholder, TemplateEngine, render_template};
pub use pipes::{BUILTIN_PIPES, PipeFn, PipeRegistry, PipeValue};
