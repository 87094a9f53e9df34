//! Placeholder scanning and rendering.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

use super::pipes::{PipeFn, PipeRegistry, PipeValue};
use crate::value::resolve_path;

/// Matches `{{` up to the next `}}`. No nesting, no escapes.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("Invalid placeholder regex"));

static DEFAULT_ENGINE: LazyLock<TemplateEngine> = LazyLock::new(TemplateEngine::new);

/// A parsed `{{path|pipe...}}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Dot-separated data path (may be empty).
    pub path: String,
    /// Pipe names in application order.
    pub pipes: Vec<String>,
}

impl Placeholder {
    /// Parse the text between `{{` and `}}`.
    ///
    /// Segments are split on `|` and trimmed; empty pipe segments are dropped.
    pub fn parse(body: &str) -> Self {
        let mut segments = body.split('|').map(str::trim);
        let path = segments.next().unwrap_or_default().to_string();
        let pipes = segments
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { path, pipes }
    }
}

/// Renders templates against JSON data contexts.
///
/// The engine is immutable once built and safe to share between threads.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    pipes: PipeRegistry,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine with the built-in pipes.
    pub fn new() -> Self {
        Self::with_registry(PipeRegistry::builtin())
    }

    /// Create an engine using a custom pipe registry.
    pub fn with_registry(pipes: PipeRegistry) -> Self {
        Self { pipes }
    }

    pub fn pipes(&self) -> &PipeRegistry {
        &self.pipes
    }

    /// Register an additional pipe (or replace a built-in one).
    pub fn register_pipe(&mut self, name: impl Into<String>, pipe: PipeFn) {
        self.pipes.register(name, pipe);
    }

    /// Render `template` against `data`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediatask::template::TemplateEngine;
    /// use serde_json::json;
    ///
    /// let engine = TemplateEngine::new();
    /// let data = json!({"workflow": "sdxl", "tags": ["Red", "Fox"], "seed": 42});
    /// let name = engine.render("{{workflow}}/{{tags|snakecase}}_{{seed}}", &data);
    /// assert_eq!(name, "sdxl/Red_Fox_42");
    /// ```
    pub fn render(&self, template: &str, data: &Value) -> String {
        PLACEHOLDER_REGEX
            .replace_all(template, |caps: &Captures| {
                self.render_placeholder(&caps[1], data)
            })
            .into_owned()
    }

    fn render_placeholder(&self, body: &str, data: &Value) -> String {
        let placeholder = Placeholder::parse(body);

        let Some(mut value) =
            resolve_path(data, &placeholder.path).and_then(PipeValue::from_value)
        else {
            return String::new();
        };

        for pipe in &placeholder.pipes {
            value = self.pipes.apply(pipe, value);
        }

        value.into_output()
    }

    /// All placeholders in `template`, in order of appearance.
    pub fn placeholders(template: &str) -> Vec<Placeholder> {
        PLACEHOLDER_REGEX
            .captures_iter(template)
            .map(|caps| Placeholder::parse(&caps[1]))
            .collect()
    }

    /// Pipe names used in `template` that this engine does not know.
    pub fn unknown_pipes(&self, template: &str) -> Vec<String> {
        let mut unknown: Vec<String> = Self::placeholders(template)
            .into_iter()
            .flat_map(|p| p.pipes)
            .filter(|name| !self.pipes.contains(name))
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }
}

/// Render `template` with the process-wide default engine.
///
/// ```
/// use mediatask::template::render_template;
/// use serde_json::json;
///
/// let out = render_template("{{tags|camelcase}}.png", &json!({"tags": ["Hello", "World"]}));
/// assert_eq!(out, "helloWorld.png");
/// ```
pub fn render_template(template: &str, data: &Value) -> String {
    DEFAULT_ENGINE.render(template, data)
}
