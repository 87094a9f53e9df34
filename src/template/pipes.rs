//! Named pipe transformations.
//!
//! A pipe maps a [`PipeValue`] to a [`PipeValue`]. Pipes are plain function
//! pointers held in a [`PipeRegistry`]; adding a pipe means inserting one more
//! entry. Every pipe is total: a shape it does not handle is returned as is.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::value::to_display_string;

/// A value flowing through a placeholder's pipe chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeValue {
    /// A single string.
    Text(String),
    /// A list of strings (from an array field or `split-by-spaces`).
    List(Vec<String>),
}

impl PipeValue {
    /// Build a pipe value from a resolved data value.
    ///
    /// Arrays become lists (non-string elements are stringified); every other
    /// value becomes text. `null` yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(PipeValue::List(
                items.iter().map(to_display_string).collect(),
            )),
            other => Some(PipeValue::Text(to_display_string(other))),
        }
    }

    /// Final text of a rendered placeholder.
    ///
    /// Lists are concatenated with no separator; a pipe chain that needs a
    /// separator has to end in a joining pipe.
    pub fn into_output(self) -> String {
        match self {
            PipeValue::Text(text) => text,
            PipeValue::List(items) => items.concat(),
        }
    }
}

/// Signature shared by every pipe.
pub type PipeFn = fn(PipeValue) -> PipeValue;

/// Pipes available in every default engine.
pub const BUILTIN_PIPES: &[(&str, PipeFn)] = &[
    ("split-by-spaces", split_by_spaces),
    ("snakecase", snakecase),
    ("camelcase", camelcase),
    ("kebabcase", kebabcase),
    ("titlecase", titlecase),
    ("join-by-spaces", join_by_spaces),
    ("lowercase", lowercase),
    ("uppercase", uppercase),
];

/// Lookup table from pipe name to transformation.
#[derive(Debug, Clone, Default)]
pub struct PipeRegistry {
    pipes: BTreeMap<String, PipeFn>,
}

impl PipeRegistry {
    /// A registry with no pipes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding [`BUILTIN_PIPES`].
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, pipe) in BUILTIN_PIPES {
            registry.register(*name, *pipe);
        }
        registry
    }

    /// Insert or replace a pipe. Returns the pipe previously registered
    /// under `name`, if any.
    pub fn register(&mut self, name: impl Into<String>, pipe: PipeFn) -> Option<PipeFn> {
        self.pipes.insert(name.into(), pipe)
    }

    pub fn get(&self, name: &str) -> Option<PipeFn> {
        self.pipes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipes.contains_key(name)
    }

    /// Registered pipe names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipes.keys().map(String::as_str)
    }

    /// Apply the named pipe. Unknown names log a warning and return the value
    /// unchanged.
    pub fn apply(&self, name: &str, value: PipeValue) -> PipeValue {
        match self.get(name) {
            Some(pipe) => pipe(value),
            None => {
                tracing::warn!(pipe = name, "unknown template pipe; value passed through");
                value
            }
        }
    }
}

fn split_by_spaces(value: PipeValue) -> PipeValue {
    match value {
        PipeValue::Text(text) => {
            PipeValue::List(text.split_whitespace().map(str::to_string).collect())
        }
        list => list,
    }
}

fn snakecase(value: PipeValue) -> PipeValue {
    join_list(value, "_")
}

fn kebabcase(value: PipeValue) -> PipeValue {
    join_list(value, "-")
}

fn join_by_spaces(value: PipeValue) -> PipeValue {
    join_list(value, " ")
}

fn camelcase(value: PipeValue) -> PipeValue {
    match value {
        PipeValue::List(items) => {
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                if i == 0 {
                    out.push_str(&item.to_lowercase());
                } else {
                    out.push_str(&capitalize(&item.to_lowercase()));
                }
            }
            PipeValue::Text(out)
        }
        text => text,
    }
}

fn titlecase(value: PipeValue) -> PipeValue {
    match value {
        PipeValue::List(items) => PipeValue::Text(
            items
                .iter()
                .map(|item| capitalize(item))
                .collect::<Vec<_>>()
                .join(" "),
        ),
        text => text,
    }
}

fn lowercase(value: PipeValue) -> PipeValue {
    match value {
        PipeValue::Text(text) => PipeValue::Text(text.to_lowercase()),
        PipeValue::List(items) => {
            PipeValue::List(items.iter().map(|s| s.to_lowercase()).collect())
        }
    }
}

fn uppercase(value: PipeValue) -> PipeValue {
    match value {
        PipeValue::Text(text) => PipeValue::Text(text.to_uppercase()),
        PipeValue::List(items) => {
            PipeValue::List(items.iter().map(|s| s.to_uppercase()).collect())
        }
    }
}

fn join_list(value: PipeValue, separator: &str) -> PipeValue {
    match value {
        PipeValue::List(items) => PipeValue::Text(items.join(separator)),
        text => text,
    }
}

/// Uppercase the first character, keep the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
