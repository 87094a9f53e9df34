//! Condition trees that gate task execution.
//!
//! Conditions are persisted as JSON (or YAML) in this shape:
//!
//! ```json
//! { "and": [
//!     { "where": { "data": "kind" }, "equals": { "value": "portrait" } },
//!     { "or": [
//!         { "where": { "data": "meta.upscaled" }, "equals": { "value": false } },
//!         { "where": { "data": "width" }, "equals": { "value": 512 } }
//!     ] }
//! ] }
//! ```
//!
//! A leaf looks up its field path inside the named source object of the data
//! context and compares it with the expected literal using strict equality.
//! Literals are typed when the condition is authored (see
//! [`LeafCondition::authored`]); evaluation never re-parses strings.
//!
//! Evaluation is total. Shapes that cannot be understood parse into
//! [`ConditionNode::Malformed`], which evaluates to `false` so a broken
//! condition keeps its task from running.

mod evaluate;
mod node;


pub use evaluate::{evaluate_condition, evaluate_condition_value};
pub use node::{ConditionError, ConditionNode, LeafCondition, parse_condition};
