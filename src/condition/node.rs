//! Condition node types and their persisted JSON shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::value::coerce_to_comparable;

/// Error returned by [`ConditionNode::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed condition at {path}: {reason}")]
pub struct ConditionError {
    /// Location of the node, e.g. `and[1].or[0]` (`(root)` for the top node).
    pub path: String,
    /// What is wrong with it.
    pub reason: String,
}

/// One node of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ConditionNode {
    /// True iff every child is true. Empty is true.
    And(Vec<ConditionNode>),
    /// True iff any child is true. Empty is false.
    Or(Vec<ConditionNode>),
    /// A single field comparison.
    Leaf(LeafCondition),
    /// A node whose shape was not understood. Always false.
    Malformed {
        /// Why parsing rejected the node.
        reason: String,
        /// The original JSON, kept so it serializes back unchanged.
        raw: Value,
    },
}

/// `{ "where": { <source>: <field> }, "equals": { "value": <expected> } }`
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCondition {
    /// Name of the sub-object of the data context to look in.
    pub source: String,
    /// Dot-separated path inside `source`.
    pub field: String,
    /// Literal the resolved value must equal.
    pub expected: Value,
}

impl LeafCondition {
    pub fn new(
        source: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Self {
        Self {
            source: source.into(),
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Build a leaf from free text typed into a condition builder.
    ///
    /// `"true"`/`"false"` become booleans and numeric text becomes a number, so
    /// the persisted literal is already typed when it is evaluated.
    ///
    /// ```
    /// use mediatask::condition::LeafCondition;
    /// use serde_json::json;
    ///
    /// let leaf = LeafCondition::authored("data", "steps", "30");
    /// assert_eq!(leaf.expected, json!(30));
    /// ```
    pub fn authored(source: impl Into<String>, field: impl Into<String>, raw: &str) -> Self {
        Self::new(source, field, coerce_to_comparable(raw))
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self, String> {
        let where_obj = match map.get("where") {
            Some(Value::Object(w)) => w,
            Some(_) => return Err("`where` must be an object".to_string()),
            None => return Err("leaf is missing `where`".to_string()),
        };
        if where_obj.len() != 1 {
            return Err(format!(
                "`where` must name exactly one source (found {})",
                where_obj.len()
            ));
        }
        let Some((source, field)) = where_obj.iter().next() else {
            return Err("`where` must name exactly one source (found 0)".to_string());
        };
        let Value::String(field) = field else {
            return Err(format!("`where.{}` must be a field path string", source));
        };

        let expected = match map.get("equals") {
            Some(Value::Object(equals)) => match equals.get("value") {
                Some(value) => value.clone(),
                None => return Err("`equals` is missing `value`".to_string()),
            },
            Some(_) => return Err("`equals` must be an object".to_string()),
            None => return Err("leaf is missing `equals`".to_string()),
        };

        Ok(Self {
            source: source.clone(),
            field: field.clone(),
            expected,
        })
    }
}

impl ConditionNode {
    pub fn and(children: Vec<ConditionNode>) -> Self {
        ConditionNode::And(children)
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        ConditionNode::Or(children)
    }

    pub fn leaf(
        source: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Self {
        ConditionNode::Leaf(LeafCondition::new(source, field, expected))
    }

    /// Parse one node from its persisted JSON form. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let malformed = |reason: &str| ConditionNode::Malformed {
            reason: reason.to_string(),
            raw: value.clone(),
        };

        let Value::Object(map) = value else {
            return malformed("condition must be an object");
        };

        match (map.get("and"), map.get("or")) {
            (Some(_), Some(_)) => malformed("node has both `and` and `or`"),
            (Some(Value::Array(children)), None) => {
                ConditionNode::And(children.iter().map(Self::from_value).collect())
            }
            (None, Some(Value::Array(children))) => {
                ConditionNode::Or(children.iter().map(Self::from_value).collect())
            }
            (Some(_), None) => malformed("`and` must be an array"),
            (None, Some(_)) => malformed("`or` must be an array"),
            (None, None) => {
                if !map.contains_key("where") && !map.contains_key("equals") {
                    return malformed("expected `and`, `or`, or a `where`/`equals` leaf");
                }
                match LeafCondition::from_object(map) {
                    Ok(leaf) => ConditionNode::Leaf(leaf),
                    Err(reason) => malformed(&reason),
                }
            }
        }
    }

    /// Check the whole tree, reporting the first malformed node.
    pub fn validate(&self) -> Result<(), ConditionError> {
        self.validate_at("(root)")
    }

    fn validate_at(&self, path: &str) -> Result<(), ConditionError> {
        let (key, children) = match self {
            ConditionNode::And(children) => ("and", children),
            ConditionNode::Or(children) => ("or", children),
            ConditionNode::Leaf(_) => return Ok(()),
            ConditionNode::Malformed { reason, .. } => {
                return Err(ConditionError {
                    path: path.to_string(),
                    reason: reason.clone(),
                });
            }
        };

        for (i, child) in children.iter().enumerate() {
            let child_path = if path == "(root)" {
                format!("{}[{}]", key, i)
            } else {
                format!("{}.{}[{}]", path, key, i)
            };
            child.validate_at(&child_path)?;
        }
        Ok(())
    }

    /// Every leaf in the tree, depth first.
    pub fn leaves(&self) -> Vec<&LeafCondition> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafCondition>) {
        match self {
            ConditionNode::And(children) | ConditionNode::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            ConditionNode::Leaf(leaf) => out.push(leaf),
            ConditionNode::Malformed { .. } => {}
        }
    }
}

/// Parse an optional persisted condition. `null` means "no condition".
pub fn parse_condition(value: &Value) -> Option<ConditionNode> {
    match value {
        Value::Null => None,
        other => Some(ConditionNode::from_value(other)),
    }
}

impl From<Value> for ConditionNode {
    fn from(value: Value) -> Self {
        ConditionNode::from_value(&value)
    }
}

impl From<ConditionNode> for Value {
    fn from(node: ConditionNode) -> Self {
        match node {
            ConditionNode::And(children) => {
                json!({ "and": children.into_iter().map(Value::from).collect::<Vec<_>>() })
            }
            ConditionNode::Or(children) => {
                json!({ "or": children.into_iter().map(Value::from).collect::<Vec<_>>() })
            }
            ConditionNode::Leaf(leaf) => {
                let mut where_obj = Map::new();
                where_obj.insert(leaf.source, Value::String(leaf.field));
                json!({
                    "where": Value::Object(where_obj),
                    "equals": { "value": leaf.expected },
                })
            }
            ConditionNode::Malformed { raw, .. } => raw,
        }
    }
}
