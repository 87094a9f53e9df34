//! Condition evaluation against a data context.

use serde_json::Value;

use super::node::{ConditionNode, LeafCondition, parse_condition};
use crate::value::{resolve_path, values_equal};

/// Evaluate an optional condition. No condition means "always run".
///
/// ```
/// use mediatask::condition::{ConditionNode, evaluate_condition};
/// use serde_json::json;
///
/// let data = json!({"data": {"x": 5, "y": true}});
/// let node = ConditionNode::and(vec![
///     ConditionNode::leaf("data", "x", 5),
///     ConditionNode::leaf("data", "y", true),
/// ]);
/// assert!(evaluate_condition(Some(&node), &data));
/// assert!(evaluate_condition(None, &data));
/// ```
pub fn evaluate_condition(node: Option<&ConditionNode>, data: &Value) -> bool {
    node.is_none_or(|node| node.evaluate(data))
}

/// Parse and evaluate a condition still in its persisted JSON form.
pub fn evaluate_condition_value(node: &Value, data: &Value) -> bool {
    evaluate_condition(parse_condition(node).as_ref(), data)
}

impl ConditionNode {
    /// Evaluate this node. `And`/`Or` stop at the first deciding child.
    pub fn evaluate(&self, data: &Value) -> bool {
        match self {
            ConditionNode::And(children) => children.iter().all(|child| child.evaluate(data)),
            ConditionNode::Or(children) => children.iter().any(|child| child.evaluate(data)),
            ConditionNode::Leaf(leaf) => leaf.evaluate(data),
            ConditionNode::Malformed { reason, .. } => {
                tracing::warn!(reason = %reason, "malformed condition evaluated as false");
                false
            }
        }
    }
}

impl LeafCondition {
    /// Compare `data[source].<field>` with the expected literal.
    pub fn evaluate(&self, data: &Value) -> bool {
        let actual = data
            .get(&self.source)
            .and_then(|source| resolve_path(source, &self.field));
        values_equal(actual, &self.expected)
    }
}
