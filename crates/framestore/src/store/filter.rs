//! Attribute filters for repository queries.

use serde_json::Value;

use crate::store::{AttributeStore, Node};

/// A predicate over node attributes.
///
/// Length and membership filters apply to list attributes (such as the
/// `columns` and `index` mirrors of frame records); any other attribute
/// type never matches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Attribute equals the value.
    Equals { field: String, value: Value },

    /// List attribute holds every one of the values.
    Contains { field: String, values: Vec<Value> },

    /// List attribute has fewer than `len` entries.
    ShorterThan { field: String, len: usize },

    /// List attribute has more than `len` entries.
    LongerThan { field: String, len: usize },

    /// Attribute is present.
    Exists { field: String },

    /// Every filter matches.
    And(Vec<Filter>),
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::Contains {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn shorter_than(field: impl Into<String>, len: usize) -> Self {
        Filter::ShorterThan {
            field: field.into(),
            len,
        }
    }

    pub fn longer_than(field: impl Into<String>, len: usize) -> Self {
        Filter::LongerThan {
            field: field.into(),
            len,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists {
            field: field.into(),
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Evaluates the filter against a node's attributes.
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Filter::Equals { field, value } => node.get_attribute(field) == Some(value),
            Filter::Contains { field, values } => list(node, field)
                .is_some_and(|items| values.iter().all(|v| items.contains(v))),
            Filter::ShorterThan { field, len } => {
                list(node, field).is_some_and(|items| items.len() < *len)
            }
            Filter::LongerThan { field, len } => {
                list(node, field).is_some_and(|items| items.len() > *len)
            }
            Filter::Exists { field } => node.get_attribute(field).is_some(),
            Filter::And(filters) => filters.iter().all(|f| f.matches(node)),
        }
    }
}

fn list<'a>(node: &'a Node, field: &str) -> Option<&'a Vec<Value>> {
    node.get_attribute(field).and_then(Value::as_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> Node {
        let mut node = Node::new("test");
        node.set_attribute("columns", json!(["A", "B"])).unwrap();
        node.set_attribute("index", json!([0, 1, 2])).unwrap();
        node.set_attribute("name", json!("frame")).unwrap();
        node
    }

    #[test]
    fn test_contains() {
        let node = node();
        assert!(Filter::contains("columns", ["A"]).matches(&node));
        assert!(Filter::contains("columns", ["A", "B"]).matches(&node));
        assert!(!Filter::contains("columns", ["A", "C"]).matches(&node));
        assert!(!Filter::contains("name", ["frame"]).matches(&node));
    }

    #[test]
    fn test_length_filters() {
        let node = node();
        assert!(Filter::shorter_than("index", 4).matches(&node));
        assert!(!Filter::shorter_than("index", 3).matches(&node));
        assert!(Filter::longer_than("index", 2).matches(&node));
        assert!(!Filter::longer_than("missing", 0).matches(&node));
    }

    #[test]
    fn test_equals_and_exists() {
        let node = node();
        assert!(Filter::equals("name", "frame").matches(&node));
        assert!(!Filter::equals("name", "other").matches(&node));
        assert!(Filter::exists("index").matches(&node));
        assert!(!Filter::and([Filter::exists("index"), Filter::exists("nope")]).matches(&node));
    }
}
