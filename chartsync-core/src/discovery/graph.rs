//! Object graph abstraction over a host page's live objects.
//!
//! Objects are shared through `Arc` handles, so a graph may contain shared
//! sub-objects and cycles. Identity is the handle's pointer.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Reading a property failed (inaccessible, or its getter threw).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyError(pub String);

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property not readable: {}", self.0)
    }
}

impl std::error::Error for PropertyError {}

/// An object whose enumerable own properties can be listed and read.
pub trait GraphObject: Send + Sync {
    /// Enumerable own property names, in a stable order.
    fn keys(&self) -> Vec<String>;

    /// Reads one property.
    fn get(&self, key: &str) -> Result<GraphValue, PropertyError>;
}

pub type ObjectRef = Arc<dyn GraphObject>;

/// A property value: a scalar, or a handle to another object.
#[derive(Clone)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectRef),
}

impl GraphValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            GraphValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Converts a JSON value into a graph. Arrays become objects keyed by index.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => GraphValue::Null,
            Value::Bool(b) => GraphValue::Bool(b),
            Value::Number(n) => GraphValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => GraphValue::String(s),
            Value::Array(items) => {
                let node = ObjectNode::new();
                for (index, item) in items.into_iter().enumerate() {
                    node.insert(index.to_string(), GraphValue::from_json(item));
                }
                GraphValue::Object(node)
            }
            Value::Object(map) => {
                let node = ObjectNode::new();
                for (key, item) in map {
                    node.insert(key, GraphValue::from_json(item));
                }
                GraphValue::Object(node)
            }
        }
    }
}

impl fmt::Debug for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => f.write_str("Null"),
            GraphValue::Bool(b) => write!(f, "Bool({})", b),
            GraphValue::Number(n) => write!(f, "Number({})", n),
            GraphValue::String(s) => write!(f, "String({:?})", s),
            GraphValue::Object(obj) => write!(f, "Object({:#x})", identity(obj)),
        }
    }
}

impl From<&str> for GraphValue {
    fn from(s: &str) -> Self {
        GraphValue::String(s.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(s: String) -> Self {
        GraphValue::String(s)
    }
}

impl From<ObjectRef> for GraphValue {
    fn from(obj: ObjectRef) -> Self {
        GraphValue::Object(obj)
    }
}

impl From<Arc<ObjectNode>> for GraphValue {
    fn from(node: Arc<ObjectNode>) -> Self {
        GraphValue::Object(node)
    }
}

/// Identity of an object handle.
pub fn identity(obj: &ObjectRef) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

/// Identity-keyed set of objects already entered by a traversal.
#[derive(Debug, Default)]
pub struct Visited(HashSet<usize>);

impl Visited {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `obj` as entered. Returns false if it already was.
    pub fn enter(&mut self, obj: &ObjectRef) -> bool {
        self.0.insert(identity(obj))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone)]
enum Slot {
    Value(GraphValue),
    Unreadable(String),
}

/// In-memory object with insertion-ordered properties.
///
/// Properties can be added after construction, which is how cycles are built.
/// Cyclic `Arc` graphs are never freed; that is fine for snapshots and tests.
#[derive(Default)]
pub struct ObjectNode {
    properties: RwLock<Vec<(String, Slot)>>,
}

impl ObjectNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets a property, replacing any existing value under the same key.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<GraphValue>) {
        self.put(key.into(), Slot::Value(value.into()));
    }

    /// Adds a property whose read always fails.
    pub fn insert_unreadable(&self, key: impl Into<String>, reason: impl Into<String>) {
        self.put(key.into(), Slot::Unreadable(reason.into()));
    }

    fn put(&self, key: String, slot: Slot) {
        let mut properties = self
            .properties
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = slot,
            None => properties.push((key, slot)),
        }
    }
}

impl GraphObject for ObjectNode {
    fn keys(&self) -> Vec<String> {
        self.properties
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn get(&self, key: &str) -> Result<GraphValue, PropertyError> {
        let properties = self
            .properties
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match properties.iter().find(|(k, _)| k == key) {
            Some((_, Slot::Value(value))) => Ok(value.clone()),
            Some((_, Slot::Unreadable(reason))) => Err(PropertyError(reason.clone())),
            None => Ok(GraphValue::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let node = ObjectNode::new();
        node.insert("b", "1");
        node.insert("a", "2");
        node.insert("b", "3");

        assert_eq!(node.keys(), vec!["b", "a"]);
        assert_eq!(node.get("b").unwrap().as_str(), Some("3"));
    }

    #[test]
    fn test_unreadable_property() {
        let node = ObjectNode::new();
        node.insert_unreadable("secret", "SecurityError");
        assert_eq!(
            node.get("secret").unwrap_err(),
            PropertyError("SecurityError".into())
        );
    }

    #[test]
    fn test_visited_is_identity_based() {
        let a: ObjectRef = ObjectNode::new();
        let b: ObjectRef = ObjectNode::new();
        let a_again = a.clone();

        let mut visited = Visited::new();
        assert!(visited.enter(&a));
        assert!(visited.enter(&b));
        assert!(!visited.enter(&a_again));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_from_json() {
        let value = GraphValue::from_json(json!({"list": ["x", {"k": true}], "n": 1}));
        let root = value.as_object().unwrap();
        assert_eq!(root.keys(), vec!["list", "n"]);

        let list = root.get("list").unwrap();
        let list = list.as_object().unwrap();
        assert_eq!(list.keys(), vec!["0", "1"]);
        assert_eq!(list.get("0").unwrap().as_str(), Some("x"));
    }
}
