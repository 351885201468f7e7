use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::{NodeError, Result};
use crate::graph::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Bool(bool),
    Number(f64),
    Str(String),
    Node(NodeId),
}

impl From<bool> for ContextValue {
    fn from(v: bool) -> Self {
        ContextValue::Bool(v)
    }
}

impl From<f64> for ContextValue {
    fn from(v: f64) -> Self {
        ContextValue::Number(v)
    }
}

impl From<&str> for ContextValue {
    fn from(v: &str) -> Self {
        ContextValue::Str(v.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        ContextValue::Str(v)
    }
}

impl From<NodeId> for ContextValue {
    fn from(v: NodeId) -> Self {
        ContextValue::Node(v)
    }
}

/// Key-value overrides visible to every node built beneath a context node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextMap {
    values: BTreeMap<String, ContextValue>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ContextValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ContextValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ContextValue::Str(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow merge: keys of `overrides` replace keys of `self`.
    pub fn merged(&self, overrides: &ContextMap) -> ContextMap {
        let mut values = self.values.clone();
        values.extend(overrides.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        ContextMap { values }
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    ContextValue::Bool(v) => json!(v),
                    ContextValue::Number(v) => json!(v),
                    ContextValue::Str(v) => json!(v),
                    ContextValue::Node(id) => json!({ "node": id }),
                };
                (key.clone(), value)
            })
            .collect();
        Value::Object(map)
    }

    pub fn from_json(value: &Value) -> Result<ContextMap> {
        let Value::Object(map) = value else {
            return Err(NodeError::invalid_argument("ContextNode: context must be an object"));
        };
        let mut context = ContextMap::new();
        for (key, value) in map {
            let value = match value {
                Value::Bool(v) => ContextValue::Bool(*v),
                Value::Number(n) => ContextValue::Number(n.as_f64().unwrap_or_default()),
                Value::String(s) => ContextValue::Str(s.clone()),
                Value::Object(o) => match o.get("node").and_then(Value::as_u64) {
                    Some(id) => ContextValue::Node(NodeId(id as u32)),
                    None => {
                        return Err(NodeError::invalid_argument(format!(
                            "ContextNode: unsupported value for '{key}'"
                        )))
                    }
                },
                _ => {
                    return Err(NodeError::invalid_argument(format!(
                        "ContextNode: unsupported value for '{key}'"
                    )))
                }
            };
            context.values.insert(key.clone(), value);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_keys() {
        let outer = ContextMap::new().with("label", "b").with("tempRead", true);
        let inner = ContextMap::new().with("label", "a");
        let merged = outer.merged(&inner);
        assert_eq!(merged.get_str("label"), Some("a"));
        assert_eq!(merged.get_bool("tempRead"), Some(true));
        assert_eq!(outer.get_str("label"), Some("b"));
    }

    #[test]
    fn json_round_trip() {
        let context = ContextMap::new()
            .with("label", "tint")
            .with("tempWrite", false)
            .with("level", 2.0);
        let restored = ContextMap::from_json(&context.to_json()).unwrap();
        assert_eq!(restored, context);
        assert!(ContextMap::from_json(&json!([1, 2])).is_err());
    }
}
