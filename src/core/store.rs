// src/core/store.rs

//! In-memory option store keyed by dotted flag path.

use crate::core::value::Value;
use std::collections::BTreeMap;

/// Flag values keyed by `cmd.path.flag`, optionally under a prefix.
#[derive(Debug, Clone, Default)]
pub struct Store {
    prefix: String,
    values: BTreeMap<String, Value>,
}

impl Store {
    /// A store whose keys are all placed under `prefix` (may be empty).
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_matches('.').to_string(),
            values: BTreeMap::new(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Writes `value` under `key` (prefix applied).
    pub fn set(&mut self, key: &str, value: Value) {
        let full = self.full_key(key);
        log::debug!("store: {} = {}", full, value);
        self.values.insert(full, value);
    }

    /// Reads `key` (prefix applied).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&self.full_key(key))
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Items of a slice or array value.
    pub fn get_items(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_items)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&self.full_key(key))
    }

    /// All entries with their full keys, sorted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_applied_transparently() {
        let mut store = Store::new("app.");
        store.set("server.port", Value::U16(80));
        assert_eq!(store.get_i64("server.port"), Some(80));
        let keys: Vec<&str> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["app.server.port"]);
    }

    #[test]
    fn test_typed_getters() {
        let mut store = Store::new("");
        store.set("debug", Value::Bool(true));
        store.set("name", Value::from("x"));
        store.set("tags", Value::strings(["a", "b"]));
        assert!(store.get_bool("debug"));
        assert!(!store.get_bool("missing"));
        assert_eq!(store.get_str("name"), Some("x"));
        assert_eq!(store.get_items("tags").map(<[Value]>::len), Some(2));
    }
}
