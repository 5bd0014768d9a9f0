//! Loosely-typed document fields.
//!
//! The remote stores `metadata`, `cost`, and legacy `identifiers` either as
//! serialized JSON text or as already-structured objects, depending on which
//! writer produced the record. `Doc` captures that union explicitly and
//! normalizes to object-or-none at the access sites.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A field that may arrive as JSON text, a JSON object, or something else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Doc {
    Text(String),
    Object(Map<String, Value>),
    Other(Value),
}

impl Doc {
    /// Normalize to a JSON object: parse text forms, pass objects through,
    /// and treat anything else (arrays, numbers, null) as absent.
    pub fn to_object(&self) -> Option<Map<String, Value>> {
        match self {
            Doc::Object(map) => Some(map.clone()),
            Doc::Text(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            Doc::Other(_) => None,
        }
    }

    /// Normalize to an arbitrary JSON value: parse text forms when they hold
    /// valid JSON, otherwise keep the raw value.
    pub fn to_value(&self) -> Value {
        match self {
            Doc::Object(map) => Value::Object(map.clone()),
            Doc::Text(raw) => serde_json::from_str(raw).unwrap_or(Value::String(raw.clone())),
            Doc::Other(v) => v.clone(),
        }
    }
}

impl From<Map<String, Value>> for Doc {
    fn from(map: Map<String, Value>) -> Self {
        Doc::Object(map)
    }
}
