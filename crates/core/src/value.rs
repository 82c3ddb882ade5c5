//! Dynamic value type shared by documents, scripts, and function-score params
//!
//! This module defines:
//! - Value: the dynamically typed value every doc field, script param, and
//!   `_source` entry is represented as
//! - Context: the per-document evaluation context threaded through the
//!   script engine and function-score engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamically typed value.
///
/// Every document field, script parameter, and intermediate script result
/// is a `Value`. There is no distinct integer type: integers are represented
/// as `F64` (matching how JSON numbers decode and how Painless treats
/// `doc['x'].value` arithmetic uniformly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Numeric value (covers both integer and floating-point JSON numbers).
    F64(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed map of values.
    Map(HashMap<String, Value>),
}

impl Value {
    /// Truthiness per §4.F: non-zero numbers, non-empty strings distinct
    /// from `"false"`, non-nil objects are all true.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::F64(f) => *f != 0.0,
            Value::String(s) => !s.is_empty() && s != "false",
            Value::Array(a) => !a.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    /// Coerce to `f64`. Non-numeric values that cannot be parsed yield `0.0`,
    /// matching the script engine's permissive arithmetic coercion.
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::F64(f) => *f,
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Array(_) | Value::Map(_) => 0.0,
        }
    }

    /// Coerce to a display string, used by string concatenation and
    /// `Math`/`Date` formatting built-ins.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::F64(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Map(_) => {
                serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
            }
        }
    }

    /// Looks up a dotted path (`a.b.c`) inside nested maps, returning `None`
    /// at the first missing segment. Used for `doc`/`_source` field access.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            match current {
                Value::Map(m) => current = m.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Returns true if the value is `Null` or absent-equivalent.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::F64(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::F64(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Value::Map(m) => {
                serde_json::Value::Object(m.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Per-document evaluation context, threaded through script execution and
/// scoring (§3.2).
///
/// `doc` and `source` carry the same shape (a field map) but distinct
/// semantics: `doc` models doc-value access (`doc['x'].value`), `source`
/// models `_source` access. They are frequently identical in this
/// implementation since both derive from the same stored document.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Field map backing `doc['x']` / `doc.x` access.
    pub doc: HashMap<String, Value>,
    /// Field map backing `_source['x']` / `_source.x` access.
    pub source: HashMap<String, Value>,
    /// Script parameters (`params['k']` / `params.k`).
    pub params: HashMap<String, Value>,
    /// Current score (`_score`), when evaluating in a scoring context.
    pub score: f64,
    /// Current wall-clock time in epoch milliseconds (`Date.now()`).
    pub now: i64,
    /// Update context document (`ctx._source...`), mutated by update scripts.
    pub ctx: HashMap<String, Value>,
    /// Local variable scope for `def` declarations and bare assignments.
    pub variables: HashMap<String, Value>,
}

impl Context {
    /// Builds a filter/score context from a document field map.
    pub fn for_document(doc: HashMap<String, Value>) -> Self {
        Context {
            source: doc.clone(),
            doc,
            now: chrono::Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    /// Builds an update context, seeding `ctx._source` from the document.
    pub fn for_update(doc: HashMap<String, Value>) -> Self {
        let mut ctx = HashMap::new();
        ctx.insert("_source".to_string(), Value::Map(doc.clone()));
        Context {
            source: doc.clone(),
            doc,
            ctx,
            now: chrono::Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    /// Attach script parameters.
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Attach the original query score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_painless_rules() {
        assert!(!Value::Null.to_bool());
        assert!(!Value::F64(0.0).to_bool());
        assert!(Value::F64(-1.0).to_bool());
        assert!(!Value::String(String::new()).to_bool());
        assert!(!Value::String("false".into()).to_bool());
        assert!(Value::String("False".into()).to_bool());
        assert!(!Value::Array(vec![]).to_bool());
        assert!(Value::Array(vec![Value::Null]).to_bool());
    }

    #[test]
    fn to_f64_coercion() {
        assert_eq!(Value::String("3.5".into()).to_f64(), 3.5);
        assert_eq!(Value::String("not a number".into()).to_f64(), 0.0);
        assert_eq!(Value::Bool(true).to_f64(), 1.0);
        assert_eq!(Value::Null.to_f64(), 0.0);
    }

    #[test]
    fn integral_f64_formats_without_decimal() {
        assert_eq!(Value::F64(100.0).to_text(), "100");
        assert_eq!(Value::F64(100.5).to_text(), "100.5");
    }

    #[test]
    fn get_path_walks_nested_maps() {
        let mut inner = HashMap::new();
        inner.insert("b".to_string(), Value::F64(42.0));
        let mut outer = HashMap::new();
        outer.insert("a".to_string(), Value::Map(inner));
        let root = Value::Map(outer);

        assert_eq!(root.get_path("a.b"), Some(&Value::F64(42.0)));
        assert_eq!(root.get_path("a.missing"), None);
        assert_eq!(root.get_path("missing"), None);
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let json = serde_json::json!({"a": 1, "b": [1, "x", null], "c": true});
        let value: Value = json.clone().into();
        let back: serde_json::Value = value.into();
        assert_eq!(json, back);
    }

    #[test]
    fn context_for_document_seeds_doc_and_source() {
        let mut doc = HashMap::new();
        doc.insert("price".to_string(), Value::F64(100.0));
        let ctx = Context::for_document(doc.clone());
        assert_eq!(ctx.doc, doc);
        assert_eq!(ctx.source, doc);
        assert!(ctx.now > 0);
    }

    #[test]
    fn context_for_update_seeds_ctx_source() {
        let mut doc = HashMap::new();
        doc.insert("price".to_string(), Value::F64(100.0));
        let ctx = Context::for_update(doc.clone());
        assert_eq!(ctx.ctx.get("_source"), Some(&Value::Map(doc)));
    }
}
