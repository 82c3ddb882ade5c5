//! Shared JSON-reading helpers used by every strategy (§4.C).

use qx_ast::normalize_field;
use qx_core::{Error, Result};
use serde_json::{Map, Value as Json};

/// Reads `body["boost"]`, defaulting to `1.0`.
pub fn boost_of(body: &Json) -> f64 {
    body.get("boost").and_then(Json::as_f64).unwrap_or(1.0)
}

/// Returns `body` as a JSON object, or a generic invalid-value-type error.
pub fn as_object<'a>(kind: &str, body: &'a Json) -> Result<&'a Map<String, Json>> {
    body.as_object().ok_or_else(|| Error::InvalidValueType {
        field: kind.to_string(),
        reason: "expected a JSON object".to_string(),
    })
}

/// Fetches a required field from `obj`, erroring with `MissingRequiredField`.
pub fn require<'a>(kind: &str, obj: &'a Map<String, Json>, field: &str) -> Result<&'a Json> {
    obj.get(field).ok_or_else(|| Error::MissingRequiredField {
        kind: kind.to_string(),
        field: field.to_string(),
    })
}

/// Fetches a required string field, normalizing it as a field name.
pub fn require_field_name(kind: &str, obj: &Map<String, Json>, key: &str) -> Result<String> {
    let raw = require(kind, obj, key)?
        .as_str()
        .ok_or_else(|| Error::InvalidValueType {
            field: key.to_string(),
            reason: "expected a string".to_string(),
        })?;
    Ok(normalize_field(raw))
}

/// Fetches a required string value (not normalized as a field name).
pub fn require_str<'a>(kind: &str, obj: &'a Map<String, Json>, key: &str) -> Result<&'a str> {
    require(kind, obj, key)?
        .as_str()
        .ok_or_else(|| Error::InvalidValueType {
            field: key.to_string(),
            reason: "expected a string".to_string(),
        })
}

/// Renders a JSON scalar the way the index's text analyzer would store it,
/// matching [`qx_core::Value::to_text`]'s integral-number formatting.
pub fn json_to_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            } else {
                n.to_string()
            }
        }
        Json::Bool(b) => b.to_string(),
        Json::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Accepts either a single object/value or a JSON array of them, always
/// returning a `Vec` — used for `bool.must`/`should`/`must_not`/`filter`
/// which may each be given as an object or an array (§4.C).
pub fn as_vec(value: &Json) -> Vec<Json> {
    match value {
        Json::Array(items) => items.clone(),
        Json::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Replaces a query's own `boost` field in place, for reductions that
/// collapse a wrapper query (e.g. `constant_score`, single-clause span
/// queries) down to its single inner query while keeping the wrapper's
/// boost.
pub fn set_boost(query: qx_ast::Query, boost: f64) -> qx_ast::Query {
    use qx_ast::Query;
    match query {
        Query::MatchAll { .. } => Query::MatchAll { boost },
        Query::MatchNone { .. } => Query::MatchNone { boost },
        Query::Term { field, value, .. } => Query::Term { field, value, boost },
        Query::Terms { field, values, .. } => Query::Terms { field, values, boost },
        Query::NumericRange { field, min, max, min_inclusive, max_inclusive, .. } => {
            Query::NumericRange { field, min, max, min_inclusive, max_inclusive, boost }
        }
        Query::TermRange { field, min, max, min_inclusive, max_inclusive, .. } => {
            Query::TermRange { field, min, max, min_inclusive, max_inclusive, boost }
        }
        Query::Prefix { field, prefix, .. } => Query::Prefix { field, prefix, boost },
        Query::Wildcard { field, pattern, .. } => Query::Wildcard { field, pattern, boost },
        Query::Regexp { field, pattern, .. } => Query::Regexp { field, pattern, boost },
        Query::Fuzzy { field, value, edits, .. } => Query::Fuzzy { field, value, edits, boost },
        Query::Match { field, text, operator, .. } => Query::Match { field, text, operator, boost },
        Query::MatchPhrase { field, phrase, slop, .. } => Query::MatchPhrase { field, phrase, slop, boost },
        Query::Ids { ids, .. } => Query::Ids { ids, boost },
        Query::Conjunction { children, .. } => Query::Conjunction { children, boost },
        Query::Disjunction { children, min, .. } => Query::Disjunction { children, min, boost },
        Query::Boolean { must, should, must_not, filter, min_should_match, .. } => {
            Query::Boolean { must, should, must_not, filter, min_should_match, boost }
        }
        Query::DocId { ids, .. } => Query::DocId { ids, boost },
        Query::GeoBoundingBox { field, params, .. } => Query::GeoBoundingBox { field, params, boost },
        Query::GeoDistance { field, params, .. } => Query::GeoDistance { field, params, boost },
        Query::GeoPolygon { field, params, .. } => Query::GeoPolygon { field, params, boost },
        Query::GeoShape { field, params, .. } => Query::GeoShape { field, params, boost },
        Query::ScriptScoreQuery { inner, script, min_score, .. } => {
            Query::ScriptScoreQuery { inner, script, min_score, boost }
        }
        Query::FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, .. } => {
            Query::FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, boost }
        }
        Query::Placeholder { key, .. } => Query::Placeholder { boost, key },
        unchanged @ (Query::Exists { .. } | Query::ScriptQuery { .. }) => unchanged,
    }
}

/// The sole key/value pair of a single-key JSON object, or a
/// `MultipleQueryTypes`/type error.
pub fn single_keyword(body: &Json) -> Result<(String, Json)> {
    let obj = body.as_object().ok_or_else(|| Error::InvalidValueType {
        field: "query".to_string(),
        reason: "expected a JSON object".to_string(),
    })?;
    if obj.is_empty() {
        return Ok(("match_all".to_string(), serde_json::json!({})));
    }
    if obj.len() != 1 {
        return Err(Error::MultipleQueryTypes(obj.keys().cloned().collect()));
    }
    let (k, v) = obj.iter().next().expect("len == 1");
    Ok((k.clone(), v.clone()))
}
