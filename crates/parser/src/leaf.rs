//! Leaf query strategies: `match_all`, `match_none`, `term`, `terms`,
//! `range`, `prefix`, `wildcard`, `fuzzy`, `regexp`, `exists`, `ids` (§4.C).

use crate::strategy::ParseContext;
use crate::support::{as_object, boost_of, json_to_text, require, require_field_name};
use qx_ast::Query;
use qx_core::{Error, Result};
use serde_json::Value as Json;

pub fn match_all(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    Ok(Query::MatchAll { boost: boost_of(body) })
}

pub fn match_none(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    Ok(Query::MatchNone { boost: boost_of(body) })
}

/// One candidate alternative a `term`/`terms` value expands to (§4.C numeric/
/// string duality).
enum Alt {
    Term(String),
    Numeric(f64),
}

/// Expands a single JSON scalar into its duality alternatives.
fn alternatives(value: &Json) -> Vec<Alt> {
    let mut out = Vec::new();
    match value {
        Json::Number(n) => {
            let f = n.as_f64().unwrap_or(0.0);
            out.push(Alt::Numeric(f));
            out.push(Alt::Term(json_to_text(value)));
        }
        Json::Bool(b) => {
            out.push(Alt::Term(b.to_string()));
            out.push(Alt::Term(if *b { "T".to_string() } else { "F".to_string() }));
        }
        Json::String(s) => {
            out.push(Alt::Term(s.clone()));
            if let Ok(f) = s.trim().parse::<f64>() {
                out.push(Alt::Numeric(f));
            }
            if s == "true" {
                out.push(Alt::Term("T".to_string()));
            } else if s == "false" {
                out.push(Alt::Term("F".to_string()));
            }
            let lower = s.to_lowercase();
            if &lower != s {
                out.push(Alt::Term(lower));
            }
        }
        other => out.push(Alt::Term(json_to_text(other))),
    }
    out
}

fn alt_to_query(field: &str, alt: Alt, boost: f64) -> Query {
    match alt {
        Alt::Term(value) => Query::Term { field: field.to_string(), value, boost },
        Alt::Numeric(v) => Query::NumericRange {
            field: field.to_string(),
            min: Some(v),
            max: Some(v),
            min_inclusive: true,
            max_inclusive: true,
            boost,
        },
    }
}

/// Wraps a list of per-value alternatives into the final query: a bare
/// variant when exactly one alternative survives, otherwise a
/// `Disjunction{min:1}` carrying the outer boost.
fn wrap_alternatives(field: &str, alts: Vec<Alt>, boost: f64) -> Query {
    if alts.len() == 1 {
        return alt_to_query(field, alts.into_iter().next().expect("len == 1"), boost);
    }
    let children = alts
        .into_iter()
        .map(|alt| alt_to_query(field, alt, 1.0))
        .collect();
    Query::Disjunction { children, min: 1, boost }
}

/// Reads the `{value, boost}` shorthand-or-object body shared by `term` and
/// the per-value portion of `terms`/`fuzzy`.
fn term_value_and_boost(body: &Json) -> (Json, f64) {
    match body.as_object() {
        Some(obj) if obj.contains_key("value") => {
            (obj.get("value").cloned().unwrap_or(Json::Null), boost_of(body))
        }
        Some(_) | None => (body.clone(), 1.0),
    }
}

pub fn term(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("term", body)?;
    let (field_raw, value_body) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let (value, boost) = term_value_and_boost(&value_body);
    Ok(wrap_alternatives(&field, alternatives(&value), boost))
}

pub fn terms(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("terms", body)?;
    let (field_raw, value_body) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let values = value_body.as_array().ok_or_else(|| Error::InvalidValueType {
        field: field_raw.clone(),
        reason: "terms value must be an array".to_string(),
    })?;
    let boost = boost_of(body);
    let mut alts = Vec::new();
    for v in values {
        alts.extend(alternatives(v));
    }
    if alts.is_empty() {
        return Ok(Query::MatchNone { boost });
    }
    Ok(wrap_alternatives(&field, alts, boost))
}

/// Picks the single `{field: value}` entry out of a `term`/`terms` body,
/// ignoring the shared `boost` key when present alongside it.
fn single_field(obj: &serde_json::Map<String, Json>) -> Result<(String, Json)> {
    let (field, value) = obj
        .iter()
        .find(|(k, _)| k.as_str() != "boost")
        .ok_or_else(|| Error::MissingRequiredField {
            kind: "term".to_string(),
            field: "<field>".to_string(),
        })?;
    Ok((field.clone(), value.clone()))
}

pub fn range(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("range", body)?;
    let (field_raw, spec) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let spec_obj = as_object("range", &spec)?;
    let boost = boost_of(&spec);

    let (min_raw, max_raw, min_inclusive, max_inclusive) = bounds(spec_obj);
    let min_num = min_raw.as_ref().and_then(Json::as_f64);
    let max_num = max_raw.as_ref().and_then(Json::as_f64);
    let numeric_ok = (min_raw.is_none() || min_num.is_some()) && (max_raw.is_none() || max_num.is_some());

    if numeric_ok {
        Ok(Query::NumericRange {
            field,
            min: min_num,
            max: max_num,
            min_inclusive,
            max_inclusive,
            boost,
        })
    } else {
        Ok(Query::TermRange {
            field,
            min: min_raw.as_ref().map(json_to_text),
            max: max_raw.as_ref().map(json_to_text),
            min_inclusive,
            max_inclusive,
            boost,
        })
    }
}

fn bounds(obj: &serde_json::Map<String, Json>) -> (Option<Json>, Option<Json>, bool, bool) {
    if obj.contains_key("gte") || obj.contains_key("gt") || obj.contains_key("lte") || obj.contains_key("lt") {
        let min = obj.get("gte").or_else(|| obj.get("gt")).cloned();
        let max = obj.get("lte").or_else(|| obj.get("lt")).cloned();
        (min, max, obj.contains_key("gte"), obj.contains_key("lte"))
    } else {
        let min = obj.get("from").cloned().filter(|v| !v.is_null());
        let max = obj.get("to").cloned().filter(|v| !v.is_null());
        let min_inclusive = obj.get("include_lower").and_then(Json::as_bool).unwrap_or(true);
        let max_inclusive = obj.get("include_upper").and_then(Json::as_bool).unwrap_or(true);
        (min, max, min_inclusive, max_inclusive)
    }
}

pub fn prefix(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("prefix", body)?;
    let (field_raw, value_body) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let (value, boost) = term_value_and_boost(&value_body);
    Ok(Query::Prefix { field, prefix: json_to_text(&value), boost })
}

pub fn wildcard(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("wildcard", body)?;
    let (field_raw, value_body) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let (value, boost) = match value_body.as_object() {
        Some(inner) if inner.contains_key("value") => {
            (inner.get("value").cloned().unwrap_or(Json::Null), boost_of(&value_body))
        }
        Some(inner) if inner.contains_key("wildcard") => {
            (inner.get("wildcard").cloned().unwrap_or(Json::Null), boost_of(&value_body))
        }
        _ => (value_body.clone(), 1.0),
    };
    Ok(Query::Wildcard { field, pattern: json_to_text(&value), boost })
}

pub fn fuzzy(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("fuzzy", body)?;
    let (field_raw, value_body) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let (value, boost) = term_value_and_boost(&value_body);
    let edits = value_body
        .as_object()
        .and_then(|o| o.get("fuzziness"))
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(2) as u32;
    Ok(Query::Fuzzy { field, value: json_to_text(&value), edits, boost })
}

pub fn regexp(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("regexp", body)?;
    let (field_raw, value_body) = single_field(obj)?;
    let field = qx_ast::normalize_field(&field_raw);
    let (value, boost) = term_value_and_boost(&value_body);
    Ok(Query::Regexp { field, pattern: json_to_text(&value), boost })
}

pub fn exists(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("exists", body)?;
    let field = require_field_name("exists", obj, "field")?;
    Ok(Query::Exists { field })
}

pub fn ids(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("ids", body)?;
    let values = require("ids", obj, "values")?;
    let ids = values
        .as_array()
        .ok_or_else(|| Error::InvalidValueType {
            field: "values".to_string(),
            reason: "expected an array".to_string(),
        })?
        .iter()
        .map(json_to_text)
        .collect();
    Ok(Query::Ids { ids, boost: boost_of(body) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qx_join::JoinRegistry;

    fn ctx(registry: &JoinRegistry) -> ParseContext<'_> {
        ParseContext { registry }
    }

    #[test]
    fn match_all_empty_object_parses() {
        let registry = JoinRegistry::new();
        let q = match_all(&serde_json::json!({}), &ctx(&registry)).unwrap();
        assert_eq!(q, Query::MatchAll { boost: 1.0 });
    }

    #[test]
    fn numeric_term_expands_to_disjunction_of_range_and_term() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"price": 100});
        let q = term(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Disjunction { children, min, boost } => {
                assert_eq!(min, 1);
                assert_eq!(boost, 1.0);
                assert_eq!(children.len(), 2);
                assert!(children.iter().any(|c| matches!(c, Query::NumericRange { .. })));
                assert!(children.iter().any(|c| matches!(c, Query::Term { .. })));
            }
            other => panic!("expected Disjunction, got {other:?}"),
        }
    }

    #[test]
    fn boolean_string_term_includes_one_letter_encoding() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"published": "true"});
        let q = term(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Disjunction { children, .. } => {
                let values: Vec<&str> = children
                    .iter()
                    .filter_map(|c| match c {
                        Query::Term { value, .. } => Some(value.as_str()),
                        _ => None,
                    })
                    .collect();
                assert!(values.contains(&"true"));
                assert!(values.contains(&"T"));
            }
            other => panic!("expected Disjunction, got {other:?}"),
        }
    }

    #[test]
    fn lowercase_string_term_has_no_extra_alternative() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"category": "technology"});
        let q = term(&body, &ctx(&registry)).unwrap();
        assert_eq!(
            q,
            Query::Term { field: "category".into(), value: "technology".into(), boost: 1.0 }
        );
    }

    #[test]
    fn mixed_case_string_term_adds_lowercase_alternative() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"category": "Technology"});
        let q = term(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Disjunction { children, .. } => {
                assert!(children.iter().any(
                    |c| matches!(c, Query::Term { value, .. } if value == "technology")
                ));
            }
            other => panic!("expected Disjunction, got {other:?}"),
        }
    }

    #[test]
    fn field_names_are_normalized() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"category.keyword": "technology"});
        let q = term(&body, &ctx(&registry)).unwrap();
        assert_eq!(
            q,
            Query::Term { field: "category".into(), value: "technology".into(), boost: 1.0 }
        );
    }

    #[test]
    fn terms_query_flattens_alternatives_for_every_value() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"category": ["technology", "science"]});
        let q = terms(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Disjunction { children, min, .. } => {
                assert_eq!(min, 1);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected Disjunction, got {other:?}"),
        }
    }

    #[test]
    fn range_with_gte_lte_builds_numeric_range() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"price": {"gte": 10, "lte": 20}});
        let q = range(&body, &ctx(&registry)).unwrap();
        assert_eq!(
            q,
            Query::NumericRange {
                field: "price".into(),
                min: Some(10.0),
                max: Some(20.0),
                min_inclusive: true,
                max_inclusive: true,
                boost: 1.0,
            }
        );
    }

    #[test]
    fn range_with_gt_lt_is_exclusive() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"price": {"gt": 10, "lt": 20}});
        let q = range(&body, &ctx(&registry)).unwrap();
        match q {
            Query::NumericRange { min_inclusive, max_inclusive, .. } => {
                assert!(!min_inclusive);
                assert!(!max_inclusive);
            }
            other => panic!("expected NumericRange, got {other:?}"),
        }
    }

    #[test]
    fn range_legacy_from_to_falls_back() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"price": {"from": 10, "to": 20}});
        let q = range(&body, &ctx(&registry)).unwrap();
        assert_eq!(
            q,
            Query::NumericRange {
                field: "price".into(),
                min: Some(10.0),
                max: Some(20.0),
                min_inclusive: true,
                max_inclusive: true,
                boost: 1.0,
            }
        );
    }

    #[test]
    fn range_with_non_numeric_bounds_builds_term_range() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"name": {"gte": "alice", "lt": "mallory"}});
        let q = range(&body, &ctx(&registry)).unwrap();
        assert_eq!(
            q,
            Query::TermRange {
                field: "name".into(),
                min: Some("alice".into()),
                max: Some("mallory".into()),
                min_inclusive: true,
                max_inclusive: false,
                boost: 1.0,
            }
        );
    }

    #[test]
    fn exists_requires_field() {
        let registry = JoinRegistry::new();
        assert!(exists(&serde_json::json!({}), &ctx(&registry)).is_err());
        let q = exists(&serde_json::json!({"field": "price"}), &ctx(&registry)).unwrap();
        assert_eq!(q, Query::Exists { field: "price".into() });
    }

    #[test]
    fn ids_collects_string_values() {
        let registry = JoinRegistry::new();
        let q = ids(&serde_json::json!({"values": ["a", "b"]}), &ctx(&registry)).unwrap();
        assert_eq!(q, Query::Ids { ids: vec!["a".into(), "b".into()], boost: 1.0 });
    }
}
