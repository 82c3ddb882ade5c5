//! Compound query strategies: `bool`, `constant_score`, `dis_max`, `nested`,
//! `pinned`, `wrapper`, and the span-query family (§4.C).
//!
//! `constant_score`, `dis_max`, and every `span_*` keyword have no dedicated
//! AST representation; each reduces to its nearest non-span primitive, per
//! the documented lossy reduction in §4.C/§9.

use crate::strategy::ParseContext;
use crate::support::{as_object, as_vec, boost_of, require, set_boost};
use qx_ast::Query;
use qx_core::{Error, Result};
use serde_json::Value as Json;

fn parse_list(value: Option<&Json>, ctx: &ParseContext) -> Result<Vec<Query>> {
    match value {
        None => Ok(Vec::new()),
        Some(v) => as_vec(v).iter().map(|item| crate::parse_query(item, ctx)).collect(),
    }
}

fn minimum_should_match(obj: &serde_json::Map<String, Json>, should_count: usize, has_must: bool) -> u32 {
    match obj.get("minimum_should_match") {
        Some(Json::Number(n)) => n.as_i64().unwrap_or(0).max(0) as u32,
        Some(Json::String(s)) if s.trim_end().ends_with('%') => {
            let pct: f64 = s.trim().trim_end_matches('%').parse().unwrap_or(0.0);
            let computed = (pct / 100.0 * should_count as f64).round().max(0.0) as u32;
            computed.min(should_count as u32)
        }
        Some(Json::String(s)) => s.parse().unwrap_or(0),
        _ => {
            if should_count > 0 && !has_must {
                1
            } else {
                0
            }
        }
    }
}

pub fn bool_query(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("bool", body)?;
    let must = parse_list(obj.get("must"), ctx)?;
    let should = parse_list(obj.get("should"), ctx)?;
    let must_not = parse_list(obj.get("must_not"), ctx)?;
    let filter = parse_list(obj.get("filter"), ctx)?;

    let mut combined_must = must;
    combined_must.extend(filter);
    let min_should_match = minimum_should_match(obj, should.len(), !combined_must.is_empty());

    Ok(Query::Boolean {
        must: combined_must,
        should,
        must_not,
        filter: Vec::new(),
        min_should_match,
        boost: boost_of(body),
    })
}

pub fn constant_score(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("constant_score", body)?;
    let filter = require("constant_score", obj, "filter")?;
    let inner = crate::parse_query(filter, ctx)?;
    Ok(set_boost(inner, boost_of(body)))
}

pub fn dis_max(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("dis_max", body)?;
    let queries = require("dis_max", obj, "queries")?
        .as_array()
        .ok_or_else(|| Error::InvalidValueType { field: "queries".to_string(), reason: "expected an array".to_string() })?;
    let children: Vec<Query> = queries.iter().map(|q| crate::parse_query(q, ctx)).collect::<Result<_>>()?;
    let boost = boost_of(body);
    Ok(match children.len() {
        0 => Query::match_all(),
        1 => set_boost(children.into_iter().next().expect("len == 1"), boost),
        _ => Query::Disjunction { children, min: 1, boost },
    })
}

/// Recursively prefixes every field name in `query` with `path.` (§4.C).
fn prefix_fields(query: Query, path: &str) -> Query {
    let prefixed = |field: String| format!("{path}.{field}");
    match query {
        Query::Term { field, value, boost } => Query::Term { field: prefixed(field), value, boost },
        Query::Terms { field, values, boost } => Query::Terms { field: prefixed(field), values, boost },
        Query::NumericRange { field, min, max, min_inclusive, max_inclusive, boost } => {
            Query::NumericRange { field: prefixed(field), min, max, min_inclusive, max_inclusive, boost }
        }
        Query::TermRange { field, min, max, min_inclusive, max_inclusive, boost } => {
            Query::TermRange { field: prefixed(field), min, max, min_inclusive, max_inclusive, boost }
        }
        Query::Prefix { field, prefix, boost } => Query::Prefix { field: prefixed(field), prefix, boost },
        Query::Wildcard { field, pattern, boost } => Query::Wildcard { field: prefixed(field), pattern, boost },
        Query::Regexp { field, pattern, boost } => Query::Regexp { field: prefixed(field), pattern, boost },
        Query::Fuzzy { field, value, edits, boost } => Query::Fuzzy { field: prefixed(field), value, edits, boost },
        Query::Match { field, text, operator, boost } => Query::Match { field: prefixed(field), text, operator, boost },
        Query::MatchPhrase { field, phrase, slop, boost } => {
            Query::MatchPhrase { field: prefixed(field), phrase, slop, boost }
        }
        Query::Exists { field } => Query::Exists { field: prefixed(field) },
        Query::GeoBoundingBox { field, params, boost } => Query::GeoBoundingBox { field: prefixed(field), params, boost },
        Query::GeoDistance { field, params, boost } => Query::GeoDistance { field: prefixed(field), params, boost },
        Query::GeoPolygon { field, params, boost } => Query::GeoPolygon { field: prefixed(field), params, boost },
        Query::GeoShape { field, params, boost } => Query::GeoShape { field: prefixed(field), params, boost },
        Query::Conjunction { children, boost } => Query::Conjunction {
            children: children.into_iter().map(|c| prefix_fields(c, path)).collect(),
            boost,
        },
        Query::Disjunction { children, min, boost } => Query::Disjunction {
            children: children.into_iter().map(|c| prefix_fields(c, path)).collect(),
            min,
            boost,
        },
        Query::Boolean { must, should, must_not, filter, min_should_match, boost } => Query::Boolean {
            must: must.into_iter().map(|c| prefix_fields(c, path)).collect(),
            should: should.into_iter().map(|c| prefix_fields(c, path)).collect(),
            must_not: must_not.into_iter().map(|c| prefix_fields(c, path)).collect(),
            filter: filter.into_iter().map(|c| prefix_fields(c, path)).collect(),
            min_should_match,
            boost,
        },
        unchanged => unchanged,
    }
}

pub fn nested(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("nested", body)?;
    let path = require("nested", obj, "path")?
        .as_str()
        .ok_or_else(|| Error::InvalidValueType { field: "path".to_string(), reason: "expected a string".to_string() })?
        .to_string();
    let inner_json = require("nested", obj, "query")?;
    let inner = crate::parse_query(inner_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?;
    let rewritten = prefix_fields(inner, &path);
    Ok(set_boost(rewritten, boost_of(body)))
}

pub fn pinned(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("pinned", body)?;
    let ids = obj
        .get("ids")
        .and_then(Json::as_array)
        .map(|arr| arr.iter().map(crate::support::json_to_text).collect())
        .unwrap_or_default();
    let organic_json = require("pinned", obj, "organic")?;
    let organic = crate::parse_query(organic_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?;
    let pinned_ids = Query::DocId { ids, boost: 1.0 };
    Ok(Query::Disjunction { children: vec![pinned_ids, organic], min: 1, boost: boost_of(body) })
}

pub fn wrapper(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("wrapper", body)?;
    let encoded = require("wrapper", obj, "query")?
        .as_str()
        .ok_or_else(|| Error::InvalidValueType { field: "query".to_string(), reason: "expected a base64 string".to_string() })?;

    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(encoded))
        .map_err(|e| Error::Base64Decode(e.to_string()))?;
    let decoded_str = String::from_utf8(decoded).map_err(|e| Error::Base64Decode(e.to_string()))?;
    let inner_json: Json = serde_json::from_str(&decoded_str)
        .map_err(|e| Error::InvalidValueType { field: "query".to_string(), reason: format!("decoded payload is not valid JSON: {e}") })?;
    crate::parse_query(&inner_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))
}

const SPAN_WRAPPER_KEYS: [&str; 6] = ["clauses", "match", "little", "big", "include", "exclude"];

pub fn span_reduce(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("span", body)?;
    if !SPAN_WRAPPER_KEYS.iter().any(|k| obj.contains_key(*k)) {
        // Shaped like a bare span_term: {field: value|{value, boost}}.
        return crate::leaf::term(body, ctx);
    }

    let mut should = Vec::new();
    if let Some(clauses) = obj.get("clauses").and_then(Json::as_array) {
        for clause in clauses {
            should.push(crate::parse_query(clause, ctx)?);
        }
    }
    for key in ["match", "little", "big", "include"] {
        if let Some(clause) = obj.get(key) {
            should.push(crate::parse_query(clause, ctx)?);
        }
    }
    let mut must_not = Vec::new();
    if let Some(exclude) = obj.get("exclude") {
        must_not.push(crate::parse_query(exclude, ctx)?);
    }

    let boost = boost_of(body);
    if should.is_empty() && must_not.is_empty() {
        return Ok(Query::match_all());
    }
    if should.len() == 1 && must_not.is_empty() {
        return Ok(set_boost(should.pop().expect("len == 1"), boost));
    }
    let min_should_match = if should.is_empty() { 0 } else { 1 };
    Ok(Query::Boolean { must: Vec::new(), should, must_not, filter: Vec::new(), min_should_match, boost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qx_join::JoinRegistry;

    fn ctx(registry: &JoinRegistry) -> ParseContext<'_> {
        ParseContext { registry }
    }

    #[test]
    fn bool_folds_filter_into_must() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "must": [{"term": {"category": "technology"}}],
            "filter": [{"term": {"published": "true"}}]
        });
        let q = bool_query(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Boolean { must, filter, .. } => {
                assert_eq!(must.len(), 2);
                assert!(filter.is_empty());
            }
            other => panic!("expected Boolean, got {other:?}"),
        }
    }

    #[test]
    fn minimum_should_match_defaults_to_one_without_must() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "should": [{"term": {"a": "1"}}, {"term": {"b": "2"}}]
        });
        let q = bool_query(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Boolean { min_should_match, .. } => assert_eq!(min_should_match, 1),
            other => panic!("expected Boolean, got {other:?}"),
        }
    }

    #[test]
    fn minimum_should_match_percentage_is_clamped() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "should": [
                {"term": {"a": "1"}}, {"term": {"b": "2"}}, {"term": {"c": "3"}}
            ],
            "minimum_should_match": "300%"
        });
        let q = bool_query(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Boolean { min_should_match, .. } => assert_eq!(min_should_match, 3),
            other => panic!("expected Boolean, got {other:?}"),
        }
    }

    #[test]
    fn nested_prefixes_inner_field_names() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "path": "comments",
            "query": {"term": {"author": "alice"}}
        });
        let q = nested(&body, &ctx(&registry)).unwrap();
        assert_eq!(q, Query::Term { field: "comments.author".into(), value: "alice".into(), boost: 1.0 });
    }

    #[test]
    fn constant_score_keeps_inner_but_overrides_boost() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "filter": {"term": {"category": "technology"}},
            "boost": 3.0
        });
        let q = constant_score(&body, &ctx(&registry)).unwrap();
        assert_eq!(q, Query::Term { field: "category".into(), value: "technology".into(), boost: 3.0 });
    }

    #[test]
    fn dis_max_reduces_to_disjunction() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "queries": [{"term": {"a": "1"}}, {"term": {"b": "2"}}]
        });
        let q = dis_max(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Disjunction { children, min, .. } => {
                assert_eq!(min, 1);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected Disjunction, got {other:?}"),
        }
    }

    #[test]
    fn pinned_builds_disjunction_of_doc_ids_and_organic() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "ids": ["1", "2"],
            "organic": {"match_all": {}}
        });
        let q = pinned(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Disjunction { children, .. } => {
                assert!(children.iter().any(|c| matches!(c, Query::DocId { ids, .. } if ids.len() == 2)));
            }
            other => panic!("expected Disjunction, got {other:?}"),
        }
    }

    #[test]
    fn wrapper_decodes_base64_and_recurses() {
        use base64::Engine;
        let registry = JoinRegistry::new();
        let inner = serde_json::json!({"term": {"category": "technology"}}).to_string();
        let encoded = base64::engine::general_purpose::STANDARD.encode(inner);
        let q = wrapper(&serde_json::json!({"query": encoded}), &ctx(&registry)).unwrap();
        assert_eq!(q, Query::Term { field: "category".into(), value: "technology".into(), boost: 1.0 });
    }

    #[test]
    fn span_term_shorthand_reduces_to_term() {
        let registry = JoinRegistry::new();
        let q = span_reduce(&serde_json::json!({"category": "technology"}), &ctx(&registry)).unwrap();
        assert_eq!(q, Query::Term { field: "category".into(), value: "technology".into(), boost: 1.0 });
    }

    #[test]
    fn span_near_reduces_clauses_to_disjunction() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "clauses": [
                {"span_term": {"a": "1"}},
                {"span_term": {"b": "2"}}
            ]
        });
        let q = span_reduce(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Boolean { should, .. } => assert_eq!(should.len(), 2),
            other => panic!("expected Boolean, got {other:?}"),
        }
    }

    #[test]
    fn span_not_excludes_via_must_not() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "include": {"span_term": {"a": "1"}},
            "exclude": {"span_term": {"b": "2"}}
        });
        let q = span_reduce(&body, &ctx(&registry)).unwrap();
        match q {
            Query::Boolean { should, must_not, .. } => {
                assert_eq!(should.len(), 1);
                assert_eq!(must_not.len(), 1);
            }
            other => panic!("expected Boolean, got {other:?}"),
        }
    }
}
