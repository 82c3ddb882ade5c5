//! In-memory document matcher used only for percolation (§4.H).
//!
//! This matcher interprets a query AST directly against a field map instead
//! of going through the `IndexReader`'s primitive searchers — percolation
//! flips the usual direction (many stored queries, one candidate document),
//! so a tree-walking interpreter is the simpler and sufficiently correct
//! tool for the job.
//!
//! Per §9, unsupported query kinds default to matching (`true`) rather than
//! not matching. This is a deliberate over-approximation: percolation
//! exists to surface "would this stored query have matched", and a false
//! negative (silently dropping a query that could plausibly match) is worse
//! than an occasional false positive on a clause this matcher can't fully
//! interpret.

use qx_ast::Query;
use qx_core::Value;
use std::collections::HashMap;

/// Evaluates `query` against `doc`, returning whether it matches.
pub fn matches_document(query: &Query, doc: &HashMap<String, Value>) -> bool {
    match query {
        Query::MatchAll { .. } => true,
        Query::MatchNone { .. } => false,
        Query::Term { field, value, .. } => field_contains(doc, field, value),
        Query::Match { field, text, .. } => field_contains(doc, field, text),
        Query::Conjunction { children, .. } => {
            children.iter().all(|c| matches_document(c, doc))
        }
        Query::Disjunction { children, min, .. } => {
            let matched = children.iter().filter(|c| matches_document(c, doc)).count();
            matched as u32 >= (*min).max(1)
        }
        Query::Boolean {
            must,
            should,
            must_not,
            filter,
            min_should_match,
            ..
        } => {
            let must_ok = must.iter().chain(filter).all(|c| matches_document(c, doc));
            let not_ok = !must_not.iter().any(|c| matches_document(c, doc));
            let should_ok = if should.is_empty() {
                true
            } else {
                let threshold = if must.is_empty() && filter.is_empty() {
                    (*min_should_match).max(1)
                } else {
                    *min_should_match
                };
                let matched = should.iter().filter(|c| matches_document(c, doc)).count();
                matched as u32 >= threshold
            };
            must_ok && not_ok && should_ok
        }
        // Every other kind (ranges, prefix/wildcard/fuzzy, geo, script,
        // function_score, nested two-phase queries, ...) is outside this
        // matcher's scope; over-approximate as matching.
        _ => true,
    }
}

/// Field-value comparator shared by `Term`/`Match` percolation (§4.H):
/// case-insensitive substring for strings, numeric equality for numbers,
/// any-item match for sequences.
fn field_contains(doc: &HashMap<String, Value>, field: &str, needle: &str) -> bool {
    match doc.get(field) {
        Some(value) => value_contains(value, needle),
        None => false,
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(&needle.to_lowercase()),
        Value::F64(n) => needle
            .trim()
            .parse::<f64>()
            .map(|parsed| parsed == *n)
            .unwrap_or(false),
        Value::Bool(b) => needle.eq_ignore_ascii_case(&b.to_string()),
        Value::Array(items) => items.iter().any(|item| value_contains(item, needle)),
        Value::Null | Value::Map(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn term_is_case_insensitive_substring_on_strings() {
        let d = doc(&[("title", Value::String("Elasticsearch as a Database".into()))]);
        let q = Query::Term {
            field: "title".into(),
            value: "elasticsearch".into(),
            boost: 1.0,
        };
        assert!(matches_document(&q, &d));
    }

    #[test]
    fn term_numeric_equality() {
        let d = doc(&[("price", Value::F64(100.0))]);
        let q = Query::Term {
            field: "price".into(),
            value: "100".into(),
            boost: 1.0,
        };
        assert!(matches_document(&q, &d));
        let q2 = Query::Term {
            field: "price".into(),
            value: "101".into(),
            boost: 1.0,
        };
        assert!(!matches_document(&q2, &d));
    }

    #[test]
    fn term_any_item_match_on_sequences() {
        let d = doc(&[(
            "tags",
            Value::Array(vec![Value::String("database".into()), Value::String("search".into())]),
        )]);
        let q = Query::Term {
            field: "tags".into(),
            value: "database".into(),
            boost: 1.0,
        };
        assert!(matches_document(&q, &d));
    }

    #[test]
    fn missing_field_does_not_match() {
        let d = doc(&[]);
        let q = Query::Term {
            field: "missing".into(),
            value: "x".into(),
            boost: 1.0,
        };
        assert!(!matches_document(&q, &d));
    }

    #[test]
    fn boolean_combines_must_should_must_not() {
        let d = doc(&[
            ("title", Value::String("Elasticsearch as a Database".into())),
            ("tags", Value::String("database".into())),
        ]);
        let q = Query::Boolean {
            must: vec![Query::Term {
                field: "title".into(),
                value: "elasticsearch".into(),
                boost: 1.0,
            }],
            should: vec![],
            must_not: vec![Query::Term {
                field: "tags".into(),
                value: "spam".into(),
                boost: 1.0,
            }],
            filter: vec![],
            min_should_match: 0,
            boost: 1.0,
        };
        assert!(matches_document(&q, &d));
    }

    #[test]
    fn unsupported_kinds_default_to_matching() {
        let d = doc(&[]);
        let q = Query::Prefix {
            field: "x".into(),
            prefix: "y".into(),
            boost: 1.0,
        };
        assert!(matches_document(&q, &d));
    }

    #[test]
    fn match_all_and_match_none_are_constants() {
        let d = doc(&[]);
        assert!(matches_document(&Query::match_all(), &d));
        assert!(!matches_document(&Query::match_none(), &d));
    }
}
