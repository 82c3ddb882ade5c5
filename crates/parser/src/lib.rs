//! DSL JSON to [`qx_ast::Query`] translation (§4.C).
//!
//! The public entry point is [`parse`]. Internally, every top-level DSL
//! keyword is handled by a [`strategy::QueryStrategy`] looked up from a
//! closed [`strategy::table`]; strategies that need to recurse into an
//! inner query (compound/wrapper/scoring queries) call [`parse_query`] with
//! the same [`strategy::ParseContext`] they were given.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod compound;
mod fulltext;
mod geo;
mod leaf;
mod scoring;
mod strategy;
mod support;
mod twophase;

pub use strategy::{ParseContext, QueryStrategy};

use qx_ast::Query;
use qx_core::{Error, Result};
use qx_join::JoinRegistry;
use serde_json::Value as Json;

/// Parses a single DSL JSON object into a [`Query`] (§4.C).
///
/// The top-level object must contain exactly one recognised keyword; an
/// empty object is accepted and treated as `match_all` (§4.C, §8 property 2).
/// Two-phase queries (`has_child`/`has_parent`/`percolate`) register their
/// auxiliary info against `registry` and return a `Placeholder` for the
/// executor to resolve later (§4.H).
pub fn parse(json: &Json, registry: &JoinRegistry) -> Result<Query> {
    let ctx = ParseContext { registry };
    parse_query(json, &ctx)
}

/// Recursive entry point used by strategies that embed an inner query
/// (`bool`, `nested`, `function_score`, `wrapper`, ...). Shares `ctx` so
/// nested two-phase queries register against the same registry.
pub(crate) fn parse_query(json: &Json, ctx: &ParseContext) -> Result<Query> {
    let (keyword, body) = support::single_keyword(json)?;
    let strategy = strategy::table()
        .get(keyword.as_str())
        .ok_or_else(|| Error::UnknownQueryType(keyword.clone()))?;
    strategy.parse(&body, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_parses_as_match_all() {
        let registry = JoinRegistry::new();
        let q = parse(&serde_json::json!({}), &registry).unwrap();
        assert_eq!(q, Query::MatchAll { boost: 1.0 });
    }

    #[test]
    fn multiple_top_level_keys_is_an_error() {
        let registry = JoinRegistry::new();
        let err = parse(&serde_json::json!({"term": {}, "match": {}}), &registry).unwrap_err();
        assert!(matches!(err, Error::MultipleQueryTypes(_)));
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let registry = JoinRegistry::new();
        let err = parse(&serde_json::json!({"frobnicate": {}}), &registry).unwrap_err();
        assert!(matches!(err, Error::UnknownQueryType(_)));
    }

    #[test]
    fn parsing_is_deterministic() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"term": {"category": "technology"}});
        let a = parse(&body, &registry).unwrap();
        let b = parse(&body, &registry).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bool_query_parses_must_clauses() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "bool": {
                "must": [
                    {"term": {"category": "technology"}},
                    {"term": {"published": "true"}}
                ]
            }
        });
        let q = parse(&body, &registry).unwrap();
        match q {
            Query::Boolean { must, .. } => assert_eq!(must.len(), 2),
            other => panic!("expected Boolean, got {other:?}"),
        }
    }
}
