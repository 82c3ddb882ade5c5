//! Two-phase join/percolate strategies: `has_child`, `has_parent`,
//! `percolate` (§3.4, §4.G, §4.H).
//!
//! None of these produce a concrete `Query` node directly. Each registers
//! its auxiliary parameters against the shared [`qx_join::JoinRegistry`] and
//! returns a [`Query::Placeholder`] for the executor to collapse once it has
//! run the auxiliary search/match (§4.H).

use crate::strategy::ParseContext;
use crate::support::{as_object, boost_of, require, require_field_name};
use qx_ast::Query;
use qx_core::{Error, Result, Value};
use qx_join::{JoinKind, JoinQueryInfo, PercolateInfo, RegistryEntry};
use serde_json::Value as Json;
use std::collections::HashMap;

fn document_of(value: &Json) -> HashMap<String, Value> {
    match value.as_object() {
        Some(obj) => obj.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))).collect(),
        None => HashMap::new(),
    }
}

pub fn has_child(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("has_child", body)?;
    let type_name = require("has_child", obj, "type")?
        .as_str()
        .ok_or_else(|| Error::InvalidValueType { field: "type".to_string(), reason: "expected a string".to_string() })?
        .to_string();
    let inner_json = require("has_child", obj, "query")?;
    let inner = crate::parse_query(inner_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?;
    let boost = boost_of(body);
    let key = ctx.registry.register(RegistryEntry::Join(JoinQueryInfo {
        kind: JoinKind::HasChild,
        type_name,
        inner,
        boost,
    }));
    Ok(Query::Placeholder { boost, key })
}

pub fn has_parent(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("has_parent", body)?;
    let type_name = require("has_parent", obj, "parent_type")?
        .as_str()
        .ok_or_else(|| Error::InvalidValueType { field: "parent_type".to_string(), reason: "expected a string".to_string() })?
        .to_string();
    let inner_json = require("has_parent", obj, "query")?;
    let inner = crate::parse_query(inner_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?;
    let boost = boost_of(body);
    let key = ctx.registry.register(RegistryEntry::Join(JoinQueryInfo {
        kind: JoinKind::HasParent,
        type_name,
        inner,
        boost,
    }));
    Ok(Query::Placeholder { boost, key })
}

/// Parses `percolate`'s `document`/`documents` forms (§4.C).
///
/// The `id` form (percolate an already-indexed document fetched by id) is
/// not accepted here: resolving it needs a fetch-by-external-id primitive
/// the `IndexReader` seam doesn't expose (it only looks up field maps by
/// the reader's own internal id, per §6.3's `id`/`index_internal_id`
/// split — see `SPEC_FULL.md` §C.1). A request that supplies only `id`
/// fails with the same `MissingRequiredField` as an empty body.
pub fn percolate(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("percolate", body)?;
    let field = require_field_name("percolate", obj, "field")?;

    let document = obj.get("document").map(document_of);
    let documents = obj
        .get("documents")
        .and_then(Json::as_array)
        .map(|arr| arr.iter().map(document_of).collect())
        .unwrap_or_default();

    if document.is_none() && documents.is_empty() {
        return Err(Error::MissingRequiredField { kind: "percolate".to_string(), field: "document".to_string() });
    }

    let boost = boost_of(body);
    let key = ctx.registry.register(RegistryEntry::Percolate(PercolateInfo {
        field,
        document,
        documents,
        boost,
    }));
    Ok(Query::Placeholder { boost, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qx_join::JoinRegistry;

    fn ctx(registry: &JoinRegistry) -> ParseContext<'_> {
        ParseContext { registry }
    }

    #[test]
    fn has_child_registers_join_info_and_returns_placeholder() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "type": "comment",
            "query": {"term": {"author": "alice"}}
        });
        let q = has_child(&body, &ctx(&registry)).unwrap();
        let key = match q {
            Query::Placeholder { key, boost } => {
                assert_eq!(boost, 1.0);
                key
            }
            other => panic!("expected Placeholder, got {other:?}"),
        };
        match registry.get(key).unwrap() {
            RegistryEntry::Join(info) => {
                assert_eq!(info.kind, JoinKind::HasChild);
                assert_eq!(info.type_name, "comment");
            }
            other => panic!("expected Join entry, got {other:?}"),
        }
    }

    #[test]
    fn has_parent_requires_parent_type() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"query": {"match_all": {}}});
        let err = has_parent(&body, &ctx(&registry)).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { .. }));
    }

    #[test]
    fn percolate_registers_single_document() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "field": "query",
            "document": {"title": "breaking news", "views": 42}
        });
        let q = percolate(&body, &ctx(&registry)).unwrap();
        let key = match q {
            Query::Placeholder { key, .. } => key,
            other => panic!("expected Placeholder, got {other:?}"),
        };
        match registry.get(key).unwrap() {
            RegistryEntry::Percolate(info) => {
                assert_eq!(info.field, "query");
                assert_eq!(info.document.unwrap().get("views"), Some(&Value::F64(42.0)));
                assert!(info.documents.is_empty());
            }
            other => panic!("expected Percolate entry, got {other:?}"),
        }
    }

    #[test]
    fn percolate_requires_a_document_or_documents() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"field": "query"});
        let err = percolate(&body, &ctx(&registry)).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { .. }));
    }

    #[test]
    fn percolate_accepts_multiple_documents() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "field": "query",
            "documents": [{"title": "a"}, {"title": "b"}]
        });
        let q = percolate(&body, &ctx(&registry)).unwrap();
        let key = match q {
            Query::Placeholder { key, .. } => key,
            other => panic!("expected Placeholder, got {other:?}"),
        };
        match registry.get(key).unwrap() {
            RegistryEntry::Percolate(info) => assert_eq!(info.documents.len(), 2),
            other => panic!("expected Percolate entry, got {other:?}"),
        }
    }
}
