//! Two-phase join/percolate resolution (§4.H).
//!
//! [`resolve`] walks an optimized AST looking for `Placeholder` nodes
//! (`has_child`/`has_parent`/`percolate`), runs the auxiliary search each
//! one needs against the `IndexReader`, and replaces the placeholder with a
//! concrete `DocId`/`Term`/`Disjunction`/`MatchNone` node. The result
//! contains no `Placeholder`s and can be handed straight to
//! [`crate::search`].

use crate::cancel::ExecutionContext;
use crate::reader::IndexReader;
use qx_ast::Query;
use qx_core::{Error, Result, Value};
use qx_join::{JoinKind, JoinQueryInfo, JoinRegistry, PercolateInfo, RegistryEntry};
use std::collections::{BTreeSet, HashMap};

fn check_cancel(ctx: &ExecutionContext) -> Result<()> {
    if ctx.cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if ctx.deadline_exceeded() {
        return Err(Error::DeadlineExceeded);
    }
    Ok(())
}

fn resolve_list(
    children: Vec<Query>,
    registry: &JoinRegistry,
    reader: &dyn IndexReader,
    page_size: usize,
    ctx: &ExecutionContext,
) -> Result<Vec<Query>> {
    children.into_iter().map(|c| resolve(c, registry, reader, page_size, ctx)).collect()
}

/// Recursively collapses every `Placeholder` reachable from `query` (§4.H,
/// §3.4 invariant: each id is registered exactly once until collapsed here).
pub fn resolve(
    query: Query,
    registry: &JoinRegistry,
    reader: &dyn IndexReader,
    page_size: usize,
    ctx: &ExecutionContext,
) -> Result<Query> {
    check_cancel(ctx)?;
    match query {
        Query::Conjunction { children, boost } => {
            Ok(Query::Conjunction { children: resolve_list(children, registry, reader, page_size, ctx)?, boost })
        }
        Query::Disjunction { children, min, boost } => {
            Ok(Query::Disjunction { children: resolve_list(children, registry, reader, page_size, ctx)?, min, boost })
        }
        Query::Boolean { must, should, must_not, filter, min_should_match, boost } => Ok(Query::Boolean {
            must: resolve_list(must, registry, reader, page_size, ctx)?,
            should: resolve_list(should, registry, reader, page_size, ctx)?,
            must_not: resolve_list(must_not, registry, reader, page_size, ctx)?,
            filter: resolve_list(filter, registry, reader, page_size, ctx)?,
            min_should_match,
            boost,
        }),
        Query::ScriptScoreQuery { inner, script, min_score, boost } => Ok(Query::ScriptScoreQuery {
            inner: Box::new(resolve(*inner, registry, reader, page_size, ctx)?),
            script,
            min_score,
            boost,
        }),
        Query::FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, boost } => {
            let inner = Box::new(resolve(*inner, registry, reader, page_size, ctx)?);
            let mut resolved_functions = Vec::with_capacity(functions.len());
            for mut f in functions {
                if let Some(filter) = f.filter {
                    f.filter = Some(Box::new(resolve(*filter, registry, reader, page_size, ctx)?));
                }
                resolved_functions.push(f);
            }
            Ok(Query::FunctionScoreQuery {
                inner,
                functions: resolved_functions,
                score_mode,
                boost_mode,
                max_boost,
                min_score,
                boost,
            })
        }
        Query::Placeholder { boost, key } => {
            let entry = registry
                .unregister(key)
                .ok_or_else(|| Error::IndexReadFailed(format!("placeholder {key:?} already resolved")))?;
            match entry {
                RegistryEntry::Join(info) => resolve_join(info, boost, reader, page_size, ctx),
                RegistryEntry::Percolate(info) => resolve_percolate(info, boost, reader, page_size, ctx),
            }
        }
        leaf => Ok(leaf),
    }
}

fn resolve_join(
    info: JoinQueryInfo,
    boost: f64,
    reader: &dyn IndexReader,
    page_size: usize,
    ctx: &ExecutionContext,
) -> Result<Query> {
    match info.kind {
        JoinKind::HasChild => resolve_has_child(info, boost, reader, page_size, ctx),
        JoinKind::HasParent => resolve_has_parent(info, boost, reader, page_size, ctx),
    }
}

/// `has_child` (§4.H): matches children of `type_name`, collects their
/// distinct `_join_parent` ids, and collapses to a `DocId` over those ids
/// (or `MatchNone` when no child matched).
fn resolve_has_child(
    info: JoinQueryInfo,
    boost: f64,
    reader: &dyn IndexReader,
    page_size: usize,
    ctx: &ExecutionContext,
) -> Result<Query> {
    let type_q = Query::Term { field: "_join_name".to_string(), value: info.type_name, boost: 1.0 };
    let child_q = Query::Conjunction { children: vec![type_q, info.inner], boost: 1.0 };

    let hits = reader.search(&child_q, page_size.max(10_000))?;
    let mut parent_ids: BTreeSet<String> = BTreeSet::new();
    for hit in hits {
        check_cancel(ctx)?;
        if let Some(fields) = reader.fetch_fields(hit.internal_id)? {
            if let Some(parent_id) = parent_id_of(&fields) {
                if !parent_id.is_empty() {
                    parent_ids.insert(parent_id);
                }
            }
        }
    }

    if parent_ids.is_empty() {
        Ok(Query::MatchNone { boost })
    } else {
        Ok(Query::DocId { ids: parent_ids.into_iter().collect(), boost })
    }
}

/// `has_parent` (§4.H): matches parents of `parent_type`, and collapses to
/// a disjunction of `Term{_join_parent, id}` over the matched parent ids
/// (or a single `Term` when exactly one parent matched, `MatchNone` when
/// none did).
fn resolve_has_parent(
    info: JoinQueryInfo,
    boost: f64,
    reader: &dyn IndexReader,
    page_size: usize,
    ctx: &ExecutionContext,
) -> Result<Query> {
    let type_q = Query::Term { field: "_join_name".to_string(), value: info.type_name, boost: 1.0 };
    let combined = Query::Conjunction { children: vec![type_q, info.inner], boost: 1.0 };

    let hits = reader.search(&combined, page_size.max(10_000))?;
    let mut parent_ids: BTreeSet<String> = BTreeSet::new();
    for hit in &hits {
        check_cancel(ctx)?;
        if !hit.external_id.is_empty() {
            parent_ids.insert(hit.external_id.clone());
        }
    }

    if parent_ids.is_empty() {
        return Ok(Query::MatchNone { boost });
    }
    if parent_ids.len() == 1 {
        let id = parent_ids.into_iter().next().expect("len == 1");
        return Ok(Query::Term { field: "_join_parent".to_string(), value: id, boost });
    }
    let children = parent_ids
        .into_iter()
        .map(|id| Query::Term { field: "_join_parent".to_string(), value: id, boost: 1.0 })
        .collect();
    Ok(Query::Disjunction { children, min: 1, boost })
}

/// `percolate` (§4.H): fetches every stored percolator query, re-parses its
/// serialized form, and matches it against every candidate document via the
/// in-memory matcher. Collapses to a `DocId` of the stored queries' own ids
/// that matched at least one candidate, or `MatchNone`.
fn resolve_percolate(
    info: PercolateInfo,
    boost: f64,
    reader: &dyn IndexReader,
    page_size: usize,
    ctx: &ExecutionContext,
) -> Result<Query> {
    let candidates: Vec<HashMap<String, Value>> = info.document.into_iter().chain(info.documents).collect();
    if candidates.is_empty() {
        return Ok(Query::MatchNone { boost });
    }

    let indicator = Query::Term { field: "_has_percolator".to_string(), value: "true".to_string(), boost: 1.0 };
    let hits = reader.search(&indicator, page_size.max(10_000))?;

    let mut matched_ids: BTreeSet<String> = BTreeSet::new();
    for hit in hits {
        check_cancel(ctx)?;
        let Some(fields) = reader.fetch_fields(hit.internal_id)? else { continue };
        let Some(Value::String(stored_query)) = fields.get("_percolator_query") else { continue };
        let Ok(stored_json) = serde_json::from_str::<serde_json::Value>(stored_query) else { continue };

        // Stored percolator queries may themselves carry nested two-phase
        // clauses; they get their own disposable registry since their
        // placeholders never reach the top-level resolution pass above.
        let sub_registry = JoinRegistry::new();
        let Ok(parsed) = qx_parser::parse(&stored_json, &sub_registry) else { continue };

        if candidates.iter().any(|doc| qx_join::matches_document(&parsed, doc)) {
            matched_ids.insert(hit.external_id);
        }
    }

    if matched_ids.is_empty() {
        Ok(Query::MatchNone { boost })
    } else {
        Ok(Query::DocId { ids: matched_ids.into_iter().collect(), boost })
    }
}

fn parent_id_of(fields: &HashMap<String, Value>) -> Option<String> {
    match fields.get("_join_parent") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SearchHit;
    use qx_ast::Operator;
    use std::sync::Mutex;

    /// Minimal in-memory reader double for unit-testing resolution logic in
    /// isolation from the full executor (integration scenarios in
    /// `tests/scenarios.rs` exercise the real `Executor`).
    struct FakeReader {
        docs: Mutex<Vec<(u64, String, HashMap<String, Value>)>>,
    }

    impl FakeReader {
        fn new(docs: Vec<(u64, &str, HashMap<String, Value>)>) -> Self {
            FakeReader { docs: Mutex::new(docs.into_iter().map(|(i, id, f)| (i, id.to_string(), f)).collect()) }
        }
    }

    impl IndexReader for FakeReader {
        fn search(&self, query: &Query, _page_size: usize) -> Result<Vec<SearchHit>> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .iter()
                .filter(|(_, _, fields)| qx_join::matches_document(query, fields))
                .map(|(id, ext, _)| SearchHit { internal_id: *id, external_id: ext.clone(), score: 1.0 })
                .collect())
        }

        fn fetch_fields(&self, internal_id: u64) -> Result<Option<HashMap<String, Value>>> {
            let docs = self.docs.lock().unwrap();
            Ok(docs.iter().find(|(id, _, _)| *id == internal_id).map(|(_, _, f)| f.clone()))
        }
    }

    fn doc(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn s1_has_child_collapses_to_doc_id_of_matched_parents() {
        let reader = FakeReader::new(vec![
            (1, "q1", doc(&[("_join_name", Value::String("question".into()))])),
            (
                2,
                "a1",
                doc(&[
                    ("_join_name", Value::String("answer".into())),
                    ("_join_parent", Value::String("q1".into())),
                    ("body", Value::String("Elasticsearch is a distributed search engine".into())),
                ]),
            ),
            (
                3,
                "a2",
                doc(&[
                    ("_join_name", Value::String("answer".into())),
                    ("_join_parent", Value::String("q1".into())),
                    ("body", Value::String("It is built on Apache Lucene".into())),
                ]),
            ),
        ]);

        let registry = JoinRegistry::new();
        let info = JoinQueryInfo {
            kind: JoinKind::HasChild,
            type_name: "answer".to_string(),
            inner: Query::Match { field: "body".to_string(), text: "search engine".to_string(), operator: Operator::Or, boost: 1.0 },
            boost: 1.0,
        };
        let key = registry.register(RegistryEntry::Join(info));
        let placeholder = Query::Placeholder { boost: 1.0, key };

        let resolved = resolve(placeholder, &registry, &reader, 10_000, &ExecutionContext::new()).unwrap();
        assert_eq!(resolved, Query::DocId { ids: vec!["q1".to_string()], boost: 1.0 });
    }

    #[test]
    fn has_child_with_no_matches_collapses_to_match_none() {
        let reader = FakeReader::new(vec![]);
        let registry = JoinRegistry::new();
        let info = JoinQueryInfo {
            kind: JoinKind::HasChild,
            type_name: "answer".to_string(),
            inner: Query::match_all(),
            boost: 1.0,
        };
        let key = registry.register(RegistryEntry::Join(info));
        let resolved = resolve(Query::Placeholder { boost: 1.0, key }, &registry, &reader, 10_000, &ExecutionContext::new()).unwrap();
        assert_eq!(resolved, Query::MatchNone { boost: 1.0 });
    }

    #[test]
    fn s2_has_parent_collapses_to_disjunction_of_join_parent_terms() {
        let reader = FakeReader::new(vec![(
            1,
            "cat1",
            doc(&[("_join_name", Value::String("category".into())), ("name", Value::String("Electronics".into()))]),
        )]);

        let registry = JoinRegistry::new();
        let info = JoinQueryInfo {
            kind: JoinKind::HasParent,
            type_name: "category".to_string(),
            inner: Query::Match { field: "name".to_string(), text: "electronics".to_string(), operator: Operator::Or, boost: 1.0 },
            boost: 1.0,
        };
        let key = registry.register(RegistryEntry::Join(info));
        let resolved = resolve(Query::Placeholder { boost: 1.0, key }, &registry, &reader, 10_000, &ExecutionContext::new()).unwrap();
        assert_eq!(resolved, Query::Term { field: "_join_parent".to_string(), value: "cat1".to_string(), boost: 1.0 });
    }

    #[test]
    fn s3_percolate_collapses_to_doc_id_of_matched_stored_queries() {
        let query1 = serde_json::json!({"match": {"title": "elasticsearch"}}).to_string();
        let query3 = serde_json::json!({"match": {"tags": "database"}}).to_string();
        let reader = FakeReader::new(vec![
            (
                1,
                "query1",
                doc(&[("_has_percolator", Value::String("true".into())), ("_percolator_query", Value::String(query1))]),
            ),
            (
                2,
                "query3",
                doc(&[("_has_percolator", Value::String("true".into())), ("_percolator_query", Value::String(query3))]),
            ),
        ]);

        let registry = JoinRegistry::new();
        let candidate = doc(&[
            ("title", Value::String("Elasticsearch as a Database".into())),
            ("content", Value::String("...".into())),
            ("tags", Value::String("database".into())),
        ]);
        let info = PercolateInfo { field: "query".to_string(), document: Some(candidate), documents: vec![], boost: 1.0 };
        let key = registry.register(RegistryEntry::Percolate(info));
        let resolved = resolve(Query::Placeholder { boost: 1.0, key }, &registry, &reader, 10_000, &ExecutionContext::new()).unwrap();
        match resolved {
            Query::DocId { mut ids, .. } => {
                ids.sort();
                assert_eq!(ids, vec!["query1".to_string(), "query3".to_string()]);
            }
            other => panic!("expected DocId, got {other:?}"),
        }
    }

    #[test]
    fn resolving_an_already_collapsed_placeholder_is_an_error() {
        let reader = FakeReader::new(vec![]);
        let registry = JoinRegistry::new();
        let info = JoinQueryInfo { kind: JoinKind::HasChild, type_name: "x".to_string(), inner: Query::match_all(), boost: 1.0 };
        let key = registry.register(RegistryEntry::Join(info));
        let placeholder = Query::Placeholder { boost: 1.0, key };
        resolve(placeholder.clone(), &registry, &reader, 10_000, &ExecutionContext::new()).unwrap();
        let err = resolve(placeholder, &registry, &reader, 10_000, &ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, Error::IndexReadFailed(_)));
    }

    #[test]
    fn cancellation_is_observed_before_resolving() {
        let reader = FakeReader::new(vec![]);
        let registry = JoinRegistry::new();
        let ctx = ExecutionContext::new();
        ctx.cancel.cancel();
        let err = resolve(Query::match_all(), &registry, &reader, 10_000, &ctx).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
