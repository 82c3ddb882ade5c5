//! End-to-end scenarios (§8) driven through the public [`Executor::execute`]
//! API: parse -> optimize -> execute (which itself resolves two-phase
//! placeholders before delegating to the `IndexReader`).

use qx_core::Value;
use qx_executor::{ExecutionContext, Executor, IndexReader, InternalId, SearchHit, SearchRequest};
use qx_join::JoinRegistry;
use std::collections::HashMap;
use std::sync::Mutex;

/// Whole-corpus in-memory reader: `search` runs the in-memory percolation
/// matcher over every stored document (adequate for scenario-scale corpora;
/// a real `IndexReader` would use an inverted index instead, per §1).
struct MemoryIndexReader {
    docs: Mutex<Vec<(InternalId, String, HashMap<String, Value>)>>,
}

impl MemoryIndexReader {
    fn new(docs: Vec<(InternalId, &str, HashMap<String, Value>)>) -> Self {
        MemoryIndexReader { docs: Mutex::new(docs.into_iter().map(|(i, id, f)| (i, id.to_string(), f)).collect()) }
    }
}

impl IndexReader for MemoryIndexReader {
    fn search(&self, query: &qx_ast::Query, _page_size: usize) -> qx_core::Result<Vec<SearchHit>> {
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .iter()
            .filter(|(_, _, fields)| qx_join::matches_document(query, fields))
            .map(|(id, ext, _)| SearchHit { internal_id: *id, external_id: ext.clone(), score: 1.0 })
            .collect())
    }

    fn fetch_fields(&self, internal_id: InternalId) -> qx_core::Result<Option<HashMap<String, Value>>> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.iter().find(|(id, _, _)| *id == internal_id).map(|(_, _, f)| f.clone()))
    }
}

fn doc(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn run(reader: &MemoryIndexReader, registry: &JoinRegistry, body: serde_json::Value) -> qx_executor::SearchResponse {
    let parsed = qx_parser::parse(&body, registry).unwrap();
    let optimized = qx_optimizer::optimize(parsed);
    let executor = Executor::new();
    let request = SearchRequest::new(optimized);
    executor.execute(registry, request, reader, &ExecutionContext::new()).unwrap()
}

#[test]
fn s1_has_child_returns_parent_with_matching_child() {
    let reader = MemoryIndexReader::new(vec![
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
        (3, "q2", doc(&[("_join_name", Value::String("question".into()))])),
        (
            4,
            "a2",
            doc(&[
                ("_join_name", Value::String("answer".into())),
                ("_join_parent", Value::String("q2".into())),
                ("body", Value::String("Rust is a systems programming language".into())),
            ]),
        ),
    ]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "has_child": {
                "type": "answer",
                "query": {"match": {"body": "search engine"}}
            }
        }),
    );

    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].id, "q1");
}

#[test]
fn s2_has_parent_returns_children_of_matching_parent() {
    let reader = MemoryIndexReader::new(vec![
        (1, "cat1", doc(&[("_join_name", Value::String("category".into())), ("name", Value::String("Electronics".into()))])),
        (2, "cat2", doc(&[("_join_name", Value::String("category".into())), ("name", Value::String("Books".into()))])),
        (
            3,
            "p1",
            doc(&[
                ("_join_name", Value::String("product".into())),
                ("_join_parent", Value::String("cat1".into())),
                ("title", Value::String("Laptop".into())),
            ]),
        ),
        (
            4,
            "p2",
            doc(&[
                ("_join_name", Value::String("product".into())),
                ("_join_parent", Value::String("cat2".into())),
                ("title", Value::String("Novel".into())),
            ]),
        ),
    ]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "has_parent": {
                "parent_type": "category",
                "query": {"match": {"name": "electronics"}}
            }
        }),
    );

    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].id, "p1");
}

#[test]
fn s3_percolate_returns_stored_queries_matching_the_candidate_document() {
    let query1 = serde_json::json!({"match": {"title": "elasticsearch"}}).to_string();
    let query2 = serde_json::json!({"match": {"tags": "database"}}).to_string();
    let reader = MemoryIndexReader::new(vec![
        (1, "query1", doc(&[("_has_percolator", Value::String("true".into())), ("_percolator_query", Value::String(query1))])),
        (2, "query2", doc(&[("_has_percolator", Value::String("true".into())), ("_percolator_query", Value::String(query2))])),
    ]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "percolate": {
                "field": "query",
                "document": {
                    "title": "Elasticsearch as a Database",
                    "tags": "database"
                }
            }
        }),
    );

    let mut ids: Vec<&str> = response.hits.iter().map(|h| h.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["query1", "query2"]);
}

#[test]
fn s6_bool_must_filter_matches_required_term_and_score_contributing_match() {
    let reader = MemoryIndexReader::new(vec![
        (1, "d1", doc(&[("category", Value::String("books".into())), ("title", Value::String("rust programming".into()))])),
        (2, "d2", doc(&[("category", Value::String("electronics".into())), ("title", Value::String("rust programming".into()))])),
    ]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "bool": {
                "must": [{"match": {"title": "rust"}}],
                "filter": [{"term": {"category": "books"}}]
            }
        }),
    );

    assert_eq!(response.total, 1);
    assert_eq!(response.hits[0].id, "d1");
}

#[test]
fn script_score_replaces_base_score_with_computed_value() {
    let reader = MemoryIndexReader::new(vec![(1, "d1", doc(&[("price", Value::F64(20.0))]))]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "script_score": {
                "query": {"match_all": {}},
                "script": {"source": "doc['price'].value * 2"}
            }
        }),
    );

    assert_eq!(response.hits[0].score, 40.0);
}

#[test]
fn s4_script_score_combines_base_score_with_doc_field_and_params() {
    let reader = MemoryIndexReader::new(vec![(1, "d1", doc(&[("price", Value::F64(100.0))]))]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "script_score": {
                "query": {"match_all": {}},
                "script": {
                    "source": "_score * doc['price'].value / params.max",
                    "params": {"max": 200}
                }
            }
        }),
    );

    assert_eq!(response.hits[0].score, 0.5);
}

#[test]
fn s5_function_score_gaussian_decay_scores_documents_by_distance_from_origin() {
    let reader = MemoryIndexReader::new(vec![
        (1, "near", doc(&[("price", Value::F64(100.0))])),
        (2, "far", doc(&[("price", Value::F64(500.0))])),
    ]);
    let registry = JoinRegistry::new();

    let response = run(
        &reader,
        &registry,
        serde_json::json!({
            "function_score": {
                "query": {"match_all": {}},
                "functions": [{
                    "gauss": {"price": {"origin": 100, "scale": 50, "offset": 10, "decay": 0.5}}
                }],
                "boost_mode": "replace"
            }
        }),
    );

    let near = response.hits.iter().find(|h| h.id == "near").unwrap();
    let far = response.hits.iter().find(|h| h.id == "far").unwrap();
    assert_eq!(near.score, 1.0);
    assert!(far.score < near.score);
}

#[test]
fn pagination_applies_from_and_size_after_sorting() {
    let reader = MemoryIndexReader::new(vec![
        (1, "a", doc(&[])),
        (2, "b", doc(&[])),
        (3, "c", doc(&[])),
    ]);
    let registry = JoinRegistry::new();

    let parsed = qx_parser::parse(&serde_json::json!({"match_all": {}}), &registry).unwrap();
    let mut request = SearchRequest::new(parsed);
    request.size = 1;
    request.from = 1;

    let executor = Executor::new();
    let response = executor.execute(&registry, request, &reader, &ExecutionContext::new()).unwrap();
    assert_eq!(response.total, 3);
    assert_eq!(response.hits.len(), 1);
}

#[test]
fn cancelled_context_aborts_execution() {
    let reader = MemoryIndexReader::new(vec![(1, "a", doc(&[]))]);
    let registry = JoinRegistry::new();
    let parsed = qx_parser::parse(&serde_json::json!({"match_all": {}}), &registry).unwrap();
    let request = SearchRequest::new(parsed);

    let ctx = ExecutionContext::new();
    ctx.cancel.cancel();

    let executor = Executor::new();
    let err = executor.execute(&registry, request, &reader, &ctx).unwrap_err();
    assert!(matches!(err, qx_core::Error::Cancelled));
}
