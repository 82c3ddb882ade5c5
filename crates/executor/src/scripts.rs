//! Extracting bare `script` filter clauses out of a resolved AST (§4.F, §7).
//!
//! The `IndexReader` (§1) only understands structural primitive queries; a
//! `Query::ScriptQuery` has no primitive-layer equivalent, so it can't be
//! handed to [`crate::reader::IndexReader::search`] directly. This pass
//! pulls `ScriptQuery` clauses that appear directly in a top-level
//! `Boolean`'s `must`/`filter` lists (or as the whole query) out into a
//! side list the executor applies as a per-document post-filter instead.
//!
//! Scoped deliberately to the top level: a `script` clause nested inside an
//! inner `bool` (`bool.filter[].bool.filter[].script`) is not extracted.
//! Real Elasticsearch pushes script queries all the way down through a
//! Lucene `Weight`/`Scorer` composition that this core's primitive-query
//! seam does not attempt to replicate; one level covers the overwhelmingly
//! common `bool: {filter: [{script: ...}]}` shape used for script filtering
//! and keeps the executor from needing a full query-interpreter fallback
//! path duplicating the `IndexReader` it already delegates to.

use qx_ast::{Query, Script};

/// Splits `query` into a structural query the `IndexReader` can execute and
/// any `script` clauses that must be applied as a post-filter.
pub fn strip_script_filters(query: Query) -> (Query, Vec<Script>) {
    match query {
        Query::ScriptQuery { script } => (Query::match_all(), vec![script]),
        Query::Boolean { must, should, must_not, filter, min_should_match, boost } => {
            let mut scripts = Vec::new();
            let must = extract(must, &mut scripts);
            let filter = extract(filter, &mut scripts);
            if must.is_empty() && should.is_empty() && must_not.is_empty() && filter.is_empty() {
                (Query::MatchAll { boost }, scripts)
            } else {
                (Query::Boolean { must, should, must_not, filter, min_should_match, boost }, scripts)
            }
        }
        Query::Conjunction { children, boost } => {
            let mut scripts = Vec::new();
            let children = extract(children, &mut scripts);
            if children.is_empty() {
                (Query::MatchAll { boost }, scripts)
            } else {
                (Query::Conjunction { children, boost }, scripts)
            }
        }
        other => (other, Vec::new()),
    }
}

fn extract(clauses: Vec<Query>, scripts: &mut Vec<Script>) -> Vec<Query> {
    clauses
        .into_iter()
        .filter_map(|c| match c {
            Query::ScriptQuery { script } => {
                scripts.push(script);
                None
            }
            other => Some(other),
        })
        .collect()
}
