//! Per-keyword strategy dispatch (§4.C, SPEC_FULL.md §C, spec §9).
//!
//! A runtime `HashMap<&str, Box<dyn Strategy>>` is only useful when callers
//! can register new query kinds; §6.1's keyword list is closed, so a
//! compile-time `match` would suffice. The trait-object registry is kept
//! anyway to preserve that extensibility point and because `qx-join`'s
//! registry-based design already establishes the idiom in this workspace.

use qx_ast::Query;
use qx_core::Result;
use qx_join::JoinRegistry;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Parse-time context threaded through every strategy: the join/percolate
/// registry two-phase queries register themselves against (§3.4, §4.G).
pub struct ParseContext<'a> {
    /// Registry two-phase queries (`has_child`/`has_parent`/`percolate`)
    /// register their auxiliary info against.
    pub registry: &'a JoinRegistry,
}

/// One DSL keyword's translation from JSON body to [`Query`].
pub trait QueryStrategy: Send + Sync {
    /// Parses the keyword's body (the value paired with its single top-level
    /// key) into a `Query`.
    fn parse(&self, body: &Json, ctx: &ParseContext) -> Result<Query>;
}

impl<F> QueryStrategy for F
where
    F: Fn(&Json, &ParseContext) -> Result<Query> + Send + Sync,
{
    fn parse(&self, body: &Json, ctx: &ParseContext) -> Result<Query> {
        self(body, ctx)
    }
}

type Table = HashMap<&'static str, std::sync::Arc<dyn QueryStrategy>>;

/// Registers `strategy` under every key in `keys` — several span_*
/// keywords share the single reduction strategy, so this takes a slice
/// rather than one key at a time.
fn insert(table: &mut Table, keys: &[&'static str], strategy: impl QueryStrategy + 'static) {
    let shared: std::sync::Arc<dyn QueryStrategy> = std::sync::Arc::new(strategy);
    for key in keys {
        table.insert(key, shared.clone());
    }
}

/// Builds the closed strategy table for every keyword in §6.1.
fn build_table() -> Table {
    let mut table: Table = HashMap::new();

    insert(&mut table, &["match_all"], crate::leaf::match_all);
    insert(&mut table, &["match_none"], crate::leaf::match_none);
    insert(&mut table, &["term"], crate::leaf::term);
    insert(&mut table, &["terms"], crate::leaf::terms);
    insert(&mut table, &["range"], crate::leaf::range);
    insert(&mut table, &["prefix"], crate::leaf::prefix);
    insert(&mut table, &["wildcard"], crate::leaf::wildcard);
    insert(&mut table, &["fuzzy"], crate::leaf::fuzzy);
    insert(&mut table, &["regexp"], crate::leaf::regexp);
    insert(&mut table, &["exists"], crate::leaf::exists);
    insert(&mut table, &["ids"], crate::leaf::ids);

    insert(&mut table, &["match"], crate::fulltext::match_query);
    insert(&mut table, &["match_phrase"], crate::fulltext::match_phrase);
    insert(
        &mut table,
        &["match_phrase_prefix"],
        crate::fulltext::match_phrase_prefix,
    );
    insert(
        &mut table,
        &["match_bool_prefix"],
        crate::fulltext::match_bool_prefix,
    );
    insert(&mut table, &["multi_match"], crate::fulltext::multi_match);
    insert(&mut table, &["common"], crate::fulltext::common);
    insert(&mut table, &["query_string"], crate::fulltext::query_string);
    insert(
        &mut table,
        &["simple_query_string"],
        crate::fulltext::simple_query_string,
    );
    insert(
        &mut table,
        &["more_like_this"],
        crate::fulltext::more_like_this,
    );

    insert(&mut table, &["bool"], crate::compound::bool_query);
    insert(
        &mut table,
        &["constant_score"],
        crate::compound::constant_score,
    );
    insert(&mut table, &["dis_max"], crate::compound::dis_max);
    insert(&mut table, &["nested"], crate::compound::nested);
    insert(&mut table, &["pinned"], crate::compound::pinned);
    insert(&mut table, &["wrapper"], crate::compound::wrapper);
    insert(
        &mut table,
        &[
            "span_term",
            "span_near",
            "span_or",
            "span_not",
            "span_first",
            "span_containing",
            "span_within",
            "span_multi",
        ],
        crate::compound::span_reduce,
    );

    insert(&mut table, &["geo_bounding_box"], crate::geo::bounding_box);
    insert(&mut table, &["geo_distance"], crate::geo::distance);
    insert(&mut table, &["geo_polygon"], crate::geo::polygon);
    insert(&mut table, &["geo_shape"], crate::geo::shape);

    insert(&mut table, &["script"], crate::scoring::script_query);
    insert(&mut table, &["script_score"], crate::scoring::script_score);
    insert(
        &mut table,
        &["function_score"],
        crate::scoring::function_score,
    );

    insert(&mut table, &["has_child"], crate::twophase::has_child);
    insert(&mut table, &["has_parent"], crate::twophase::has_parent);
    insert(&mut table, &["percolate"], crate::twophase::percolate);

    table
}

/// Returns the process-wide, lazily-built strategy table.
pub fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_closed_list_keyword() {
        let table = table();
        for keyword in [
            "match_all", "match_none", "match", "match_phrase", "match_phrase_prefix",
            "match_bool_prefix", "multi_match", "query_string", "simple_query_string", "common",
            "more_like_this", "term", "terms", "range", "prefix", "wildcard", "fuzzy", "regexp",
            "exists", "ids", "bool", "constant_score", "dis_max", "nested", "geo_bounding_box",
            "geo_distance", "geo_polygon", "geo_shape", "script", "script_score", "function_score",
            "pinned", "wrapper", "percolate", "has_child", "has_parent", "span_term", "span_near",
            "span_or", "span_not", "span_first", "span_containing", "span_within", "span_multi",
        ] {
            assert!(table.contains_key(keyword), "missing strategy for {keyword}");
        }
    }
}
