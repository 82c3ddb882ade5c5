//! Search request/response shapes (§6.2, §6.3).

use qx_ast::Query;
use qx_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_size() -> usize {
    10
}

/// Sort direction for a [`SortClause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// One `sort` entry (§6.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortClause {
    /// Field to sort by.
    pub field: String,
    /// Sort direction.
    pub order: SortOrder,
}

/// A `facets` entry (§6.2): a terms aggregation over `field`, counting
/// distinct values among the matched (pre-pagination) hit set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSpec {
    /// Field to bucket by.
    pub field: String,
    /// Maximum number of buckets to return, largest-count first.
    #[serde(default = "default_facet_size")]
    pub size: usize,
}

fn default_facet_size() -> usize {
    10
}

/// One bucket in a facet roll-up (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    /// The bucketed value, stringified.
    pub key: String,
    /// Number of matched hits carrying this value.
    pub count: usize,
}

/// Inbound search request (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The (already-parsed) query to execute.
    #[serde(skip, default = "Query::match_all")]
    pub query: Query,
    /// Maximum number of hits to return.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Offset into the matched set.
    #[serde(default)]
    pub from: usize,
    /// Sort clauses, most significant first. Empty means "sort by score
    /// descending" (the default primitive-search order).
    #[serde(default)]
    pub sort: Vec<SortClause>,
    /// Document fields to include in each hit's `fields` map. Empty means
    /// "all fields the document carries".
    #[serde(default)]
    pub fields: Vec<String>,
    /// Named facet specs to roll up over the matched set.
    #[serde(default)]
    pub facets: HashMap<String, FacetSpec>,
    /// Whether to compute an exact total hit count. When `false`, `total`
    /// still reports the count of the in-memory matched set this
    /// implementation already materialized — there is no early-exit cost to
    /// skip here the way a true top-k search would have (documented
    /// simplification, §9-style).
    #[serde(default = "default_track_total_hits")]
    pub track_total_hits: bool,
}

fn default_track_total_hits() -> bool {
    true
}

impl SearchRequest {
    /// Builds a request for `query` with every other field defaulted.
    pub fn new(query: Query) -> Self {
        SearchRequest {
            query,
            size: default_size(),
            from: 0,
            sort: Vec::new(),
            fields: Vec::new(),
            facets: HashMap::new(),
            track_total_hits: true,
        }
    }
}

/// One outbound hit (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// External document id.
    pub id: String,
    /// Final score after script/function-score adjustment.
    pub score: f64,
    /// Requested (or all, if none requested) document fields.
    pub fields: HashMap<String, Value>,
    /// Reader-internal id, big-endian encoded (§6.3 `index_internal_id:bytes`).
    pub index_internal_id: Vec<u8>,
}

/// Outbound search response (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Hits in final (sorted, paginated) order.
    pub hits: Vec<Hit>,
    /// Count of documents that matched before pagination.
    pub total: usize,
    /// Facet roll-ups, keyed by the name given in the request.
    pub facets: HashMap<String, Vec<FacetBucket>>,
}
