//! The `IndexReader` seam (§1, component A).
//!
//! Everything in this crate is written against this trait rather than any
//! concrete storage engine — the on-disk inverted index, its primitive
//! searchers (term/range/prefix/wildcard/regexp/geo/boolean/conjunction/
//! disjunction/match-all/match-none) and document lookup are out of scope
//! (§1) and assumed to be supplied by the embedding index library.
//!
//! `search` is handed an already fully-collapsed [`Query`] (no
//! `Placeholder`s remain — the executor resolves those itself via
//! [`crate::resolve`] before ever calling `search`) and returns scored
//! matches; `fetch_fields` is the per-document field-map lookup the script
//! and function-score engines evaluate against.

use qx_ast::Query;
use qx_core::{Result, Value};
use std::collections::HashMap;

/// Opaque internal document identifier assigned by the index library.
///
/// Distinct from the external, user-supplied document id (§6.3's `id`
/// field) — internal ids are dense and reader-specific, used only to look
/// up field maps via [`IndexReader::fetch_fields`].
pub type InternalId = u64;

/// One scored match produced by [`IndexReader::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Reader-assigned internal id, used for field lookups.
    pub internal_id: InternalId,
    /// The document's external (user-facing) id.
    pub external_id: String,
    /// Base relevance score the primitive layer assigned this match.
    pub score: f64,
}

/// The primitive-query layer the execution driver searches against (§1).
///
/// Implementations are expected to be cheap to clone/share (`Arc`) and
/// thread-safe for concurrent reads (§5: "assumed externally thread-safe
/// for reads").
pub trait IndexReader: Send + Sync {
    /// Executes `query` (containing no `Placeholder` nodes) and returns
    /// every matching document, scored. Implementations may cap how many
    /// hits they actually materialize; `page_size` is a hint for two-phase
    /// auxiliary searches (§4.H asks for `page size >= 10000`) and is not a
    /// hard limit the caller depends on for correctness.
    fn search(&self, query: &Query, page_size: usize) -> Result<Vec<SearchHit>>;

    /// Looks up the stored field map for one internal id. Returns `None`
    /// when the document has since been deleted (§7 `DocumentNotFound`,
    /// swallowed per-document rather than surfaced).
    fn fetch_fields(&self, internal_id: InternalId) -> Result<Option<HashMap<String, Value>>>;
}
