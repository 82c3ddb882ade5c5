//! The query AST (§3.1, §4.B).
//!
//! `Query` is value-like: compound variants own their children directly, so
//! there are no cycles and no reference counting. The only indirection is
//! `Placeholder`, which carries a [`PlaceholderId`] instead of embedding the
//! two-phase query directly — the registry in `qx-join` holds the actual
//! `JoinQueryInfo`/`PercolateInfo` keyed by that id (§9 design notes).

use crate::function_score::{BoostMode, FunctionSpec, ScoreMode};
use crate::script::Script;
use serde::{Deserialize, Serialize};

/// Boolean combinator for [`Query::Match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Any query term may match.
    Or,
    /// Every query term must match.
    And,
}

impl Default for Operator {
    fn default() -> Self {
        Operator::Or
    }
}

/// Opaque identity of a [`Query::Placeholder`] node, indexing into the
/// join/percolate registry maintained by `qx-join`.
///
/// Using an arena index rather than node identity/pointer equality means a
/// cloned AST keeps a stable, meaningful key: two clones of the same
/// placeholder refer to the same registry entry, which is exactly what the
/// parser/executor need and sidesteps lifetime coupling entirely (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceholderId(pub u32);

/// Raw geometry payload for geo queries.
///
/// The primitive geo searchers live in the external `IndexReader` (§1), so
/// the core only needs to carry structured-enough data to hand off; the
/// geometry itself is kept as JSON rather than re-modeled here.
pub type GeoParams = serde_json::Value;

/// The query AST (§3.1). Every variant's contract is documented at its
/// definition site in spec §3.1/§4.B; this type only carries data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Matches every document.
    MatchAll {
        /// Score contribution.
        boost: f64,
    },
    /// Matches no document.
    MatchNone {
        /// Present for symmetry with `MatchAll`; has no scoring effect.
        boost: f64,
    },
    /// Exact token match.
    Term {
        /// Normalized field name.
        field: String,
        /// Token to match, as a string.
        value: String,
        /// Score contribution.
        boost: f64,
    },
    /// Any-of term match.
    Terms {
        /// Normalized field name.
        field: String,
        /// Candidate token values.
        values: Vec<String>,
        /// Score contribution.
        boost: f64,
    },
    /// Inclusive/exclusive numeric range.
    NumericRange {
        /// Normalized field name.
        field: String,
        /// Inclusive/exclusive lower bound, if any.
        min: Option<f64>,
        /// Inclusive/exclusive upper bound, if any.
        max: Option<f64>,
        /// Whether `min` is inclusive.
        min_inclusive: bool,
        /// Whether `max` is inclusive.
        max_inclusive: bool,
        /// Score contribution.
        boost: f64,
    },
    /// Lexicographic string range.
    TermRange {
        /// Normalized field name.
        field: String,
        /// Lower bound, if any.
        min: Option<String>,
        /// Upper bound, if any.
        max: Option<String>,
        /// Whether `min` is inclusive.
        min_inclusive: bool,
        /// Whether `max` is inclusive.
        max_inclusive: bool,
        /// Score contribution.
        boost: f64,
    },
    /// Prefix match.
    Prefix {
        /// Normalized field name.
        field: String,
        /// Prefix to match.
        prefix: String,
        /// Score contribution.
        boost: f64,
    },
    /// Wildcard pattern match (`?`/`*`).
    Wildcard {
        /// Normalized field name.
        field: String,
        /// Wildcard pattern.
        pattern: String,
        /// Score contribution.
        boost: f64,
    },
    /// Regular-expression match.
    Regexp {
        /// Normalized field name.
        field: String,
        /// Regex pattern.
        pattern: String,
        /// Score contribution.
        boost: f64,
    },
    /// Fuzzy (edit-distance) match.
    Fuzzy {
        /// Normalized field name.
        field: String,
        /// Value to fuzzy-match against.
        value: String,
        /// Maximum edit distance.
        edits: u32,
        /// Score contribution.
        boost: f64,
    },
    /// Analyzed full-text match.
    Match {
        /// Normalized field name.
        field: String,
        /// Query text.
        text: String,
        /// Whether all or any terms must match.
        operator: Operator,
        /// Score contribution.
        boost: f64,
    },
    /// Analyzed phrase match with positional slop.
    MatchPhrase {
        /// Normalized field name.
        field: String,
        /// Phrase text.
        phrase: String,
        /// Allowed term-position slop.
        slop: u32,
        /// Score contribution.
        boost: f64,
    },
    /// Matches documents where the field is present.
    Exists {
        /// Normalized field name.
        field: String,
    },
    /// Matches documents by internal id.
    Ids {
        /// Candidate document ids.
        ids: Vec<String>,
        /// Score contribution.
        boost: f64,
    },
    /// Logical AND of children.
    Conjunction {
        /// Children, all of which must match.
        children: Vec<Query>,
        /// Score contribution.
        boost: f64,
    },
    /// Logical OR of children with a minimum-should-match threshold.
    Disjunction {
        /// Candidate children.
        children: Vec<Query>,
        /// Minimum number of children that must match (≥ 1 to contribute).
        min: u32,
        /// Score contribution.
        boost: f64,
    },
    /// Elasticsearch-style compound boolean query.
    Boolean {
        /// Clauses that must match and contribute to score.
        must: Vec<Query>,
        /// Clauses that optionally match and contribute to score.
        should: Vec<Query>,
        /// Clauses that must not match.
        must_not: Vec<Query>,
        /// Clauses that must match but do not contribute to score.
        filter: Vec<Query>,
        /// Minimum number of `should` clauses that must match.
        min_should_match: u32,
        /// Score contribution.
        boost: f64,
    },
    /// Internal shortcut: matches an explicit set of document ids, produced
    /// by two-phase query collapse (§4.H).
    DocId {
        /// Matching document ids.
        ids: Vec<String>,
        /// Score contribution.
        boost: f64,
    },
    /// Geo bounding-box match; geometry is opaque to this core (§1).
    GeoBoundingBox {
        /// Normalized field name.
        field: String,
        /// Raw geometry parameters.
        params: GeoParams,
        /// Score contribution.
        boost: f64,
    },
    /// Geo distance match; geometry is opaque to this core (§1).
    GeoDistance {
        /// Normalized field name.
        field: String,
        /// Raw geometry parameters.
        params: GeoParams,
        /// Score contribution.
        boost: f64,
    },
    /// Geo polygon match; geometry is opaque to this core (§1).
    GeoPolygon {
        /// Normalized field name.
        field: String,
        /// Raw geometry parameters.
        params: GeoParams,
        /// Score contribution.
        boost: f64,
    },
    /// Geo shape match (including `circle`); geometry is opaque (§1).
    GeoShape {
        /// Normalized field name.
        field: String,
        /// Raw geometry parameters.
        params: GeoParams,
        /// Score contribution.
        boost: f64,
    },
    /// Filter semantics: a document matches iff the script evaluates truthy.
    ScriptQuery {
        /// The filter script.
        script: Script,
    },
    /// Wraps an inner query, replacing/adjusting its score via a script.
    ScriptScoreQuery {
        /// Inner query supplying the candidate set and original score.
        inner: Box<Query>,
        /// Scoring script.
        script: Script,
        /// Documents scoring below this are dropped.
        min_score: Option<f64>,
        /// Score contribution.
        boost: f64,
    },
    /// Composes the inner query's score with a list of scoring functions
    /// (§3.3, §4.E).
    FunctionScoreQuery {
        /// Inner query supplying the candidate set and original score.
        inner: Box<Query>,
        /// Scoring functions to combine.
        functions: Vec<FunctionSpec>,
        /// How per-function scores combine with each other.
        score_mode: ScoreMode,
        /// How the combined function score combines with the original score.
        boost_mode: BoostMode,
        /// Clamp applied to the combined function score before boost_mode.
        max_boost: f64,
        /// Documents scoring below this are dropped.
        min_score: Option<f64>,
        /// Score contribution.
        boost: f64,
    },
    /// Stand-in for a two-phase query (`has_child`/`has_parent`/`percolate`)
    /// whose concrete match set is not known until the executor resolves it
    /// against the `IndexReader` (§4.H, §9).
    Placeholder {
        /// Score contribution.
        boost: f64,
        /// Registry key for the associated `JoinQueryInfo`/`PercolateInfo`.
        key: PlaceholderId,
    },
}

impl Query {
    /// The query's own boost factor, where applicable. Leaf queries with no
    /// meaningful boost (`Exists`) return `1.0`.
    pub fn boost(&self) -> f64 {
        match self {
            Query::MatchAll { boost }
            | Query::MatchNone { boost }
            | Query::Term { boost, .. }
            | Query::Terms { boost, .. }
            | Query::NumericRange { boost, .. }
            | Query::TermRange { boost, .. }
            | Query::Prefix { boost, .. }
            | Query::Wildcard { boost, .. }
            | Query::Regexp { boost, .. }
            | Query::Fuzzy { boost, .. }
            | Query::Match { boost, .. }
            | Query::MatchPhrase { boost, .. }
            | Query::Ids { boost, .. }
            | Query::Conjunction { boost, .. }
            | Query::Disjunction { boost, .. }
            | Query::Boolean { boost, .. }
            | Query::DocId { boost, .. }
            | Query::GeoBoundingBox { boost, .. }
            | Query::GeoDistance { boost, .. }
            | Query::GeoPolygon { boost, .. }
            | Query::GeoShape { boost, .. }
            | Query::ScriptScoreQuery { boost, .. }
            | Query::FunctionScoreQuery { boost, .. }
            | Query::Placeholder { boost, .. } => *boost,
            Query::Exists { .. } | Query::ScriptQuery { .. } => 1.0,
        }
    }

    /// Convenience constructor for the common `boost = 1.0` case.
    pub fn match_all() -> Query {
        Query::MatchAll { boost: 1.0 }
    }

    /// Convenience constructor for the common `boost = 1.0` case.
    pub fn match_none() -> Query {
        Query::MatchNone { boost: 1.0 }
    }

    /// Shallow children, for traversal (optimizer rewrites, join-registry
    /// lookups, field-rewrite for `nested`). Does not recurse into `inner`
    /// of wrapper queries on purpose — callers that need that also match on
    /// those variants explicitly.
    pub fn children(&self) -> &[Query] {
        match self {
            Query::Conjunction { children, .. } => children,
            Query::Disjunction { children, .. } => children,
            _ => &[],
        }
    }

    /// Mutable shallow children; see [`Query::children`].
    pub fn children_mut(&mut self) -> &mut [Query] {
        match self {
            Query::Conjunction { children, .. } => children,
            Query::Disjunction { children, .. } => children,
            _ => &mut [],
        }
    }
}
