//! # qx
//!
//! An Elasticsearch-compatible query-execution core: DSL parsing, a rewrite
//! optimizer, a Painless-like script engine, a function-score engine, and
//! two-phase join/percolate resolution, all driven by an execution layer
//! that searches against an embedding index library's [`IndexReader`].
//!
//! # Quick start
//!
//! ```no_run
//! use qx::{Executor, ExecutionContext, JoinRegistry, SearchRequest};
//!
//! fn run(reader: &dyn qx::IndexReader) -> qx::Result<()> {
//!     let registry = JoinRegistry::new();
//!     let query = qx::parse(&serde_json::json!({"term": {"category": "books"}}), &registry)?;
//!     let query = qx::optimize(query);
//!
//!     let executor = Executor::new();
//!     let request = SearchRequest::new(query);
//!     let response = executor.execute(&registry, request, reader, &ExecutionContext::new())?;
//!     println!("{} hits", response.total);
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! | Stage | Crate | Purpose |
//! |---|---|---|
//! | Parse | `qx-parser` | DSL JSON → [`Query`] AST |
//! | Optimize | `qx-optimizer` | Semantics-preserving rewrites |
//! | Resolve | `qx-executor::resolve` | Collapse `has_child`/`has_parent`/`percolate` placeholders |
//! | Search | caller's [`IndexReader`] | Primitive structural search (out of scope here) |
//! | Score | `qx-script` / `qx-scoring` | `script_score` / `function_score` |
//!
//! Internal crates (`qx-core`, `qx-ast`, `qx-join`) provide the shared types
//! every stage above is built from; only the surface re-exported here is
//! considered stable.

pub use qx_ast::{
    BoostMode, DecayKind, FunctionSpec, GeoParams, Modifier, Operator, PlaceholderId, Query,
    Script, ScoreKind, ScoreMode,
};
pub use qx_core::{Context, Error, Result, Value};
pub use qx_executor::{
    CancellationToken, ExecutionContext, Executor, ExecutorConfig, ExecutorConfigBuilder,
    FacetBucket, FacetSpec, Hit, IndexReader, InternalId, SearchHit, SearchRequest,
    SearchResponse, SortClause, SortOrder,
};
pub use qx_join::{find_join_queries, matches_document, JoinKind, JoinQueryInfo, JoinRegistry, PercolateInfo, RegistryEntry};
pub use qx_optimizer::optimize;
pub use qx_parser::parse;
pub use qx_script::{run, run_filter, run_score, CacheStats, ScriptCache, ScriptCacheConfig};
