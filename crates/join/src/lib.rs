//! Join/percolate registry and in-memory percolation matcher (§3.4, §4.G, §4.H).
//!
//! This crate provides:
//! - `JoinRegistry`: the arena-backed side table attaching `JoinQueryInfo`/
//!   `PercolateInfo` to `Query::Placeholder` nodes
//! - `find_join_queries`: a `Conjunction`/`Disjunction`/`Boolean` tree walk
//!   that collects every placeholder's registered info reachable from an
//!   AST root, for callers that want to inspect a query's auxiliary
//!   parameters without resolving it (the executor itself resolves
//!   placeholders via direct recursion in `qx-executor::resolve`, not this
//!   walk — see its module docs)
//! - `matches_document`: the in-memory matcher used only during percolation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod percolate;
pub mod registry;

pub use percolate::matches_document;
pub use registry::{find_join_queries, JoinKind, JoinQueryInfo, JoinRegistry, PercolateInfo, RegistryEntry};
