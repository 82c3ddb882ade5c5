//! Join/percolate registry (§3.4, §4.G).
//!
//! Rather than a process-wide map keyed by AST-node pointer identity (which
//! bakes language-specific identity semantics into the design), this
//! registry is an arena: [`JoinRegistry::register`] hands back a
//! [`PlaceholderId`] that indexes a slot in an internal `Vec`. A registry is
//! owned per search request (or per long-lived executor, for requests that
//! share one), so there is no cross-request lifetime coupling and no need
//! for a sweep-on-drop discipline — the arena and the AST it was built
//! alongside are dropped together.

use parking_lot::RwLock;
use qx_ast::{PlaceholderId, Query};
use qx_core::Value;
use std::collections::HashMap;

/// Which side of a join the placeholder represents (§3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `has_child`: find parents whose children match.
    HasChild,
    /// `has_parent`: find children whose parent matches.
    HasParent,
}

/// Auxiliary-search parameters for a `has_child`/`has_parent` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinQueryInfo {
    /// Which side of the join this is.
    pub kind: JoinKind,
    /// The child or parent type name to restrict the auxiliary search to.
    pub type_name: String,
    /// The inner query to run as part of the auxiliary search.
    pub inner: Query,
    /// Boost to apply to the collapsed result.
    pub boost: f64,
}

/// Auxiliary-match parameters for a `percolate` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct PercolateInfo {
    /// Field holding the indicator that a document is a stored percolator
    /// query (the field name used to look up `_has_percolator` documents).
    pub field: String,
    /// A single candidate document to percolate, if provided inline.
    pub document: Option<HashMap<String, Value>>,
    /// Multiple candidate documents to percolate.
    pub documents: Vec<HashMap<String, Value>>,
    /// Boost to apply to the collapsed result.
    pub boost: f64,
}

/// Either kind of auxiliary info a placeholder may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEntry {
    /// `has_child`/`has_parent` auxiliary parameters.
    Join(JoinQueryInfo),
    /// `percolate` auxiliary parameters.
    Percolate(PercolateInfo),
}

/// Arena-backed registry mapping [`PlaceholderId`] to its auxiliary info.
///
/// Guarded by a single `RwLock`: the parser takes the writer lock once per
/// registration, the executor takes the reader lock once per lookup (§5).
#[derive(Debug, Default)]
pub struct JoinRegistry {
    entries: RwLock<Vec<Option<RegistryEntry>>>,
}

impl JoinRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        JoinRegistry {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Registers a new entry, returning the `PlaceholderId` to embed in the
    /// AST's `Query::Placeholder` node.
    ///
    /// Invariant (§3.1): the returned id is registered exactly once until
    /// the executor collapses the placeholder via [`JoinRegistry::unregister`].
    pub fn register(&self, entry: RegistryEntry) -> PlaceholderId {
        let mut entries = self.entries.write();
        let id = entries.len() as u32;
        entries.push(Some(entry));
        PlaceholderId(id)
    }

    /// Reads the entry for a placeholder, if it hasn't been collapsed yet.
    pub fn get(&self, id: PlaceholderId) -> Option<RegistryEntry> {
        self.entries.read().get(id.0 as usize)?.clone()
    }

    /// Removes and returns the entry for a placeholder. Called by the
    /// executor once it has collapsed the placeholder into a concrete
    /// `DocId`/`MatchNone` query (§4.H).
    pub fn unregister(&self, id: PlaceholderId) -> Option<RegistryEntry> {
        let mut entries = self.entries.write();
        entries.get_mut(id.0 as usize)?.take()
    }

    /// Number of entries still registered (not yet collapsed).
    pub fn len(&self) -> usize {
        self.entries.read().iter().filter(|e| e.is_some()).count()
    }

    /// True if no entries remain registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walks `Conjunction`/`Disjunction`/`Boolean` children of `root` (§4.G) and
/// collects every `Placeholder` id reachable without crossing into an
/// unrelated wrapper query's `inner` (those are resolved independently by
/// the executor when it reaches them).
pub fn find_join_queries(root: &Query) -> Vec<PlaceholderId> {
    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

fn walk(query: &Query, out: &mut Vec<PlaceholderId>) {
    match query {
        Query::Placeholder { key, .. } => out.push(*key),
        Query::Conjunction { children, .. } | Query::Disjunction { children, .. } => {
            for child in children {
                walk(child, out);
            }
        }
        Query::Boolean {
            must,
            should,
            must_not,
            filter,
            ..
        } => {
            for child in must.iter().chain(should).chain(must_not).chain(filter) {
                walk(child, out);
            }
        }
        _ => {}
    }
}
