//! Shared types for the query-execution core.
//!
//! This crate defines the foundational types used throughout the
//! DSL-parsing, optimization, scripting, and execution crates:
//! - Value: dynamically typed document/script value
//! - Context: per-document evaluation context
//! - Error: the unified error taxonomy (§7)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::{Context, Value};
