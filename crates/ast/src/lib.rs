//! Query AST, script, and function-score types for the query-execution core.
//!
//! This crate has no operations beyond construction (§4.B) — parsing lives
//! in `qx-parser`, rewriting in `qx-optimizer`, evaluation in `qx-script`
//! and `qx-scoring`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod function_score;
pub mod query;
pub mod script;

pub use field::normalize_field;
pub use function_score::{BoostMode, DecayKind, FunctionSpec, Modifier, ScoreKind, ScoreMode};
pub use query::{GeoParams, Operator, PlaceholderId, Query};
pub use script::Script;
