//! Function-score engine (§4.E, §3.3).
//!
//! [`score_document`] is called once per candidate document by the executor
//! when it evaluates a `Query::FunctionScoreQuery`. It has no knowledge of
//! the `IndexReader` or the primitive searchers — it only needs the
//! document's field map, the base score the query produced, and the
//! [`FunctionSpec`] list carried by the AST node.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod functions;

use qx_ast::{BoostMode, FunctionSpec, ScoreMode};
use qx_core::{Context, Value};
use qx_script::ScriptCache;
use std::collections::HashMap;

/// Applies a `function_score` query's functions to one document (§4.E).
///
/// Returns `None` when the combined score falls below `min_score` — the
/// caller drops the document from the result set in that case (§4.E step 5).
///
/// `base_score` is the score the wrapped (`inner`) query already produced
/// for this document. `doc` is the document's field map, used both for
/// `FieldValueFactor`/`Decay`/`Random` and for evaluating each function's
/// `filter` (via the in-memory matcher also used for percolation — a
/// function-score filter only needs to answer "does this doc satisfy this
/// predicate", exactly what that matcher already does).
#[allow(clippy::too_many_arguments)]
pub fn score_document(
    base_score: f64,
    doc: &HashMap<String, Value>,
    functions: &[FunctionSpec],
    score_mode: ScoreMode,
    boost_mode: BoostMode,
    max_boost: f64,
    min_score: Option<f64>,
    boost: f64,
    cache: &ScriptCache,
) -> Option<f64> {
    let weighted: Vec<f64> = functions
        .iter()
        .filter(|f| f.filter.as_deref().map_or(true, |q| qx_join::matches_document(q, doc)))
        .map(|f| {
            let mut ctx = Context::for_document(doc.clone()).with_score(base_score);
            let raw = functions::raw_value(&f.kind, f.weight, doc, &mut ctx, cache).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "function_score function failed, falling back to base score");
                base_score
            });
            raw * f.weight
        })
        .collect();

    let function_score = combine_functions(&weighted, score_mode).min(max_boost);
    let combined = combine_boost(base_score, function_score, boost_mode) * boost;

    match min_score {
        Some(min) if combined < min => None,
        _ => Some(combined),
    }
}

/// Combines per-function weighted values `{w₁…wₙ}` per `score_mode` (§4.E step 3).
///
/// An empty function list combines to `0.0` for every mode except `Multiply`,
/// whose identity element is `1.0` — matching `function_score` with no
/// `functions` array, which is a no-op that leaves the base score unchanged
/// once combined under `boost_mode`.
fn combine_functions(values: &[f64], mode: ScoreMode) -> f64 {
    if values.is_empty() {
        return match mode {
            ScoreMode::Multiply => 1.0,
            _ => 0.0,
        };
    }
    match mode {
        ScoreMode::Multiply => values.iter().product(),
        ScoreMode::Sum => values.iter().sum(),
        ScoreMode::Avg => values.iter().sum::<f64>() / values.len() as f64,
        ScoreMode::First => values[0],
        ScoreMode::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        ScoreMode::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
    }
}

/// Combines the base query score with the combined function score per
/// `boost_mode` (§4.E step 4).
fn combine_boost(base: f64, function: f64, mode: BoostMode) -> f64 {
    match mode {
        BoostMode::Multiply => base * function,
        BoostMode::Replace => function,
        BoostMode::Sum => base + function,
        BoostMode::Avg => (base + function) / 2.0,
        BoostMode::Max => base.max(function),
        BoostMode::Min => base.min(function),
    }
}
