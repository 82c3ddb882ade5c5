//! Per-function raw value computation (§4.E step 1).
//!
//! Each [`ScoreKind`] produces a raw value `fᵢ` from a document's field map.
//! Errors here are caught by the caller (`score_document` in `lib.rs`) and
//! downgraded to a neutral fallback rather than aborting the whole request
//! (§4.E: "errors in one function must not abort the query").

use qx_ast::{DecayKind, Modifier, ScoreKind};
use qx_core::{Context, Result, Value};
use qx_script::ScriptCache;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Computes the raw value `fᵢ` for one scoring function against `doc`.
///
/// `ctx` carries the document/source/params/score already seeded by the
/// caller; only `ScriptKind::ScriptScore` actually consults it, the other
/// kinds read straight from `doc`.
pub fn raw_value(kind: &ScoreKind, weight: f64, doc: &HashMap<String, Value>, ctx: &mut Context, cache: &ScriptCache) -> Result<f64> {
    match kind {
        ScoreKind::ScriptScore { script } => {
            ctx.params.extend(script.params.clone());
            qx_script::run_score(cache, &script.source, ctx)
        }
        ScoreKind::FieldValueFactor { field, factor, modifier, missing } => {
            Ok(field_value_factor(doc, field, *factor, *modifier, *missing))
        }
        ScoreKind::Decay { field, origin, scale, offset, decay, kind } => {
            Ok(decay_value(doc, field, *origin, *scale, *offset, *decay, *kind))
        }
        ScoreKind::Random { seed, field } => Ok(random_value(*seed, field.as_deref(), doc)),
        // Literal reading of §3.3/§4.E: the function's raw value for `Weight`
        // is the weight itself, which step 2 then multiplies by `weight`
        // again — see DESIGN.md for why this (slightly redundant) reading
        // was kept rather than silently "fixed" to `1.0`.
        ScoreKind::Weight => Ok(weight),
    }
}

fn field_value_factor(doc: &HashMap<String, Value>, field: &str, factor: f64, modifier: Modifier, missing: Option<f64>) -> f64 {
    let v = doc
        .get(field)
        .map(|v| v.to_f64())
        .unwrap_or_else(|| missing.unwrap_or(0.0));
    let v = v * factor;
    apply_modifier(v, modifier)
}

fn apply_modifier(v: f64, modifier: Modifier) -> f64 {
    match modifier {
        Modifier::None => v,
        Modifier::Log => if v > 0.0 { v.log10() } else { v },
        Modifier::Log1p => (1.0 + v).log10(),
        Modifier::Log2p => (2.0 + v).log10(),
        Modifier::Ln => if v > 0.0 { v.ln() } else { v },
        Modifier::Ln1p => (1.0 + v).ln(),
        Modifier::Ln2p => (2.0 + v).ln(),
        Modifier::Square => v * v,
        Modifier::Sqrt => if v >= 0.0 { v.sqrt() } else { v },
        Modifier::Reciprocal => if v == 0.0 { 0.0 } else { 1.0 / v },
    }
}

fn decay_value(doc: &HashMap<String, Value>, field: &str, origin: f64, scale: f64, offset: f64, decay: f64, kind: DecayKind) -> f64 {
    let value = doc.get(field).map(|v| v.to_f64()).unwrap_or(origin);
    let distance = ((value - origin).abs() - offset).max(0.0);
    if scale <= 0.0 {
        return if distance == 0.0 { 1.0 } else { 0.0 };
    }
    match kind {
        DecayKind::Linear => (1.0 - (distance / scale) * (1.0 - decay)).max(0.0),
        DecayKind::Exp => decay.powf(distance / scale),
        DecayKind::Gauss => {
            let sigma = scale / (2.0 * (1.0 / decay).ln()).sqrt();
            (-(distance * distance) / (2.0 * sigma * sigma)).exp()
        }
    }
}

/// Deterministic pseudo-hash over `(seed, doc[field])`, normalized to `[0, 1)`.
///
/// Not cryptographically meaningful — `random_score` only needs a stable,
/// reproducible ordering per `(seed, document)` pair, which `DefaultHasher`
/// provides without pulling in a dedicated hashing dependency.
fn random_value(seed: Option<i64>, field: Option<&str>, doc: &HashMap<String, Value>) -> f64 {
    let mut hasher = DefaultHasher::new();
    seed.unwrap_or(0).hash(&mut hasher);
    if let Some(field) = field {
        if let Some(value) = doc.get(field) {
            value.to_text().hash(&mut hasher);
        }
    }
    let hashed = hasher.finish();
    (hashed as f64) / (u64::MAX as f64)
}
