//! Function-score specs (§3.3).

use crate::query::Query;
use crate::script::Script;
use serde::{Deserialize, Serialize};

/// One scoring function inside a `function_score` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Optional filter restricting which documents this function applies to.
    pub filter: Option<Box<Query>>,
    /// Multiplier applied to this function's raw value (§4.E step 2).
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// The scoring function itself.
    pub kind: ScoreKind,
}

fn default_weight() -> f64 {
    1.0
}

/// The scoring function a [`FunctionSpec`] computes (§3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Evaluate a script against the document; falls back to the original
    /// score on script error (§4.E step 1).
    ScriptScore {
        /// The script to evaluate.
        script: Script,
    },
    /// `v' = (doc[field] or missing) * factor`, then apply `modifier`.
    FieldValueFactor {
        /// Field to read the raw value from.
        field: String,
        /// Multiplier applied before the modifier.
        factor: f64,
        /// Transform applied to `value * factor`.
        modifier: Modifier,
        /// Substituted value when the field is absent from the document.
        missing: Option<f64>,
    },
    /// Distance-based decay curve (linear/exponential/gaussian).
    Decay {
        /// Field the decay distance is computed against.
        field: String,
        /// Reference point distances are measured from.
        origin: f64,
        /// Distance at which the decayed value reaches `decay`.
        scale: f64,
        /// Distance within which no decay is applied.
        offset: f64,
        /// Decay factor at `scale` distance from `origin` (beyond `offset`).
        decay: f64,
        /// Shape of the decay curve.
        kind: DecayKind,
    },
    /// Deterministic pseudo-random value in `[0, 1)`.
    Random {
        /// Seed for the pseudo-hash.
        seed: Option<i64>,
        /// Field contributing to the hash (in addition to the seed).
        field: Option<String>,
    },
    /// Returns the function's `weight` directly.
    Weight,
}

/// `field_value_factor` modifiers (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// No transform.
    None,
    /// `log10(value)`, undefined (pass-through) for non-positive input.
    Log,
    /// `log10(1 + value)`.
    Log1p,
    /// `log10(2 + value)`.
    Log2p,
    /// Natural log, undefined (pass-through) for non-positive input.
    Ln,
    /// `ln(1 + value)`.
    Ln1p,
    /// `ln(2 + value)`.
    Ln2p,
    /// `value^2`.
    Square,
    /// `sqrt(value)`, undefined (pass-through) for negative input.
    Sqrt,
    /// `1 / value`.
    Reciprocal,
}

/// Shape of a [`ScoreKind::Decay`] curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayKind {
    /// Linear ramp to zero at `scale` beyond `offset`.
    Linear,
    /// Exponential decay.
    Exp,
    /// Gaussian decay.
    Gauss,
}

/// How per-function scores combine into a single function-score value
/// (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Product of all function values.
    Multiply,
    /// Sum of all function values.
    Sum,
    /// Arithmetic mean.
    Avg,
    /// The first function's value.
    First,
    /// The maximum function value.
    Max,
    /// The minimum function value.
    Min,
}

impl Default for ScoreMode {
    fn default() -> Self {
        ScoreMode::Multiply
    }
}

/// How the combined function score combines with the original query score
/// (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostMode {
    /// `original * function`.
    Multiply,
    /// `function` (original score discarded).
    Replace,
    /// `original + function`.
    Sum,
    /// `(original + function) / 2`.
    Avg,
    /// `max(original, function)`.
    Max,
    /// `min(original, function)`.
    Min,
}

impl Default for BoostMode {
    fn default() -> Self {
        BoostMode::Multiply
    }
}
