//! Script-family strategies: `script`, `script_score`, `function_score`
//! (§4.C, §4.E).

use crate::strategy::ParseContext;
use crate::support::{as_object, boost_of, require, require_str};
use qx_ast::function_score::{BoostMode, DecayKind, FunctionSpec, Modifier, ScoreKind, ScoreMode};
use qx_ast::{normalize_field, Query, Script};
use qx_core::{Error, Result, Value};
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

fn parse_script_spec(kind: &str, obj: &Map<String, Json>) -> Result<Script> {
    let source = require_str(kind, obj, "source")?.to_string();
    let mut script = Script::new(source);
    if let Some(lang) = obj.get("lang").and_then(Json::as_str) {
        script.lang = lang.to_string();
    }
    if let Some(params) = obj.get("params").and_then(Json::as_object) {
        let converted: HashMap<String, Value> =
            params.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))).collect();
        script.params = converted;
    }
    Ok(script)
}

/// The `script` query nests its script spec under a `script` key
/// (`{"script": {"script": {"source": ...}}}`); the inner spec is accepted
/// bare too, for callers that already unwrapped one level.
fn script_obj<'a>(kind: &str, obj: &'a Map<String, Json>) -> Result<&'a Map<String, Json>> {
    match obj.get("script") {
        Some(inner) => as_object(kind, inner),
        None => Ok(obj),
    }
}

pub fn script_query(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("script", body)?;
    let spec = script_obj("script", obj)?;
    let script = parse_script_spec("script", spec)?;
    Ok(Query::ScriptQuery { script })
}

pub fn script_score(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("script_score", body)?;
    let query_json = obj.get("query").cloned().unwrap_or_else(|| serde_json::json!({"match_all": {}}));
    let inner = crate::parse_query(&query_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?;
    let script_spec = require("script_score", obj, "script")?;
    let script = parse_script_spec("script_score", as_object("script_score", script_spec)?)?;
    Ok(Query::ScriptScoreQuery {
        inner: Box::new(inner),
        script,
        min_score: obj.get("min_score").and_then(Json::as_f64),
        boost: boost_of(body),
    })
}

fn parse_modifier(value: Option<&Json>) -> Modifier {
    match value.and_then(Json::as_str) {
        Some("log") => Modifier::Log,
        Some("log1p") => Modifier::Log1p,
        Some("log2p") => Modifier::Log2p,
        Some("ln") => Modifier::Ln,
        Some("ln1p") => Modifier::Ln1p,
        Some("ln2p") => Modifier::Ln2p,
        Some("square") => Modifier::Square,
        Some("sqrt") => Modifier::Sqrt,
        Some("reciprocal") => Modifier::Reciprocal,
        _ => Modifier::None,
    }
}

fn parse_decay(obj: &Map<String, Json>, kind: DecayKind) -> Result<ScoreKind> {
    let (field_raw, params) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::MissingRequiredField { kind: "decay".to_string(), field: "<field>".to_string() })?;
    let params_obj = as_object("decay", params)?;
    Ok(ScoreKind::Decay {
        field: normalize_field(field_raw),
        origin: params_obj.get("origin").and_then(Json::as_f64).unwrap_or(0.0),
        scale: params_obj.get("scale").and_then(Json::as_f64).unwrap_or(1.0),
        offset: params_obj.get("offset").and_then(Json::as_f64).unwrap_or(0.0),
        decay: params_obj.get("decay").and_then(Json::as_f64).unwrap_or(0.5),
        kind,
    })
}

/// Dispatches on whichever scoring-kind key is present in `obj`. Returns
/// `Ok(None)` when none of the recognised keys are present, so callers can
/// distinguish "no function here" from a malformed one.
fn try_parse_score_kind(obj: &Map<String, Json>) -> Result<Option<ScoreKind>> {
    if let Some(spec) = obj.get("script_score") {
        let spec_obj = as_object("script_score", spec)?;
        let script_spec = require("script_score", spec_obj, "script")?;
        let script = parse_script_spec("script_score", as_object("script_score", script_spec)?)?;
        return Ok(Some(ScoreKind::ScriptScore { script }));
    }
    if let Some(spec) = obj.get("field_value_factor") {
        let spec_obj = as_object("field_value_factor", spec)?;
        let field = require("field_value_factor", spec_obj, "field")?
            .as_str()
            .ok_or_else(|| Error::InvalidValueType { field: "field".to_string(), reason: "expected a string".to_string() })?;
        return Ok(Some(ScoreKind::FieldValueFactor {
            field: normalize_field(field),
            factor: spec_obj.get("factor").and_then(Json::as_f64).unwrap_or(1.0),
            modifier: parse_modifier(spec_obj.get("modifier")),
            missing: spec_obj.get("missing").and_then(Json::as_f64),
        }));
    }
    if let Some(spec) = obj.get("random_score") {
        let spec_obj = as_object("random_score", spec)?;
        return Ok(Some(ScoreKind::Random {
            seed: spec_obj.get("seed").and_then(Json::as_i64),
            field: spec_obj.get("field").and_then(Json::as_str).map(normalize_field),
        }));
    }
    if let Some(spec) = obj.get("gauss") {
        return Ok(Some(parse_decay(as_object("gauss", spec)?, DecayKind::Gauss)?));
    }
    if let Some(spec) = obj.get("exp") {
        return Ok(Some(parse_decay(as_object("exp", spec)?, DecayKind::Exp)?));
    }
    if let Some(spec) = obj.get("linear") {
        return Ok(Some(parse_decay(as_object("linear", spec)?, DecayKind::Linear)?));
    }
    if obj.contains_key("weight") {
        return Ok(Some(ScoreKind::Weight));
    }
    Ok(None)
}

fn parse_function_spec(json: &Json, ctx: &ParseContext) -> Result<FunctionSpec> {
    let obj = as_object("function_score.functions[]", json)?;
    let filter = match obj.get("filter") {
        Some(f) => Some(Box::new(
            crate::parse_query(f, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?,
        )),
        None => None,
    };
    let weight = obj.get("weight").and_then(Json::as_f64).unwrap_or(1.0);
    let kind = try_parse_score_kind(obj)?.ok_or_else(|| Error::MissingRequiredField {
        kind: "function_score.functions[]".to_string(),
        field: "<scoring kind>".to_string(),
    })?;
    Ok(FunctionSpec { filter, weight, kind })
}

fn parse_score_mode(s: &str) -> ScoreMode {
    match s {
        "sum" => ScoreMode::Sum,
        "avg" => ScoreMode::Avg,
        "first" => ScoreMode::First,
        "max" => ScoreMode::Max,
        "min" => ScoreMode::Min,
        _ => ScoreMode::Multiply,
    }
}

fn parse_boost_mode(s: &str) -> BoostMode {
    match s {
        "replace" => BoostMode::Replace,
        "sum" => BoostMode::Sum,
        "avg" => BoostMode::Avg,
        "max" => BoostMode::Max,
        "min" => BoostMode::Min,
        _ => BoostMode::Multiply,
    }
}

pub fn function_score(body: &Json, ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("function_score", body)?;
    let query_json = obj.get("query").cloned().unwrap_or_else(|| serde_json::json!({"match_all": {}}));
    let inner = crate::parse_query(&query_json, ctx).map_err(|e| Error::InnerQueryFailed(Box::new(e)))?;

    let mut functions = Vec::new();
    if let Some(arr) = obj.get("functions").and_then(Json::as_array) {
        for f in arr {
            functions.push(parse_function_spec(f, ctx)?);
        }
    } else if let Some(kind) = try_parse_score_kind(obj)? {
        functions.push(FunctionSpec { filter: None, weight: 1.0, kind });
    }

    let score_mode = obj.get("score_mode").and_then(Json::as_str).map(parse_score_mode).unwrap_or_default();
    let boost_mode = obj.get("boost_mode").and_then(Json::as_str).map(parse_boost_mode).unwrap_or_default();
    let max_boost = obj.get("max_boost").and_then(Json::as_f64).unwrap_or(f64::MAX);
    let min_score = obj.get("min_score").and_then(Json::as_f64);

    Ok(Query::FunctionScoreQuery {
        inner: Box::new(inner),
        functions,
        score_mode,
        boost_mode,
        max_boost,
        min_score,
        boost: boost_of(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qx_join::JoinRegistry;

    fn ctx(registry: &JoinRegistry) -> ParseContext<'_> {
        ParseContext { registry }
    }

    #[test]
    fn script_query_unwraps_nested_script_key() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"script": {"source": "doc['x'].value > 0"}});
        let q = script_query(&body, &ctx(&registry)).unwrap();
        match q {
            Query::ScriptQuery { script } => assert_eq!(script.source, "doc['x'].value > 0"),
            other => panic!("expected ScriptQuery, got {other:?}"),
        }
    }

    #[test]
    fn script_score_combines_inner_query_and_script() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "query": {"match_all": {}},
            "script": {"source": "_score * doc['price'].value / params.max", "params": {"max": 200}},
        });
        let q = script_score(&body, &ctx(&registry)).unwrap();
        match q {
            Query::ScriptScoreQuery { inner, script, .. } => {
                assert_eq!(*inner, Query::match_all());
                assert_eq!(script.params.get("max"), Some(&Value::F64(200.0)));
            }
            other => panic!("expected ScriptScoreQuery, got {other:?}"),
        }
    }

    #[test]
    fn function_score_defaults_query_to_match_all() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({"functions": [{"weight": 2.0}]});
        let q = function_score(&body, &ctx(&registry)).unwrap();
        match q {
            Query::FunctionScoreQuery { inner, functions, .. } => {
                assert_eq!(*inner, Query::match_all());
                assert_eq!(functions.len(), 1);
                assert!(matches!(functions[0].kind, ScoreKind::Weight));
            }
            other => panic!("expected FunctionScoreQuery, got {other:?}"),
        }
    }

    #[test]
    fn function_score_parses_gauss_decay_function() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "functions": [{
                "gauss": {"price": {"origin": 100, "scale": 50, "offset": 10, "decay": 0.5}}
            }],
            "boost_mode": "multiply"
        });
        let q = function_score(&body, &ctx(&registry)).unwrap();
        match q {
            Query::FunctionScoreQuery { functions, boost_mode, .. } => {
                assert_eq!(boost_mode, BoostMode::Multiply);
                match &functions[0].kind {
                    ScoreKind::Decay { field, origin, scale, offset, decay, kind } => {
                        assert_eq!(field, "price");
                        assert_eq!(*origin, 100.0);
                        assert_eq!(*scale, 50.0);
                        assert_eq!(*offset, 10.0);
                        assert_eq!(*decay, 0.5);
                        assert_eq!(*kind, DecayKind::Gauss);
                    }
                    other => panic!("expected Decay, got {other:?}"),
                }
            }
            other => panic!("expected FunctionScoreQuery, got {other:?}"),
        }
    }

    #[test]
    fn function_score_accepts_top_level_field_value_factor_without_functions_array() {
        let registry = JoinRegistry::new();
        let body = serde_json::json!({
            "field_value_factor": {"field": "popularity", "factor": 1.2, "modifier": "log1p"}
        });
        let q = function_score(&body, &ctx(&registry)).unwrap();
        match q {
            Query::FunctionScoreQuery { functions, .. } => {
                assert_eq!(functions.len(), 1);
                match &functions[0].kind {
                    ScoreKind::FieldValueFactor { field, factor, modifier, .. } => {
                        assert_eq!(field, "popularity");
                        assert_eq!(*factor, 1.2);
                        assert_eq!(*modifier, Modifier::Log1p);
                    }
                    other => panic!("expected FieldValueFactor, got {other:?}"),
                }
            }
            other => panic!("expected FunctionScoreQuery, got {other:?}"),
        }
    }
}
