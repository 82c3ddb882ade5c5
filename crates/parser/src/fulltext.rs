//! Full-text strategies: `match`, `match_phrase`, `match_phrase_prefix`,
//! `match_bool_prefix`, `multi_match`, `common`, `query_string`,
//! `simple_query_string`, `more_like_this` (§4.C).
//!
//! `match_phrase_prefix` and `match_bool_prefix` have no dedicated AST
//! representation; they reduce to their nearest primitive the same way
//! `constant_score`/`dis_max`/span queries do (§4.C, §9), trading prefix-
//! aware scoring for a correct-but-coarser match set.

use crate::strategy::ParseContext;
use crate::support::{as_object, boost_of, require_str};
use qx_ast::{normalize_field, Operator, Query};
use qx_core::{Error, Result};
use serde_json::Value as Json;

/// Reads the `field: "text"` shorthand or `field: {query, operator, boost}`
/// object form shared by `match`/`match_phrase`/`match_bool_prefix` (§4.C).
fn field_and_query(kind: &str, body: &Json) -> Result<(String, String, Operator, f64)> {
    let obj = as_object(kind, body)?;
    let (field_raw, spec) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::MissingRequiredField { kind: kind.to_string(), field: "<field>".to_string() })?;
    let field = normalize_field(field_raw);
    match spec {
        Json::String(s) => Ok((field, s.clone(), Operator::Or, 1.0)),
        Json::Object(inner) => {
            let text = inner
                .get("query")
                .and_then(Json::as_str)
                .ok_or_else(|| Error::MissingRequiredField { kind: kind.to_string(), field: "query".to_string() })?
                .to_string();
            let operator = match inner.get("operator").and_then(Json::as_str) {
                Some("AND") | Some("and") => Operator::And,
                _ => Operator::Or,
            };
            let boost = inner.get("boost").and_then(Json::as_f64).unwrap_or(1.0);
            Ok((field, text, operator, boost))
        }
        other => Ok((field, crate::support::json_to_text(other), Operator::Or, 1.0)),
    }
}

pub fn match_query(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, text, operator, boost) = field_and_query("match", body)?;
    Ok(Query::Match { field, text, operator, boost })
}

pub fn match_bool_prefix(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, text, operator, boost) = field_and_query("match_bool_prefix", body)?;
    Ok(Query::Match { field, text, operator, boost })
}

fn field_and_phrase(kind: &str, body: &Json) -> Result<(String, String, u32, f64)> {
    let obj = as_object(kind, body)?;
    let (field_raw, spec) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::MissingRequiredField { kind: kind.to_string(), field: "<field>".to_string() })?;
    let field = normalize_field(field_raw);
    match spec {
        Json::String(s) => Ok((field, s.clone(), 0, 1.0)),
        Json::Object(inner) => {
            let text = inner
                .get("query")
                .and_then(Json::as_str)
                .ok_or_else(|| Error::MissingRequiredField { kind: kind.to_string(), field: "query".to_string() })?
                .to_string();
            let slop = inner.get("slop").and_then(Json::as_u64).unwrap_or(0) as u32;
            let boost = inner.get("boost").and_then(Json::as_f64).unwrap_or(1.0);
            Ok((field, text, slop, boost))
        }
        other => Ok((field, crate::support::json_to_text(other), 0, 1.0)),
    }
}

pub fn match_phrase(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, phrase, slop, boost) = field_and_phrase("match_phrase", body)?;
    Ok(Query::MatchPhrase { field, phrase, slop, boost })
}

pub fn match_phrase_prefix(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, phrase, slop, boost) = field_and_phrase("match_phrase_prefix", body)?;
    Ok(Query::MatchPhrase { field, phrase, slop, boost })
}

pub fn multi_match(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("multi_match", body)?;
    let text = require_str("multi_match", obj, "query")?.to_string();
    let fields = obj
        .get("fields")
        .and_then(Json::as_array)
        .map(|arr| arr.iter().filter_map(Json::as_str).map(normalize_field).collect::<Vec<_>>())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingRequiredField { kind: "multi_match".to_string(), field: "fields".to_string() })?;
    let operator = match obj.get("operator").and_then(Json::as_str) {
        Some("AND") | Some("and") => Operator::And,
        _ => Operator::Or,
    };
    let boost = boost_of(body);
    let children: Vec<Query> = fields
        .into_iter()
        .map(|field| Query::Match { field, text: text.clone(), operator, boost: 1.0 })
        .collect();
    if children.len() == 1 {
        let mut only = children;
        return Ok(match only.pop().expect("len == 1") {
            Query::Match { field, text, operator, .. } => Query::Match { field, text, operator, boost },
            other => other,
        });
    }
    Ok(Query::Disjunction { children, min: 1, boost })
}

pub fn common(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("common", body)?;
    let (field_raw, spec) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::MissingRequiredField { kind: "common".to_string(), field: "<field>".to_string() })?;
    let field = normalize_field(field_raw);
    let spec_obj = as_object("common", spec)?;
    let text = require_str("common", spec_obj, "query")?.to_string();
    let operator = match spec_obj.get("low_freq_operator").and_then(Json::as_str) {
        Some("AND") | Some("and") => Operator::And,
        _ => Operator::Or,
    };
    let boost = spec_obj.get("boost").and_then(Json::as_f64).unwrap_or(1.0);
    Ok(Query::Match { field, text, operator, boost })
}

/// Splits `text` on whitespace, keeping double-quoted spans as single
/// tokens (quotes retained so callers can detect phrase tokens).
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            let mut tok = String::from("\"");
            chars.next();
            for ch in chars.by_ref() {
                tok.push(ch);
                if ch == '"' {
                    break;
                }
            }
            tokens.push(tok);
        } else {
            let mut tok = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                tok.push(ch);
                chars.next();
            }
            tokens.push(tok);
        }
    }
    tokens
}

fn token_clause(field: &str, token: &str) -> Query {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        Query::MatchPhrase {
            field: field.to_string(),
            phrase: token[1..token.len() - 1].to_string(),
            slop: 0,
            boost: 1.0,
        }
    } else {
        Query::Match { field: field.to_string(), text: token.to_string(), operator: Operator::Or, boost: 1.0 }
    }
}

pub fn query_string(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("query_string", body)?;
    let text = require_str("query_string", obj, "query")?;
    let default_field = obj
        .get("default_field")
        .and_then(Json::as_str)
        .map(normalize_field)
        .or_else(|| {
            obj.get("fields")
                .and_then(Json::as_array)
                .and_then(|arr| arr.first())
                .and_then(Json::as_str)
                .map(normalize_field)
        })
        .unwrap_or_else(|| "_all".to_string());

    let mut mode_and = false;
    let mut clauses = Vec::new();
    for token in tokenize(text) {
        match token.as_str() {
            "AND" => {
                mode_and = true;
                continue;
            }
            "OR" => {
                mode_and = false;
                continue;
            }
            _ => {}
        }
        let (field, rest) = match token.find(':') {
            Some(idx) if !token[..idx].is_empty() => (normalize_field(&token[..idx]), &token[idx + 1..]),
            _ => (default_field.clone(), token.as_str()),
        };
        clauses.push(token_clause(&field, rest));
    }

    Ok(match clauses.len() {
        0 => Query::match_all(),
        1 => clauses.pop().expect("len == 1"),
        _ if mode_and => Query::Conjunction { children: clauses, boost: 1.0 },
        _ => Query::Disjunction { children: clauses, min: 1, boost: 1.0 },
    })
}

pub fn simple_query_string(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("simple_query_string", body)?;
    let text = require_str("simple_query_string", obj, "query")?;
    let default_field = obj
        .get("fields")
        .and_then(Json::as_array)
        .and_then(|arr| arr.first())
        .and_then(Json::as_str)
        .map(normalize_field)
        .unwrap_or_else(|| "_all".to_string());

    let mut must = Vec::new();
    let mut must_not = Vec::new();
    let mut should = Vec::new();
    for token in tokenize(text) {
        if let Some(rest) = token.strip_prefix('+') {
            if !rest.is_empty() {
                must.push(token_clause(&default_field, rest));
            }
        } else if let Some(rest) = token.strip_prefix('-') {
            if !rest.is_empty() {
                must_not.push(token_clause(&default_field, rest));
            }
        } else {
            should.push(token_clause(&default_field, &token));
        }
    }

    let boost = boost_of(body);
    if must.is_empty() && must_not.is_empty() && should.len() == 1 {
        return Ok(should.pop().expect("len == 1"));
    }
    if must.is_empty() && must_not.is_empty() && should.is_empty() {
        return Ok(Query::match_all());
    }
    let min_should_match = if should.is_empty() || !must.is_empty() { 0 } else { 1 };
    Ok(Query::Boolean { must, should, must_not, filter: Vec::new(), min_should_match, boost })
}

pub fn more_like_this(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let obj = as_object("more_like_this", body)?;
    let text = obj
        .get("like")
        .and_then(Json::as_array)
        .and_then(|items| items.iter().find_map(Json::as_str))
        .or_else(|| obj.get("like").and_then(Json::as_str));
    Ok(match text {
        Some(t) => Query::Match { field: "_all".to_string(), text: t.to_string(), operator: Operator::Or, boost: 1.0 },
        None => Query::match_all(),
    })
}
