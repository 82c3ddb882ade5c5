//! Built-in namespaces and method tables for the script engine (§4.F).

use chrono::{Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use qx_core::{Error, Result, Value};

/// Evaluates a `Math.<method>(args)` call.
pub fn call_math(method: &str, args: &[f64]) -> Result<f64> {
    let arg = |i: usize| args.get(i).copied().unwrap_or(0.0);
    Ok(match method {
        "abs" => arg(0).abs(),
        "ceil" => arg(0).ceil(),
        "floor" => arg(0).floor(),
        "round" => arg(0).round(),
        "sqrt" => arg(0).sqrt(),
        "log" => arg(0).ln(),
        "log10" => arg(0).log10(),
        "exp" => arg(0).exp(),
        "sin" => arg(0).sin(),
        "cos" => arg(0).cos(),
        "tan" => arg(0).tan(),
        "pow" => arg(0).powf(arg(1)),
        "min" => arg(0).min(arg(1)),
        "max" => arg(0).max(arg(1)),
        "random" => {
            // Painless's Math.random() is [0,1); scripts calling it are
            // inherently non-deterministic, so a fixed generator suffices.
            use std::time::{SystemTime, UNIX_EPOCH};
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos();
            (nanos % 1_000_000) as f64 / 1_000_000.0
        }
        other => return Err(Error::UnsupportedMethod(format!("Math.{other}"))),
    })
}

/// Evaluates a `Date.<method>(args)` call (epoch milliseconds throughout).
pub fn call_date(method: &str, args: &[Value], now: i64) -> Result<Value> {
    match method {
        "now" => Ok(Value::F64(now as f64)),
        "parse" => {
            let raw = args.first().cloned().unwrap_or(Value::Null);
            match raw {
                Value::F64(n) => Ok(Value::F64(n)),
                Value::String(s) => parse_date_string(&s).map(|ms| Value::F64(ms as f64)),
                _ => Err(Error::DateParseFailure("Date.parse expects a string or number".into())),
            }
        }
        "add" => date_shift(args, 1),
        "subtract" => date_shift(args, -1),
        other => Err(Error::UnsupportedMethod(format!("Date.{other}"))),
    }
}

fn date_shift(args: &[Value], sign: i64) -> Result<Value> {
    let ts = args.first().map(Value::to_f64).unwrap_or(0.0) as i64;
    let field = args.get(1).map(Value::to_text).unwrap_or_default();
    let n = args.get(2).map(Value::to_f64).unwrap_or(0.0) as i64 * sign;
    let millis = match field.as_str() {
        "year" => n * 365 * 24 * 3_600_000,
        "month" => n * 30 * 24 * 3_600_000,
        "day" => n * 24 * 3_600_000,
        "hour" => n * 3_600_000,
        "minute" => n * 60_000,
        "second" => n * 1000,
        "ms" => n,
        other => return Err(Error::UnsupportedMethod(format!("Date field '{other}'"))),
    };
    Ok(Value::F64((ts + millis) as f64))
}

fn parse_date_string(s: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp_millis())
        .map_err(|_| Error::DateParseFailure(s.to_string()))
}

/// Formats epoch-millisecond `ts` using a `SimpleDateFormat`-style `pattern`,
/// recognising the `yyyy MM dd HH mm ss` field codes (§4.F).
pub fn simple_date_format(pattern: &str, ts: i64) -> Result<String> {
    let dt = Utc
        .timestamp_millis_opt(ts)
        .single()
        .ok_or_else(|| Error::DateParseFailure(format!("invalid timestamp {ts}")))?;
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run_len = {
            let mut j = i;
            while j < chars.len() && chars[j] == c {
                j += 1;
            }
            j - i
        };
        match c {
            'y' => {
                out.push_str(&format!("{:0width$}", dt.year(), width = run_len.max(4)));
            }
            'M' => out.push_str(&format!("{:02}", dt.month())),
            'd' => out.push_str(&format!("{:02}", dt.day())),
            'H' => out.push_str(&format!("{:02}", dt.hour())),
            'm' => out.push_str(&format!("{:02}", dt.minute())),
            's' => out.push_str(&format!("{:02}", dt.second())),
            other => {
                for _ in 0..run_len {
                    out.push(other);
                }
            }
        }
        i += run_len;
    }
    Ok(out)
}

/// Evaluates a string method call in the subset listed in §4.F.
pub fn call_string_method(receiver: &str, method: &str, args: &[Value]) -> Result<Value> {
    let arg_str = |i: usize| args.get(i).map(Value::to_text).unwrap_or_default();
    let arg_f64 = |i: usize| args.get(i).map(Value::to_f64).unwrap_or(0.0);
    Ok(match method {
        "length" => Value::F64(receiver.chars().count() as f64),
        "contains" => Value::Bool(receiver.contains(&arg_str(0))),
        "startsWith" => Value::Bool(receiver.starts_with(&arg_str(0))),
        "endsWith" => Value::Bool(receiver.ends_with(&arg_str(0))),
        "toLowerCase" => Value::String(receiver.to_lowercase()),
        "toUpperCase" => Value::String(receiver.to_uppercase()),
        "trim" => Value::String(receiver.trim().to_string()),
        "substring" => {
            let chars: Vec<char> = receiver.chars().collect();
            let start = arg_f64(0).max(0.0) as usize;
            let end = if args.len() > 1 {
                (arg_f64(1) as usize).min(chars.len())
            } else {
                chars.len()
            };
            if start >= end || start > chars.len() {
                Value::String(String::new())
            } else {
                Value::String(chars[start..end].iter().collect())
            }
        }
        "indexOf" => {
            let needle = arg_str(0);
            match receiver.find(&needle) {
                Some(byte_idx) => Value::F64(receiver[..byte_idx].chars().count() as f64),
                None => Value::F64(-1.0),
            }
        }
        "replace" => Value::String(receiver.replace(&arg_str(0), &arg_str(1))),
        "replaceAll" => Value::String(receiver.replace(&arg_str(0), &arg_str(1))),
        "split" => Value::Array(
            receiver
                .split(&arg_str(0) as &str)
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        "matches" => {
            let pattern = arg_str(0);
            let re = regex_lite_match(&pattern, receiver)
                .map_err(|e| Error::InvalidRegex(format!("{pattern}: {e}")))?;
            Value::Bool(re)
        }
        other => return Err(Error::UnsupportedMethod(format!("String.{other}"))),
    })
}

/// A minimal regex matcher supporting `.`, `*`, `^`, `$`, and literal
/// characters — enough for the simple `matches()` patterns scripts commonly
/// use without pulling in a full regex engine for this subset.
fn regex_lite_match(pattern: &str, text: &str) -> std::result::Result<bool, String> {
    fn matches_here(p: &[char], t: &[char]) -> bool {
        if p.is_empty() {
            return t.is_empty();
        }
        if p.len() >= 2 && p[1] == '*' {
            return matches_star(p[0], &p[2..], t);
        }
        if p[0] == '$' && p.len() == 1 {
            return t.is_empty();
        }
        if !t.is_empty() && (p[0] == '.' || p[0] == t[0]) {
            return matches_here(&p[1..], &t[1..]);
        }
        false
    }
    fn matches_star(c: char, rest: &[char], t: &[char]) -> bool {
        if matches_here(rest, t) {
            return true;
        }
        let mut i = 0;
        while i < t.len() && (c == '.' || t[i] == c) {
            i += 1;
            if matches_here(rest, &t[i..]) {
                return true;
            }
        }
        false
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    if p.first() == Some(&'^') {
        return Ok(matches_here(&p[1..], &t));
    }
    for start in 0..=t.len() {
        if matches_here(&p, &t[start..]) {
            return Ok(true);
        }
    }
    Ok(false)
}
