//! Tree-walking evaluator for compiled [`Program`]s (§4.F).
//!
//! Filter/score evaluation never mutates the document; update scripts
//! mutate `ctx.ctx["_source"]` in place, materialising intermediate maps
//! along assignment paths as the spec requires.

use crate::ast::{BinOp, Expr, Program, Stmt, SwitchArm, UnOp};
use crate::builtins;
use qx_core::{Context, Error, Result, Value};
use std::collections::HashMap;

/// Outcome of executing a statement list: either falls through normally,
/// short-circuits with a `return` value, or propagates a loop sentinel.
enum Flow {
    Next,
    Return(Value),
    Break,
    Continue,
}

/// Runs `program` as a filter script, returning its `toBool` result.
pub fn execute_filter(program: &Program, ctx: &mut Context) -> Result<bool> {
    Ok(execute(program, ctx)?.to_bool())
}

/// Runs `program` as a score script, returning its `toFloat64` result.
pub fn execute_score(program: &Program, ctx: &mut Context) -> Result<f64> {
    Ok(execute(program, ctx)?.to_f64())
}

/// Runs `program`, returning the last statement's value or the `return` argument.
pub fn execute(program: &Program, ctx: &mut Context) -> Result<Value> {
    match program {
        Program::Expr(e) => eval_expr(e, ctx),
        Program::Stmts(stmts) => match exec_stmts(stmts, ctx)? {
            Flow::Return(v) => Ok(v),
            Flow::Next => Ok(ctx.variables.get("__last__").cloned().unwrap_or(Value::Null)),
            Flow::Break | Flow::Continue => {
                Err(Error::UnsupportedExpression("break/continue outside a loop".into()))
            }
        },
    }
}

fn exec_stmts(stmts: &[Stmt], ctx: &mut Context) -> Result<Flow> {
    for stmt in stmts {
        match exec_stmt(stmt, ctx)? {
            Flow::Next => {}
            other => return Ok(other),
        }
    }
    Ok(Flow::Next)
}

fn exec_stmt(stmt: &Stmt, ctx: &mut Context) -> Result<Flow> {
    match stmt {
        Stmt::Expr(e) => {
            let v = eval_expr(e, ctx)?;
            ctx.variables.insert("__last__".to_string(), v);
            Ok(Flow::Next)
        }
        Stmt::Def(name, e) => {
            let v = eval_expr(e, ctx)?;
            ctx.variables.insert(name.clone(), v.clone());
            ctx.variables.insert("__last__".to_string(), v);
            Ok(Flow::Next)
        }
        Stmt::If(cond, then_body, else_body) => {
            if eval_expr(cond, ctx)?.to_bool() {
                exec_stmts(then_body, ctx)
            } else {
                exec_stmts(else_body, ctx)
            }
        }
        Stmt::While(cond, body) => {
            while eval_expr(cond, ctx)?.to_bool() {
                match exec_stmts(body, ctx)? {
                    Flow::Break => break,
                    Flow::Continue | Flow::Next => {}
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                }
            }
            Ok(Flow::Next)
        }
        Stmt::DoWhile(body, cond) => {
            loop {
                match exec_stmts(body, ctx)? {
                    Flow::Break => break,
                    Flow::Continue | Flow::Next => {}
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                }
                if !eval_expr(cond, ctx)?.to_bool() {
                    break;
                }
            }
            Ok(Flow::Next)
        }
        Stmt::For(init, cond, update, body) => {
            if let Some(init) = init {
                exec_stmt(init, ctx)?;
            }
            loop {
                if let Some(cond) = cond {
                    if !eval_expr(cond, ctx)?.to_bool() {
                        break;
                    }
                }
                match exec_stmts(body, ctx)? {
                    Flow::Break => break,
                    Flow::Continue | Flow::Next => {}
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                }
                if let Some(update) = update {
                    eval_expr(update, ctx)?;
                }
            }
            Ok(Flow::Next)
        }
        Stmt::Switch(scrutinee, arms) => {
            let value = eval_expr(scrutinee, ctx)?;
            let mut matched = false;
            for SwitchArm { value: arm_value, body } in arms {
                if !matched {
                    matched = match arm_value {
                        Some(v) => values_equal(&eval_expr(v, ctx)?, &value),
                        None => true,
                    };
                }
                if matched {
                    match exec_stmts(body, ctx)? {
                        Flow::Break => return Ok(Flow::Next),
                        Flow::Next => {}
                        other => return Ok(other),
                    }
                }
            }
            Ok(Flow::Next)
        }
        Stmt::Return(e) => {
            let v = match e {
                Some(e) => eval_expr(e, ctx)?,
                None => Value::Null,
            };
            Ok(Flow::Return(v))
        }
        Stmt::Break => Ok(Flow::Break),
        Stmt::Continue => Ok(Flow::Continue),
    }
}

fn eval_expr(expr: &Expr, ctx: &mut Context) -> Result<Value> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(Value::F64(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Score => Ok(Value::F64(ctx.score)),
        Expr::Ident(name) => Ok(resolve_ident(name, ctx)),
        Expr::Field(receiver, name) => {
            let value = eval_expr(receiver, ctx)?;
            Ok(field_of(&value, name))
        }
        Expr::Index(receiver, index_expr) => {
            let value = eval_expr(receiver, ctx)?;
            let index = eval_expr(index_expr, ctx)?;
            Ok(index_into(&value, &index))
        }
        Expr::Unary(UnOp::Neg, inner) => Ok(Value::F64(-eval_expr(inner, ctx)?.to_f64())),
        Expr::Unary(UnOp::Not, inner) => Ok(Value::Bool(!eval_expr(inner, ctx)?.to_bool())),
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            if !l.to_bool() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval_expr(rhs, ctx)?.to_bool()))
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            if l.to_bool() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval_expr(rhs, ctx)?.to_bool()))
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            Ok(apply_binop(*op, &l, &r))
        }
        Expr::Ternary(cond, then_e, else_e) => {
            if eval_expr(cond, ctx)?.to_bool() {
                eval_expr(then_e, ctx)
            } else {
                eval_expr(else_e, ctx)
            }
        }
        Expr::Assign(lhs, rhs) => {
            let value = eval_expr(rhs, ctx)?;
            assign(lhs, value.clone(), ctx)?;
            Ok(value)
        }
        Expr::CompoundAssign(op, lhs, rhs) => {
            let current = eval_expr(lhs, ctx)?;
            let rhs_val = eval_expr(rhs, ctx)?;
            let updated = apply_binop(*op, &current, &rhs_val);
            assign(lhs, updated.clone(), ctx)?;
            Ok(updated)
        }
        Expr::PathCall(path, args) => eval_path_call(path, args, ctx),
        Expr::MethodCall(receiver, method, args) => eval_method_call(receiver, method, args, ctx),
    }
}

fn resolve_ident(name: &str, ctx: &Context) -> Value {
    match name {
        "doc" => Value::Map(ctx.doc.clone()),
        "_source" => Value::Map(ctx.source.clone()),
        "params" => Value::Map(ctx.params.clone()),
        "ctx" => Value::Map(ctx.ctx.clone()),
        _ => ctx.variables.get(name).cloned().unwrap_or(Value::Null),
    }
}

fn field_of(value: &Value, name: &str) -> Value {
    if name == "value" {
        return value.clone();
    }
    match value {
        Value::Map(m) => m.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn index_into(value: &Value, index: &Value) -> Value {
    match value {
        Value::Map(m) => m.get(&index.to_text()).cloned().unwrap_or(Value::Null),
        Value::Array(a) => {
            let i = index.to_f64();
            if i < 0.0 {
                return Value::Null;
            }
            a.get(i as usize).cloned().unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::String(_), _) | (_, Value::String(_)) => a.to_text() == b.to_text(),
        _ => a.to_f64() == b.to_f64(),
    }
}

fn apply_binop(op: BinOp, l: &Value, r: &Value) -> Value {
    match op {
        BinOp::Add => {
            if let (Value::String(a), _) = (l, r) {
                Value::String(format!("{a}{}", r.to_text()))
            } else if let (_, Value::String(b)) = (l, r) {
                Value::String(format!("{}{b}", l.to_text()))
            } else {
                Value::F64(l.to_f64() + r.to_f64())
            }
        }
        BinOp::Sub => Value::F64(l.to_f64() - r.to_f64()),
        BinOp::Mul => Value::F64(l.to_f64() * r.to_f64()),
        BinOp::Div => {
            let rv = r.to_f64();
            Value::F64(if rv == 0.0 { 0.0 } else { l.to_f64() / rv })
        }
        BinOp::Mod => {
            let rv = r.to_f64();
            Value::F64(if rv == 0.0 { 0.0 } else { l.to_f64() % rv })
        }
        BinOp::Eq => Value::Bool(values_equal(l, r)),
        BinOp::Ne => Value::Bool(!values_equal(l, r)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = if let (Value::String(a), Value::String(b)) = (l, r) {
                a.partial_cmp(b)
            } else {
                l.to_f64().partial_cmp(&r.to_f64())
            };
            let result = match (ordering, op) {
                (Some(std::cmp::Ordering::Less), BinOp::Lt | BinOp::Le) => true,
                (Some(std::cmp::Ordering::Equal), BinOp::Le | BinOp::Ge) => true,
                (Some(std::cmp::Ordering::Greater), BinOp::Gt | BinOp::Ge) => true,
                _ => false,
            };
            Value::Bool(result)
        }
        BinOp::And | BinOp::Or => unreachable!("short-circuited before apply_binop"),
    }
}

/// Resolves an assignment target to a nested `ctx._source` path, or `None`
/// if `expr` isn't a statically-known `_source` path (e.g. a bare local).
fn static_ctx_source_path(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::Field(inner, name) => {
            if is_ctx_ident(inner) {
                if name == "_source" {
                    Some(Vec::new())
                } else {
                    None
                }
            } else {
                let mut base = static_ctx_source_path(inner)?;
                base.push(name.clone());
                Some(base)
            }
        }
        Expr::Index(inner, index) => {
            if let Expr::Str(key) = index.as_ref() {
                let mut base = static_ctx_source_path(inner)?;
                base.push(key.clone());
                Some(base)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_ctx_ident(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(n) if n == "ctx")
}

fn source_root(ctx: &mut Context) -> &mut HashMap<String, Value> {
    let entry = ctx
        .ctx
        .entry("_source".to_string())
        .or_insert_with(|| Value::Map(HashMap::new()));
    if !matches!(entry, Value::Map(_)) {
        *entry = Value::Map(HashMap::new());
    }
    match entry {
        Value::Map(m) => m,
        _ => unreachable!(),
    }
}

fn navigate_create<'a>(current: &'a mut HashMap<String, Value>, path: &[String]) -> &'a mut Value {
    let entry = current
        .entry(path[0].clone())
        .or_insert_with(|| Value::Map(HashMap::new()));
    if path.len() == 1 {
        entry
    } else {
        if !matches!(entry, Value::Map(_)) {
            *entry = Value::Map(HashMap::new());
        }
        match entry {
            Value::Map(m) => navigate_create(m, &path[1..]),
            _ => unreachable!(),
        }
    }
}

fn assign(lhs: &Expr, value: Value, ctx: &mut Context) -> Result<()> {
    if let Expr::Ident(name) = lhs {
        if !matches!(name.as_str(), "doc" | "_source" | "params" | "ctx") {
            ctx.variables.insert(name.clone(), value);
            return Ok(());
        }
    }
    match static_ctx_source_path(lhs) {
        Some(path) if path.is_empty() => {
            if let Value::Map(m) = value {
                ctx.ctx.insert("_source".to_string(), Value::Map(m));
                Ok(())
            } else {
                Err(Error::UnsupportedExpression("ctx._source must be assigned a map".into()))
            }
        }
        Some(path) => {
            let root = source_root(ctx);
            *navigate_create(root, &path) = value;
            Ok(())
        }
        None => Err(Error::UnsupportedExpression(format!(
            "unsupported assignment target: {lhs:?}"
        ))),
    }
}

fn eval_path_call(path: &[String], args: &[Expr], ctx: &mut Context) -> Result<Value> {
    let name = path.join(".");
    if name == "SimpleDateFormat" {
        // Constructing the formatter just captures the pattern; `.format()`
        // on the resulting call does the actual work (see eval_method_call).
        let pattern = args
            .first()
            .map(|e| eval_expr(e, ctx))
            .transpose()?
            .map(|v| v.to_text())
            .unwrap_or_default();
        return Ok(Value::String(pattern));
    }
    Err(Error::UnsupportedMethod(format!("{name}(...)")))
}

fn eval_method_call(receiver: &Expr, method: &str, args: &[Expr], ctx: &mut Context) -> Result<Value> {
    if let Expr::Ident(ns) = receiver {
        if ns == "Math" {
            let arg_vals: Result<Vec<f64>> = args.iter().map(|a| Ok(eval_expr(a, ctx)?.to_f64())).collect();
            return Ok(Value::F64(builtins::call_math(method, &arg_vals?)?));
        }
        if ns == "Date" {
            let arg_vals: Result<Vec<Value>> = args.iter().map(|a| eval_expr(a, ctx)).collect();
            return builtins::call_date(method, &arg_vals?, ctx.now);
        }
    }
    if let Expr::PathCall(path, pattern_args) = receiver {
        if path.len() == 1 && path[0] == "SimpleDateFormat" && method == "format" {
            let pattern = pattern_args
                .first()
                .map(|e| eval_expr(e, ctx))
                .transpose()?
                .map(|v| v.to_text())
                .unwrap_or_default();
            let ts = args.first().map(|e| eval_expr(e, ctx)).transpose()?.map(|v| v.to_f64()).unwrap_or(0.0);
            return Ok(Value::String(builtins::simple_date_format(&pattern, ts as i64)?));
        }
    }

    let arg_vals: Result<Vec<Value>> = args.iter().map(|a| eval_expr(a, ctx)).collect();
    let arg_vals = arg_vals?;

    const MUTATORS: &[&str] = &["add", "remove", "put", "clear", "addAll", "removeAll"];
    if MUTATORS.contains(&method) {
        if let Some(path) = static_ctx_source_path(receiver) {
            if !path.is_empty() {
                let root = source_root(ctx);
                let target = navigate_create(root, &path);
                return Ok(mutate_collection(target, method, &arg_vals));
            }
        }
    }

    let receiver_value = eval_expr(receiver, ctx)?;
    match receiver_value {
        Value::String(s) => builtins::call_string_method(&s, method, &arg_vals),
        Value::Array(a) => Ok(read_sequence_method(&a, method, &arg_vals)),
        Value::Map(m) => Ok(read_mapping_method(&m, method, &arg_vals)),
        _ => Err(Error::UnsupportedMethod(format!("{method} on {receiver_value:?}"))),
    }
}

fn mutate_collection(target: &mut Value, method: &str, args: &[Value]) -> Value {
    match target {
        Value::Array(arr) => match method {
            "add" => {
                arr.push(args.first().cloned().unwrap_or(Value::Null));
                Value::Bool(true)
            }
            "remove" => {
                if let Some(needle) = args.first() {
                    if let Some(pos) = arr.iter().position(|v| values_equal(v, needle)) {
                        arr.remove(pos);
                        return Value::Bool(true);
                    }
                }
                Value::Bool(false)
            }
            "contains" => Value::Bool(args.first().is_some_and(|needle| arr.iter().any(|v| values_equal(v, needle)))),
            "clear" => {
                arr.clear();
                Value::Null
            }
            "addAll" => {
                if let Some(Value::Array(extra)) = args.first() {
                    arr.extend(extra.clone());
                }
                Value::Bool(true)
            }
            "removeAll" => {
                if let Some(Value::Array(drop)) = args.first() {
                    arr.retain(|v| !drop.iter().any(|d| values_equal(v, d)));
                }
                Value::Bool(true)
            }
            _ => Value::Null,
        },
        Value::Map(m) => match method {
            "put" => {
                let key = args.first().map(Value::to_text).unwrap_or_default();
                let value = args.get(1).cloned().unwrap_or(Value::Null);
                m.insert(key, value).unwrap_or(Value::Null)
            }
            "remove" => {
                let key = args.first().map(Value::to_text).unwrap_or_default();
                m.remove(&key).unwrap_or(Value::Null)
            }
            "clear" => {
                m.clear();
                Value::Null
            }
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

fn read_sequence_method(arr: &[Value], method: &str, args: &[Value]) -> Value {
    match method {
        "size" => Value::F64(arr.len() as f64),
        "isEmpty" => Value::Bool(arr.is_empty()),
        "get" => {
            let i = args.first().map(Value::to_f64).unwrap_or(0.0);
            if i < 0.0 {
                Value::Null
            } else {
                arr.get(i as usize).cloned().unwrap_or(Value::Null)
            }
        }
        "contains" => Value::Bool(args.first().is_some_and(|needle| arr.iter().any(|v| values_equal(v, needle)))),
        _ => Value::Null,
    }
}

fn read_mapping_method(m: &HashMap<String, Value>, method: &str, args: &[Value]) -> Value {
    match method {
        "size" => Value::F64(m.len() as f64),
        "isEmpty" => Value::Bool(m.is_empty()),
        "get" => {
            let key = args.first().map(Value::to_text).unwrap_or_default();
            m.get(&key).cloned().unwrap_or(Value::Null)
        }
        "contains" => {
            let key = args.first().map(Value::to_text).unwrap_or_default();
            Value::Bool(m.contains_key(&key))
        }
        _ => Value::Null,
    }
}
