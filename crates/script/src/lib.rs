//! Painless-like scripting subset (§4.F): tokenizer, recursive-descent
//! parser, tree-walking evaluator, built-in namespaces, and a process-wide
//! compile cache.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod cache;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::Program;
pub use cache::{CacheStats, CompiledScript, ScriptCache, ScriptCacheConfig};
pub use eval::{execute, execute_filter, execute_score};
pub use parser::parse;

use qx_core::{Context, Result, Value};

/// Compiles `source` (via the shared [`ScriptCache`]) and evaluates it as a
/// generic expression, returning its resulting [`Value`] (§4.F).
pub fn run(cache: &ScriptCache, source: &str, ctx: &mut Context) -> Result<Value> {
    let program = cache.get_or_compile(source, parse)?;
    execute(&program, ctx)
}

/// Compiles and evaluates `source` as a filter script, coercing the result
/// to a boolean per Painless truthiness rules (§4.F, used by `script` queries).
pub fn run_filter(cache: &ScriptCache, source: &str, ctx: &mut Context) -> Result<bool> {
    let program = cache.get_or_compile(source, parse)?;
    execute_filter(&program, ctx)
}

/// Compiles and evaluates `source` as a scoring script, coercing the result
/// to `f64` (§4.F, used by `script_score` and function-score `script` functions).
pub fn run_score(cache: &ScriptCache, source: &str, ctx: &mut Context) -> Result<f64> {
    let program = cache.get_or_compile(source, parse)?;
    execute_score(&program, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qx_core::Context;

    #[test]
    fn run_filter_evaluates_end_to_end_through_the_cache() {
        let cache = ScriptCache::default();
        let mut ctx = Context::default();
        let result = run_filter(&cache, "1 + 1 == 2", &mut ctx).unwrap();
        assert!(result);
        assert_eq!(cache.stats().misses, 1);

        let result = run_filter(&cache, "1 + 1 == 2", &mut ctx).unwrap();
        assert!(result);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn run_score_coerces_numeric_result() {
        let cache = ScriptCache::default();
        let mut ctx = Context::default();
        let score = run_score(&cache, "2 * 3", &mut ctx).unwrap();
        assert_eq!(score, 6.0);
    }
}
