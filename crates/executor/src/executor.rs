//! The execution driver (§4.H): resolves two-phase placeholders, hands the
//! structural query to the `IndexReader`, then applies script filters,
//! script-score/function-score scoring, sort, facets, and pagination.

use crate::cancel::ExecutionContext;
use crate::config::ExecutorConfig;
use crate::reader::IndexReader;
use crate::request::{FacetBucket, Hit, SearchRequest, SearchResponse, SortOrder};
use crate::resolve;
use crate::scripts::strip_script_filters;
use qx_ast::{BoostMode, FunctionSpec, Query, Script, ScoreMode};
use qx_core::{Context, Error, Result, Value};
use qx_join::JoinRegistry;
use qx_script::ScriptCache;
use std::collections::HashMap;

/// Owns the process-wide script compile cache and execution defaults. One
/// `Executor` is typically shared across every search request in a process
/// (§5: the script cache is a shared resource, single-writer-many-readers).
pub struct Executor {
    config: ExecutorConfig,
    script_cache: ScriptCache,
}

impl Executor {
    /// Builds an executor with default configuration and a fresh script cache.
    pub fn new() -> Self {
        Executor { config: ExecutorConfig::default(), script_cache: ScriptCache::default() }
    }

    /// Builds an executor with custom configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Executor { config, script_cache: ScriptCache::new(Default::default()) }
    }

    /// Read-only access to the script compile cache's statistics.
    pub fn script_cache_stats(&self) -> qx_script::CacheStats {
        self.script_cache.stats()
    }

    /// Executes `request.query` (already parsed and optimized by the
    /// caller) against `reader`, resolving any two-phase placeholders via
    /// `registry` and honouring `exec_ctx`'s cancellation/deadline (§4.H, §5).
    pub fn execute(
        &self,
        registry: &JoinRegistry,
        request: SearchRequest,
        reader: &dyn IndexReader,
        exec_ctx: &ExecutionContext,
    ) -> Result<SearchResponse> {
        check_cancel(exec_ctx)?;

        let resolved = resolve::resolve(request.query, registry, reader, self.config.page_size, exec_ctx)?;
        let (core, wrapper) = split_wrapper(resolved);
        let (core, script_filters) = strip_script_filters(core);

        tracing::debug!(wrapper_kind = wrapper.kind_name(), "executing resolved query");

        let candidates = reader.search(&core, self.config.page_size)?;

        let mut scored: Vec<ScoredDoc> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            check_cancel(exec_ctx)?;

            let Some(fields) = reader.fetch_fields(candidate.internal_id)? else {
                // DocumentNotFound (§7): swallowed as a per-document skip.
                continue;
            };

            if !passes_script_filters(&script_filters, &fields, candidate.score, &self.script_cache) {
                continue;
            }

            let Some(score) = apply_wrapper(&wrapper, candidate.score, &fields, &self.script_cache) else {
                continue;
            };

            scored.push(ScoredDoc { internal_id: candidate.internal_id, external_id: candidate.external_id, score, fields });
        }

        sort_docs(&mut scored, &request.sort);

        let facets = compute_facets(&scored, &request.facets);
        let total = scored.len();

        let size = request.size.min(self.config.max_size);
        let hits = scored
            .into_iter()
            .skip(request.from)
            .take(size)
            .map(|doc| to_hit(doc, &request.fields))
            .collect();

        Ok(SearchResponse { hits, total, facets })
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

fn check_cancel(ctx: &ExecutionContext) -> Result<()> {
    if ctx.cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if ctx.deadline_exceeded() {
        return Err(Error::DeadlineExceeded);
    }
    Ok(())
}

/// The scoring wrapper carried by the (now placeholder-free) query root,
/// per §4.E/§4.F's "calling (E) and (F) as dictated by the AST".
enum Wrapper {
    None,
    ScriptScore { script: Script, min_score: Option<f64>, boost: f64 },
    FunctionScore {
        functions: Vec<FunctionSpec>,
        score_mode: ScoreMode,
        boost_mode: BoostMode,
        max_boost: f64,
        min_score: Option<f64>,
        boost: f64,
    },
}

impl Wrapper {
    fn kind_name(&self) -> &'static str {
        match self {
            Wrapper::None => "none",
            Wrapper::ScriptScore { .. } => "script_score",
            Wrapper::FunctionScore { .. } => "function_score",
        }
    }
}

fn split_wrapper(query: Query) -> (Query, Wrapper) {
    match query {
        Query::ScriptScoreQuery { inner, script, min_score, boost } => {
            (*inner, Wrapper::ScriptScore { script, min_score, boost })
        }
        Query::FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, boost } => {
            (*inner, Wrapper::FunctionScore { functions, score_mode, boost_mode, max_boost, min_score, boost })
        }
        other => (other, Wrapper::None),
    }
}

/// Applies every extracted script filter (§4.F `execute_filter`). A script
/// error is non-fatal per §7 but downgrades the document out of the result
/// set, matching "document skipped" for filter-context script failures.
fn passes_script_filters(scripts: &[Script], fields: &HashMap<String, Value>, score: f64, cache: &ScriptCache) -> bool {
    scripts.iter().all(|script| {
        let mut ctx = Context::for_document(fields.clone()).with_score(score).with_params(script.params.clone());
        match qx_script::run_filter(cache, &script.source, &mut ctx) {
            Ok(passed) => passed,
            Err(err) => {
                tracing::warn!(error = %err, source = %script.source, "script filter failed, skipping document");
                false
            }
        }
    })
}

/// Applies the query root's scoring wrapper, if any (§4.E, §4.F). Returns
/// `None` when the document falls below a configured `min_score`.
fn apply_wrapper(wrapper: &Wrapper, base_score: f64, fields: &HashMap<String, Value>, cache: &ScriptCache) -> Option<f64> {
    match wrapper {
        Wrapper::None => Some(base_score),
        Wrapper::ScriptScore { script, min_score, boost } => {
            let mut ctx = Context::for_document(fields.clone()).with_score(base_score).with_params(script.params.clone());
            let computed = match qx_script::run_score(cache, &script.source, &mut ctx) {
                Ok(score) => score,
                Err(err) => {
                    tracing::warn!(error = %err, source = %script.source, "script_score failed, leaving score unchanged");
                    base_score
                }
            };
            let final_score = computed * boost;
            match min_score {
                Some(min) if final_score < *min => None,
                _ => Some(final_score),
            }
        }
        Wrapper::FunctionScore { functions, score_mode, boost_mode, max_boost, min_score, boost } => {
            qx_scoring::score_document(base_score, fields, functions, *score_mode, *boost_mode, *max_boost, *min_score, *boost, cache)
        }
    }
}

struct ScoredDoc {
    internal_id: u64,
    external_id: String,
    score: f64,
    fields: HashMap<String, Value>,
}

/// Sorts by the request's `sort` clauses, falling back to score descending
/// when none are given (§4.H "order... composed with the configured sort").
/// Stable so tie-breaks among equal sort keys preserve the `IndexReader`'s
/// own match order.
fn sort_docs(docs: &mut [ScoredDoc], sort: &[crate::request::SortClause]) {
    if sort.is_empty() {
        docs.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        return;
    }
    docs.sort_by(|a, b| {
        for clause in sort {
            let av = a.fields.get(&clause.field);
            let bv = b.fields.get(&clause.field);
            let ordering = compare_values(av, bv);
            let ordering = match clause.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::F64(x)), Some(Value::F64(y))) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_text().cmp(&y.to_text()),
    }
}

/// Rolls up each requested facet's terms counts over the full (post-filter,
/// pre-pagination) matched set (§6.2/§6.3).
fn compute_facets(docs: &[ScoredDoc], specs: &HashMap<String, crate::request::FacetSpec>) -> HashMap<String, Vec<FacetBucket>> {
    let mut out = HashMap::new();
    for (name, spec) in specs {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            if let Some(value) = doc.fields.get(&spec.field) {
                *counts.entry(value.to_text()).or_insert(0) += 1;
            }
        }
        let mut buckets: Vec<FacetBucket> = counts.into_iter().map(|(key, count)| FacetBucket { key, count }).collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        buckets.truncate(spec.size);
        out.insert(name.clone(), buckets);
    }
    out
}

fn to_hit(doc: ScoredDoc, requested_fields: &[String]) -> Hit {
    let fields = if requested_fields.is_empty() {
        doc.fields
    } else {
        requested_fields
            .iter()
            .filter_map(|name| doc.fields.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    };
    Hit { id: doc.external_id, score: doc.score, fields, index_internal_id: doc.internal_id.to_be_bytes().to_vec() }
}
