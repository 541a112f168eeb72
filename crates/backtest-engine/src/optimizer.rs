use std::collections::BTreeMap;

use allocation_core::{
    AllocationError, IndicatorRow, MacroSnapshot, PriceBar, ThresholdSet,
};
use allocation_policy::{decide_allocation, VoteWeights};
use chrono::NaiveDate;
use rayon::prelude::*;

use crate::engine::run_backtest;
use crate::metrics::compute_metrics;
use crate::models::{GridRanges, OptimizationResult, OptimizeMetric, ScoredCandidate};

/// How many top candidates to retain for reporting.
pub const TOP_K: usize = 5;

/// Read-only inputs shared by every grid candidate.
///
/// Price and macro series are materialized once before the search begins; no
/// candidate mutates them.
pub struct OptimizerInputs<'a> {
    pub base: &'a [PriceBar],
    pub leveraged: &'a [PriceBar],
    /// Enriched counterpart of `base`, index-aligned.
    pub rows: &'a [IndicatorRow],
    pub vix: &'a BTreeMap<NaiveDate, f64>,
    pub fear_greed: &'a BTreeMap<NaiveDate, i64>,
    pub interest_rate: Option<f64>,
}

/// Grid-search settings.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub metric: OptimizeMetric,
    /// Candidates whose cumulative return falls below this floor are
    /// discarded, never selected.
    pub min_return: f64,
    /// Worker threads; defaults to half the available parallelism.
    pub threads: Option<usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            metric: OptimizeMetric::Sharpe,
            min_return: 0.0,
            threads: None,
        }
    }
}

fn worker_threads(config: &OptimizerConfig) -> usize {
    config.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| (n.get() / 2).max(1))
            .unwrap_or(1)
    })
}

/// Backtest and score a single threshold candidate.
fn evaluate_candidate(
    inputs: &OptimizerInputs<'_>,
    thresholds: &ThresholdSet,
    metric: OptimizeMetric,
) -> Result<ScoredCandidate, AllocationError> {
    let weights = VoteWeights::default();
    let allocation = |row: &IndicatorRow| {
        let macros = MacroSnapshot {
            vix: inputs.vix.get(&row.date).copied(),
            fear_greed: inputs.fear_greed.get(&row.date).copied(),
            interest_rate: inputs.interest_rate,
        };
        decide_allocation(row, &macros, thresholds, &weights)
    };

    let curves = run_backtest(inputs.base, inputs.leveraged, inputs.rows, Some(&allocation))?;
    let metrics = compute_metrics(&curves.strategy)?;
    Ok(ScoredCandidate {
        thresholds: thresholds.clone(),
        metrics,
        score: metric.score(&metrics),
    })
}

/// Evaluate one grid pass; returns the surviving candidates in canonical
/// enumeration order.
///
/// Candidate evaluations are independent and run on a bounded worker pool; a
/// single failing candidate is logged and excluded without aborting the grid.
pub fn run_grid_search(
    inputs: &OptimizerInputs<'_>,
    config: &OptimizerConfig,
    ranges: &GridRanges,
) -> Result<Vec<ScoredCandidate>, AllocationError> {
    let candidates = ranges.candidates(&ThresholdSet::default_set());
    tracing::info!(
        candidates = candidates.len(),
        metric = config.metric.as_str(),
        "starting grid search"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads(config))
        .build()
        .map_err(|e| AllocationError::Calculation(format!("worker pool: {e}")))?;

    // Indexed collect keeps results in canonical grid order regardless of
    // which worker finishes first.
    let evaluated: Vec<Option<ScoredCandidate>> = pool.install(|| {
        candidates
            .par_iter()
            .enumerate()
            .map(|(i, thresholds)| {
                match evaluate_candidate(inputs, thresholds, config.metric) {
                    Ok(scored) => {
                        if !scored.score.is_finite() {
                            return None;
                        }
                        if scored.metrics.cumulative_return < config.min_return {
                            return None;
                        }
                        Some(scored)
                    }
                    Err(e) => {
                        tracing::debug!(candidate = i, error = %e, "candidate evaluation failed");
                        None
                    }
                }
            })
            .collect()
    });

    Ok(evaluated.into_iter().flatten().collect())
}

/// Select the best candidate from one grid pass.
///
/// The maximum score wins; ties go to the earliest candidate in the canonical
/// enumeration, so results do not depend on parallel completion order.
fn select_best(
    survivors: Vec<ScoredCandidate>,
    metric: OptimizeMetric,
    evaluated: usize,
) -> Option<OptimizationResult> {
    if survivors.is_empty() {
        return None;
    }

    let mut order: Vec<usize> = (0..survivors.len()).collect();
    order.sort_by(|&a, &b| {
        survivors[b]
            .score
            .partial_cmp(&survivors[a].score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let top: Vec<ScoredCandidate> = order
        .iter()
        .take(TOP_K)
        .map(|&i| survivors[i].clone())
        .collect();

    Some(OptimizationResult {
        best: top[0].clone(),
        top,
        metric,
        evaluated,
    })
}

/// Run the full threshold optimization: one pass over the initial grid, and
/// if no candidate clears the minimum-return floor, exactly one more pass
/// over the predetermined expanded grid.
///
/// An empty second pass is an explicit failure; a floor-violating candidate
/// is never substituted as a best effort.
pub fn optimize(
    inputs: &OptimizerInputs<'_>,
    config: &OptimizerConfig,
) -> Result<OptimizationResult, AllocationError> {
    optimize_with_grids(
        inputs,
        config,
        &GridRanges::initial(),
        &GridRanges::expanded(),
    )
}

/// [`optimize`] with caller-supplied grid passes.
pub fn optimize_with_grids(
    inputs: &OptimizerInputs<'_>,
    config: &OptimizerConfig,
    initial: &GridRanges,
    expanded: &GridRanges,
) -> Result<OptimizationResult, AllocationError> {
    let first_pass = initial.candidates(&ThresholdSet::default_set()).len();
    let survivors = run_grid_search(inputs, config, initial)?;
    if let Some(result) = select_best(survivors, config.metric, first_pass) {
        return Ok(result);
    }

    tracing::warn!(
        min_return = config.min_return,
        "no candidate met the minimum-return floor; retrying with expanded ranges"
    );

    let second_pass = expanded.candidates(&ThresholdSet::default_set()).len();
    let survivors = run_grid_search(inputs, config, expanded)?;
    select_best(survivors, config.metric, first_pass + second_pass).ok_or_else(|| {
        AllocationError::OptimizationFailed(format!(
            "no threshold candidate reached the minimum cumulative return {:.2}% after range expansion",
            config.min_return * 100.0
        ))
    })
}
