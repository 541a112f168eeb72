use std::str::FromStr;

use allocation_core::{EquityCurve, PerformanceMetrics, ThresholdSet};
use serde::{Deserialize, Serialize};

/// The three equity curves produced by one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestCurves {
    /// The dynamically allocated strategy.
    pub strategy: EquityCurve,
    /// 100% base asset, buy and hold.
    pub base_only: EquityCurve,
    /// 100% leveraged asset, buy and hold.
    pub leveraged_only: EquityCurve,
}

/// The metric a grid search maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizeMetric {
    Sharpe,
    Cagr,
    /// Scored as the negated drawdown, so smaller drawdowns rank higher.
    MaxDrawdown,
}

impl OptimizeMetric {
    /// The scalar score for a candidate: the raw metric for higher-is-better
    /// metrics, negated for max drawdown.
    pub fn score(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            OptimizeMetric::Sharpe => metrics.sharpe,
            OptimizeMetric::Cagr => metrics.cagr,
            OptimizeMetric::MaxDrawdown => -metrics.max_drawdown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizeMetric::Sharpe => "sharpe",
            OptimizeMetric::Cagr => "cagr",
            OptimizeMetric::MaxDrawdown => "mdd",
        }
    }
}

impl FromStr for OptimizeMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sharpe" => Ok(OptimizeMetric::Sharpe),
            "cagr" => Ok(OptimizeMetric::Cagr),
            "mdd" => Ok(OptimizeMetric::MaxDrawdown),
            other => Err(format!(
                "unknown metric '{other}', expected sharpe, cagr or mdd"
            )),
        }
    }
}

/// One evaluated grid candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub thresholds: ThresholdSet,
    pub metrics: PerformanceMetrics,
    pub score: f64,
}

/// The outcome of a completed grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best: ScoredCandidate,
    /// The top candidates by score, best first (at most K = 5).
    pub top: Vec<ScoredCandidate>,
    pub metric: OptimizeMetric,
    /// Grid candidates evaluated across all passes.
    pub evaluated: usize,
}

/// Candidate value lists for each searched threshold dimension.
///
/// The grid is the cartesian product, enumerated in field order with the last
/// field varying fastest; that enumeration order is the canonical tie-break
/// order for equal scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridRanges {
    pub rsi_daily_lows: Vec<f64>,
    pub rsi_daily_highs: Vec<f64>,
    pub atr_lows: Vec<f64>,
    pub atr_highs: Vec<f64>,
    pub bb_width_lows: Vec<f64>,
    pub bb_width_highs: Vec<f64>,
}

impl GridRanges {
    /// The first-pass search space.
    pub fn initial() -> Self {
        Self {
            rsi_daily_lows: vec![10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0],
            rsi_daily_highs: vec![50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0],
            atr_lows: vec![0.5, 1.0, 1.5, 2.0, 2.5],
            atr_highs: vec![3.0, 4.0, 5.0, 6.0, 7.0],
            bb_width_lows: vec![0.01, 0.03, 0.05, 0.07, 0.09],
            bb_width_highs: vec![0.10, 0.15, 0.20, 0.25, 0.30],
        }
    }

    /// The predetermined wider search space used when the first pass finds no
    /// candidate above the minimum-return floor. A strict superset of
    /// [`GridRanges::initial`].
    pub fn expanded() -> Self {
        Self {
            rsi_daily_lows: vec![5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0],
            rsi_daily_highs: vec![45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0],
            atr_lows: vec![0.3, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0],
            atr_highs: vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            bb_width_lows: vec![0.005, 0.01, 0.03, 0.05, 0.07, 0.09, 0.11],
            bb_width_highs: vec![0.10, 0.15, 0.20, 0.25, 0.30, 0.35, 0.40],
        }
    }

    /// Materialize the cartesian product over a base threshold set.
    pub fn candidates(&self, base: &ThresholdSet) -> Vec<ThresholdSet> {
        let mut out = Vec::with_capacity(
            self.rsi_daily_lows.len()
                * self.rsi_daily_highs.len()
                * self.atr_lows.len()
                * self.atr_highs.len()
                * self.bb_width_lows.len()
                * self.bb_width_highs.len(),
        );
        for &rsi_lo in &self.rsi_daily_lows {
            for &rsi_hi in &self.rsi_daily_highs {
                for &atr_lo in &self.atr_lows {
                    for &atr_hi in &self.atr_highs {
                        for &bb_lo in &self.bb_width_lows {
                            for &bb_hi in &self.bb_width_highs {
                                let mut t = base.clone();
                                t.rsi_daily_low = rsi_lo;
                                t.rsi_daily_high = rsi_hi;
                                t.atr_low = atr_lo;
                                t.atr_high = atr_hi;
                                t.bb_width_low = bb_lo;
                                t.bb_width_high = bb_hi;
                                out.push(t);
                            }
                        }
                    }
                }
            }
        }
        out
    }
}
