use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::AllocationError;

/// One trading day of OHLCV data for a single instrument.
///
/// `adj_close` is the canonical price for indicator math; `close` is kept for
/// range-based indicators (ATR, stochastic). Both are guaranteed present after
/// [`validate_series`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

/// A price row as it arrives from a provider, before schema validation.
///
/// `close` and `adj_close` may each be absent; [`validate_series`] back-fills
/// one from the other and rejects rows where both are missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub adj_close: Option<f64>,
    pub volume: f64,
}

/// Validate and normalize a raw price series into [`PriceBar`]s.
///
/// This is the single schema-adapter step at the ingestion boundary: column
/// back-filling and date-ordering checks happen here, once, so downstream
/// computations never re-derive missing fields.
pub fn validate_series(records: Vec<RawPriceRecord>) -> Result<Vec<PriceBar>, AllocationError> {
    if records.is_empty() {
        return Err(AllocationError::InsufficientData(
            "price series is empty".to_string(),
        ));
    }

    let mut bars = Vec::with_capacity(records.len());
    let mut prev_date: Option<NaiveDate> = None;
    let mut any_nonzero = false;

    for rec in records {
        if let Some(prev) = prev_date {
            if rec.date <= prev {
                return Err(AllocationError::InvalidData(format!(
                    "dates must be strictly increasing: {} followed by {}",
                    prev, rec.date
                )));
            }
        }
        prev_date = Some(rec.date);

        let (close, adj_close) = match (rec.close, rec.adj_close) {
            (Some(c), Some(a)) => (c, a),
            (Some(c), None) => (c, c),
            (None, Some(a)) => (a, a),
            (None, None) => {
                return Err(AllocationError::InvalidData(format!(
                    "row {} has neither close nor adjusted close",
                    rec.date
                )));
            }
        };

        if !close.is_finite() || !adj_close.is_finite() {
            return Err(AllocationError::InvalidData(format!(
                "non-finite price on {}",
                rec.date
            )));
        }
        if adj_close > 0.0 {
            any_nonzero = true;
        }

        bars.push(PriceBar {
            date: rec.date,
            open: rec.open,
            high: rec.high,
            low: rec.low,
            close,
            adj_close,
            volume: rec.volume,
        });
    }

    if !any_nonzero {
        return Err(AllocationError::InvalidData(
            "price series is all zero".to_string(),
        ));
    }

    Ok(bars)
}

/// A [`PriceBar`] augmented with derived indicator fields.
///
/// Indicator fields are `None` during each indicator's warm-up window and are
/// never mutated after the series is enriched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub price: f64,
    pub rsi: Option<f64>,
    pub rsi_short: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub atr: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub obv: Option<f64>,
    pub vwap: Option<f64>,
    pub sma_5: Option<f64>,
    pub sma_10: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub volume_change: Option<f64>,
}

impl IndicatorRow {
    /// A row with a price and every indicator still in warm-up.
    pub fn empty(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            price,
            rsi: None,
            rsi_short: None,
            macd: None,
            macd_signal: None,
            macd_hist: None,
            bb_upper: None,
            bb_lower: None,
            bb_width: None,
            atr: None,
            stoch_k: None,
            stoch_d: None,
            obv: None,
            vwap: None,
            sma_5: None,
            sma_10: None,
            sma_50: None,
            sma_200: None,
            volume_change: None,
        }
    }
}

/// Named numeric bounds parameterizing the allocation policy's voting rules.
///
/// Immutable once constructed; the optimizer produces a fresh set per grid
/// candidate. [`ThresholdSet::default_set`] is the fallback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub rsi_daily_low: f64,
    pub rsi_daily_mid: f64,
    pub rsi_daily_high: f64,
    pub rsi_short_low: f64,
    pub rsi_short_high: f64,
    pub atr_low: f64,
    pub atr_high: f64,
    pub bb_width_low: f64,
    pub bb_width_high: f64,
    pub stoch_k_low: f64,
    pub stoch_k_high: f64,
    pub fear_greed_low: f64,
    pub fear_greed_high: f64,
}

impl ThresholdSet {
    /// The default threshold configuration.
    ///
    /// A pure factory, not a process-wide singleton: every caller gets a
    /// fresh value it may adjust independently.
    pub fn default_set() -> Self {
        Self {
            rsi_daily_low: 30.0,
            rsi_daily_mid: 40.0,
            rsi_daily_high: 70.0,
            rsi_short_low: 20.0,
            rsi_short_high: 80.0,
            atr_low: 1.5,
            atr_high: 5.0,
            bb_width_low: 0.05,
            bb_width_high: 0.15,
            stoch_k_low: 20.0,
            stoch_k_high: 80.0,
            fear_greed_low: 20.0,
            fear_greed_high: 80.0,
        }
    }
}

/// Macro-market signals merged into a day's allocation decision.
///
/// Any field may be absent; an absent signal simply contributes no vote.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MacroSnapshot {
    pub vix: Option<f64>,
    pub fear_greed: Option<i64>,
    pub interest_rate: Option<f64>,
}

/// Tomorrow's portfolio split between the base and leveraged instruments.
///
/// Both weights are in [0, 1] and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub weight_base: f64,
    pub weight_leveraged: f64,
}

impl AllocationDecision {
    /// Build a decision from the leveraged weight, clipping to [0, 1].
    pub fn from_leveraged_weight(weight_leveraged: f64) -> Self {
        let w = weight_leveraged.clamp(0.0, 1.0);
        Self {
            weight_base: 1.0 - w,
            weight_leveraged: w,
        }
    }

    /// 100% base asset; the buy-and-hold fallback.
    pub fn all_base() -> Self {
        Self {
            weight_base: 1.0,
            weight_leveraged: 0.0,
        }
    }
}

/// A point on an equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A date-ordered portfolio value series starting at 100.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn first_value(&self) -> Option<f64> {
        self.points.first().map(|p| p.value)
    }

    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

/// Summary risk/return statistics for one equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Compound annual growth rate (252 trading days/year convention).
    pub cagr: f64,
    /// Annualized standard deviation of daily returns.
    pub volatility: f64,
    /// Annualized mean/stddev of daily returns; 0.0 when stddev is zero.
    pub sharpe: f64,
    /// Largest peak-to-trough decline, reported as a positive magnitude.
    pub max_drawdown: f64,
    /// final/initial - 1.
    pub cumulative_return: f64,
    /// running-max/initial - 1.
    pub max_return: f64,
}

/// An optimized threshold configuration as persisted by a threshold store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredThresholds {
    pub thresholds: ThresholdSet,
    pub metric: String,
    pub score: f64,
    pub metrics: PerformanceMetrics,
    pub saved_on: NaiveDate,
}
