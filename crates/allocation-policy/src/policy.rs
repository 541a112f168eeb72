use allocation_core::{AllocationDecision, IndicatorRow, MacroSnapshot, ThresholdSet};
use serde::{Deserialize, Serialize};

/// VIX levels above/below which the volatility vote fires.
const VIX_FEAR: f64 = 25.0;
const VIX_CALM: f64 = 15.0;

/// Interest-rate levels (percent) above/below which the rate vote fires.
const RATE_HIGH: f64 = 4.0;
const RATE_LOW: f64 = 2.0;

/// The indicator behind a single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    RsiDaily,
    RsiShort,
    Macd,
    Bollinger,
    AtrPercent,
    BbWidth,
    StochK,
    FearGreed,
    Vix,
    InterestRate,
}

/// One indicator's signed vote: -2 (strong sell) to +2 (strong buy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub indicator: Indicator,
    pub value: i32,
    pub detail: String,
}

/// Per-indicator weights for combining votes into a scalar score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteWeights {
    pub rsi_daily: f64,
    pub rsi_short: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub atr_percent: f64,
    pub bb_width: f64,
    pub stoch_k: f64,
    pub fear_greed: f64,
    pub vix: f64,
    pub interest_rate: f64,
}

impl Default for VoteWeights {
    fn default() -> Self {
        Self {
            rsi_daily: 1.0,
            rsi_short: 1.0,
            macd: 1.0,
            bollinger: 1.0,
            atr_percent: 1.0,
            bb_width: 1.0,
            stoch_k: 1.0,
            fear_greed: 1.0,
            vix: 1.0,
            interest_rate: 1.0,
        }
    }
}

impl VoteWeights {
    fn weight_for(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::RsiDaily => self.rsi_daily,
            Indicator::RsiShort => self.rsi_short,
            Indicator::Macd => self.macd,
            Indicator::Bollinger => self.bollinger,
            Indicator::AtrPercent => self.atr_percent,
            Indicator::BbWidth => self.bb_width,
            Indicator::StochK => self.stoch_k,
            Indicator::FearGreed => self.fear_greed,
            Indicator::Vix => self.vix,
            Indicator::InterestRate => self.interest_rate,
        }
    }
}

/// Collect the per-indicator votes for one day.
///
/// Indicators still in their warm-up window (or macro signals that are
/// unavailable) cast no vote at all; they are skipped, never counted as
/// neutral bearishness.
pub fn collect_votes(
    row: &IndicatorRow,
    macros: &MacroSnapshot,
    thresholds: &ThresholdSet,
) -> Vec<Vote> {
    let mut votes = Vec::new();

    if let Some(rsi) = row.rsi {
        let (value, label) = if rsi < thresholds.rsi_daily_low {
            (2, "deeply oversold")
        } else if rsi < thresholds.rsi_daily_mid {
            (1, "oversold")
        } else if rsi > thresholds.rsi_daily_high {
            (-2, "overbought")
        } else {
            (0, "neutral")
        };
        votes.push(Vote {
            indicator: Indicator::RsiDaily,
            value,
            detail: format!("RSI {rsi:.1} {label}"),
        });
    }

    if let Some(rsi) = row.rsi_short {
        let value = if rsi < thresholds.rsi_short_low {
            1
        } else if rsi > thresholds.rsi_short_high {
            -1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::RsiShort,
            value,
            detail: format!("short RSI {rsi:.1}"),
        });
    }

    if let (Some(macd), Some(signal)) = (row.macd, row.macd_signal) {
        let value = if macd > signal { 1 } else { -1 };
        let label = if value > 0 { "rising" } else { "falling" };
        votes.push(Vote {
            indicator: Indicator::Macd,
            value,
            detail: format!("MACD {macd:.2} vs signal {signal:.2}: {label} momentum"),
        });
    }

    if let (Some(upper), Some(lower)) = (row.bb_upper, row.bb_lower) {
        let value = if row.price < lower {
            1
        } else if row.price > upper {
            -1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::Bollinger,
            value,
            detail: format!(
                "price {:.2} vs bands [{lower:.2}, {upper:.2}]",
                row.price
            ),
        });
    }

    if let Some(atr) = row.atr {
        if row.price > 0.0 {
            let atr_pct = atr / row.price * 100.0;
            let value = if atr_pct < thresholds.atr_low {
                1
            } else if atr_pct > thresholds.atr_high {
                -1
            } else {
                0
            };
            votes.push(Vote {
                indicator: Indicator::AtrPercent,
                value,
                detail: format!("ATR {atr_pct:.1}% of price"),
            });
        }
    }

    if let Some(width) = row.bb_width {
        let value = if width < thresholds.bb_width_low {
            1
        } else if width > thresholds.bb_width_high {
            -1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::BbWidth,
            value,
            detail: format!("band width {width:.3}"),
        });
    }

    if let Some(k) = row.stoch_k {
        let value = if k < thresholds.stoch_k_low {
            1
        } else if k > thresholds.stoch_k_high {
            -1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::StochK,
            value,
            detail: format!("stochastic %K {k:.1}"),
        });
    }

    if let Some(fg) = macros.fear_greed {
        let value = if fg as f64 >= thresholds.fear_greed_high {
            1
        } else if fg as f64 <= thresholds.fear_greed_low {
            -1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::FearGreed,
            value,
            detail: format!("fear & greed index {fg}"),
        });
    }

    if let Some(vix) = macros.vix {
        let value = if vix > VIX_FEAR {
            -1
        } else if vix < VIX_CALM {
            1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::Vix,
            value,
            detail: format!("VIX {vix:.1}"),
        });
    }

    if let Some(rate) = macros.interest_rate {
        let value = if rate > RATE_HIGH {
            -1
        } else if rate < RATE_LOW {
            1
        } else {
            0
        };
        votes.push(Vote {
            indicator: Indicator::InterestRate,
            value,
            detail: format!("10Y rate {rate:.2}%"),
        });
    }

    votes
}

/// Combine votes into a scalar score using per-indicator weights.
pub fn score_votes(votes: &[Vote], weights: &VoteWeights) -> f64 {
    votes
        .iter()
        .map(|v| weights.weight_for(v.indicator) * v.value as f64)
        .sum()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Decide tomorrow's allocation from today's indicator row.
///
/// The weighted vote score is squashed through a logistic transform into the
/// leveraged-asset weight, so a more bullish score can never decrease it. A
/// row with no usable indicators scores zero and lands on the 50/50 split.
pub fn decide_allocation(
    row: &IndicatorRow,
    macros: &MacroSnapshot,
    thresholds: &ThresholdSet,
    weights: &VoteWeights,
) -> AllocationDecision {
    let votes = collect_votes(row, macros, thresholds);
    let score = score_votes(&votes, weights);
    AllocationDecision::from_leveraged_weight(sigmoid(score))
}

/// Render a human-readable trace of a day's votes and resulting weights.
pub fn explain_decision(
    row: &IndicatorRow,
    macros: &MacroSnapshot,
    thresholds: &ThresholdSet,
    weights: &VoteWeights,
) -> String {
    let votes = collect_votes(row, macros, thresholds);
    let score = score_votes(&votes, weights);
    let decision = AllocationDecision::from_leveraged_weight(sigmoid(score));

    let mut lines = Vec::with_capacity(votes.len() + 2);
    for vote in &votes {
        lines.push(format!("  {} ({:+})", vote.detail, vote.value));
    }
    lines.push(format!("  score: {score:+.1}"));
    lines.push(format!(
        "  suggested split: base {:.1}% / leveraged {:.1}%",
        decision.weight_base * 100.0,
        decision.weight_leveraged * 100.0
    ));
    lines.join("\n")
}
