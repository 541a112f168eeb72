use allocation_core::PriceBar;

/// Simple Moving Average, index-aligned with the input.
///
/// The first `period - 1` slots are `None` (warm-up window).
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let mut window_sum: f64 = data[..period].iter().sum();
    result[period - 1] = Some(window_sum / period as f64);
    for i in period..data.len() {
        window_sum += data[i] - data[i - period];
        result[i] = Some(window_sum / period as f64);
    }
    result
}

/// Exponential Moving Average with adjustment disabled.
///
/// Seeded with the first raw value (not a simple average), so every slot is
/// defined. Matches the recursive smoothing `ema[i] = a*x[i] + (1-a)*ema[i-1]`
/// with `a = 2 / (span + 1)`.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || data.is_empty() {
        return vec![];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);
    for i in 1..data.len() {
        let prev = result[i - 1];
        result.push(alpha * data[i] + (1.0 - alpha) * prev);
    }
    result
}

/// Relative Strength Index over a rolling window of price deltas.
///
/// RSI = 100 - 100/(1+RS) where RS = avg gain / avg loss. A window with zero
/// average loss but positive gains saturates at 100; a flat window (both
/// averages zero) has no defined RSI and stays `None`.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period + 1 {
        return result;
    }

    let deltas: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

    for i in period..data.len() {
        let window = &deltas[i - period..i];
        let avg_gain: f64 =
            window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
        let avg_loss: f64 =
            window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;

        result[i] = if avg_loss == 0.0 {
            if avg_gain == 0.0 {
                None
            } else {
                Some(100.0)
            }
        } else {
            let rs = avg_gain / avg_loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        };
    }
    result
}

/// MACD line, signal line and histogram, index-aligned.
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(data: &[f64], fast: usize, slow: usize, signal_span: usize) -> MacdSeries {
    if fast == 0 || slow == 0 || signal_span == 0 || data.is_empty() {
        return MacdSeries {
            macd: vec![],
            signal: vec![],
            histogram: vec![],
        };
    }

    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal_span);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger bands and normalized band width, index-aligned.
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    /// (upper - lower) / middle; `None` where the middle band is zero.
    pub width: Vec<Option<f64>>,
}

/// Rolling mean ± `k` sample standard deviations (ddof = 1).
pub fn bollinger_bands(data: &[f64], period: usize, k: f64) -> BollingerSeries {
    let mut upper = vec![None; data.len()];
    let mut lower = vec![None; data.len()];
    let mut width = vec![None; data.len()];
    if period < 2 || data.len() < period {
        return BollingerSeries {
            upper,
            lower,
            width,
        };
    }

    for i in period - 1..data.len() {
        let window = &data[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / (period - 1) as f64;
        let std = variance.sqrt();

        upper[i] = Some(mean + k * std);
        lower[i] = Some(mean - k * std);
        width[i] = if mean != 0.0 {
            Some(2.0 * k * std / mean)
        } else {
            None
        };
    }

    BollingerSeries {
        upper,
        lower,
        width,
    }
}

/// Average True Range: rolling mean of the true range, index-aligned.
///
/// The first bar has no previous close, so its true range is just high - low.
pub fn atr(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return result;
    }

    let mut true_ranges = Vec::with_capacity(bars.len());
    true_ranges.push(bars[0].high - bars[0].low);
    for i in 1..bars.len() {
        let high_low = bars[i].high - bars[i].low;
        let high_close = (bars[i].high - bars[i - 1].close).abs();
        let low_close = (bars[i].low - bars[i - 1].close).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    let mut window_sum: f64 = true_ranges[..period].iter().sum();
    result[period - 1] = Some(window_sum / period as f64);
    for i in period..bars.len() {
        window_sum += true_ranges[i] - true_ranges[i - period];
        result[i] = Some(window_sum / period as f64);
    }
    result
}

/// Stochastic oscillator %K and %D, index-aligned.
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// %K = 100 * (close - lowest low) / (highest high - lowest low) over
/// `k_period` bars; a zero-range window resolves to the neutral 50. %D is a
/// simple moving average of %K over `d_period`.
pub fn stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> StochasticSeries {
    let mut k = vec![None; bars.len()];
    let mut d = vec![None; bars.len()];
    if k_period == 0 || d_period == 0 || bars.len() < k_period {
        return StochasticSeries { k, d };
    }

    for i in k_period - 1..bars.len() {
        let window = &bars[i + 1 - k_period..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        k[i] = if highest == lowest {
            Some(50.0)
        } else {
            Some(100.0 * (bars[i].close - lowest) / (highest - lowest))
        };
    }

    for i in 0..bars.len() {
        if i + 1 >= k_period + d_period - 1 {
            let window: Vec<f64> = (i + 1 - d_period..=i).filter_map(|j| k[j]).collect();
            if window.len() == d_period {
                d[i] = Some(window.iter().sum::<f64>() / d_period as f64);
            }
        }
    }

    StochasticSeries { k, d }
}

/// On-Balance Volume: cumulative sum of volume signed by price direction.
pub fn obv(bars: &[PriceBar]) -> Vec<f64> {
    if bars.is_empty() {
        return vec![];
    }

    let mut result = Vec::with_capacity(bars.len());
    result.push(bars[0].volume);
    for i in 1..bars.len() {
        let prev = result[i - 1];
        let next = if bars[i].close > bars[i - 1].close {
            prev + bars[i].volume
        } else if bars[i].close < bars[i - 1].close {
            prev - bars[i].volume
        } else {
            prev
        };
        result.push(next);
    }
    result
}

/// Cumulative Volume-Weighted Average Price over typical prices.
pub fn vwap(bars: &[PriceBar]) -> Vec<f64> {
    let mut result = Vec::with_capacity(bars.len());
    let mut cumulative_tpv = 0.0;
    let mut cumulative_volume = 0.0;

    for bar in bars {
        let typical = (bar.high + bar.low + bar.close) / 3.0;
        cumulative_tpv += typical * bar.volume;
        cumulative_volume += bar.volume;
        result.push(if cumulative_volume > 0.0 {
            cumulative_tpv / cumulative_volume
        } else {
            typical
        });
    }
    result
}

/// Day-over-day percentage change, index-aligned; `None` at the first slot
/// and wherever the previous value is zero.
pub fn pct_change(data: &[f64]) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    for i in 1..data.len() {
        if data[i - 1] != 0.0 {
            result[i] = Some(data[i] / data[i - 1] - 1.0);
        }
    }
    result
}
