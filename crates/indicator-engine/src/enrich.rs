use allocation_core::{AllocationError, IndicatorRow, PriceBar};

use crate::indicators::*;

/// Standard lookback periods for the enriched series.
pub const RSI_PERIOD: usize = 14;
pub const RSI_SHORT_PERIOD: usize = 5;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_STD: f64 = 2.0;
pub const ATR_PERIOD: usize = 14;
pub const STOCH_K_PERIOD: usize = 14;
pub const STOCH_D_PERIOD: usize = 3;

/// Enrich a validated price series with the full indicator set.
///
/// Output is index-aligned with the input: one [`IndicatorRow`] per bar, with
/// `None` in each indicator's warm-up window. Adjusted close is the canonical
/// price for all price-only indicators; ATR and the stochastic use the raw
/// high/low/close range.
pub fn enrich_series(bars: &[PriceBar]) -> Result<Vec<IndicatorRow>, AllocationError> {
    if bars.is_empty() {
        return Err(AllocationError::InsufficientData(
            "cannot enrich an empty price series".to_string(),
        ));
    }

    let prices: Vec<f64> = bars.iter().map(|b| b.adj_close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let rsi_daily = rsi(&prices, RSI_PERIOD);
    let rsi_fast = rsi(&prices, RSI_SHORT_PERIOD);
    let macd_series = macd(&prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let bb = bollinger_bands(&prices, BB_PERIOD, BB_STD);
    let atr_series = atr(bars, ATR_PERIOD);
    let stoch = stochastic(bars, STOCH_K_PERIOD, STOCH_D_PERIOD);
    let obv_series = obv(bars);
    let vwap_series = vwap(bars);
    let sma_5 = sma(&prices, 5);
    let sma_10 = sma(&prices, 10);
    let sma_50 = sma(&prices, 50);
    let sma_200 = sma(&prices, 200);
    let volume_change = pct_change(&volumes);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            date: bar.date,
            price: bar.adj_close,
            rsi: rsi_daily[i],
            rsi_short: rsi_fast[i],
            macd: macd_series.macd.get(i).copied(),
            macd_signal: macd_series.signal.get(i).copied(),
            macd_hist: macd_series.histogram.get(i).copied(),
            bb_upper: bb.upper[i],
            bb_lower: bb.lower[i],
            bb_width: bb.width[i],
            atr: atr_series[i],
            stoch_k: stoch.k[i],
            stoch_d: stoch.d[i],
            obv: obv_series.get(i).copied(),
            vwap: vwap_series.get(i).copied(),
            sma_5: sma_5[i],
            sma_10: sma_10[i],
            sma_50: sma_50[i],
            sma_200: sma_200[i],
            volume_change: volume_change[i],
        })
        .collect();

    Ok(rows)
}
