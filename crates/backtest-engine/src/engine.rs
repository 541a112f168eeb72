use std::collections::HashMap;

use allocation_core::{
    AllocationDecision, AllocationError, EquityCurve, EquityPoint, IndicatorRow, PriceBar,
};

use crate::models::BacktestCurves;

/// Starting value for every equity curve.
pub const INITIAL_VALUE: f64 = 100.0;

/// A day's allocation decided from the previous day's indicator row.
pub type AllocationFn<'a> = dyn Fn(&IndicatorRow) -> AllocationDecision + Sync + 'a;

/// Replay an allocation policy day by day over two aligned price histories.
///
/// Both series are aligned to their common date intersection; all three
/// curves start at exactly 100.0 on the first common date. Each day's blended
/// return uses the decision from the *previous* day's indicator row, so the
/// policy never sees the price move it is being scored on. With no allocation
/// function the strategy holds 100% of the base asset.
///
/// `rows` must be the enriched counterpart of `base`, index-aligned.
pub fn run_backtest(
    base: &[PriceBar],
    leveraged: &[PriceBar],
    rows: &[IndicatorRow],
    allocation: Option<&AllocationFn<'_>>,
) -> Result<BacktestCurves, AllocationError> {
    if rows.len() != base.len() {
        return Err(AllocationError::InvalidData(format!(
            "indicator rows ({}) not aligned with base series ({})",
            rows.len(),
            base.len()
        )));
    }

    // Common-date alignment: keep base rows whose date exists in the
    // leveraged series.
    let lev_by_date: HashMap<_, _> = leveraged.iter().map(|b| (b.date, b)).collect();
    let mut aligned: Vec<(&PriceBar, &PriceBar, &IndicatorRow)> = Vec::new();
    for (bar, row) in base.iter().zip(rows) {
        if let Some(lev) = lev_by_date.get(&bar.date) {
            aligned.push((bar, lev, row));
        }
    }

    if aligned.len() < 2 {
        return Err(AllocationError::InsufficientData(format!(
            "need at least 2 common trading days, found {}",
            aligned.len()
        )));
    }

    tracing::debug!(days = aligned.len(), "aligned price series for backtest");

    let n = aligned.len();
    let mut strategy = Vec::with_capacity(n);
    let mut base_only = Vec::with_capacity(n);
    let mut leveraged_only = Vec::with_capacity(n);

    let first_date = aligned[0].0.date;
    strategy.push(EquityPoint {
        date: first_date,
        value: INITIAL_VALUE,
    });
    base_only.push(EquityPoint {
        date: first_date,
        value: INITIAL_VALUE,
    });
    leveraged_only.push(EquityPoint {
        date: first_date,
        value: INITIAL_VALUE,
    });

    for t in 1..n {
        let (yesterday_base, yesterday_lev, yesterday_row) = aligned[t - 1];
        let (today_base, today_lev, _) = aligned[t];

        let r_base = today_base.adj_close / yesterday_base.adj_close - 1.0;
        let r_lev = today_lev.adj_close / yesterday_lev.adj_close - 1.0;

        // Decision lagged by one day: today's weights come from yesterday's
        // close-of-day indicator snapshot.
        let decision = match allocation {
            Some(f) => f(yesterday_row),
            None => AllocationDecision::all_base(),
        };
        let r_strategy = decision.weight_base * r_base + decision.weight_leveraged * r_lev;

        let date = today_base.date;
        push_compounded(&mut strategy, date, r_strategy);
        push_compounded(&mut base_only, date, r_base);
        push_compounded(&mut leveraged_only, date, r_lev);
    }

    Ok(BacktestCurves {
        strategy: EquityCurve { points: strategy },
        base_only: EquityCurve { points: base_only },
        leveraged_only: EquityCurve {
            points: leveraged_only,
        },
    })
}

fn push_compounded(points: &mut Vec<EquityPoint>, date: chrono::NaiveDate, daily_return: f64) {
    let prev = points.last().map(|p| p.value).unwrap_or(INITIAL_VALUE);
    points.push(EquityPoint {
        date,
        value: prev * (1.0 + daily_return),
    });
}
