use allocation_core::{AllocationError, EquityCurve, PerformanceMetrics};

/// Trading days per year, for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Reduce one equity curve to summary risk/return statistics.
///
/// Zero-variance return series resolve to Sharpe 0.0 rather than dividing by
/// zero; drawdown is reported as a positive magnitude.
pub fn compute_metrics(curve: &EquityCurve) -> Result<PerformanceMetrics, AllocationError> {
    let n = curve.len();
    if n < 2 {
        return Err(AllocationError::InsufficientData(format!(
            "equity curve needs at least 2 points, has {n}"
        )));
    }

    let initial = curve.first_value().unwrap_or(0.0);
    let final_value = curve.final_value().unwrap_or(0.0);
    if initial <= 0.0 {
        return Err(AllocationError::InvalidData(
            "equity curve starts at a non-positive value".to_string(),
        ));
    }

    let values: Vec<f64> = curve.values().collect();
    let returns: Vec<f64> = values.windows(2).map(|w| w[1] / w[0] - 1.0).collect();

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    // Sample standard deviation (ddof = 1); a single return has no spread.
    let stddev = if returns.len() > 1 {
        let var = returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (returns.len() - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    let volatility = stddev * TRADING_DAYS.sqrt();
    let sharpe = if stddev == 0.0 {
        0.0
    } else {
        mean / stddev * TRADING_DAYS.sqrt()
    };

    let cagr = (final_value / initial).powf(TRADING_DAYS / n as f64) - 1.0;

    let mut running_max = f64::NEG_INFINITY;
    let mut max_drawdown: f64 = 0.0;
    for &v in &values {
        running_max = running_max.max(v);
        max_drawdown = max_drawdown.max(1.0 - v / running_max);
    }

    Ok(PerformanceMetrics {
        cagr,
        volatility,
        sharpe,
        max_drawdown,
        cumulative_return: final_value / initial - 1.0,
        max_return: running_max / initial - 1.0,
    })
}
