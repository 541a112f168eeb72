//! Console rendering of backtest results.

use allocation_core::PerformanceMetrics;
use backtest_engine::{compute_metrics, BacktestCurves};
use chrono::NaiveDate;

/// A day's allocation as recorded during a simulation run.
#[derive(Debug, Clone)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub weight_base: f64,
    pub weight_leveraged: f64,
}

/// Metrics for all three curves of one backtest run.
pub struct BacktestReport {
    pub strategy: PerformanceMetrics,
    pub base_only: PerformanceMetrics,
    pub leveraged_only: PerformanceMetrics,
    pub final_values: (f64, f64, f64),
    pub days: usize,
}

impl BacktestReport {
    pub fn from_curves(curves: &BacktestCurves) -> Result<Self, allocation_core::AllocationError> {
        Ok(Self {
            strategy: compute_metrics(&curves.strategy)?,
            base_only: compute_metrics(&curves.base_only)?,
            leveraged_only: compute_metrics(&curves.leveraged_only)?,
            final_values: (
                curves.strategy.final_value().unwrap_or(0.0),
                curves.base_only.final_value().unwrap_or(0.0),
                curves.leveraged_only.final_value().unwrap_or(0.0),
            ),
            days: curves.strategy.len(),
        })
    }
}

/// Render the strategy-vs-baselines comparison table.
pub fn render_comparison(report: &BacktestReport, base: &str, leveraged: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Performance over {} trading days\n\n", report.days));
    out.push_str(&format!(
        "{:<22} {:>10} {:>10} {:>10}\n",
        "", "strategy", base, leveraged
    ));

    let rows: [(&str, fn(&PerformanceMetrics) -> String); 6] = [
        ("CAGR", |m| format!("{:.2}%", m.cagr * 100.0)),
        ("Volatility (ann.)", |m| {
            format!("{:.2}%", m.volatility * 100.0)
        }),
        ("Sharpe", |m| format!("{:.2}", m.sharpe)),
        ("Max drawdown", |m| format!("{:.2}%", m.max_drawdown * 100.0)),
        ("Cumulative return", |m| {
            format!("{:.2}%", m.cumulative_return * 100.0)
        }),
        ("Max return", |m| format!("{:.2}%", m.max_return * 100.0)),
    ];
    for (label, fmt) in rows {
        out.push_str(&format!(
            "{:<22} {:>10} {:>10} {:>10}\n",
            label,
            fmt(&report.strategy),
            fmt(&report.base_only),
            fmt(&report.leveraged_only)
        ));
    }

    let (s, b, l) = report.final_values;
    out.push_str(&format!(
        "{:<22} {:>10.2} {:>10.2} {:>10.2}\n",
        "Final value (of 100)", s, b, l
    ));
    out
}

/// Render the tail of a simulation's daily allocation log.
pub fn render_daily_records(records: &[DailyRecord], tail: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:>8} {:>10}\n",
        "date", "base", "leveraged"
    ));
    let start = records.len().saturating_sub(tail);
    for record in &records[start..] {
        out.push_str(&format!(
            "{:<12} {:>7.1}% {:>9.1}%\n",
            record.date,
            record.weight_base * 100.0,
            record.weight_leveraged * 100.0
        ));
    }
    out
}
