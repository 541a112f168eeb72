//! CLI definition and command dispatch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use allocation_core::{
    AllocationDecision, IndicatorRow, MacroProvider, MacroSnapshot, PriceBar, PriceProvider,
    StoredThresholds, ThresholdSet, ThresholdStore,
};
use allocation_policy::{decide_allocation, explain_decision, VoteWeights};
use anyhow::{anyhow, Context, Result};
use backtest_engine::{
    optimize, run_backtest, OptimizeMetric, OptimizerConfig, OptimizerInputs,
};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use indicator_engine::enrich_series;
use threshold_store::SqliteThresholdStore;

use crate::providers::{CsvMacroProvider, CsvPriceProvider};
use crate::report::{render_comparison, render_daily_records, BacktestReport, DailyRecord};

#[derive(Parser, Debug)]
#[command(name = "portpulse", about = "Two-asset daily allocation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Directory holding <SYMBOL>.csv price files
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
    /// Base instrument symbol
    #[arg(long, default_value = "TSLA")]
    pub base: String,
    /// Leveraged instrument symbol
    #[arg(long, default_value = "TSLL")]
    pub leveraged: String,
    /// First trading day to include (default: 3 years back)
    #[arg(long)]
    pub start: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct MacroArgs {
    /// Optional VIX series CSV (date,value)
    #[arg(long)]
    pub vix: Option<PathBuf>,
    /// Optional fear & greed series CSV (date,value)
    #[arg(long)]
    pub fear_greed: Option<PathBuf>,
    /// Current 10Y interest rate in percent
    #[arg(long)]
    pub rate: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the allocation strategy against buy-and-hold baselines
    Backtest {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        macros: MacroArgs,
        /// Use the best stored thresholds instead of the defaults
        #[arg(long)]
        use_stored: bool,
        /// Threshold database path
        #[arg(long, default_value = "portpulse.db")]
        db: PathBuf,
    },
    /// Grid-search indicator thresholds and store the best configuration
    Optimize {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        macros: MacroArgs,
        /// Metric to maximize: sharpe, cagr or mdd
        #[arg(long, default_value = "sharpe")]
        metric: String,
        /// Minimum acceptable cumulative return (fraction, e.g. 0.05)
        #[arg(long, default_value_t = 0.0)]
        min_return: f64,
        /// Worker threads (default: half the CPUs)
        #[arg(long)]
        threads: Option<usize>,
        /// Skip persisting the winning thresholds
        #[arg(long)]
        no_save: bool,
        #[arg(long, default_value = "portpulse.db")]
        db: PathBuf,
    },
    /// Replay stored vs default thresholds side by side with a daily log
    Simulate {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        macros: MacroArgs,
        /// How many trailing days of the allocation log to print
        #[arg(long, default_value_t = 10)]
        tail: usize,
        #[arg(long, default_value = "portpulse.db")]
        db: PathBuf,
    },
    /// Print today's votes and suggested split from the latest data
    Analyze {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        macros: MacroArgs,
        /// Use the best stored thresholds instead of the defaults
        #[arg(long)]
        use_stored: bool,
        #[arg(long, default_value = "portpulse.db")]
        db: PathBuf,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Backtest {
            data,
            macros,
            use_stored,
            db,
        } => run_backtest_cmd(data, macros, use_stored, db).await,
        Command::Optimize {
            data,
            macros,
            metric,
            min_return,
            threads,
            no_save,
            db,
        } => run_optimize_cmd(data, macros, metric, min_return, threads, no_save, db).await,
        Command::Simulate {
            data,
            macros,
            tail,
            db,
        } => run_simulate_cmd(data, macros, tail, db).await,
        Command::Analyze {
            data,
            macros,
            use_stored,
            db,
        } => run_analyze_cmd(data, macros, use_stored, db).await,
    }
}

/// Everything a backtest or grid search needs, loaded once.
struct LoadedInputs {
    base_symbol: String,
    leveraged_symbol: String,
    base: Vec<PriceBar>,
    leveraged: Vec<PriceBar>,
    rows: Vec<IndicatorRow>,
    vix: BTreeMap<NaiveDate, f64>,
    fear_greed: BTreeMap<NaiveDate, i64>,
    interest_rate: Option<f64>,
}

impl LoadedInputs {
    fn snapshot_for(&self, date: NaiveDate) -> MacroSnapshot {
        MacroSnapshot {
            vix: self.vix.get(&date).copied(),
            fear_greed: self.fear_greed.get(&date).copied(),
            interest_rate: self.interest_rate,
        }
    }

    fn allocation_fn<'a>(
        &'a self,
        thresholds: &'a ThresholdSet,
        weights: &'a VoteWeights,
    ) -> impl Fn(&IndicatorRow) -> AllocationDecision + Sync + 'a {
        move |row| {
            let macros = self.snapshot_for(row.date);
            decide_allocation(row, &macros, thresholds, weights)
        }
    }
}

async fn load_inputs(data: &DataArgs, macros: &MacroArgs) -> Result<LoadedInputs> {
    let start = data
        .start
        .unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(3 * 365));

    let prices = CsvPriceProvider::new(&data.data_dir);
    let base = prices
        .daily_bars(&data.base, start)
        .await
        .with_context(|| format!("loading {}", data.base))?;
    let leveraged = prices
        .daily_bars(&data.leveraged, start)
        .await
        .with_context(|| format!("loading {}", data.leveraged))?;
    if base.is_empty() || leveraged.is_empty() {
        return Err(anyhow!("no price data on or after {start}"));
    }

    let rows = enrich_series(&base)?;

    let rate = macros.rate.or_else(|| {
        std::env::var("PORTPULSE_INTEREST_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
    });
    let macro_provider =
        CsvMacroProvider::new(macros.vix.clone(), macros.fear_greed.clone(), rate);

    Ok(LoadedInputs {
        base_symbol: data.base.clone(),
        leveraged_symbol: data.leveraged.clone(),
        base,
        leveraged,
        rows,
        vix: macro_provider.vix_series().await?,
        fear_greed: macro_provider.fear_greed_series().await?,
        interest_rate: macro_provider.interest_rate().await?,
    })
}

async fn stored_thresholds(db: &Path) -> Result<Option<StoredThresholds>> {
    let store = SqliteThresholdStore::open(db).await?;
    Ok(store.load_best().await?)
}

async fn run_backtest_cmd(
    data: DataArgs,
    macros: MacroArgs,
    use_stored: bool,
    db: PathBuf,
) -> Result<()> {
    let inputs = load_inputs(&data, &macros).await?;

    let thresholds = if use_stored {
        match stored_thresholds(&db).await? {
            Some(stored) => {
                tracing::info!(metric = %stored.metric, score = stored.score, "using stored thresholds");
                stored.thresholds
            }
            None => {
                tracing::warn!("no stored thresholds found, falling back to defaults");
                ThresholdSet::default_set()
            }
        }
    } else {
        ThresholdSet::default_set()
    };

    let weights = VoteWeights::default();
    let allocation = inputs.allocation_fn(&thresholds, &weights);
    let curves = run_backtest(&inputs.base, &inputs.leveraged, &inputs.rows, Some(&allocation))?;
    let report = BacktestReport::from_curves(&curves)?;

    println!(
        "{}",
        render_comparison(&report, &inputs.base_symbol, &inputs.leveraged_symbol)
    );
    Ok(())
}

async fn run_optimize_cmd(
    data: DataArgs,
    macros: MacroArgs,
    metric: String,
    min_return: f64,
    threads: Option<usize>,
    no_save: bool,
    db: PathBuf,
) -> Result<()> {
    let metric: OptimizeMetric = metric.parse().map_err(|e: String| anyhow!(e))?;
    let inputs = load_inputs(&data, &macros).await?;

    let optimizer_inputs = OptimizerInputs {
        base: &inputs.base,
        leveraged: &inputs.leveraged,
        rows: &inputs.rows,
        vix: &inputs.vix,
        fear_greed: &inputs.fear_greed,
        interest_rate: inputs.interest_rate,
    };
    let config = OptimizerConfig {
        metric,
        min_return,
        threads,
    };

    let result = optimize(&optimizer_inputs, &config)?;
    tracing::info!(
        evaluated = result.evaluated,
        best_score = result.best.score,
        "grid search finished"
    );

    println!(
        "Top candidates by {} ({} evaluated):\n",
        metric.as_str(),
        result.evaluated
    );
    for (rank, candidate) in result.top.iter().enumerate() {
        let t = &candidate.thresholds;
        println!(
            "{}. score {:.3}  cum {:+.1}%  rsi [{:.0}, {:.0}]  atr [{:.1}, {:.1}]  bbw [{:.2}, {:.2}]",
            rank + 1,
            candidate.score,
            candidate.metrics.cumulative_return * 100.0,
            t.rsi_daily_low,
            t.rsi_daily_high,
            t.atr_low,
            t.atr_high,
            t.bb_width_low,
            t.bb_width_high
        );
    }

    if !no_save {
        let store = SqliteThresholdStore::open(&db).await?;
        store
            .save_best(&StoredThresholds {
                thresholds: result.best.thresholds.clone(),
                metric: metric.as_str().to_string(),
                score: result.best.score,
                metrics: result.best.metrics,
                saved_on: Utc::now().date_naive(),
            })
            .await?;
        println!("\nSaved best thresholds to {}", db.display());
    }
    Ok(())
}

async fn run_simulate_cmd(
    data: DataArgs,
    macros: MacroArgs,
    tail: usize,
    db: PathBuf,
) -> Result<()> {
    let inputs = load_inputs(&data, &macros).await?;
    let weights = VoteWeights::default();

    let defaults = ThresholdSet::default_set();
    let stored = stored_thresholds(&db).await?;

    let allocation = inputs.allocation_fn(&defaults, &weights);
    let default_curves =
        run_backtest(&inputs.base, &inputs.leveraged, &inputs.rows, Some(&allocation))?;
    println!("== Default thresholds ==");
    println!(
        "{}",
        render_comparison(
            &BacktestReport::from_curves(&default_curves)?,
            &inputs.base_symbol,
            &inputs.leveraged_symbol
        )
    );

    let active = match &stored {
        Some(stored) => {
            let allocation = inputs.allocation_fn(&stored.thresholds, &weights);
            let curves =
                run_backtest(&inputs.base, &inputs.leveraged, &inputs.rows, Some(&allocation))?;
            println!("== Stored thresholds (saved {}) ==", stored.saved_on);
            println!(
                "{}",
                render_comparison(
                    &BacktestReport::from_curves(&curves)?,
                    &inputs.base_symbol,
                    &inputs.leveraged_symbol
                )
            );
            stored.thresholds.clone()
        }
        None => {
            println!("No stored thresholds; daily log uses defaults.\n");
            defaults.clone()
        }
    };

    // Each row's decision takes effect the next trading day.
    let records: Vec<DailyRecord> = inputs
        .rows
        .iter()
        .map(|row| {
            let macros = inputs.snapshot_for(row.date);
            let decision = decide_allocation(row, &macros, &active, &weights);
            DailyRecord {
                date: row.date,
                weight_base: decision.weight_base,
                weight_leveraged: decision.weight_leveraged,
            }
        })
        .collect();

    println!("Daily allocation log (last {tail} days):");
    println!("{}", render_daily_records(&records, tail));
    Ok(())
}

async fn run_analyze_cmd(
    data: DataArgs,
    macros: MacroArgs,
    use_stored: bool,
    db: PathBuf,
) -> Result<()> {
    let inputs = load_inputs(&data, &macros).await?;
    let row = inputs
        .rows
        .last()
        .ok_or_else(|| anyhow!("no indicator rows"))?;

    let thresholds = if use_stored {
        match stored_thresholds(&db).await? {
            Some(stored) => stored.thresholds,
            None => ThresholdSet::default_set(),
        }
    } else {
        ThresholdSet::default_set()
    };

    let snapshot = inputs.snapshot_for(row.date);
    let weights = VoteWeights::default();

    println!(
        "{} as of {} (price {:.2}):",
        inputs.base_symbol, row.date, row.price
    );
    println!("{}", explain_decision(row, &snapshot, &thresholds, &weights));
    Ok(())
}
