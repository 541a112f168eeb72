pub mod engine;
pub mod metrics;
pub mod models;
pub mod optimizer;


pub use engine::{run_backtest, AllocationFn, INITIAL_VALUE};
pub use metrics::{compute_metrics, TRADING_DAYS};
pub use models::*;
pub use optimizer::{
    optimize, optimize_with_grids, run_grid_search, OptimizerConfig, OptimizerInputs, TOP_K,
};
