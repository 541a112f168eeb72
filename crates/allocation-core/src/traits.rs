use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AllocationError, PriceBar, StoredThresholds};

/// Source of daily price history for one instrument.
///
/// An empty vec means no data exists for the requested range; transport or
/// parse failures surface as errors so callers can tell absence from failure.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<Vec<PriceBar>, AllocationError>;
}

/// Source of macro-market signal series (volatility index, sentiment, rates).
///
/// Each signal is independently optional; a missing signal degrades the
/// allocation policy to fewer votes rather than failing the pipeline.
#[async_trait]
pub trait MacroProvider: Send + Sync {
    async fn vix_series(&self) -> Result<BTreeMap<NaiveDate, f64>, AllocationError>;

    async fn fear_greed_series(&self) -> Result<BTreeMap<NaiveDate, i64>, AllocationError>;

    async fn interest_rate(&self) -> Result<Option<f64>, AllocationError>;
}

/// Persistence for optimized threshold configurations.
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// Save a new candidate configuration with its score and metrics.
    async fn save_best(&self, stored: &StoredThresholds) -> Result<(), AllocationError>;

    /// Load the configuration with the highest recorded score, if any exists.
    async fn load_best(&self) -> Result<Option<StoredThresholds>, AllocationError>;
}
