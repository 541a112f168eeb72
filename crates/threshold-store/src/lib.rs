//! SQLite persistence for optimized allocation thresholds.

use std::path::Path;
use std::str::FromStr;

use allocation_core::{
    AllocationError, PerformanceMetrics, StoredThresholds, ThresholdSet, ThresholdStore,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Threshold configurations persisted in a local SQLite database.
///
/// Every optimization run appends a row; `load_best` returns the row with the
/// highest recorded score across all runs, so a worse re-optimization never
/// shadows an earlier better one.
pub struct SqliteThresholdStore {
    pool: SqlitePool,
}

impl SqliteThresholdStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self, AllocationError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    /// An in-memory store, used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, AllocationError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(store_err)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), AllocationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS optimized_thresholds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thresholds_json TEXT NOT NULL,
                metric TEXT NOT NULL,
                score REAL NOT NULL,
                metrics_json TEXT NOT NULL,
                saved_on TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl ThresholdStore for SqliteThresholdStore {
    async fn save_best(&self, stored: &StoredThresholds) -> Result<(), AllocationError> {
        let thresholds_json = serde_json::to_string(&stored.thresholds).map_err(store_err)?;
        let metrics_json = serde_json::to_string(&stored.metrics).map_err(store_err)?;

        sqlx::query(
            "INSERT INTO optimized_thresholds
                (thresholds_json, metric, score, metrics_json, saved_on)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&thresholds_json)
        .bind(&stored.metric)
        .bind(stored.score)
        .bind(&metrics_json)
        .bind(stored.saved_on.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        tracing::info!(
            metric = %stored.metric,
            score = stored.score,
            "saved optimized thresholds"
        );
        Ok(())
    }

    async fn load_best(&self) -> Result<Option<StoredThresholds>, AllocationError> {
        let row = sqlx::query_as::<_, ThresholdRow>(
            "SELECT thresholds_json, metric, score, metrics_json, saved_on
             FROM optimized_thresholds
             ORDER BY score DESC, id ASC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(ThresholdRow::into_stored).transpose()
    }
}

fn store_err(e: impl std::fmt::Display) -> AllocationError {
    AllocationError::Store(e.to_string())
}

/// Internal row type for sqlx deserialization.
#[derive(sqlx::FromRow)]
struct ThresholdRow {
    thresholds_json: String,
    metric: String,
    score: f64,
    metrics_json: String,
    saved_on: String,
}

impl ThresholdRow {
    fn into_stored(self) -> Result<StoredThresholds, AllocationError> {
        let thresholds: ThresholdSet =
            serde_json::from_str(&self.thresholds_json).map_err(store_err)?;
        let metrics: PerformanceMetrics =
            serde_json::from_str(&self.metrics_json).map_err(store_err)?;
        let saved_on = NaiveDate::from_str(&self.saved_on).map_err(store_err)?;

        Ok(StoredThresholds {
            thresholds,
            metric: self.metric,
            score: self.score,
            metrics,
            saved_on,
        })
    }
}
