//! CSV-file implementations of the data-provider traits.
//!
//! Price history lives in one CSV per symbol under a data directory
//! (`<dir>/<SYMBOL>.csv`); macro series are optional single-value CSVs. No
//! network access anywhere.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use allocation_core::{
    validate_series, AllocationError, MacroProvider, PriceBar, PriceProvider, RawPriceRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

/// Daily bars read from `<data_dir>/<SYMBOL>.csv`.
///
/// Expected header: `date,open,high,low,close,adj_close,volume`, where
/// `close` and `adj_close` may each be empty on a given row.
pub struct CsvPriceProvider {
    data_dir: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl PriceProvider for CsvPriceProvider {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
    ) -> Result<Vec<PriceBar>, AllocationError> {
        let path = self.data_dir.join(format!("{symbol}.csv"));
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            AllocationError::InvalidData(format!("cannot open {}: {e}", path.display()))
        })?;

        let mut records: Vec<RawPriceRecord> = Vec::new();
        for row in reader.deserialize() {
            let record: RawPriceRecord = row.map_err(|e| {
                AllocationError::InvalidData(format!("bad row in {}: {e}", path.display()))
            })?;
            records.push(record);
        }
        records.retain(|r| r.date >= start);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let bars = validate_series(records)?;
        tracing::info!(symbol, rows = bars.len(), "loaded price history");
        Ok(bars)
    }
}

#[derive(Debug, Deserialize)]
struct MacroRow {
    date: NaiveDate,
    value: f64,
}

fn read_macro_csv(path: &Path) -> Result<BTreeMap<NaiveDate, f64>, AllocationError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AllocationError::InvalidData(format!("cannot open {}: {e}", path.display()))
    })?;

    let mut series = BTreeMap::new();
    for row in reader.deserialize() {
        let record: MacroRow = row.map_err(|e| {
            AllocationError::InvalidData(format!("bad row in {}: {e}", path.display()))
        })?;
        series.insert(record.date, record.value);
    }
    Ok(series)
}

/// Macro signals from optional CSV files plus a fixed interest rate.
///
/// Every input is optional; a missing file simply yields an empty series and
/// the corresponding votes are skipped downstream.
pub struct CsvMacroProvider {
    vix_path: Option<PathBuf>,
    fear_greed_path: Option<PathBuf>,
    interest_rate: Option<f64>,
}

impl CsvMacroProvider {
    pub fn new(
        vix_path: Option<PathBuf>,
        fear_greed_path: Option<PathBuf>,
        interest_rate: Option<f64>,
    ) -> Self {
        Self {
            vix_path,
            fear_greed_path,
            interest_rate,
        }
    }
}

#[async_trait]
impl MacroProvider for CsvMacroProvider {
    async fn vix_series(&self) -> Result<BTreeMap<NaiveDate, f64>, AllocationError> {
        match &self.vix_path {
            Some(path) => read_macro_csv(path),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn fear_greed_series(&self) -> Result<BTreeMap<NaiveDate, i64>, AllocationError> {
        match &self.fear_greed_path {
            Some(path) => Ok(read_macro_csv(path)?
                .into_iter()
                .map(|(date, value)| (date, value.round() as i64))
                .collect()),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn interest_rate(&self) -> Result<Option<f64>, AllocationError> {
        Ok(self.interest_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("portpulse-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_loads_and_filters_price_csv() {
        let path = write_temp(
            "BASE.csv",
            "date,open,high,low,close,adj_close,volume\n\
             2024-01-01,10,11,9,10.5,10.5,1000\n\
             2024-01-02,10.5,12,10,11.0,,1100\n\
             2024-01-03,11,12,10,,11.5,1200\n",
        );
        let provider = CsvPriceProvider::new(path.parent().unwrap());

        let bars = provider
            .daily_bars("BASE", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .await
            .unwrap();

        assert_eq!(bars.len(), 2);
        // Missing adj_close back-fills from close and vice versa
        assert_eq!(bars[0].adj_close, 11.0);
        assert_eq!(bars[1].close, 11.5);
    }

    #[tokio::test]
    async fn test_missing_symbol_is_an_error_not_empty() {
        let provider = CsvPriceProvider::new(std::env::temp_dir());
        let err = provider
            .daily_bars("NO-SUCH-SYMBOL", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_absent_macro_files_yield_empty_series() {
        let provider = CsvMacroProvider::new(None, None, Some(4.3));
        assert!(provider.vix_series().await.unwrap().is_empty());
        assert!(provider.fear_greed_series().await.unwrap().is_empty());
        assert_eq!(provider.interest_rate().await.unwrap(), Some(4.3));
    }

    #[tokio::test]
    async fn test_fear_greed_values_round_to_integers() {
        let path = write_temp("fg.csv", "date,value\n2024-01-01,72.6\n2024-01-02,18.2\n");
        let provider = CsvMacroProvider::new(None, Some(path), None);

        let series = provider.fear_greed_series().await.unwrap();
        assert_eq!(
            series.get(&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            Some(&73)
        );
        assert_eq!(
            series.get(&NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Some(&18)
        );
    }
}
