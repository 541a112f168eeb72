pub mod error;
pub mod traits;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn raw(date: &str, close: Option<f64>, adj: Option<f64>) -> RawPriceRecord {
        RawPriceRecord {
            date: d(date),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close,
            adj_close: adj,
            volume: 1_000.0,
        }
    }

    #[test]
    fn validate_backfills_close_from_adj_close() {
        let bars = validate_series(vec![raw("2024-01-02", None, Some(100.5))]).unwrap();
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[0].adj_close, 100.5);
    }

    #[test]
    fn validate_backfills_adj_close_from_close() {
        let bars = validate_series(vec![raw("2024-01-02", Some(99.5), None)]).unwrap();
        assert_eq!(bars[0].adj_close, 99.5);
    }

    #[test]
    fn validate_rejects_missing_price_columns() {
        let err = validate_series(vec![raw("2024-01-02", None, None)]).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidData(_)));
    }

    #[test]
    fn validate_rejects_unsorted_dates() {
        let recs = vec![
            raw("2024-01-03", Some(100.0), None),
            raw("2024-01-02", Some(101.0), None),
        ];
        assert!(matches!(
            validate_series(recs),
            Err(AllocationError::InvalidData(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_dates() {
        let recs = vec![
            raw("2024-01-02", Some(100.0), None),
            raw("2024-01-02", Some(101.0), None),
        ];
        assert!(validate_series(recs).is_err());
    }

    #[test]
    fn validate_rejects_empty_series() {
        assert!(matches!(
            validate_series(vec![]),
            Err(AllocationError::InsufficientData(_))
        ));
    }

    #[test]
    fn validate_rejects_all_zero_series() {
        let recs = vec![raw("2024-01-02", Some(0.0), Some(0.0))];
        assert!(matches!(
            validate_series(recs),
            Err(AllocationError::InvalidData(_))
        ));
    }

    #[test]
    fn decision_clamps_and_sums_to_one() {
        let d = AllocationDecision::from_leveraged_weight(1.7);
        assert_eq!(d.weight_leveraged, 1.0);
        assert_eq!(d.weight_base, 0.0);

        let d = AllocationDecision::from_leveraged_weight(0.25);
        assert!((d.weight_base + d.weight_leveraged - 1.0).abs() < 1e-12);
    }

    #[test]
    fn default_thresholds_are_a_fresh_value() {
        let mut a = ThresholdSet::default_set();
        let b = ThresholdSet::default_set();
        a.rsi_daily_low = 5.0;
        assert_eq!(b.rsi_daily_low, 30.0);
    }
}
