pub mod policy;

pub use policy::*;

#[cfg(test)]
mod tests {
    use super::*;
    use allocation_core::{IndicatorRow, MacroSnapshot, ThresholdSet};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn weights_sum_to_one(row: &IndicatorRow, macros: &MacroSnapshot) {
        let d = decide_allocation(
            row,
            macros,
            &ThresholdSet::default_set(),
            &VoteWeights::default(),
        );
        assert!((d.weight_base + d.weight_leveraged - 1.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&d.weight_base));
        assert!((0.0..=1.0).contains(&d.weight_leveraged));
    }

    #[test]
    fn all_none_row_yields_valid_even_split() {
        let row = IndicatorRow::empty(day(), 100.0);
        let macros = MacroSnapshot::default();
        weights_sum_to_one(&row, &macros);

        let d = decide_allocation(
            &row,
            &macros,
            &ThresholdSet::default_set(),
            &VoteWeights::default(),
        );
        assert!((d.weight_leveraged - 0.5).abs() < 1e-9);
    }

    #[test]
    fn weights_valid_for_extreme_rows() {
        let mut bullish = IndicatorRow::empty(day(), 100.0);
        bullish.rsi = Some(5.0);
        bullish.rsi_short = Some(5.0);
        bullish.macd = Some(2.0);
        bullish.macd_signal = Some(1.0);
        bullish.bb_upper = Some(120.0);
        bullish.bb_lower = Some(105.0);
        bullish.atr = Some(0.5);
        bullish.bb_width = Some(0.01);
        bullish.stoch_k = Some(5.0);
        let macros = MacroSnapshot {
            vix: Some(10.0),
            fear_greed: Some(90),
            interest_rate: Some(1.0),
        };
        weights_sum_to_one(&bullish, &macros);
    }

    #[test]
    fn missing_indicator_casts_no_vote() {
        let mut row = IndicatorRow::empty(day(), 100.0);
        row.rsi = Some(25.0); // +2 and nothing else
        let votes = collect_votes(
            &row,
            &MacroSnapshot::default(),
            &ThresholdSet::default_set(),
        );
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].value, 2);
    }

    #[test]
    fn rsi_vote_tiers() {
        let thresholds = ThresholdSet::default_set();
        let macros = MacroSnapshot::default();
        let mut row = IndicatorRow::empty(day(), 100.0);

        for (rsi, expected) in [(25.0, 2), (35.0, 1), (55.0, 0), (75.0, -2)] {
            row.rsi = Some(rsi);
            let votes = collect_votes(&row, &macros, &thresholds);
            assert_eq!(votes[0].value, expected, "rsi {rsi}");
        }
    }

    #[test]
    fn macd_histogram_crossing_never_decreases_leveraged_weight() {
        let thresholds = ThresholdSet::default_set();
        let weights = VoteWeights::default();
        let macros = MacroSnapshot::default();

        let mut prev_weight = 0.0;
        // Sweep the histogram from negative to positive, all else fixed
        for hist in [-2.0, -0.5, 0.0, 0.5, 2.0] {
            let mut row = IndicatorRow::empty(day(), 100.0);
            row.macd = Some(hist);
            row.macd_signal = Some(0.0);
            row.macd_hist = Some(hist);
            let d = decide_allocation(&row, &macros, &thresholds, &weights);
            assert!(
                d.weight_leveraged >= prev_weight,
                "leveraged weight decreased at hist {hist}"
            );
            prev_weight = d.weight_leveraged;
        }
    }

    #[test]
    fn net_bullish_row_overweights_leveraged_asset() {
        // RSI below the default low, MACD above signal, price under the lower
        // band, tame ATR: the policy should lean into the leveraged asset.
        let mut row = IndicatorRow::empty(day(), 100.0);
        row.rsi = Some(25.0);
        row.macd = Some(1.5);
        row.macd_signal = Some(1.0);
        row.bb_upper = Some(115.0);
        row.bb_lower = Some(102.0);
        row.atr = Some(1.0); // 1% of price, below atr_low

        let d = decide_allocation(
            &row,
            &MacroSnapshot::default(),
            &ThresholdSet::default_set(),
            &VoteWeights::default(),
        );
        assert!(
            d.weight_leveraged > 0.5,
            "expected leveraged overweight, got {}",
            d.weight_leveraged
        );
    }

    #[test]
    fn vote_weight_scales_score() {
        let mut row = IndicatorRow::empty(day(), 100.0);
        row.macd = Some(1.0);
        row.macd_signal = Some(0.0);

        let votes = collect_votes(
            &row,
            &MacroSnapshot::default(),
            &ThresholdSet::default_set(),
        );
        let mut weights = VoteWeights::default();
        assert_eq!(score_votes(&votes, &weights), 1.0);
        weights.macd = 2.5;
        assert_eq!(score_votes(&votes, &weights), 2.5);
    }

    #[test]
    fn macro_votes_follow_fixed_cutoffs() {
        let row = IndicatorRow::empty(day(), 100.0);
        let thresholds = ThresholdSet::default_set();

        let fearful = MacroSnapshot {
            vix: Some(30.0),
            fear_greed: Some(10),
            interest_rate: Some(5.0),
        };
        let votes = collect_votes(&row, &fearful, &thresholds);
        let total: i32 = votes.iter().map(|v| v.value).sum();
        assert_eq!(total, -3);

        let calm = MacroSnapshot {
            vix: Some(12.0),
            fear_greed: Some(85),
            interest_rate: Some(1.5),
        };
        let votes = collect_votes(&row, &calm, &thresholds);
        let total: i32 = votes.iter().map(|v| v.value).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn explain_mentions_votes_and_split() {
        let mut row = IndicatorRow::empty(day(), 100.0);
        row.rsi = Some(25.0);
        let text = explain_decision(
            &row,
            &MacroSnapshot::default(),
            &ThresholdSet::default_set(),
            &VoteWeights::default(),
        );
        assert!(text.contains("RSI"));
        assert!(text.contains("suggested split"));
    }
}
