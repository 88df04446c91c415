// src/analysis/swings.rs
use crate::domain::decision::InsufficientData;
use crate::domain::models::{PriceBar, SwingRange};

/// Default number of recent bars scanned for the dominant extremes
pub const DEFAULT_LOOKBACK: usize = 100;

/// Finds the dominant swing high and swing low of a recent window
#[derive(Debug, Clone)]
pub struct SwingRangeDetector {
    lookback: usize,
}

impl SwingRangeDetector {
    pub fn new() -> Self {
        Self::with_lookback(DEFAULT_LOOKBACK)
    }

    pub fn with_lookback(lookback: usize) -> Self {
        Self { lookback }
    }

    /// Range of the last `lookback` bars (or all bars when fewer are available).
    /// Indices in the returned range refer to `bars`.
    pub fn find_range(&self, bars: &[PriceBar]) -> Result<SwingRange, InsufficientData> {
        find_range(bars, self.lookback)
    }
}

impl Default for SwingRangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Global max high / min low of the most recent `lookback` bars.
///
/// Ties go to the earliest bar holding the extreme.
pub fn find_range(bars: &[PriceBar], lookback: usize) -> Result<SwingRange, InsufficientData> {
    if bars.is_empty() || lookback == 0 {
        return Err(InsufficientData {
            stage: "swing range",
            required: 1,
            available: bars.len().min(lookback),
        });
    }

    let start = bars.len().saturating_sub(lookback);
    let window = &bars[start..];

    let mut high_idx = 0;
    let mut low_idx = 0;
    for (i, bar) in window.iter().enumerate().skip(1) {
        // strict comparisons keep the first occurrence
        if bar.high > window[high_idx].high {
            high_idx = i;
        }
        if bar.low < window[low_idx].low {
            low_idx = i;
        }
    }

    let high = &window[high_idx];
    let low = &window[low_idx];

    Ok(SwingRange {
        high_index: start + high_idx,
        high_timestamp: high.timestamp,
        high_price: high.high,
        low_index: start + low_idx,
        low_timestamp: low.timestamp,
        low_price: low.low,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ImpulseDirection;
    use crate::testing::{bar, flat_bars};
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_window_extremes() {
        let mut bars = flat_bars(150, dec!(1.19), dec!(0.001));
        // outside the 100-bar window: must be ignored
        bars[20].high = dec!(1.25);
        bars[30].low = dec!(1.10);
        bars[140].high = dec!(1.2);
        bars[60].low = dec!(1.18);

        let range = find_range(&bars, 100).unwrap();
        assert_eq!(range.high_index, 140);
        assert_eq!(range.high_price, dec!(1.2));
        assert_eq!(range.low_index, 60);
        assert_eq!(range.low_price, dec!(1.18));
        assert_eq!(range.high_timestamp, bars[140].timestamp);
        assert_eq!(range.impulse(), ImpulseDirection::Bullish);

        for b in &bars[50..] {
            assert!(range.high_price >= b.high);
            assert!(range.low_price <= b.low);
        }
    }

    #[test]
    fn test_short_history_uses_all_bars() {
        let mut bars = flat_bars(40, dec!(1.5), dec!(0.01));
        bars[0].high = dec!(1.6);
        bars[39].low = dec!(1.4);

        let range = find_range(&bars, 100).unwrap();
        assert_eq!(range.high_index, 0);
        assert_eq!(range.low_index, 39);
        assert_eq!(range.impulse(), ImpulseDirection::Bearish);
    }

    #[test]
    fn test_ties_resolve_to_first_occurrence() {
        let mut bars = flat_bars(10, dec!(2.0), dec!(0.1));
        bars[3].high = dec!(2.5);
        bars[7].high = dec!(2.5);
        bars[2].low = dec!(1.5);
        bars[8].low = dec!(1.5);

        let range = find_range(&bars, 10).unwrap();
        assert_eq!(range.high_index, 3);
        assert_eq!(range.low_index, 2);
    }

    #[test]
    fn test_single_bar_is_indeterminate() {
        let bars = vec![bar(0, dec!(1), dec!(1.1), dec!(0.9), dec!(1.05), dec!(0.01))];
        let range = find_range(&bars, 100).unwrap();
        assert_eq!(range.impulse(), ImpulseDirection::Indeterminate);
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        let err = find_range(&[], 100).unwrap_err();
        assert_eq!(err.available, 0);
        assert_eq!(err.stage, "swing range");
    }
}
