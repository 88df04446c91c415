// src/analysis/indicators.rs
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::models::Candle;
use rust_decimal::Decimal;

/// True range of every candle. The first candle has no previous close, so its
/// true range is its own high - low.
pub fn true_range(candles: &[Candle]) -> Vec<Decimal> {
    let mut ranges = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        let hl = candle.high - candle.low;
        let tr = if i == 0 {
            hl
        } else {
            let prev_close = candles[i - 1].close;
            let hc = (candle.high - prev_close).abs();
            let lc = (candle.low - prev_close).abs();
            hl.max(hc).max(lc)
        };
        ranges.push(tr);
    }

    ranges
}

/// Average True Range (ATR) with Wilder smoothing.
///
/// The first value is the simple mean of the first `period` true ranges and
/// belongs to candle `period - 1`; element `k` of the result belongs to candle
/// `k + period - 1`.
pub fn calculate_atr(candles: &[Candle], period: usize) -> AnalysisResult<Vec<Decimal>> {
    if period == 0 {
        return Err(AnalysisError::IndicatorCalculation(
            "ATR period must be greater than zero".to_string(),
        ));
    }

    if candles.len() < period {
        return Err(AnalysisError::InsufficientData(format!(
            "Not enough data for ATR calculation. Need at least {} candles, got {}",
            period,
            candles.len()
        )));
    }

    let true_ranges = true_range(candles);
    let n = Decimal::from(period as u64);
    let n_minus_one = Decimal::from(period as u64 - 1);

    // Calculate first ATR as simple average
    let first_atr = true_ranges.iter().take(period).copied().sum::<Decimal>() / n;

    // Calculate remaining ATRs using the smoothing formula
    let mut atr = Vec::with_capacity(true_ranges.len() - period + 1);
    atr.push(first_atr);

    for tr in &true_ranges[period..] {
        let previous = atr[atr.len() - 1];
        atr.push((previous * n_minus_one + *tr) / n);
    }

    Ok(atr)
}
