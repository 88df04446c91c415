// src/market_data/history.rs
use crate::analysis::indicators::{calculate_atr, true_range};
use crate::domain::errors::{MarketDataError, MarketDataResult};
use crate::domain::models::{Candle, PriceBar};
use rust_decimal::Decimal;

/// Default ATR period attached to every bar
pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Turn raw terminal candles into `PriceBar`s carrying their ATR.
///
/// Candles must be ordered oldest first, and every candle yields one bar. The
/// first `period - 1` candles come before a full ATR window; they carry the
/// running mean of the true ranges seen so far, so every bar has a
/// volatility measure and the swing window keeps its full length.
pub fn attach_atr(candles: &[Candle], period: usize) -> MarketDataResult<Vec<PriceBar>> {
    validate_candles(candles)?;

    let atr = calculate_atr(candles, period)?;
    let seeded = true_range(candles)
        .into_iter()
        .take(period - 1)
        .enumerate()
        .scan(Decimal::ZERO, |sum, (i, tr)| {
            *sum += tr;
            Some(*sum / Decimal::from(i as u64 + 1))
        })
        .collect::<Vec<_>>();

    let bars = candles
        .iter()
        .zip(seeded.into_iter().chain(atr))
        .map(|(candle, atr)| PriceBar {
            timestamp: candle.time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            atr,
        })
        .collect();

    Ok(bars)
}

fn validate_candles(candles: &[Candle]) -> MarketDataResult<()> {
    for (i, candle) in candles.iter().enumerate() {
        if candle.high < candle.low {
            return Err(MarketDataError::InvalidFormat(format!(
                "candle {} at {} has high {} below low {}",
                i, candle.time, candle.high, candle.low
            )));
        }

        if i > 0 && candle.time <= candles[i - 1].time {
            return Err(MarketDataError::InvalidFormat(format!(
                "candles out of order at index {} ({} after {})",
                i,
                candle.time,
                candles[i - 1].time
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::AnalysisError;
    use crate::testing::candle;
    use rust_decimal_macros::dec;

    fn candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| candle(i as i64, dec!(1.1), dec!(1.102), dec!(1.098), dec!(1.1)))
            .collect()
    }

    #[test]
    fn test_keeps_every_candle() {
        let raw = candles(30);
        let bars = attach_atr(&raw, 14).unwrap();

        assert_eq!(bars.len(), 30);
        assert_eq!(bars[0].timestamp, raw[0].time);
        assert_eq!(bars.last().unwrap().timestamp, raw[29].time);
        // constant 0.004 range with unchanged closes
        assert!(bars.iter().all(|b| b.atr == dec!(0.004)));
    }

    #[test]
    fn test_warm_up_bars_carry_running_mean() {
        let mut raw = candles(16);
        raw[1].high = dec!(1.106);
        raw[1].low = dec!(1.098);
        let bars = attach_atr(&raw, 14).unwrap();

        assert_eq!(bars[0].atr, dec!(0.004));
        assert_eq!(bars[1].atr, dec!(0.006));
        assert_eq!(bars[2].atr, (dec!(0.004) + dec!(0.008) + dec!(0.004)) / dec!(3));
        assert!(bars.iter().all(|b| b.atr > Decimal::ZERO));

        let wilder = calculate_atr(&raw, 14).unwrap();
        assert_eq!(bars[13].atr, wilder[0]);
        assert_eq!(bars[15].atr, wilder[2]);
    }

    #[test]
    fn test_too_few_candles_for_atr() {
        let raw = candles(5);
        let err = attach_atr(&raw, 14).unwrap_err();
        assert!(matches!(
            err,
            MarketDataError::Indicator(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_rejects_unordered_candles() {
        let mut raw = candles(20);
        raw.swap(4, 5);
        assert!(matches!(
            attach_atr(&raw, 14),
            Err(MarketDataError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_candle() {
        let mut raw = candles(20);
        raw[7].low = dec!(1.2);
        assert!(matches!(
            attach_atr(&raw, 14),
            Err(MarketDataError::InvalidFormat(_))
        ));
    }
}
