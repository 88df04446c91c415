// src/trading/signals.rs
use crate::domain::decision::{NoSignalReason, Signal};
use crate::domain::models::{
    ImpulseDirection, OrderSide, PriceBar, RetracementZone, SignalIntent, SwingRange,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Shallow edge of the golden zone
pub const FIB_50: Decimal = dec!(0.5);
/// Deep edge of the golden zone
pub const FIB_618: Decimal = dec!(0.618);
/// Target extension beyond the impulse extreme
pub const FIB_EXTENSION: Decimal = dec!(0.272);
/// Minimum history for a signal to be considered
pub const DEFAULT_MIN_SIGNAL_BARS: usize = 50;

/// Golden-zone band for a range and impulse. `None` when the impulse is
/// indeterminate.
pub fn retracement_zone(range: &SwingRange, impulse: ImpulseDirection) -> Option<RetracementZone> {
    let size = range.size();
    match impulse {
        // dip back toward the low
        ImpulseDirection::Bullish => Some(RetracementZone {
            lower_bound: range.high_price - FIB_618 * size,
            upper_bound: range.high_price - FIB_50 * size,
        }),
        // rally back toward the high
        ImpulseDirection::Bearish => Some(RetracementZone {
            lower_bound: range.low_price + FIB_50 * size,
            upper_bound: range.low_price + FIB_618 * size,
        }),
        ImpulseDirection::Indeterminate => None,
    }
}

/// Golden-zone retracement entry detector
#[derive(Debug, Clone)]
pub struct RetracementSignalEngine {
    min_bars: usize,
}

impl RetracementSignalEngine {
    pub fn new() -> Self {
        Self::with_min_bars(DEFAULT_MIN_SIGNAL_BARS)
    }

    pub fn with_min_bars(min_bars: usize) -> Self {
        Self { min_bars }
    }

    /// Test the current close against the golden zone of `range`.
    ///
    /// The take-profit anchors in the returned intent are zone geometry only;
    /// order targets are derived independently from the stop distance.
    pub fn evaluate(&self, bars: &[PriceBar], range: &SwingRange) -> Signal {
        if bars.len() < self.min_bars || bars.is_empty() {
            return Signal::NoSignal(NoSignalReason::InsufficientBars {
                required: self.min_bars.max(1),
                available: bars.len(),
            });
        }

        let impulse = range.impulse();
        let zone = match retracement_zone(range, impulse) {
            Some(zone) => zone,
            None => return Signal::NoSignal(NoSignalReason::IndeterminateImpulse),
        };

        let close = bars[bars.len() - 1].close;
        if !zone.contains(close) {
            log::debug!("Close {} outside golden zone {} ({:?} impulse)", close, zone, impulse);
            return Signal::NoSignal(NoSignalReason::OutsideZone { close, zone });
        }

        let size = range.size();
        match impulse {
            ImpulseDirection::Bullish => {
                let extension = range.high_price + FIB_EXTENSION * size;
                log::info!(
                    "Golden zone hit (bullish dip): close {} in {} [high {}, low {}]",
                    close, zone, range.high_price, range.low_price
                );
                Signal::Buy(SignalIntent {
                    side: OrderSide::Buy,
                    impulse,
                    zone,
                    close,
                    take_profit_anchors: vec![range.high_price, extension, extension],
                })
            }
            ImpulseDirection::Bearish => {
                let extension = range.low_price - FIB_EXTENSION * size;
                log::info!(
                    "Golden zone hit (bearish rally): close {} in {} [high {}, low {}]",
                    close, zone, range.high_price, range.low_price
                );
                Signal::Sell(SignalIntent {
                    side: OrderSide::Sell,
                    impulse,
                    zone,
                    close,
                    take_profit_anchors: vec![range.low_price, extension, extension],
                })
            }
            ImpulseDirection::Indeterminate => Signal::NoSignal(NoSignalReason::IndeterminateImpulse),
        }
    }
}

impl Default for RetracementSignalEngine {
    fn default() -> Self {
        Self::new()
    }
}
