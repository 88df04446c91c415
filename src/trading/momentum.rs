// src/trading/momentum.rs
use crate::domain::decision::MomentumRejection;
use crate::domain::models::{OrderSide, PriceBar};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Minimum body as a fraction of the candle's total range
pub const DEFAULT_BODY_STRENGTH: Decimal = dec!(0.3);

/// Candle momentum gate.
///
/// Looks at the last closed bar (the newest bar is still forming) and the bar
/// before it:
/// 1. colour matches the direction
/// 2. close breaks the previous bar's extreme
/// 3. body exceeds `body_strength` of the bar's range
#[derive(Debug, Clone)]
pub struct MomentumConfirmer {
    body_strength: Decimal,
}

impl MomentumConfirmer {
    pub fn new() -> Self {
        Self::with_body_strength(DEFAULT_BODY_STRENGTH)
    }

    pub fn with_body_strength(body_strength: Decimal) -> Self {
        Self { body_strength }
    }

    /// Verdict only. Rejections are logged with their reason.
    pub fn confirm(&self, side: OrderSide, bars: &[PriceBar]) -> bool {
        match self.check(side, bars) {
            Ok(()) => {
                log::info!("Candle momentum validated for {}", side);
                true
            }
            Err(reason) => {
                log::warn!("Candle momentum rejected for {}: {}", side, reason);
                false
            }
        }
    }

    /// Verdict with the first failing condition
    pub fn check(&self, side: OrderSide, bars: &[PriceBar]) -> Result<(), MomentumRejection> {
        if bars.len() < 3 {
            return Err(MomentumRejection::InsufficientData { available: bars.len() });
        }

        let target = &bars[bars.len() - 2];
        let previous = &bars[bars.len() - 3];

        let total_range = target.range();
        if total_range.is_zero() {
            return Err(MomentumRejection::ZeroRange);
        }

        let (colored, breakout_level, broke_out) = match side {
            OrderSide::Buy => (
                target.close > target.open,
                previous.high,
                target.close > previous.high,
            ),
            OrderSide::Sell => (
                target.close < target.open,
                previous.low,
                target.close < previous.low,
            ),
        };

        if !colored {
            return Err(MomentumRejection::WrongColor {
                side,
                open: target.open,
                close: target.close,
            });
        }

        if !broke_out {
            return Err(MomentumRejection::NoBreakout {
                close: target.close,
                level: breakout_level,
            });
        }

        let threshold = self.body_strength * total_range;
        let body = target.body();
        if body <= threshold {
            return Err(MomentumRejection::WeakBody { body, threshold });
        }

        Ok(())
    }
}

impl Default for MomentumConfirmer {
    fn default() -> Self {
        Self::new()
    }
}
