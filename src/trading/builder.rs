// src/trading/builder.rs
use crate::domain::decision::AbortReason;
use crate::domain::models::{InstrumentSpec, OrderSide, PriceBar, Quote, TradeLeg, TradePlan};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Stop distance as a multiple of the last bar's ATR
pub const STOP_ATR_MULTIPLE: Decimal = dec!(2);

/// Take-profit distance of each leg, in multiples of the stop distance
pub const LEG_RISK_MULTIPLES: [Decimal; 4] = [dec!(0.5), dec!(1.0), dec!(1.5), dec!(2.0)];

pub const DEFAULT_MAGIC_BASE: u64 = 123456;

/// Builds the four-leg order ladder sharing one entry and one stop
#[derive(Debug, Clone)]
pub struct TradeBuilder {
    magic_base: u64,
}

impl TradeBuilder {
    pub fn new() -> Self {
        Self::with_magic_base(DEFAULT_MAGIC_BASE)
    }

    pub fn with_magic_base(magic_base: u64) -> Self {
        Self { magic_base }
    }

    /// Magic numbers carried by our legs, leg 1 first
    pub fn magic_numbers(&self) -> impl Iterator<Item = u64> {
        let base = self.magic_base;
        (0..LEG_RISK_MULTIPLES.len() as u64).map(move |i| base + i)
    }

    pub fn leg_comment(ordinal: u8) -> String {
        format!("FIB_TP{}", ordinal)
    }

    /// Stop distance from the volatility of the last bar
    pub fn stop_distance(bars: &[PriceBar]) -> Result<Decimal, AbortReason> {
        let last = bars.last().ok_or(AbortReason::MissingVolatility)?;
        if last.atr <= Decimal::ZERO {
            return Err(AbortReason::MissingVolatility);
        }
        Ok(STOP_ATR_MULTIPLE * last.atr)
    }

    pub fn build(
        &self,
        symbol: &str,
        side: OrderSide,
        bars: &[PriceBar],
        quote: &Quote,
        sized_volume: Decimal,
        instrument: &InstrumentSpec,
    ) -> Result<TradePlan, AbortReason> {
        let stop_distance = Self::stop_distance(bars)?;

        let entry_price = quote.entry_price(side);
        if entry_price <= Decimal::ZERO {
            return Err(AbortReason::QuoteUnavailable);
        }
        if sized_volume <= Decimal::ZERO {
            return Err(AbortReason::ZeroVolume);
        }

        let direction = match side {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => Decimal::NEGATIVE_ONE,
        };
        let stop_loss = round_price(entry_price - direction * stop_distance, instrument);

        let leg_volume = split_volume(sized_volume, LEG_RISK_MULTIPLES.len(), instrument);

        let legs = LEG_RISK_MULTIPLES
            .iter()
            .enumerate()
            .map(|(i, &risk_multiple)| {
                let ordinal = (i + 1) as u8;
                TradeLeg {
                    ordinal,
                    volume: leg_volume,
                    take_profit: round_price(
                        entry_price + direction * risk_multiple * stop_distance,
                        instrument,
                    ),
                    risk_multiple,
                    magic: self.magic_base + i as u64,
                    comment: Self::leg_comment(ordinal),
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "Plan {} {}: entry {} SL {} (dist {}), {} x {} lot(s), TPs [{}]",
            side,
            symbol,
            entry_price,
            stop_loss,
            stop_distance,
            legs.len(),
            leg_volume,
            legs.iter().map(|l| l.take_profit.to_string()).collect::<Vec<_>>().join(", ")
        );

        Ok(TradePlan {
            symbol: symbol.to_string(),
            side,
            entry_price,
            stop_loss,
            stop_distance,
            total_volume: sized_volume,
            legs,
        })
    }
}

impl Default for TradeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Equal share of `volume` per leg, snapped to the step, rounded to 2 dp and
/// floored at the broker minimum.
pub fn split_volume(volume: Decimal, legs: usize, instrument: &InstrumentSpec) -> Decimal {
    let raw = volume / Decimal::from(legs.max(1) as u64);
    let snapped = if instrument.volume_step > Decimal::ZERO {
        (raw / instrument.volume_step).round() * instrument.volume_step
    } else {
        raw
    };
    snapped.round_dp(2).max(instrument.volume_min)
}

/// Snap to the nearest multiple of the instrument's point
fn round_price(price: Decimal, instrument: &InstrumentSpec) -> Decimal {
    if instrument.point > Decimal::ZERO {
        (price / instrument.point).round() * instrument.point
    } else {
        price
    }
}
