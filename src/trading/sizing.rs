// src/trading/sizing.rs
use crate::domain::decision::{AbortReason, SizingDecision};
use crate::domain::models::{AccountSnapshot, CapitalState, InstrumentSpec, OrderSide};
use crate::exchange::client::BrokerClient;
use crate::storage::HighWaterMarkStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Fraction of the high-water mark risked per trade is `1 / RISK_DIVISOR`
pub const RISK_DIVISOR: Decimal = dec!(10);

/// Lot precision accepted by the terminal
const VOLUME_DP: u32 = 2;

/// Cash at risk for a given high-water mark
pub fn risk_cash(high_water_mark: Decimal, risk_divisor: Decimal) -> Decimal {
    high_water_mark / risk_divisor
}

/// Unconstrained volume: `risk_cash / (stop_points * tick_value)`
pub fn raw_volume(
    risk_cash: Decimal,
    stop_points: Decimal,
    tick_value: Decimal,
) -> Result<Decimal, AbortReason> {
    if stop_points.is_zero() {
        return Err(AbortReason::ZeroStopDistance);
    }
    if tick_value.is_zero() {
        return Err(AbortReason::ZeroTickValue);
    }
    Ok(risk_cash / (stop_points * tick_value))
}

/// Snap to the volume step, round to lot precision, clamp to the broker range.
///
/// Rounding is half-to-even at both steps. A non-positive step skips snapping.
pub fn normalize_volume(volume: Decimal, spec: &InstrumentSpec) -> Decimal {
    let snapped = if spec.volume_step > Decimal::ZERO {
        (volume / spec.volume_step).round() * spec.volume_step
    } else {
        volume
    };

    snapped
        .round_dp(VOLUME_DP)
        .max(spec.volume_min)
        .min(spec.volume_max)
}

/// High-water-mark position sizer
pub struct PositionSizer {
    store: Arc<dyn HighWaterMarkStore>,
}

impl PositionSizer {
    pub fn new(store: Arc<dyn HighWaterMarkStore>) -> Self {
        Self { store }
    }

    /// Capital state seeded from the stored mark. An unreadable store counts
    /// as no mark, and the state is flagged so it is never written back.
    pub async fn capital_state(&self, balance: Decimal) -> CapitalState {
        match self.store.load_high_water_mark().await {
            Ok(mark) => CapitalState::new(balance, mark),
            Err(e) => {
                log::error!("Failed to load high-water mark, sizing from balance: {}", e);
                CapitalState::unknown_mark(balance)
            }
        }
    }

    /// Record the balance and persist the mark if it rose. Persistence
    /// failures are logged; the raised mark is still used.
    pub async fn observe_balance(&self, capital: &mut CapitalState, balance: Decimal) {
        if !capital.observe(balance) {
            return;
        }
        if !capital.mark_known {
            log::warn!(
                "Stored high-water mark unavailable, not persisting {}",
                capital.high_water_mark
            );
            return;
        }

        log::info!("New high-water mark: {}", capital.high_water_mark);
        if let Err(e) = self.store.save_high_water_mark(capital.high_water_mark).await {
            log::error!("Failed to persist high-water mark {}: {}", capital.high_water_mark, e);
        }
    }

    /// Volume for one trade, or the reason the trade must be abandoned.
    ///
    /// `price` is the entry price used for the margin estimate.
    #[allow(clippy::too_many_arguments)]
    pub async fn size_position(
        &self,
        capital: &mut CapitalState,
        account: &AccountSnapshot,
        stop_points: Decimal,
        instrument: &InstrumentSpec,
        side: OrderSide,
        price: Decimal,
        broker: &dyn BrokerClient,
    ) -> SizingDecision {
        self.observe_balance(capital, account.balance).await;

        let risk = risk_cash(capital.high_water_mark, RISK_DIVISOR);
        let raw = match raw_volume(risk, stop_points, instrument.tick_value) {
            Ok(raw) => raw,
            Err(reason) => return SizingDecision::Abandon(reason),
        };

        let volume = normalize_volume(raw, instrument);
        log::info!(
            "Sizing {}: HWM {} risk {} stop {} pts -> raw {} lot(s), normalized {}",
            instrument.symbol, capital.high_water_mark, risk, stop_points, raw, volume
        );

        if volume <= Decimal::ZERO {
            return SizingDecision::Abandon(AbortReason::ZeroVolume);
        }

        self.apply_margin_guard(volume, account.free_margin, instrument, side, price, broker)
            .await
    }

    async fn apply_margin_guard(
        &self,
        volume: Decimal,
        free_margin: Decimal,
        instrument: &InstrumentSpec,
        side: OrderSide,
        price: Decimal,
        broker: &dyn BrokerClient,
    ) -> SizingDecision {
        let required = match estimate_margin(broker, instrument, side, volume, price).await {
            Some(required) => required,
            None => return SizingDecision::Volume(volume),
        };

        if required <= free_margin {
            return SizingDecision::Volume(volume);
        }

        log::warn!(
            "Insufficient margin for {} {} lot(s): required {} free {}. Retrying at minimum volume",
            instrument.symbol, volume, required, free_margin
        );

        let minimum = instrument.volume_min;
        match estimate_margin(broker, instrument, side, minimum, price).await {
            Some(required) if required > free_margin => {
                log::warn!(
                    "Abandoning {}: minimum volume {} still needs {} margin (free {})",
                    instrument.symbol, minimum, required, free_margin
                );
                SizingDecision::Abandon(AbortReason::InsufficientMargin {
                    required,
                    free: free_margin,
                })
            }
            _ => SizingDecision::Volume(minimum),
        }
    }
}

/// Margin estimate, or `None` when the terminal cannot provide one
async fn estimate_margin(
    broker: &dyn BrokerClient,
    instrument: &InstrumentSpec,
    side: OrderSide,
    volume: Decimal,
    price: Decimal,
) -> Option<Decimal> {
    match broker.calc_margin(&instrument.symbol, side, volume, price).await {
        Ok(Some(required)) => Some(required),
        Ok(None) => {
            log::warn!("Margin estimate unavailable for {}, skipping margin check", instrument.symbol);
            None
        }
        Err(e) => {
            log::warn!("Margin estimate failed for {}: {}, skipping margin check", instrument.symbol, e);
            None
        }
    }
}
