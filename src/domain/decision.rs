// src/domain/decision.rs
// Outcome types of the decision pipeline. Expected conditions are values,
// not errors.
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::models::{OrderSide, RetracementZone, SignalIntent, TradePlan};

/// Output of the retracement signal engine
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    NoSignal(NoSignalReason),
    Buy(SignalIntent),
    Sell(SignalIntent),
}

impl Signal {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Signal::NoSignal(_) => None,
            Signal::Buy(_) => Some(OrderSide::Buy),
            Signal::Sell(_) => Some(OrderSide::Sell),
        }
    }

    pub fn intent(&self) -> Option<&SignalIntent> {
        match self {
            Signal::NoSignal(_) => None,
            Signal::Buy(intent) | Signal::Sell(intent) => Some(intent),
        }
    }
}

/// Why the market produced no entry this cycle
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoSignalReason {
    #[error("need at least {required} bars for a signal, got {available}")]
    InsufficientBars { required: usize, available: usize },

    #[error("swing high and low share the same bar, impulse is indeterminate")]
    IndeterminateImpulse,

    #[error("close {close} outside golden zone {zone}")]
    OutsideZone { close: Decimal, zone: RetracementZone },
}

/// First failing condition of the candle momentum check
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MomentumRejection {
    #[error("need at least 3 bars for momentum check, got {available}")]
    InsufficientData { available: usize },

    #[error("target candle has zero range")]
    ZeroRange,

    #[error("candle colour against {side} (open {open}, close {close})")]
    WrongColor {
        side: OrderSide,
        open: Decimal,
        close: Decimal,
    },

    #[error("no breakout of previous extreme (close {close}, level {level})")]
    NoBreakout { close: Decimal, level: Decimal },

    #[error("weak body ({body} <= {threshold})")]
    WeakBody { body: Decimal, threshold: Decimal },
}

/// A stage that ran out of bars before any geometry could be computed
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage}: need {required} bars, got {available}")]
pub struct InsufficientData {
    pub stage: &'static str,
    pub required: usize,
    pub available: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCategory {
    DegenerateInput,
    ResourceUnavailable,
    ConstraintViolation,
    GateRejected,
}

/// Why a plan could not be produced after a signal fired
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbortReason {
    #[error("volatility measure missing or zero")]
    MissingVolatility,

    #[error("stop distance is zero")]
    ZeroStopDistance,

    #[error("tick value is zero")]
    ZeroTickValue,

    #[error("instrument point size is zero")]
    ZeroPointSize,

    #[error("sized volume is zero")]
    ZeroVolume,

    #[error("quote unavailable")]
    QuoteUnavailable,

    #[error("instrument metadata unavailable")]
    InstrumentUnavailable,

    #[error("account state unavailable")]
    AccountUnavailable,

    #[error("insufficient margin even at minimum volume (required {required}, free {free})")]
    InsufficientMargin { required: Decimal, free: Decimal },

    #[error("momentum not confirmed: {0}")]
    MomentumRejected(MomentumRejection),
}

impl AbortReason {
    pub fn category(&self) -> AbortCategory {
        match self {
            AbortReason::MissingVolatility
            | AbortReason::ZeroStopDistance
            | AbortReason::ZeroTickValue
            | AbortReason::ZeroPointSize
            | AbortReason::ZeroVolume => AbortCategory::DegenerateInput,
            AbortReason::QuoteUnavailable
            | AbortReason::InstrumentUnavailable
            | AbortReason::AccountUnavailable => AbortCategory::ResourceUnavailable,
            AbortReason::InsufficientMargin { .. } => AbortCategory::ConstraintViolation,
            AbortReason::MomentumRejected(_) => AbortCategory::GateRejected,
        }
    }
}

/// Result of position sizing
#[derive(Debug, Clone, PartialEq)]
pub enum SizingDecision {
    Volume(Decimal),
    Abandon(AbortReason),
}

/// Result of one `evaluate_and_plan` call
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Plan(TradePlan),
    NoSignal(NoSignalReason),
    InsufficientData(InsufficientData),
    Aborted(AbortReason),
}
