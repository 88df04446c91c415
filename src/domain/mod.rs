// src/domain/mod.rs
pub mod decision;
pub mod errors;
pub mod models;

// Re-export common types for convenience
pub use decision::{
    AbortCategory, AbortReason, Decision, InsufficientData, MomentumRejection, NoSignalReason,
    Signal, SizingDecision,
};
pub use errors::{AppError, AppResult, ExchangeError, ExchangeResult, StorageError, StorageResult};
pub use models::{
    AccountSnapshot, Candle, CapitalState, ClosedDeal, DealEntry, ImpulseDirection,
    InstrumentSpec, OpenPosition, OrderReceipt, OrderRequest, OrderSide, OrderStatus, PriceBar,
    Quote, RetracementZone, SignalIntent, StopUpdate, SwingRange, SymbolInfo, TradeLeg, TradePlan,
};
