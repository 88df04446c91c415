// src/trading/mod.rs
pub mod break_even;
pub mod builder;
pub mod execution;
pub mod guards;
pub mod momentum;
pub mod pipeline;
pub mod signals;
pub mod sizing;
pub mod universe;

pub use break_even::BreakEvenManager;
pub use builder::TradeBuilder;
pub use execution::{ExecutionReport, TradeExecutor};
pub use guards::{CycleGate, RiskGuard, RiskParameters};
pub use momentum::MomentumConfirmer;
pub use pipeline::DecisionPipeline;
pub use signals::RetracementSignalEngine;
pub use sizing::PositionSizer;
