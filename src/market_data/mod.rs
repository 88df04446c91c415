// src/market_data/mod.rs
pub mod history;

pub use history::{attach_atr, DEFAULT_ATR_PERIOD};
