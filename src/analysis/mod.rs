// src/analysis/mod.rs
pub mod indicators;
pub mod swings;

pub use swings::{find_range, SwingRangeDetector};
