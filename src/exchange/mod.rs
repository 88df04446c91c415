// src/exchange/mod.rs
pub mod bridge;
pub mod client;

pub use bridge::TerminalBridge;
pub use client::BrokerClient;
