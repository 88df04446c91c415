// src/exchange/client.rs
use crate::domain::errors::ExchangeResult;
use crate::domain::models::{
    AccountSnapshot, Candle, ClosedDeal, InstrumentSpec, OpenPosition, OrderReceipt, OrderRequest,
    OrderSide, Quote, StopUpdate, SymbolInfo,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Brokerage terminal interface.
///
/// Lookups that the terminal may legitimately not answer (unknown symbol, no
/// tick yet, margin calculator unavailable) return `Ok(None)`; `Err` is
/// reserved for transport and terminal failures.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Connect to the terminal
    async fn connect(&mut self) -> ExchangeResult<()>;

    /// Disconnect from the terminal
    async fn disconnect(&mut self) -> ExchangeResult<()>;

    /// Symbols known to the terminal
    async fn symbols(&self) -> ExchangeResult<Vec<SymbolInfo>>;

    /// Most recent `count` candles, oldest first
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        count: usize,
    ) -> ExchangeResult<Vec<Candle>>;

    /// Current bid/ask
    async fn get_quote(&self, symbol: &str) -> ExchangeResult<Option<Quote>>;

    /// Point size, tick value and volume constraints
    async fn get_instrument(&self, symbol: &str) -> ExchangeResult<Option<InstrumentSpec>>;

    /// Balance and free margin
    async fn get_account(&self) -> ExchangeResult<Option<AccountSnapshot>>;

    /// Margin required to open `volume` at `price`
    async fn calc_margin(
        &self,
        symbol: &str,
        side: OrderSide,
        volume: Decimal,
        price: Decimal,
    ) -> ExchangeResult<Option<Decimal>>;

    /// Submit a market order
    async fn send_order(&self, request: &OrderRequest) -> ExchangeResult<OrderReceipt>;

    /// Open positions, optionally for one symbol
    async fn positions(&self, symbol: Option<&str>) -> ExchangeResult<Vec<OpenPosition>>;

    /// Change stop-loss / take-profit of an open position
    async fn modify_position(&self, update: &StopUpdate) -> ExchangeResult<OrderReceipt>;

    /// Deals executed between `from` and now
    async fn deals_since(&self, from: DateTime<Utc>) -> ExchangeResult<Vec<ClosedDeal>>;
}
