// src/testing.rs
// Bar builders and a scripted broker shared by the unit tests.
use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{
    AccountSnapshot, Candle, ClosedDeal, DealEntry, InstrumentSpec, OpenPosition, OrderReceipt,
    OrderRequest, OrderSide, OrderStatus, PriceBar, Quote, StopUpdate, SymbolInfo,
};
use crate::exchange::client::BrokerClient;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

const BASE_TIMESTAMP: i64 = 1_700_000_000;

/// Open time of the i-th five-minute candle
pub fn bar_time(i: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_TIMESTAMP, 0).single().unwrap() + Duration::minutes(5 * i)
}

pub fn candle(i: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
    Candle {
        time: bar_time(i),
        open,
        high,
        low,
        close,
        tick_volume: 100,
    }
}

pub fn bar(i: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal, atr: Decimal) -> PriceBar {
    PriceBar {
        timestamp: bar_time(i),
        open,
        high,
        low,
        close,
        atr,
    }
}

/// `count` doji bars at `price` spanning `price ± half_spread`
pub fn flat_bars(count: usize, price: Decimal, half_spread: Decimal) -> Vec<PriceBar> {
    (0..count)
        .map(|i| bar(i as i64, price, price + half_spread, price - half_spread, price, dec!(0.001)))
        .collect()
}

/// 100 bars oscillating around the midpoint of `high` and `low`, with the
/// swing high at `high_idx`, the swing low at `low_idx` and the last bar
/// closing at `last_close`.
pub fn swing_bars(
    high_idx: usize,
    high: Decimal,
    low_idx: usize,
    low: Decimal,
    last_close: Decimal,
) -> Vec<PriceBar> {
    let mid = (high + low) / dec!(2);
    let mut bars = flat_bars(100, mid, dec!(0.001));
    bars[high_idx].high = high;
    bars[low_idx].low = low;

    let last = &mut bars[99];
    last.close = last_close;
    last.high = last.high.max(last_close);
    last.low = last.low.min(last_close);
    bars
}

/// `swing_bars` as the 100 raw candles a terminal would return
pub fn swing_candles(
    high_idx: usize,
    high: Decimal,
    low_idx: usize,
    low: Decimal,
    last_close: Decimal,
) -> Vec<Candle> {
    swing_bars(high_idx, high, low_idx, low, last_close)
        .iter()
        .enumerate()
        .map(|(i, b)| candle(i as i64, b.open, b.high, b.low, b.close))
        .collect()
}

/// Five-digit FX pair: point 0.00001, tick value 1.0, lots 0.01..100
pub fn fx_instrument(symbol: &str) -> InstrumentSpec {
    InstrumentSpec {
        symbol: symbol.to_string(),
        point: dec!(0.00001),
        tick_value: dec!(1),
        volume_min: dec!(0.01),
        volume_max: dec!(100),
        volume_step: dec!(0.01),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn position(
    ticket: u64,
    symbol: &str,
    side: OrderSide,
    price_open: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
    magic: u64,
    comment: &str,
) -> OpenPosition {
    OpenPosition {
        ticket,
        symbol: symbol.to_string(),
        side,
        volume: dec!(0.1),
        price_open,
        stop_loss,
        take_profit,
        magic,
        comment: comment.to_string(),
    }
}

pub fn closing_deal(ticket: u64, symbol: &str, time: DateTime<Utc>, magic: u64, profit: Decimal) -> ClosedDeal {
    ClosedDeal {
        ticket,
        symbol: symbol.to_string(),
        time,
        magic,
        entry: DealEntry::Out,
        profit,
        commission: Decimal::ZERO,
        swap: Decimal::ZERO,
    }
}

/// How the mock answers margin queries
#[derive(Debug, Clone, Copy)]
pub enum MarginModel {
    Unavailable,
    Failing,
    PerLot(Decimal),
}

/// Scripted `BrokerClient`. Orders and stop changes are recorded; accepted
/// orders become open positions.
pub struct MockBroker {
    symbols: Vec<SymbolInfo>,
    candles: HashMap<String, Vec<Candle>>,
    quotes: HashMap<String, Quote>,
    instruments: HashMap<String, InstrumentSpec>,
    account: Option<AccountSnapshot>,
    margin: MarginModel,
    reject_orders: bool,
    positions: Mutex<Vec<OpenPosition>>,
    deals: Vec<ClosedDeal>,
    sent_orders: Mutex<Vec<OrderRequest>>,
    modifications: Mutex<Vec<StopUpdate>>,
    next_ticket: Mutex<u64>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            candles: HashMap::new(),
            quotes: HashMap::new(),
            instruments: HashMap::new(),
            account: None,
            margin: MarginModel::Unavailable,
            reject_orders: false,
            positions: Mutex::new(Vec::new()),
            deals: Vec::new(),
            sent_orders: Mutex::new(Vec::new()),
            modifications: Mutex::new(Vec::new()),
            next_ticket: Mutex::new(1000),
        }
    }

    pub fn with_symbol(mut self, name: &str, visible: bool) -> Self {
        self.symbols.push(SymbolInfo {
            name: name.to_string(),
            visible,
        });
        self
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.candles.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_quote(mut self, symbol: &str, bid: Decimal, ask: Decimal) -> Self {
        self.quotes.insert(symbol.to_string(), Quote { bid, ask });
        self
    }

    pub fn with_instrument(mut self, spec: InstrumentSpec) -> Self {
        self.instruments.insert(spec.symbol.clone(), spec);
        self
    }

    pub fn with_account(mut self, balance: Decimal, free_margin: Decimal) -> Self {
        self.account = Some(AccountSnapshot { balance, free_margin });
        self
    }

    pub fn with_margin(mut self, margin: MarginModel) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_position(self, position: OpenPosition) -> Self {
        self.positions.lock().unwrap().push(position);
        self
    }

    pub fn with_deal(mut self, deal: ClosedDeal) -> Self {
        self.deals.push(deal);
        self
    }

    pub fn rejecting_orders(mut self) -> Self {
        self.reject_orders = true;
        self
    }

    pub fn sent_orders(&self) -> Vec<OrderRequest> {
        self.sent_orders.lock().unwrap().clone()
    }

    pub fn modifications(&self) -> Vec<StopUpdate> {
        self.modifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerClient for MockBroker {
    async fn connect(&mut self) -> ExchangeResult<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> ExchangeResult<()> {
        Ok(())
    }

    async fn symbols(&self) -> ExchangeResult<Vec<SymbolInfo>> {
        Ok(self.symbols.clone())
    }

    async fn get_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        count: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        let candles = self
            .candles
            .get(symbol)
            .ok_or_else(|| ExchangeError::Terminal(format!("unknown symbol {}", symbol)))?;
        let start = candles.len().saturating_sub(count);
        Ok(candles[start..].to_vec())
    }

    async fn get_quote(&self, symbol: &str) -> ExchangeResult<Option<Quote>> {
        Ok(self.quotes.get(symbol).copied())
    }

    async fn get_instrument(&self, symbol: &str) -> ExchangeResult<Option<InstrumentSpec>> {
        Ok(self.instruments.get(symbol).cloned())
    }

    async fn get_account(&self) -> ExchangeResult<Option<AccountSnapshot>> {
        Ok(self.account)
    }

    async fn calc_margin(
        &self,
        _symbol: &str,
        _side: OrderSide,
        volume: Decimal,
        _price: Decimal,
    ) -> ExchangeResult<Option<Decimal>> {
        match self.margin {
            MarginModel::Unavailable => Ok(None),
            MarginModel::Failing => Err(ExchangeError::Terminal("order_calc_margin failed".to_string())),
            MarginModel::PerLot(per_lot) => Ok(Some(volume * per_lot)),
        }
    }

    async fn send_order(&self, request: &OrderRequest) -> ExchangeResult<OrderReceipt> {
        self.sent_orders.lock().unwrap().push(request.clone());

        if self.reject_orders {
            return Ok(OrderReceipt {
                status: OrderStatus::Rejected,
                ticket: None,
                message: "no money".to_string(),
            });
        }

        let ticket = {
            let mut next = self.next_ticket.lock().unwrap();
            *next += 1;
            *next
        };
        self.positions.lock().unwrap().push(OpenPosition {
            ticket,
            symbol: request.symbol.clone(),
            side: request.side,
            volume: request.volume,
            price_open: request.price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            magic: request.magic,
            comment: request.comment.clone(),
        });

        Ok(OrderReceipt {
            status: OrderStatus::Done,
            ticket: Some(ticket),
            message: String::new(),
        })
    }

    async fn positions(&self, symbol: Option<&str>) -> ExchangeResult<Vec<OpenPosition>> {
        let positions = self.positions.lock().unwrap();
        Ok(positions
            .iter()
            .filter(|p| symbol.map_or(true, |s| p.symbol == s))
            .cloned()
            .collect())
    }

    async fn modify_position(&self, update: &StopUpdate) -> ExchangeResult<OrderReceipt> {
        self.modifications.lock().unwrap().push(update.clone());

        let mut positions = self.positions.lock().unwrap();
        match positions.iter_mut().find(|p| p.ticket == update.ticket) {
            Some(position) => {
                position.stop_loss = update.stop_loss;
                position.take_profit = update.take_profit;
                Ok(OrderReceipt {
                    status: OrderStatus::Done,
                    ticket: Some(update.ticket),
                    message: String::new(),
                })
            }
            None => Ok(OrderReceipt {
                status: OrderStatus::Rejected,
                ticket: None,
                message: "position not found".to_string(),
            }),
        }
    }

    async fn deals_since(&self, from: DateTime<Utc>) -> ExchangeResult<Vec<ClosedDeal>> {
        Ok(self.deals.iter().filter(|d| d.time >= from).cloned().collect())
    }
}
