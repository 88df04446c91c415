// src/domain/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Terminal records

/// Raw OHLC record as delivered by the terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub tick_volume: u64,
}

/// A candle with its volatility measure attached. Only produced by
/// `market_data::history`, which guarantees `atr` is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub atr: Decimal,
}

impl PriceBar {
    /// Total range (high - low)
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Absolute body size |close - open|
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Quote {
    /// Price an order of the given side fills at
    pub fn entry_price(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.ask,
            OrderSide::Sell => self.bid,
        }
    }
}

/// Tick economics and volume constraints of a tradable instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Smallest price increment
    pub point: Decimal,
    /// Account-currency value of one price increment for one lot
    pub tick_value: Decimal,
    pub volume_min: Decimal,
    pub volume_max: Decimal,
    pub volume_step: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: Decimal,
    pub free_margin: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub visible: bool,
}

/// A single market order request sent to the terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: Decimal,
    pub price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Done,
    Rejected,
    Simulated,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderStatus::Done => write!(f, "DONE"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Simulated => write!(f, "SIMULATED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub status: OrderStatus,
    #[serde(default)]
    pub ticket: Option<u64>,
    #[serde(default)]
    pub message: String,
}

impl OrderReceipt {
    pub fn is_done(&self) -> bool {
        self.status == OrderStatus::Done
    }
}

/// An open position as reported by the terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub ticket: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: Decimal,
    pub price_open: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub magic: u64,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealEntry {
    In,
    Out,
    /// Reversal: closes the position and opens the opposite one
    InOut,
}

impl DealEntry {
    /// Whether the deal realizes the result of a position
    pub fn is_closing(self) -> bool {
        matches!(self, DealEntry::Out | DealEntry::InOut)
    }
}

/// A historical deal (fill)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedDeal {
    pub ticket: u64,
    pub symbol: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    pub magic: u64,
    pub entry: DealEntry,
    pub profit: Decimal,
    pub commission: Decimal,
    pub swap: Decimal,
}

impl ClosedDeal {
    pub fn net_profit(&self) -> Decimal {
        self.profit + self.commission + self.swap
    }
}

/// Stop/target modification for an open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopUpdate {
    pub ticket: u64,
    pub symbol: String,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

// Decision pipeline structures

/// Dominant extremes of a lookback window. Indices are positions in the
/// bar slice handed to the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingRange {
    pub high_index: usize,
    pub high_timestamp: DateTime<Utc>,
    pub high_price: Decimal,
    pub low_index: usize,
    pub low_timestamp: DateTime<Utc>,
    pub low_price: Decimal,
}

impl SwingRange {
    pub fn size(&self) -> Decimal {
        self.high_price - self.low_price
    }

    pub fn impulse(&self) -> ImpulseDirection {
        use std::cmp::Ordering;
        match self.high_index.cmp(&self.low_index) {
            Ordering::Greater => ImpulseDirection::Bullish,
            Ordering::Less => ImpulseDirection::Bearish,
            Ordering::Equal => ImpulseDirection::Indeterminate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpulseDirection {
    Bullish,
    Bearish,
    Indeterminate,
}

/// Inclusive price band of the golden zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetracementZone {
    pub lower_bound: Decimal,
    pub upper_bound: Decimal,
}

impl RetracementZone {
    pub fn contains(&self, price: Decimal) -> bool {
        self.lower_bound <= price && price <= self.upper_bound
    }
}

impl fmt::Display for RetracementZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower_bound, self.upper_bound)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalIntent {
    pub side: OrderSide,
    pub impulse: ImpulseDirection,
    pub zone: RetracementZone,
    pub close: Decimal,
    /// Zone-derived targets: return to the extreme, then the 0.272
    /// extension twice.
    pub take_profit_anchors: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeLeg {
    /// 1-based position in the ladder
    pub ordinal: u8,
    pub volume: Decimal,
    pub take_profit: Decimal,
    pub risk_multiple: Decimal,
    pub magic: u64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub stop_distance: Decimal,
    pub total_volume: Decimal,
    pub legs: Vec<TradeLeg>,
}

impl TradePlan {
    pub fn leg_volume_sum(&self) -> Decimal {
        self.legs.iter().map(|leg| leg.volume).sum()
    }
}

/// Balance and all-time peak balance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalState {
    pub current_balance: Decimal,
    pub high_water_mark: Decimal,
    /// False when the stored mark could not be read; such a state must not
    /// be written back.
    pub mark_known: bool,
}

impl CapitalState {
    pub fn new(current_balance: Decimal, high_water_mark: Decimal) -> Self {
        Self {
            current_balance,
            high_water_mark: high_water_mark.max(Decimal::ZERO),
            mark_known: true,
        }
    }

    /// State for a balance whose stored peak is unavailable
    pub fn unknown_mark(current_balance: Decimal) -> Self {
        Self {
            mark_known: false,
            ..Self::new(current_balance, Decimal::ZERO)
        }
    }

    /// Record a balance observation; returns true when the mark was raised.
    pub fn observe(&mut self, balance: Decimal) -> bool {
        self.current_balance = balance;
        if balance > self.high_water_mark {
            self.high_water_mark = balance;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_high_water_mark_never_decreases() {
        let mut capital = CapitalState::new(dec!(1000), dec!(1000));
        let observations = [dec!(900), dec!(1200), dec!(1100), dec!(0), dec!(1200), dec!(1500)];
        let mut previous = capital.high_water_mark;

        for balance in observations {
            capital.observe(balance);
            assert!(capital.high_water_mark >= previous);
            previous = capital.high_water_mark;
        }

        assert_eq!(capital.high_water_mark, dec!(1500));
        assert_eq!(capital.current_balance, dec!(1500));
    }

    #[test]
    fn test_observe_reports_raise_only_on_new_peak() {
        let mut capital = CapitalState::new(dec!(500), dec!(800));
        assert!(!capital.observe(dec!(800)));
        assert!(capital.observe(dec!(801)));
        assert!(!capital.observe(dec!(700)));
    }

    #[test]
    fn test_zone_is_inclusive() {
        let zone = RetracementZone {
            lower_bound: dec!(1.1876),
            upper_bound: dec!(1.19),
        };
        assert!(zone.contains(dec!(1.1876)));
        assert!(zone.contains(dec!(1.19)));
        assert!(!zone.contains(dec!(1.1901)));
        assert!(!zone.contains(dec!(1.1875)));
    }

    #[test]
    fn test_deal_net_profit() {
        let deal = ClosedDeal {
            ticket: 1,
            symbol: "EURUSD".to_string(),
            time: Utc::now(),
            magic: 123456,
            entry: DealEntry::Out,
            profit: dec!(-10),
            commission: dec!(-0.5),
            swap: dec!(0.2),
        };
        assert_eq!(deal.net_profit(), dec!(-10.3));
    }
}
