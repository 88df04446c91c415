// src/trading/break_even.rs
use crate::domain::errors::AppResult;
use crate::domain::models::{OpenPosition, OrderSide, StopUpdate};
use crate::exchange::client::BrokerClient;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stop moves that secure the remaining legs once leg 1 has closed.
///
/// Only positions whose magic falls in `magic_base..magic_base + legs` are
/// considered. Buy stops move up to the open price; sell stops move down
/// to it, or are set when missing.
pub fn break_even_updates(positions: &[OpenPosition], magic_base: u64, legs: u64) -> Vec<StopUpdate> {
    let mut by_symbol: BTreeMap<&str, Vec<&OpenPosition>> = BTreeMap::new();
    for position in positions
        .iter()
        .filter(|p| p.magic >= magic_base && p.magic < magic_base + legs)
    {
        by_symbol.entry(position.symbol.as_str()).or_default().push(position);
    }

    let mut updates = Vec::new();
    for (symbol, group) in by_symbol {
        if group.iter().any(|p| p.magic == magic_base) {
            continue;
        }

        for position in group {
            let needs_move = match position.side {
                OrderSide::Buy => position.stop_loss < position.price_open,
                OrderSide::Sell => {
                    position.stop_loss > position.price_open || position.stop_loss == Decimal::ZERO
                }
            };
            if !needs_move {
                continue;
            }

            log::info!(
                "Securing {} {} (ticket {}): SL {} -> {}",
                position.side, symbol, position.ticket, position.stop_loss, position.price_open
            );
            updates.push(StopUpdate {
                ticket: position.ticket,
                symbol: position.symbol.clone(),
                stop_loss: position.price_open,
                take_profit: position.take_profit,
            });
        }
    }
    updates
}

/// Applies break-even stop moves to open positions each cycle
pub struct BreakEvenManager {
    broker: Arc<dyn BrokerClient>,
    magic_base: u64,
    legs: u64,
}

impl BreakEvenManager {
    pub fn new(broker: Arc<dyn BrokerClient>, magic_base: u64, legs: u64) -> Self {
        Self {
            broker,
            magic_base,
            legs,
        }
    }

    /// Returns the number of stops the terminal accepted
    pub async fn run(&self) -> AppResult<usize> {
        let positions = self.broker.positions(None).await?;
        let updates = break_even_updates(&positions, self.magic_base, self.legs);

        let mut applied = 0;
        for update in &updates {
            match self.broker.modify_position(update).await {
                Ok(receipt) if receipt.is_done() => applied += 1,
                Ok(receipt) => log::warn!(
                    "Break-even rejected for ticket {}: {} {}",
                    update.ticket, receipt.status, receipt.message
                ),
                Err(e) => log::error!("Break-even failed for ticket {}: {}", update.ticket, e),
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{position, MockBroker};
    use rust_decimal_macros::dec;

    #[test]
    fn test_no_move_while_first_leg_is_open() {
        let positions = vec![
            position(1, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.098), dec!(1.101), 123456, "FIB_TP1"),
            position(2, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.098), dec!(1.102), 123457, "FIB_TP2"),
        ];
        assert!(break_even_updates(&positions, 123456, 4).is_empty());
    }

    #[test]
    fn test_buy_legs_move_to_open_after_first_leg_closes() {
        let positions = vec![
            position(2, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.098), dec!(1.102), 123457, "FIB_TP2"),
            position(3, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.098), dec!(1.103), 123458, "FIB_TP3"),
            position(4, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.1), dec!(1.104), 123459, "FIB_TP4"),
        ];
        let updates = break_even_updates(&positions, 123456, 4);

        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[0],
            StopUpdate {
                ticket: 2,
                symbol: "EURUSD".to_string(),
                stop_loss: dec!(1.1),
                take_profit: dec!(1.102),
            }
        );
        assert_eq!(updates[1].ticket, 3);
    }

    #[test]
    fn test_sell_legs_move_down_or_when_stop_missing() {
        let positions = vec![
            position(2, "GBPUSD", OrderSide::Sell, dec!(1.25), dec!(1.253), dec!(1.248), 123457, "FIB_TP2"),
            position(3, "GBPUSD", OrderSide::Sell, dec!(1.25), dec!(0), dec!(1.246), 123458, "FIB_TP3"),
            position(4, "GBPUSD", OrderSide::Sell, dec!(1.25), dec!(1.249), dec!(1.244), 123459, "FIB_TP4"),
        ];
        let tickets: Vec<u64> = break_even_updates(&positions, 123456, 4)
            .iter()
            .map(|u| u.ticket)
            .collect();
        assert_eq!(tickets, vec![2, 3]);
    }

    #[test]
    fn test_foreign_positions_are_ignored() {
        let positions = vec![
            position(7, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.09), dec!(1.2), 42, "manual"),
            position(8, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.09), dec!(1.2), 123460, "other"),
        ];
        assert!(break_even_updates(&positions, 123456, 4).is_empty());
    }

    #[tokio::test]
    async fn test_manager_applies_updates_through_broker() {
        let broker = Arc::new(
            MockBroker::new()
                .with_position(position(2, "EURUSD", OrderSide::Buy, dec!(1.1), dec!(1.098), dec!(1.102), 123457, "FIB_TP2"))
                .with_position(position(9, "USDJPY", OrderSide::Sell, dec!(150), dec!(150.5), dec!(149), 123456, "FIB_TP1")),
        );
        let manager = BreakEvenManager::new(broker.clone(), 123456, 4);

        assert_eq!(manager.run().await.unwrap(), 1);
        let modifications = broker.modifications();
        assert_eq!(modifications.len(), 1);
        assert_eq!(modifications[0].ticket, 2);

        // already at break-even: nothing left to do
        assert_eq!(manager.run().await.unwrap(), 0);
    }
}
