// src/trading/execution.rs
use crate::domain::models::{OrderReceipt, OrderRequest, OrderStatus, TradeLeg, TradePlan};
use crate::exchange::client::BrokerClient;
use std::sync::Arc;

/// Outcome of one submitted leg
#[derive(Debug, Clone, PartialEq)]
pub struct LegOutcome {
    pub ordinal: u8,
    pub request: OrderRequest,
    pub receipt: OrderReceipt,
}

/// Per-leg results of executing a plan
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub symbol: String,
    pub legs: Vec<LegOutcome>,
}

impl ExecutionReport {
    /// Legs the terminal filled (or simulated, in dry-run mode)
    pub fn accepted(&self) -> usize {
        self.legs
            .iter()
            .filter(|l| matches!(l.receipt.status, OrderStatus::Done | OrderStatus::Simulated))
            .count()
    }
}

/// Trade execution service: turns a plan into one market order per leg
pub struct TradeExecutor {
    broker: Arc<dyn BrokerClient>,
    deviation: u32,
    dry_run: bool,
}

impl TradeExecutor {
    pub fn new(broker: Arc<dyn BrokerClient>, deviation: u32, dry_run: bool) -> Self {
        Self {
            broker,
            deviation,
            dry_run,
        }
    }

    /// Market order for one leg of `plan`
    pub fn order_request(&self, plan: &TradePlan, leg: &TradeLeg) -> OrderRequest {
        OrderRequest {
            symbol: plan.symbol.clone(),
            side: plan.side,
            volume: leg.volume,
            price: plan.entry_price,
            stop_loss: plan.stop_loss,
            take_profit: leg.take_profit,
            deviation: self.deviation,
            magic: leg.magic,
            comment: leg.comment.clone(),
        }
    }

    /// Submit every leg. A failed leg is logged and does not stop the others.
    pub async fn execute(&self, plan: &TradePlan) -> ExecutionReport {
        log::info!(
            "Executing {} {} ladder: {} leg(s), SL {}{}",
            plan.side,
            plan.symbol,
            plan.legs.len(),
            plan.stop_loss,
            if self.dry_run { " [dry run]" } else { "" }
        );

        let mut legs = Vec::with_capacity(plan.legs.len());
        for leg in &plan.legs {
            let request = self.order_request(plan, leg);
            let receipt = self.submit(&request).await;

            match receipt.status {
                OrderStatus::Done => log::info!(
                    "  Leg {} ({}): {} lot(s) TP {} filled, ticket {:?}",
                    leg.ordinal, leg.comment, leg.volume, leg.take_profit, receipt.ticket
                ),
                OrderStatus::Simulated => log::info!(
                    "  Leg {} ({}): {} lot(s) TP {} (R={}) simulated",
                    leg.ordinal, leg.comment, leg.volume, leg.take_profit, leg.risk_multiple
                ),
                OrderStatus::Rejected => log::error!(
                    "  Leg {} ({}) failed: {}",
                    leg.ordinal, leg.comment, receipt.message
                ),
            }

            legs.push(LegOutcome {
                ordinal: leg.ordinal,
                request,
                receipt,
            });
        }

        ExecutionReport {
            symbol: plan.symbol.clone(),
            legs,
        }
    }

    async fn submit(&self, request: &OrderRequest) -> OrderReceipt {
        if self.dry_run {
            return OrderReceipt {
                status: OrderStatus::Simulated,
                ticket: None,
                message: String::new(),
            };
        }

        match self.broker.send_order(request).await {
            Ok(receipt) => receipt,
            Err(e) => OrderReceipt {
                status: OrderStatus::Rejected,
                ticket: None,
                message: e.to_string(),
            },
        }
    }
}
