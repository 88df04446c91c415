// src/trading/guards.rs
use crate::config::Config;
use crate::domain::errors::AppResult;
use crate::exchange::client::BrokerClient;
use crate::storage::{CooldownStore, Cooldowns};
use crate::trading::builder::TradeBuilder;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Risk management parameters
#[derive(Debug, Clone)]
pub struct RiskParameters {
    pub max_daily_loss: Decimal,
    pub max_open_positions: usize,
    pub cooldown: Duration,
    pub loss_scan_window: Duration,
}

impl RiskParameters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_daily_loss: config.risk.max_daily_loss,
            max_open_positions: config.trading.max_open_positions,
            cooldown: Duration::hours(config.risk.cooldown_hours),
            loss_scan_window: Duration::minutes(config.risk.loss_scan_minutes),
        }
    }
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Account-level verdict for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleGate {
    pub daily_pnl: Decimal,
    pub daily_loss_hit: bool,
    pub open_positions: usize,
    pub capacity_reached: bool,
}

impl CycleGate {
    /// New signals may be evaluated this cycle
    pub fn can_trade(&self) -> bool {
        !self.daily_loss_hit && !self.capacity_reached
    }
}

/// Daily loss circuit breaker, loss cooldowns and position limits
pub struct RiskGuard {
    broker: Arc<dyn BrokerClient>,
    store: Arc<dyn CooldownStore>,
    params: RiskParameters,
    magic_numbers: Vec<u64>,
    cooldowns: Cooldowns,
}

impl RiskGuard {
    pub fn new(
        params: RiskParameters,
        magic_base: u64,
        broker: Arc<dyn BrokerClient>,
        store: Arc<dyn CooldownStore>,
    ) -> Self {
        Self {
            broker,
            store,
            params,
            magic_numbers: TradeBuilder::with_magic_base(magic_base).magic_numbers().collect(),
            cooldowns: Cooldowns::new(),
        }
    }

    /// Restore persisted cooldowns
    pub async fn load(&mut self) -> AppResult<()> {
        self.cooldowns = self.store.load_cooldowns().await?;
        log::info!(
            "Memory loaded. Active cooldowns: {:?}",
            self.cooldowns.keys().collect::<Vec<_>>()
        );
        Ok(())
    }

    pub fn is_ours(&self, magic: u64) -> bool {
        self.magic_numbers.contains(&magic)
    }

    pub fn on_cooldown(&self, symbol: &str) -> bool {
        self.cooldowns.contains_key(symbol)
    }

    /// Realized PnL of our deals since midnight (UTC)
    pub async fn daily_pnl(&self, now: DateTime<Utc>) -> AppResult<Decimal> {
        let midnight = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        let deals = self.broker.deals_since(midnight).await?;

        Ok(deals
            .iter()
            .filter(|d| d.time <= now && self.is_ours(d.magic))
            .map(|d| d.net_profit())
            .sum())
    }

    pub fn daily_loss_hit(&self, daily_pnl: Decimal) -> bool {
        daily_pnl < -self.params.max_daily_loss
    }

    /// Put symbols with a fresh losing close on cooldown. Returns the
    /// symbols newly added.
    pub async fn scan_recent_losses(&mut self, now: DateTime<Utc>) -> AppResult<Vec<String>> {
        let deals = self
            .broker
            .deals_since(now - self.params.loss_scan_window)
            .await?;

        let losses: Vec<_> = deals
            .into_iter()
            .filter(|d| {
                d.entry.is_closing() && self.is_ours(d.magic) && d.net_profit() < Decimal::ZERO
            })
            .collect();

        let mut added = Vec::new();
        for deal in losses {
            if self.cooldowns.contains_key(&deal.symbol) {
                continue;
            }

            let expiry = now + self.params.cooldown;
            log::warn!(
                "Loss detected on {} ({}). Cooldown until {}",
                deal.symbol,
                deal.net_profit(),
                expiry
            );
            self.cooldowns.insert(deal.symbol.clone(), expiry);
            added.push(deal.symbol);
        }

        if !added.is_empty() {
            self.persist().await;
        }
        Ok(added)
    }

    /// Drop expired cooldowns. Returns the released symbols.
    pub async fn expire_cooldowns(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .cooldowns
            .iter()
            .filter(|(_, expiry)| now > **expiry)
            .map(|(symbol, _)| symbol.clone())
            .collect();

        for symbol in &expired {
            log::info!("Cooldown over for {}", symbol);
            self.cooldowns.remove(symbol);
        }

        if !expired.is_empty() {
            self.persist().await;
        }
        expired
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save_cooldowns(&self.cooldowns).await {
            log::error!("Failed to save cooldowns: {}", e);
        }
    }

    /// Whether one of our legs is already open on `symbol`
    pub async fn has_open_position(&self, symbol: &str) -> AppResult<bool> {
        let positions = self.broker.positions(Some(symbol)).await?;
        Ok(positions.iter().any(|p| self.is_ours(p.magic)))
    }

    /// Daily PnL, cooldown upkeep and position capacity for this cycle
    pub async fn assess(&mut self, now: DateTime<Utc>) -> AppResult<CycleGate> {
        let daily_pnl = self.daily_pnl(now).await?;
        let daily_loss_hit = self.daily_loss_hit(daily_pnl);
        log::info!("Daily PnL: {}", daily_pnl);
        if daily_loss_hit {
            log::warn!(
                "Max daily loss reached ({} < -{}). Trading suspended",
                daily_pnl, self.params.max_daily_loss
            );
        }

        self.scan_recent_losses(now).await?;
        self.expire_cooldowns(now).await;

        let open_positions = self.broker.positions(None).await?.len();
        let capacity_reached = open_positions >= self.params.max_open_positions;
        if capacity_reached {
            log::warn!(
                "{} open positions, limit {}. No new entries this cycle",
                open_positions, self.params.max_open_positions
            );
        }

        Ok(CycleGate {
            daily_pnl,
            daily_loss_hit,
            open_positions,
            capacity_reached,
        })
    }
}
