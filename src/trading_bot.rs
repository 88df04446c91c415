// src/trading_bot.rs
use crate::config::Config;
use crate::domain::decision::Decision;
use crate::domain::errors::AppResult;
use crate::exchange::client::BrokerClient;
use crate::storage::{CooldownStore, HighWaterMarkStore};
use crate::trading::break_even::BreakEvenManager;
use crate::trading::builder::LEG_RISK_MULTIPLES;
use crate::trading::execution::TradeExecutor;
use crate::trading::guards::{RiskGuard, RiskParameters};
use crate::trading::pipeline::DecisionPipeline;
use crate::trading::universe::tradable_symbols;
use chrono::Utc;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tokio::time::{sleep, Duration};

/// What one polling cycle did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    pub symbols: usize,
    pub evaluated: usize,
    pub plans: usize,
    pub orders_accepted: usize,
    pub errors: usize,
}

/// Polling loop: break-even upkeep, risk gates, then one decision per symbol
pub struct TradingBot {
    config: Config,
    broker: Arc<dyn BrokerClient>,
    pipeline: DecisionPipeline,
    guard: RiskGuard,
    break_even: BreakEvenManager,
    executor: TradeExecutor,
}

impl TradingBot {
    pub fn new<S>(config: Config, broker: Arc<dyn BrokerClient>, store: Arc<S>) -> Self
    where
        S: HighWaterMarkStore + CooldownStore + 'static,
    {
        let magic_base = config.risk.magic_base;
        let pipeline = DecisionPipeline::new(&config, broker.clone(), store.clone());
        let guard = RiskGuard::new(
            RiskParameters::from_config(&config),
            magic_base,
            broker.clone(),
            store,
        );
        let break_even =
            BreakEvenManager::new(broker.clone(), magic_base, LEG_RISK_MULTIPLES.len() as u64);
        let executor = TradeExecutor::new(broker.clone(), config.risk.deviation, config.trading.dry_run);

        Self {
            config,
            broker,
            pipeline,
            guard,
            break_even,
            executor,
        }
    }

    /// Restore persisted state before the first cycle
    pub async fn initialize(&mut self) -> AppResult<()> {
        self.guard.load().await
    }

    pub async fn run_cycle(&mut self) -> AppResult<CycleSummary> {
        log::info!("--- Analysis: {} ---", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        let mut summary = CycleSummary::default();

        if let Err(e) = self.break_even.run().await {
            log::error!("Break-even manager failed: {}", e);
        }

        let symbols = tradable_symbols(&self.broker.symbols().await?, &self.config.trading.blacklist);
        summary.symbols = symbols.len();
        if symbols.is_empty() {
            log::warn!("No visible symbols to trade");
            return Ok(summary);
        }
        log::info!(
            "Watching {} market(s): {:?} ...",
            symbols.len(),
            &symbols[..symbols.len().min(5)]
        );

        let gate = self.guard.assess(Utc::now()).await?;
        if !gate.can_trade() {
            return Ok(summary);
        }

        for symbol in &symbols {
            if self.guard.on_cooldown(symbol) {
                log::debug!("{} on cooldown, skipping", symbol);
                continue;
            }

            match self.process_symbol(symbol).await {
                Ok(Some(accepted)) => {
                    summary.evaluated += 1;
                    summary.plans += 1;
                    summary.orders_accepted += accepted;
                }
                Ok(None) => summary.evaluated += 1,
                Err(e) => {
                    log::error!("[{}] {}", symbol, e);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Evaluate one symbol; returns the number of accepted legs when a plan
    /// was produced
    async fn process_symbol(&self, symbol: &str) -> AppResult<Option<usize>> {
        if self.guard.has_open_position(symbol).await? {
            log::debug!("{} already has open legs, skipping", symbol);
            return Ok(None);
        }

        let plan = match self.pipeline.evaluate_and_plan(symbol).await? {
            Decision::Plan(plan) => plan,
            Decision::NoSignal(reason) => {
                log::debug!("[{}] no signal: {}", symbol, reason);
                return Ok(None);
            }
            Decision::InsufficientData(shortfall) => {
                log::info!("[{}] insufficient data: {}", symbol, shortfall);
                return Ok(None);
            }
            Decision::Aborted(reason) => {
                log::warn!("[{}] plan aborted ({:?}): {}", symbol, reason.category(), reason);
                return Ok(None);
            }
        };

        log::warn!("!!! {} SIGNAL (FIBO) ON {} !!!", plan.side, symbol);

        if !self.config.trading.auto_trading {
            log::info!("Auto-trading is disabled. Plan for {} not executed", symbol);
            return Ok(Some(0));
        }

        let report = self.executor.execute(&plan).await;
        Ok(Some(report.accepted()))
    }

    /// Run cycles until Ctrl-C
    pub async fn run(&mut self) -> AppResult<()> {
        self.initialize().await?;
        let interval = Duration::from_secs(self.config.trading.poll_interval_secs);

        loop {
            match self.run_cycle().await {
                Ok(summary) => log::info!(
                    "Cycle done: {} symbol(s), {} evaluated, {} plan(s), {} order(s), {} error(s)",
                    summary.symbols,
                    summary.evaluated,
                    summary.plans,
                    summary.orders_accepted,
                    summary.errors
                ),
                Err(e) => log::error!("Cycle failed: {}", e),
            }

            log::info!("Waiting {} seconds...", interval.as_secs());
            tokio::select! {
                _ = ctrl_c() => {
                    log::info!("Manual stop requested");
                    return Ok(());
                }
                _ = sleep(interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::testing::{closing_deal, fx_instrument, swing_candles, MockBroker};
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    fn market() -> MockBroker {
        MockBroker::new()
            .with_symbol("EURUSD", true)
            .with_symbol("XAUUSD", true)
            .with_symbol("GBPUSD", false)
            .with_candles("EURUSD", swing_candles(90, dec!(1.2), 10, dec!(1.18), dec!(1.189)))
            .with_quote("EURUSD", dec!(1.1889), dec!(1.189))
            .with_instrument(fx_instrument("EURUSD"))
            .with_account(dec!(10000), dec!(10000))
    }

    fn bot(config: Config, broker: Arc<MockBroker>) -> TradingBot {
        TradingBot::new(config, broker, Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn test_cycle_places_ladder_once() {
        let broker = Arc::new(market());
        let mut bot = bot(Config::default(), broker.clone());
        bot.initialize().await.unwrap();

        let summary = bot.run_cycle().await.unwrap();
        assert_eq!(summary.symbols, 1);
        assert_eq!(summary.plans, 1);
        assert_eq!(summary.orders_accepted, 4);
        assert_eq!(broker.sent_orders().len(), 4);

        // legs are open now: the symbol is skipped
        let summary = bot.run_cycle().await.unwrap();
        assert_eq!(summary.plans, 0);
        assert_eq!(broker.sent_orders().len(), 4);
    }

    #[tokio::test]
    async fn test_dry_run_and_disabled_auto_trading_send_nothing() {
        let mut config = Config::default();
        config.trading.dry_run = true;
        let broker = Arc::new(market());
        let summary = bot(config, broker.clone()).run_cycle().await.unwrap();
        assert_eq!(summary.orders_accepted, 4);
        assert!(broker.sent_orders().is_empty());

        let mut config = Config::default();
        config.trading.auto_trading = false;
        let broker = Arc::new(market());
        let summary = bot(config, broker.clone()).run_cycle().await.unwrap();
        assert_eq!(summary.plans, 1);
        assert!(broker.sent_orders().is_empty());
    }

    #[tokio::test]
    async fn test_daily_loss_halts_trading() {
        let broker = Arc::new(market().with_deal(closing_deal(
            1,
            "USDJPY",
            Utc::now() - ChronoDuration::seconds(1),
            123456,
            dec!(-1000),
        )));
        let summary = bot(Config::default(), broker.clone()).run_cycle().await.unwrap();
        assert_eq!(summary.evaluated, 0);
        assert!(broker.sent_orders().is_empty());
    }

    #[tokio::test]
    async fn test_recent_loss_puts_symbol_on_cooldown() {
        let broker = Arc::new(market().with_deal(closing_deal(
            1,
            "EURUSD",
            Utc::now() - ChronoDuration::seconds(1),
            123457,
            dec!(-10),
        )));
        let mut bot = bot(Config::default(), broker.clone());
        let summary = bot.run_cycle().await.unwrap();
        assert_eq!(summary.evaluated, 0);
        assert!(broker.sent_orders().is_empty());
    }
}
