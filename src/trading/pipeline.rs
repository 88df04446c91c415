// src/trading/pipeline.rs
use crate::analysis::swings::SwingRangeDetector;
use crate::config::Config;
use crate::domain::decision::{AbortReason, Decision, InsufficientData, Signal, SizingDecision};
use crate::domain::errors::AppResult;
use crate::domain::models::PriceBar;
use crate::exchange::client::BrokerClient;
use crate::market_data::history::attach_atr;
use crate::storage::HighWaterMarkStore;
use crate::trading::builder::TradeBuilder;
use crate::trading::momentum::MomentumConfirmer;
use crate::trading::signals::RetracementSignalEngine;
use crate::trading::sizing::PositionSizer;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Swing range -> golden zone -> momentum gate -> sizing -> order ladder,
/// for one symbol per call.
pub struct DecisionPipeline {
    broker: Arc<dyn BrokerClient>,
    detector: SwingRangeDetector,
    engine: RetracementSignalEngine,
    confirmer: MomentumConfirmer,
    sizer: PositionSizer,
    builder: TradeBuilder,
    timeframe: String,
    history_bars: usize,
    atr_period: usize,
    require_momentum_confirmation: bool,
}

impl DecisionPipeline {
    pub fn new(
        config: &Config,
        broker: Arc<dyn BrokerClient>,
        store: Arc<dyn HighWaterMarkStore>,
    ) -> Self {
        Self {
            broker,
            detector: SwingRangeDetector::with_lookback(config.strategy.lookback),
            engine: RetracementSignalEngine::with_min_bars(config.strategy.min_signal_bars),
            confirmer: MomentumConfirmer::new(),
            sizer: PositionSizer::new(store),
            builder: TradeBuilder::with_magic_base(config.risk.magic_base),
            timeframe: config.trading.timeframe.clone(),
            history_bars: config.trading.history_bars,
            atr_period: config.strategy.atr_period,
            require_momentum_confirmation: config.trading.require_momentum_confirmation,
        }
    }

    /// Price history with ATR attached, or the shortfall
    async fn load_bars(&self, symbol: &str) -> AppResult<Result<Vec<PriceBar>, InsufficientData>> {
        let candles = self
            .broker
            .get_candles(symbol, &self.timeframe, self.history_bars)
            .await?;

        if candles.len() < self.atr_period {
            return Ok(Err(InsufficientData {
                stage: "volatility",
                required: self.atr_period,
                available: candles.len(),
            }));
        }

        Ok(Ok(attach_atr(&candles, self.atr_period)?))
    }

    /// Evaluate one symbol and, when the market is in the golden zone, plan
    /// the trade. Expected outcomes are `Ok(Decision)`; `Err` means a
    /// collaborator failed.
    pub async fn evaluate_and_plan(&self, symbol: &str) -> AppResult<Decision> {
        let bars = match self.load_bars(symbol).await? {
            Ok(bars) => bars,
            Err(shortfall) => return Ok(Decision::InsufficientData(shortfall)),
        };

        let range = match self.detector.find_range(&bars) {
            Ok(range) => range,
            Err(shortfall) => return Ok(Decision::InsufficientData(shortfall)),
        };

        let intent = match self.engine.evaluate(&bars, &range) {
            Signal::NoSignal(reason) => return Ok(Decision::NoSignal(reason)),
            Signal::Buy(intent) | Signal::Sell(intent) => intent,
        };
        let side = intent.side;
        log::info!(
            "{} signal on {}: close {} in zone {}, anchors {:?}",
            side, symbol, intent.close, intent.zone, intent.take_profit_anchors
        );

        if let Err(rejection) = self.confirmer.check(side, &bars) {
            if self.require_momentum_confirmation {
                log::warn!("{} {} blocked by momentum check: {}", side, symbol, rejection);
                return Ok(Decision::Aborted(AbortReason::MomentumRejected(rejection)));
            }
            log::warn!(
                "{} {} momentum not confirmed ({}), proceeding without confirmation",
                side, symbol, rejection
            );
        }

        let quote = match self.broker.get_quote(symbol).await? {
            Some(quote) => quote,
            None => return Ok(Decision::Aborted(AbortReason::QuoteUnavailable)),
        };
        let instrument = match self.broker.get_instrument(symbol).await? {
            Some(instrument) => instrument,
            None => return Ok(Decision::Aborted(AbortReason::InstrumentUnavailable)),
        };
        if instrument.point <= Decimal::ZERO {
            return Ok(Decision::Aborted(AbortReason::ZeroPointSize));
        }

        let stop_distance = match TradeBuilder::stop_distance(&bars) {
            Ok(distance) => distance,
            Err(reason) => return Ok(Decision::Aborted(reason)),
        };
        let stop_points = stop_distance / instrument.point;

        let account = match self.broker.get_account().await? {
            Some(account) => account,
            None => return Ok(Decision::Aborted(AbortReason::AccountUnavailable)),
        };

        let mut capital = self.sizer.capital_state(account.balance).await;
        let volume = match self
            .sizer
            .size_position(
                &mut capital,
                &account,
                stop_points,
                &instrument,
                side,
                quote.ask,
                self.broker.as_ref(),
            )
            .await
        {
            SizingDecision::Volume(volume) => volume,
            SizingDecision::Abandon(reason) => return Ok(Decision::Aborted(reason)),
        };

        match self
            .builder
            .build(symbol, side, &bars, &quote, volume, &instrument)
        {
            Ok(plan) => Ok(Decision::Plan(plan)),
            Err(reason) => Ok(Decision::Aborted(reason)),
        }
    }
}
