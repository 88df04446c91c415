// src/main.rs
use fibo_trade::config::Config;
use fibo_trade::domain::errors::AppResult;
use fibo_trade::exchange::bridge::TerminalBridge;
use fibo_trade::exchange::client::BrokerClient;
use fibo_trade::storage::JsonMemoryStore;
use fibo_trade::trading_bot::TradingBot;

use std::sync::Arc;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration: a JSON file when given, environment otherwise
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Initialize logging
    config.init_logging()?;

    log::info!("Starting fibo_trade v{}", env!("CARGO_PKG_VERSION"));
    if config.trading.dry_run {
        log::info!("Dry run: plans are simulated, no orders are sent");
    }

    // Connect to the terminal
    let mut bridge = TerminalBridge::new(config.broker.clone());
    bridge.connect().await?;
    let mut broker = Arc::new(bridge);

    let store = Arc::new(JsonMemoryStore::new(&config.storage.memory_file));

    let mut bot = TradingBot::new(config, broker.clone(), store);
    log::info!("Bot is running. Press Ctrl+C to stop.");
    let result = bot.run().await;
    drop(bot);

    // Shutdown
    log::info!("Shutting down...");
    if let Some(bridge) = Arc::get_mut(&mut broker) {
        bridge.disconnect().await?;
    }

    log::info!("Shutdown complete. Goodbye!");
    result
}
