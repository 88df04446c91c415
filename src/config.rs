// src/config.rs
use crate::domain::errors::{AppError, AppResult};
use dotenv::dotenv;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Trading bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Terminal bridge connection
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Trading configuration
    #[serde(default)]
    pub trading: TradingConfig,

    /// Swing/retracement parameters
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Risk management configuration
    #[serde(default)]
    pub risk: RiskConfig,

    /// Bot memory file
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Terminal bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,

    /// Trading account; when unset the terminal's current session is used
    pub login: Option<u64>,
    pub password: Option<String>,
    pub server: Option<String>,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

/// Trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Candle timeframe (e.g. "M5", "H1")
    pub timeframe: String,

    /// Candles fetched per evaluation
    pub history_bars: usize,

    /// Seconds between cycles
    pub poll_interval_secs: u64,

    /// Log plans instead of sending orders
    pub dry_run: bool,

    /// Auto trading enabled
    pub auto_trading: bool,

    /// Abort plans whose momentum check fails
    pub require_momentum_confirmation: bool,

    /// Account-wide cap on open positions
    pub max_open_positions: usize,

    /// Symbol substrings never traded
    pub blacklist: Vec<String>,
}

/// Strategy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Bars scanned for the swing extremes
    pub lookback: usize,

    /// Minimum bars before a signal is considered
    pub min_signal_bars: usize,

    /// ATR period
    pub atr_period: usize,
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Magic number of the first leg; leg n uses magic_base + n - 1
    pub magic_base: u64,

    /// Allowed slippage in points
    pub deviation: u32,

    /// Daily loss (account currency) that halts trading
    pub max_daily_loss: Decimal,

    /// Cooldown after a losing close
    pub cooldown_hours: i64,

    /// How far back closing deals are scanned for losses
    pub loss_scan_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub memory_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,

    /// Log to file
    pub to_file: bool,

    /// Log file path
    pub file_path: Option<String>,
}

pub const DEFAULT_BLACKLIST: &[&str] = &[
    "XAU", "GOLD", "XAG", "SILVER", "OIL", "WTI", "BRENT", "XTI", "XBR", "USOIL", "UKOIL", "BTC",
    "ETH", "LTC", "XRP", "CRYPTO", "BITCOIN", "DX", "DXY", "USDX", "US30", "US100", "DE30",
    "DE40", "FR40", "SPX", "NAS",
];

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18812,
            login: None,
            password: None,
            server: None,
            request_timeout_secs: 10,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            timeframe: "M5".to_string(),
            history_bars: 1000,
            poll_interval_secs: 60,
            dry_run: false,
            auto_trading: true,
            require_momentum_confirmation: false,
            max_open_positions: 30,
            blacklist: DEFAULT_BLACKLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            lookback: 100,
            min_signal_bars: 50,
            atr_period: 14,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            magic_base: 123456,
            deviation: 30,
            max_daily_loss: Decimal::new(550, 0),
            cooldown_hours: 2,
            loss_scan_minutes: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            memory_file: "bot_memory.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
            file_path: None,
        }
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid value for {}: {}", key, value))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let broker = BrokerConfig {
            host: env::var("BROKER_HOST").unwrap_or(defaults.broker.host),
            port: env_or("BROKER_PORT", defaults.broker.port)?,
            login: env::var("BROKER_LOGIN")
                .ok()
                .map(|v| {
                    v.trim()
                        .parse()
                        .map_err(|_| AppError::Config(format!("Invalid value for BROKER_LOGIN: {}", v)))
                })
                .transpose()?,
            password: env::var("BROKER_PASSWORD").ok(),
            server: env::var("BROKER_SERVER").ok(),
            request_timeout_secs: env_or(
                "BROKER_TIMEOUT_SECS",
                defaults.broker.request_timeout_secs,
            )?,
        };

        let blacklist = match env::var("SYMBOL_BLACKLIST") {
            Ok(list) => list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.trading.blacklist,
        };

        let trading = TradingConfig {
            timeframe: env::var("TRADING_TIMEFRAME").unwrap_or(defaults.trading.timeframe),
            history_bars: env_or("HISTORY_BARS", defaults.trading.history_bars)?,
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", defaults.trading.poll_interval_secs)?,
            dry_run: env_or("DRY_RUN", defaults.trading.dry_run)?,
            auto_trading: env_or("AUTO_TRADING", defaults.trading.auto_trading)?,
            require_momentum_confirmation: env_or(
                "REQUIRE_MOMENTUM_CONFIRMATION",
                defaults.trading.require_momentum_confirmation,
            )?,
            max_open_positions: env_or("MAX_OPEN_POSITIONS", defaults.trading.max_open_positions)?,
            blacklist,
        };

        let strategy = StrategyConfig {
            lookback: env_or("SWING_LOOKBACK", defaults.strategy.lookback)?,
            min_signal_bars: env_or("MIN_SIGNAL_BARS", defaults.strategy.min_signal_bars)?,
            atr_period: env_or("ATR_PERIOD", defaults.strategy.atr_period)?,
        };

        let risk = RiskConfig {
            magic_base: env_or("MAGIC_BASE", defaults.risk.magic_base)?,
            deviation: env_or("ORDER_DEVIATION", defaults.risk.deviation)?,
            max_daily_loss: env_or("MAX_DAILY_LOSS", defaults.risk.max_daily_loss)?,
            cooldown_hours: env_or("COOLDOWN_HOURS", defaults.risk.cooldown_hours)?,
            loss_scan_minutes: env_or("LOSS_SCAN_MINUTES", defaults.risk.loss_scan_minutes)?,
        };

        let storage = StorageConfig {
            memory_file: env::var("MEMORY_FILE").unwrap_or(defaults.storage.memory_file),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or(defaults.logging.level),
            to_file: env_or("LOG_TO_FILE", defaults.logging.to_file)?,
            file_path: env::var("LOG_FILE_PATH").ok(),
        };

        let config = Config {
            broker,
            trading,
            strategy,
            risk,
            storage,
            logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let mut file = File::open(path)
            .map_err(|e| AppError::Config(format!("Failed to open config file: {}", e)))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject parameter combinations the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.broker.port == 0 {
            return Err(AppError::Config("broker port must be non-zero".to_string()));
        }
        if self.strategy.lookback == 0 {
            return Err(AppError::Config("swing lookback must be at least 1".to_string()));
        }
        if self.strategy.min_signal_bars < 3 {
            return Err(AppError::Config(format!(
                "min_signal_bars must be at least 3, got {}",
                self.strategy.min_signal_bars
            )));
        }
        if self.strategy.atr_period == 0 {
            return Err(AppError::Config("atr_period must be at least 1".to_string()));
        }
        if self.trading.poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs must be non-zero".to_string()));
        }
        if self.risk.max_daily_loss < Decimal::ZERO {
            return Err(AppError::Config("max_daily_loss must not be negative".to_string()));
        }
        Ok(())
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> AppResult<()> {
        let mut builder = env_logger::Builder::new();

        // Set log level
        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        builder.filter_level(log_level);

        // Configure output
        if self.logging.to_file {
            if let Some(file_path) = &self.logging.file_path {
                let file = File::create(file_path)
                    .map_err(|e| AppError::Config(format!("Failed to create log file: {}", e)))?;

                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }

        builder
            .try_init()
            .map_err(|e| AppError::Config(format!("Failed to initialize logger: {}", e)))?;

        Ok(())
    }
}
