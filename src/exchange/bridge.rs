// src/exchange/bridge.rs
use crate::config::BrokerConfig;
use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{
    AccountSnapshot, Candle, ClosedDeal, InstrumentSpec, OpenPosition, OrderReceipt, OrderRequest,
    OrderSide, Quote, StopUpdate, SymbolInfo,
};
use crate::exchange::client::BrokerClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

/// Commands understood by the terminal-side bridge script. One JSON object
/// per line in each direction.
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Login {
        login: Option<u64>,
        password: Option<&'a str>,
        server: Option<&'a str>,
    },
    Symbols,
    Candles {
        symbol: &'a str,
        timeframe: &'a str,
        count: usize,
    },
    Quote {
        symbol: &'a str,
    },
    Instrument {
        symbol: &'a str,
    },
    Account,
    CalcMargin {
        symbol: &'a str,
        side: OrderSide,
        volume: Decimal,
        price: Decimal,
    },
    SendOrder(&'a OrderRequest),
    Positions {
        symbol: Option<&'a str>,
    },
    ModifyPosition(&'a StopUpdate),
    DealsSince {
        from: i64,
    },
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// `BrokerClient` over a line-oriented JSON TCP bridge to the trading terminal.
/// Requests are serialized; one request is in flight at a time.
pub struct TerminalBridge {
    config: BrokerConfig,
    stream: Mutex<Option<BufReader<TcpStream>>>,
}

impl TerminalBridge {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs.max(1))
    }

    async fn request<T: DeserializeOwned>(&self, request: &BridgeRequest<'_>) -> ExchangeResult<T> {
        let mut payload = serde_json::to_string(request)
            .map_err(|e| ExchangeError::Protocol(format!("Failed to encode request: {}", e)))?;
        payload.push('\n');

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ExchangeError::NotConnected)?;

        let line = match timeout(self.request_timeout(), exchange_line(stream, &payload)).await {
            Ok(result) => result,
            Err(_) => {
                // the stream may hold a late response; drop it
                *guard = None;
                return Err(ExchangeError::Connection(format!(
                    "Terminal did not answer within {:?}",
                    self.request_timeout()
                )));
            }
        };

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                *guard = None;
                return Err(e);
            }
        };

        decode_response(&line)
    }
}

async fn exchange_line(stream: &mut BufReader<TcpStream>, payload: &str) -> ExchangeResult<String> {
    stream
        .get_mut()
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| ExchangeError::Connection(format!("Failed to send request: {}", e)))?;

    let mut line = String::new();
    let read = stream
        .read_line(&mut line)
        .await
        .map_err(|e| ExchangeError::Connection(format!("Failed to read response: {}", e)))?;

    if read == 0 {
        return Err(ExchangeError::Connection("Terminal closed the connection".to_string()));
    }

    Ok(line)
}

fn decode_response<T: DeserializeOwned>(line: &str) -> ExchangeResult<T> {
    let response: BridgeResponse = serde_json::from_str(line.trim())
        .map_err(|e| ExchangeError::Protocol(format!("Malformed response: {}", e)))?;

    if !response.ok {
        return Err(ExchangeError::Terminal(
            response.error.unwrap_or_else(|| "unknown terminal error".to_string()),
        ));
    }

    serde_json::from_value(response.data)
        .map_err(|e| ExchangeError::Protocol(format!("Unexpected response payload: {}", e)))
}

#[async_trait]
impl BrokerClient for TerminalBridge {
    async fn connect(&mut self) -> ExchangeResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        log::info!("Connecting to terminal bridge at {}...", addr);

        let stream = timeout(self.request_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| ExchangeError::Connection(format!("Timed out connecting to {}", addr)))?
            .map_err(|e| ExchangeError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        {
            let mut guard = self.stream.lock().await;
            *guard = Some(BufReader::new(stream));
        }

        if self.config.login.is_some() {
            let request = BridgeRequest::Login {
                login: self.config.login,
                password: self.config.password.as_deref(),
                server: self.config.server.as_deref(),
            };
            let _: serde_json::Value = self.request(&request).await.map_err(|e| match e {
                ExchangeError::Terminal(msg) => ExchangeError::Authentication(msg),
                other => other,
            })?;
        }

        log::info!("Connected to terminal bridge");
        Ok(())
    }

    async fn disconnect(&mut self) -> ExchangeResult<()> {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            stream
                .get_mut()
                .shutdown()
                .await
                .map_err(|e| ExchangeError::Connection(format!("Failed to close connection: {}", e)))?;
        }
        Ok(())
    }

    async fn symbols(&self) -> ExchangeResult<Vec<SymbolInfo>> {
        self.request(&BridgeRequest::Symbols).await
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        count: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        self.request(&BridgeRequest::Candles { symbol, timeframe, count }).await
    }

    async fn get_quote(&self, symbol: &str) -> ExchangeResult<Option<Quote>> {
        self.request(&BridgeRequest::Quote { symbol }).await
    }

    async fn get_instrument(&self, symbol: &str) -> ExchangeResult<Option<InstrumentSpec>> {
        self.request(&BridgeRequest::Instrument { symbol }).await
    }

    async fn get_account(&self) -> ExchangeResult<Option<AccountSnapshot>> {
        self.request(&BridgeRequest::Account).await
    }

    async fn calc_margin(
        &self,
        symbol: &str,
        side: OrderSide,
        volume: Decimal,
        price: Decimal,
    ) -> ExchangeResult<Option<Decimal>> {
        self.request(&BridgeRequest::CalcMargin { symbol, side, volume, price }).await
    }

    async fn send_order(&self, request: &OrderRequest) -> ExchangeResult<OrderReceipt> {
        self.request(&BridgeRequest::SendOrder(request)).await
    }

    async fn positions(&self, symbol: Option<&str>) -> ExchangeResult<Vec<OpenPosition>> {
        self.request(&BridgeRequest::Positions { symbol }).await
    }

    async fn modify_position(&self, update: &StopUpdate) -> ExchangeResult<OrderReceipt> {
        self.request(&BridgeRequest::ModifyPosition(update)).await
    }

    async fn deals_since(&self, from: DateTime<Utc>) -> ExchangeResult<Vec<ClosedDeal>> {
        self.request(&BridgeRequest::DealsSince { from: from.timestamp() }).await
    }
}
