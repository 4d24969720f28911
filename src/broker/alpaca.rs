// =============================================================================
// Alpaca REST client — concrete BrokerClient implementation
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;

use super::rate_limit::RateLimiter;
use super::types::{
    parse_decimal_str, Account, Bar, BrokerPosition, Clock, OrderRequest, OrderSide,
    OrderStatusReport, OrderType, Quote, Timeframe,
};
use super::BrokerClient;
use crate::errors::CoreError;

pub struct AlpacaClient {
    http: Client,
    trading_base_url: String,
    data_base_url: String,
    api_key: String,
    api_secret: String,
    limiter: Arc<RateLimiter>,
}

impl AlpacaClient {
    pub fn new(
        api_key: String,
        api_secret: String,
        trading_base_url: String,
        data_base_url: String,
        limiter: Arc<RateLimiter>,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            trading_base_url,
            data_base_url,
            api_key,
            api_secret,
            limiter,
        })
    }

    /// Build a client from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY` /
    /// `APCA_API_BASE_URL` (spec §6.1, SPEC_FULL §A.3). Absence of the
    /// credentials aborts the service with a clear message.
    pub fn from_env(limiter: Arc<RateLimiter>) -> anyhow::Result<Self> {
        let api_key = std::env::var("APCA_API_KEY_ID")
            .map_err(|_| CoreError::Config("APCA_API_KEY_ID not set".into()))?;
        let api_secret = std::env::var("APCA_API_SECRET_KEY")
            .map_err(|_| CoreError::Config("APCA_API_SECRET_KEY not set".into()))?;
        let trading_base_url = std::env::var("APCA_API_BASE_URL")
            .unwrap_or_else(|_| "https://paper-api.alpaca.markets".to_string());
        let data_base_url = std::env::var("APCA_API_DATA_URL")
            .unwrap_or_else(|_| "https://data.alpaca.markets".to_string());

        Self::new(api_key, api_secret, trading_base_url, data_base_url, limiter)
    }

    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            header::HeaderValue::from_str(&self.api_key).expect("api key is valid header value"),
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            header::HeaderValue::from_str(&self.api_secret)
                .expect("api secret is valid header value"),
        );
        headers
    }

    fn classify_status(status: StatusCode, body: &str) -> CoreError {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            CoreError::BrokerTransient(format!("{status}: {body}"))
        } else {
            CoreError::BrokerPermanent(format!("{status}: {body}"))
        }
    }

    /// Send a request built fresh by `build` on every attempt, retrying a
    /// `BrokerTransient` outcome (429/5xx) with exponential backoff per
    /// `CoreError::should_retry_transient` (spec §7). A permanent error or
    /// an attempt count past the retry policy returns immediately.
    async fn request_with_retry<F>(&self, mut build: F) -> anyhow::Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire().await;
            let resp = build().send().await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }

            let body = resp.text().await.unwrap_or_default();
            let err = Self::classify_status(status, &body);
            if matches!(err, CoreError::BrokerTransient(_)) && CoreError::should_retry_transient(attempt) {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                tracing::warn!(attempt, %status, "transient broker error, retrying with backoff");
                attempt += 1;
                tokio::time::sleep(backoff).await;
                continue;
            }
            return Err(err.into());
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClock {
    is_open: bool,
    next_open: DateTime<Utc>,
    next_close: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    equity: String,
    cash: String,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    symbol: String,
    qty: String,
    avg_entry_price: String,
}

#[derive(Debug, Deserialize)]
struct RawQuoteWrapper {
    quote: RawQuote,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(rename = "bp")]
    bid_price: f64,
    #[serde(rename = "ap")]
    ask_price: f64,
}

#[derive(Debug, Deserialize)]
struct RawBarsWrapper {
    bars: Vec<RawBar>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    id: String,
    status: String,
    filled_qty: Option<String>,
    filled_avg_price: Option<String>,
}

#[async_trait]
impl BrokerClient for AlpacaClient {
    async fn get_clock(&self) -> anyhow::Result<Clock> {
        let url = format!("{}/v2/clock", self.trading_base_url);
        let resp = self
            .request_with_retry(|| self.http.get(&url).headers(self.auth_headers()))
            .await?;
        let raw: RawClock = resp.json().await?;
        Ok(Clock {
            is_open: raw.is_open,
            next_open: raw.next_open,
            next_close: raw.next_close,
        })
    }

    async fn get_account(&self) -> anyhow::Result<Account> {
        let url = format!("{}/v2/account", self.trading_base_url);
        let resp = self
            .request_with_retry(|| self.http.get(&url).headers(self.auth_headers()))
            .await?;
        let raw: RawAccount = resp.json().await?;
        Ok(Account {
            equity: parse_decimal_str(&raw.equity),
            cash: parse_decimal_str(&raw.cash),
        })
    }

    async fn list_positions(&self) -> anyhow::Result<Vec<BrokerPosition>> {
        let url = format!("{}/v2/positions", self.trading_base_url);
        let resp = self
            .request_with_retry(|| self.http.get(&url).headers(self.auth_headers()))
            .await?;
        let raw: Vec<RawPosition> = resp.json().await?;
        Ok(raw
            .into_iter()
            .map(|p| BrokerPosition {
                symbol: p.symbol,
                qty: parse_decimal_str(&p.qty),
                avg_entry_price: parse_decimal_str(&p.avg_entry_price),
            })
            .collect())
    }

    async fn get_latest_quote(&self, symbol: &str) -> anyhow::Result<Quote> {
        self.limiter.acquire().await;
        let url = format!(
            "{}/v2/stocks/{symbol}/quotes/latest",
            self.data_base_url
        );
        let resp = self.http.get(&url).headers(self.auth_headers()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CoreError::Data {
                symbol: symbol.to_string(),
                reason: format!("quote fetch failed: {status}: {body}"),
            }
            .into());
        }
        let raw: RawQuoteWrapper = resp.json().await?;
        Ok(Quote {
            bid: raw.quote.bid_price,
            ask: raw.quote.ask_price,
        })
    }

    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> anyhow::Result<Vec<Bar>> {
        self.limiter.acquire().await;
        let url = format!(
            "{}/v2/stocks/{symbol}/bars?timeframe={}&limit={limit}",
            self.data_base_url,
            timeframe.as_alpaca_str(),
        );
        let resp = self.http.get(&url).headers(self.auth_headers()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CoreError::Data {
                symbol: symbol.to_string(),
                reason: format!("bars fetch failed: {status}: {body}"),
            }
            .into());
        }
        let raw: RawBarsWrapper = resp.json().await?;
        Ok(raw
            .bars
            .into_iter()
            .map(|b| Bar {
                t: b.t,
                o: b.o,
                h: b.h,
                l: b.l,
                c: b.c,
                v: b.v,
            })
            .collect())
    }

    async fn submit_order(&self, order: OrderRequest) -> anyhow::Result<String> {
        let url = format!("{}/v2/orders", self.trading_base_url);

        let body = serde_json::json!({
            "symbol": order.symbol,
            "qty": order.qty.to_string(),
            "side": match order.side { OrderSide::Buy => "buy", OrderSide::Sell => "sell" },
            "type": match order.order_type { OrderType::Market => "market", OrderType::Limit => "limit" },
            "time_in_force": "day",
            "limit_price": order.limit_price.map(|p| format!("{p:.2}")),
        });

        tracing::info!(symbol = %order.symbol, qty = order.qty, "submitting order");
        let resp = self
            .request_with_retry(|| self.http.post(&url).headers(self.auth_headers()).json(&body))
            .await?;
        let raw: RawOrder = resp.json().await?;
        Ok(raw.id)
    }

    async fn get_order(&self, order_id: &str) -> anyhow::Result<OrderStatusReport> {
        let url = format!("{}/v2/orders/{order_id}", self.trading_base_url);
        let resp = self
            .request_with_retry(|| self.http.get(&url).headers(self.auth_headers()))
            .await?;
        let raw: RawOrder = resp.json().await?;
        Ok(OrderStatusReport {
            order_id: raw.id,
            status: super::types::OrderStatus::from_alpaca_str(&raw.status),
            filled_qty: raw.filled_qty.as_deref().map(parse_decimal_str).unwrap_or(0.0),
            filled_avg_price: raw.filled_avg_price.as_deref().map(parse_decimal_str),
        })
    }

    /// Cancellation treats a 404 as success (the order already resolved by
    /// the time the cancel lands), unlike every other endpoint, so it
    /// retries transient errors with its own short loop instead of going
    /// through `request_with_retry`.
    async fn cancel_order(&self, order_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/v2/orders/{order_id}", self.trading_base_url);
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire().await;
            let resp = self.http.delete(&url).headers(self.auth_headers()).send().await?;
            let status = resp.status();
            if status.is_success() || status == StatusCode::NOT_FOUND {
                return Ok(());
            }

            let body = resp.text().await.unwrap_or_default();
            let err = Self::classify_status(status, &body);
            if matches!(err, CoreError::BrokerTransient(_)) && CoreError::should_retry_transient(attempt) {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                tracing::warn!(attempt, %status, "transient broker error cancelling order, retrying");
                attempt += 1;
                tokio::time::sleep(backoff).await;
                continue;
            }
            return Err(err.into());
        }
    }
}
