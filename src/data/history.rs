//! Yahoo Finance price history client (RapidAPI)
//!
//! Fetches the raw history response for one ticker with the interval/period pair
//! derived from a `TimeRange`.

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::{QueryParams, RawResponse, TransformError};

/// Default API host
pub const DEFAULT_HOST: &str = "yahoo-finance15.p.rapidapi.com";

/// Path of the history endpoint, relative to the base URL
const HISTORY_PATH: &str = "/api/v1/markets/stock/history";

/// Errors that can occur when fetching price history
#[derive(Debug, Error)]
pub enum FetchError {
    /// Upstream answered with a non-success status
    #[error("API Error: {status} {status_text}")]
    Status { status: u16, status_text: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but couldn't be turned into chart points
    #[error("Failed to transform response: {0}")]
    Transform(#[from] TransformError),

    /// The API key can't be sent as a header
    #[error("Invalid API key header: {0}")]
    InvalidHeader(#[from] header::InvalidHeaderValue),
}

/// Anything that can produce a raw history response for a query
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_history(&self, params: QueryParams) -> Result<RawResponse, FetchError>;
}

/// Client for the RapidAPI history endpoint
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: String,
    symbol: String,
}

impl HistoryClient {
    /// Creates a client that authenticates with the given key against `host`
    pub fn new(api_key: &SecretString, host: &str) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        let mut key = header::HeaderValue::from_str(api_key.expose_secret())?;
        key.set_sensitive(true);
        headers.insert("X-RapidAPI-Key", key);
        headers.insert("X-RapidAPI-Host", header::HeaderValue::from_str(host)?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: format!("https://{}", host),
            symbol: "NVDA".to_string(),
        })
    }

    /// Overrides the base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the ticker symbol to fetch
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn history_url(&self) -> String {
        format!("{}{}", self.base_url, HISTORY_PATH)
    }
}

#[async_trait]
impl PriceSource for HistoryClient {
    async fn fetch_history(&self, params: QueryParams) -> Result<RawResponse, FetchError> {
        tracing::debug!(
            symbol = %self.symbol,
            interval = params.interval,
            period = params.period,
            "requesting price history"
        );

        let response = self
            .client
            .get(self.history_url())
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("interval", params.interval),
                ("period", params.period),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
