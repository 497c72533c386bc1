//! Bybit V5 REST API client.

use crate::config::ExchangeConfig;
use crate::exchange::traits::Exchange;
use crate::exchange::types::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder, Response};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, instrument};

const MAINNET_BASE_URL: &str = "https://api.bybit.com";
const TESTNET_BASE_URL: &str = "https://api-testnet.bybit.com";
const RECV_WINDOW: &str = "5000";

/// Bybit API client for the unified (V5) REST interface.
pub struct BybitClient {
    http: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl BybitClient {
    /// Create a new Bybit client from configuration.
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if config.testnet => TESTNET_BASE_URL.to_string(),
            None => MAINNET_BASE_URL.to_string(),
        };

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url,
        })
    }

    /// HMAC-SHA256 over `timestamp + api_key + recv_window + payload`.
    fn sign(&self, timestamp: &str, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(timestamp.as_bytes());
        mac.update(self.api_key.as_bytes());
        mac.update(RECV_WINDOW.as_bytes());
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn authenticate(&self, request: RequestBuilder, payload: &str) -> RequestBuilder {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, payload);

        request
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp)
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW)
            .header("X-BAPI-SIGN", signature)
    }

    fn query_string(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn get(&self, path: &str, params: &[(&str, String)], signed: bool) -> Result<ApiResponse> {
        let query = Self::query_string(params);
        let url = format!("{}{}?{}", self.base_url, path, query);

        let mut request = self.http.get(&url);
        if signed {
            request = self.authenticate(request, &query);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send GET {}", path))?;

        Self::decode(path, response).await
    }

    async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let payload = serde_json::to_string(body).context("Failed to encode request body")?;
        let url = format!("{}{}", self.base_url, path);

        let request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .body(payload.clone());

        let response = self
            .authenticate(request, &payload)
            .send()
            .await
            .with_context(|| format!("Failed to send POST {}", path))?;

        Self::decode(path, response).await
    }

    async fn decode(path: &str, response: Response) -> Result<ApiResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Bybit API error {} on {}: {}", status, path, body);
        }

        let envelope: ApiResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", path))?;

        debug!(
            path,
            ret_code = envelope.ret_code,
            ret_msg = %envelope.ret_msg,
            "Bybit response"
        );

        Ok(envelope)
    }
}

#[async_trait]
impl Exchange for BybitClient {
    #[instrument(skip(self))]
    async fn get_kline(
        &self,
        category: Category,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<ApiResponse> {
        let params = [
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get("/v5/market/kline", &params, false).await
    }

    #[instrument(skip(self))]
    async fn get_positions(&self, category: Category, symbol: &str) -> Result<ApiResponse> {
        let params = [
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
        ];
        self.get("/v5/position/list", &params, true).await
    }

    #[instrument(skip(self))]
    async fn get_tickers(&self, category: Category, symbol: &str) -> Result<ApiResponse> {
        let params = [
            ("category", category.to_string()),
            ("symbol", symbol.to_string()),
        ];
        self.get("/v5/market/tickers", &params, false).await
    }

    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = ?order.side))]
    async fn place_order(&self, order: &OrderIntent) -> Result<ApiResponse> {
        self.post("/v5/order/create", order).await
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    async fn cancel_order(&self, request: &CancelRequest) -> Result<ApiResponse> {
        self.post("/v5/order/cancel", request).await
    }
}
