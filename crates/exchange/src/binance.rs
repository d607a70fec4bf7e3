use async_trait::async_trait;
use cexgate_core::*;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Configuration for the Binance.US REST client.
#[derive(Clone)]
pub struct BinanceConfig {
    pub api_key: String,
    pub api_secret: String,
    /// REST base URL (no trailing slash).
    pub base_url: String,
    /// How long a signed request stays valid on the exchange side.
    pub recv_window_ms: u64,
    /// Client-side timeout for a single HTTP round trip.
    pub request_timeout_secs: u64,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: "https://api.binance.us".to_string(),
            recv_window_ms: 5_000,
            request_timeout_secs: 10,
        }
    }
}

/// Binance.US exchange client.
///
/// Every endpoint used here is a signed `USER_DATA` endpoint: parameters go
/// in the query string together with `timestamp` and `recvWindow`, and the
/// HMAC-SHA256 of that query string is appended as `signature`.
pub struct BinanceClient {
    config: BinanceConfig,
    http: reqwest::Client,
}

impl BinanceClient {
    pub fn new(config: BinanceConfig) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Unavailable(format!("HTTP client build failed: {}", e)))?;
        Ok(Self { config, http })
    }

    /// Send a signed request and return the raw JSON body.
    async fn signed(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ExchangeError> {
        let mut url = Url::parse(&format!("{}{}", self.config.base_url, path))
            .map_err(|e| ExchangeError::Unavailable(format!("Invalid URL: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("recvWindow", &self.config.recv_window_ms.to_string());
            query.append_pair("timestamp", &Utc::now().timestamp_millis().to_string());
        }
        let signature = sign(&self.config.api_secret, url.query().unwrap_or_default());
        url.query_pairs_mut().append_pair("signature", &signature);

        debug!(method = %method, path = %path, "Binance request");

        let response = self
            .http
            .request(method, url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }
}

/// Hex-encoded HMAC-SHA256 of `payload` keyed with the API secret.
pub(crate) fn sign(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn transport_error(e: reqwest::Error) -> ExchangeError {
    if e.is_timeout() {
        ExchangeError::Timeout
    } else {
        ExchangeError::Unavailable(e.to_string())
    }
}

/// Binance error body: `{"code": -2015, "msg": "Invalid API-key, IP, or permissions for action."}`
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

fn status_error(status: StatusCode, body: &str) -> ExchangeError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.msg.clone())
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExchangeError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::IM_A_TEAPOT => {
            ExchangeError::RateLimited(message)
        }
        StatusCode::NOT_FOUND => ExchangeError::NotFound(message),
        s if s.is_server_error() => ExchangeError::Unavailable(message),
        s => match parsed {
            Some(b) => ExchangeError::Rejected {
                code: b.code,
                message: b.msg,
            },
            None => ExchangeError::Rejected {
                code: i64::from(s.as_u16()),
                message,
            },
        },
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| ExchangeError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDepositAddress {
    address: String,
    #[serde(default)]
    tag: String,
}

#[derive(Debug, Deserialize)]
struct RawWithdrawal {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccount {
    update_time: Option<i64>,
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    free: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    locked: Decimal,
}

#[async_trait]
impl Exchange for BinanceClient {
    fn name(&self) -> &str {
        "binanceus"
    }

    async fn fetch_deposit_address(
        &self,
        token: &str,
        network: &str,
    ) -> Result<DepositAddress, ExchangeError> {
        let params = [("coin", token.to_string()), ("network", network.to_string())];
        let value = self
            .signed(Method::GET, "/sapi/v1/capital/deposit/address", &params)
            .await?;
        let raw: RawDepositAddress = decode(value)?;

        if raw.address.is_empty() {
            return Err(ExchangeError::NotFound(format!(
                "No deposit address for {} on {}",
                token, network
            )));
        }

        Ok(DepositAddress {
            token: token.to_string(),
            network: network.to_string(),
            address: raw.address,
            tag: Some(raw.tag).filter(|t| !t.is_empty()),
        })
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<Withdrawal, ExchangeError> {
        let mut params = vec![
            ("coin", request.token.clone()),
            ("network", request.network.clone()),
            ("address", request.address.clone()),
            ("amount", request.amount.normalize().to_string()),
        ];
        if let Some(client_id) = &request.client_id {
            params.push(("withdrawOrderId", client_id.clone()));
        }

        let value = self
            .signed(Method::POST, "/sapi/v1/capital/withdraw/apply", &params)
            .await?;
        let raw: RawWithdrawal = decode(value.clone())?;

        Ok(Withdrawal {
            id: raw.id,
            token: request.token.clone(),
            network: request.network.clone(),
            address: request.address.clone(),
            amount: request.amount,
            client_id: request.client_id.clone(),
            info: value,
        })
    }

    async fn fetch_balance(&self) -> Result<BalanceSnapshot, ExchangeError> {
        let value = self.signed(Method::GET, "/api/v3/account", &[]).await?;
        let raw: RawAccount = decode(value.clone())?;

        let updated_at = raw
            .update_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        let assets = raw
            .balances
            .into_iter()
            .map(|b| (b.asset, AssetBalance::new(b.free, b.locked)));

        Ok(BalanceSnapshot::from_assets(value, updated_at, assets))
    }

    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        let value = self
            .signed(Method::GET, "/sapi/v1/capital/config/getall", &[])
            .await?;
        decode(value)
    }
}
