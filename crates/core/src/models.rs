use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Account Directory
// ---------------------------------------------------------------------------

/// A named withdrawal destination (e.g. "cold-storage" → bc1q...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub name: String,
    pub address: String,
}

// ---------------------------------------------------------------------------
// Deposits & Withdrawals
// ---------------------------------------------------------------------------

/// A deposit address for one token on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAddress {
    pub token: String,
    pub network: String,
    pub address: String,
    /// Memo / destination tag for networks that need one (XRP, XLM, ...).
    pub tag: Option<String>,
}

/// A withdrawal to be submitted to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub token: String,
    pub amount: Decimal,
    pub address: String,
    pub network: String,
    /// Caller-chosen identifier forwarded to the exchange so a retried
    /// request can be matched to the original submission.
    pub client_id: Option<String>,
}

impl WithdrawRequest {
    pub fn new(token: &str, amount: Decimal, address: &str, network: &str) -> Self {
        Self {
            token: token.to_string(),
            amount,
            address: address.to_string(),
            network: network.to_string(),
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

/// A withdrawal accepted by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Exchange-assigned withdrawal ID.
    pub id: String,
    pub token: String,
    pub network: String,
    pub address: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Raw exchange response.
    #[serde(default)]
    pub info: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Free / used / total amounts of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub free: Decimal,
    pub used: Decimal,
    pub total: Decimal,
}

impl AssetBalance {
    /// Build from free and locked amounts; `total` is their sum.
    pub fn new(free: Decimal, used: Decimal) -> Self {
        Self {
            free,
            used,
            total: free + used,
        }
    }
}

/// Account balances, laid out column-wise: one map per `free` / `used` /
/// `total`, each keyed by asset code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Raw exchange response.
    #[serde(default)]
    pub info: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    /// ISO-8601 rendering of `timestamp`.
    pub datetime: Option<String>,
    pub free: BTreeMap<String, Decimal>,
    pub used: BTreeMap<String, Decimal>,
    pub total: BTreeMap<String, Decimal>,
    /// Borrowed amounts; empty for spot accounts.
    #[serde(default)]
    pub debt: BTreeMap<String, Decimal>,
}

impl BalanceSnapshot {
    pub fn from_assets<I>(
        info: serde_json::Value,
        updated_at: Option<DateTime<Utc>>,
        assets: I,
    ) -> Self
    where
        I: IntoIterator<Item = (String, AssetBalance)>,
    {
        let mut free = BTreeMap::new();
        let mut used = BTreeMap::new();
        let mut total = BTreeMap::new();
        for (code, balance) in assets {
            free.insert(code.clone(), balance.free);
            used.insert(code.clone(), balance.used);
            total.insert(code, balance.total);
        }

        Self {
            info,
            timestamp: updated_at.map(|t| t.timestamp_millis()),
            datetime: updated_at.map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            free,
            used,
            total,
            debt: BTreeMap::new(),
        }
    }

    /// Balance of one asset, or `None` if the snapshot does not mention it.
    pub fn asset(&self, code: &str) -> Option<AssetBalance> {
        if !self.free.contains_key(code)
            && !self.used.contains_key(code)
            && !self.total.contains_key(code)
        {
            return None;
        }

        let get = |m: &BTreeMap<String, Decimal>| m.get(code).copied().unwrap_or(Decimal::ZERO);
        Some(AssetBalance {
            free: get(&self.free),
            used: get(&self.used),
            total: get(&self.total),
        })
    }

    /// Free amount of an asset; zero when the asset is absent.
    pub fn free_of(&self, code: &str) -> Decimal {
        self.free.get(code).copied().unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Currency Metadata
// ---------------------------------------------------------------------------

/// A network a coin can be moved over, with its withdrawal fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub network: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub withdraw_fee: Decimal,
    /// Any other fields the exchange reports, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A coin and the networks it supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub coin: String,
    pub name: String,
    #[serde(default)]
    pub network_list: Vec<NetworkInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_columns() {
        let at = Utc.timestamp_millis_opt(1499280391811).unwrap();
        let snapshot = BalanceSnapshot::from_assets(
            serde_json::json!({}),
            Some(at),
            vec![
                ("BTC".to_string(), AssetBalance::new(dec!(321), dec!(234))),
                ("USD".to_string(), AssetBalance::new(dec!(123), dec!(456))),
            ],
        );

        assert_eq!(snapshot.timestamp, Some(1499280391811));
        assert_eq!(snapshot.datetime.as_deref(), Some("2017-07-05T18:46:31.811Z"));
        assert_eq!(snapshot.total["BTC"], dec!(555));
        assert_eq!(snapshot.total["USD"], dec!(579));
        assert!(snapshot.debt.is_empty());

        let json = serde_json::to_value(&snapshot).unwrap();
        for column in ["info", "free", "used", "total", "debt"] {
            assert!(json[column].is_object(), "missing column {column}");
        }
    }

    #[test]
    fn test_amounts_serialize_without_rounding() {
        let balance = AssetBalance::new(dec!(12345678901.12345678), dec!(0));
        assert_eq!(
            serde_json::to_string(&balance).unwrap(),
            r#"{"free":12345678901.12345678,"used":0,"total":12345678901.12345678}"#
        );

        let whole = AssetBalance::new(dec!(321), dec!(234));
        assert_eq!(
            serde_json::to_value(whole).unwrap(),
            serde_json::json!({ "free": 321, "used": 234, "total": 555 })
        );
    }

    #[test]
    fn test_asset_lookup() {
        let snapshot = BalanceSnapshot::from_assets(
            serde_json::Value::Null,
            None,
            vec![("ETH".to_string(), AssetBalance::new(dec!(1.5), dec!(0)))],
        );

        let eth = snapshot.asset("ETH").unwrap();
        assert_eq!(eth.free, dec!(1.5));
        assert_eq!(eth.total, dec!(1.5));
        assert!(snapshot.asset("BTC").is_none());
        assert_eq!(snapshot.free_of("BTC"), Decimal::ZERO);
    }

    #[test]
    fn test_currency_passthrough() {
        let raw = serde_json::json!({
            "coin": "BTC",
            "name": "Bitcoin",
            "free": "0",
            "networkList": [
                { "network": "BTC", "withdrawFee": "0.00050000", "withdrawEnable": true },
                { "network": "BNB", "withdrawFee": "0.00000220" }
            ]
        });

        let currency: Currency = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(currency.network_list.len(), 2);
        assert_eq!(currency.network_list[0].withdraw_fee, dec!(0.0005));
        assert_eq!(serde_json::to_value(&currency).unwrap(), raw);
    }
}
