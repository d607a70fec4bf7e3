use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Exchange Trait
// ---------------------------------------------------------------------------

/// Errors that can occur during exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected by exchange ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Exchange unavailable: {0}")]
    Unavailable(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ExchangeError {
    /// Short machine-readable label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Unauthorized(_) => "unauthorized",
            ExchangeError::NotFound(_) => "not_found",
            ExchangeError::Rejected { .. } => "rejected",
            ExchangeError::RateLimited(_) => "rate_limited",
            ExchangeError::Unavailable(_) => "unavailable",
            ExchangeError::Timeout => "timeout",
            ExchangeError::Decode(_) => "decode",
        }
    }
}

/// A custodial exchange account that can receive and send funds.
///
/// Implementations hold their own connection pool and are shared across
/// requests, so every method takes `&self`.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Exchange identifier, for logs.
    fn name(&self) -> &str;

    /// Deposit address for `token` on `network`.
    async fn fetch_deposit_address(
        &self,
        token: &str,
        network: &str,
    ) -> Result<DepositAddress, ExchangeError>;

    /// Submit a withdrawal.
    async fn withdraw(&self, request: &WithdrawRequest) -> Result<Withdrawal, ExchangeError>;

    /// Current balances of every asset in the account.
    async fn fetch_balance(&self) -> Result<BalanceSnapshot, ExchangeError>;

    /// Coins and networks supported by the exchange.
    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels() {
        let err = ExchangeError::Rejected {
            code: -4026,
            message: "Insufficient balance".to_string(),
        };
        assert_eq!(err.kind(), "rejected");
        assert_eq!(
            err.to_string(),
            "Rejected by exchange (-4026): Insufficient balance"
        );
        assert_eq!(ExchangeError::Timeout.kind(), "timeout");
    }
}
