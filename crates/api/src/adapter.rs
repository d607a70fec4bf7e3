//! Calls into the exchange that never fail.
//!
//! Every upstream error is logged with its kind and collapsed to `None`, so
//! handlers can answer with a `null` field instead of an error status.

use cexgate_core::*;
use rust_decimal::Decimal;
use tracing::error;

pub async fn fetch_deposit_address(
    exchange: &dyn Exchange,
    network: &str,
    token: &str,
) -> Option<String> {
    match exchange.fetch_deposit_address(token, network).await {
        Ok(deposit) => Some(deposit.address),
        Err(e) => {
            error!(
                exchange = exchange.name(),
                token = %token,
                network = %network,
                kind = e.kind(),
                "Error fetching deposit address: {}",
                e
            );
            None
        }
    }
}

pub async fn withdraw_to_network(
    exchange: &dyn Exchange,
    token: &str,
    amount: Decimal,
    address: &str,
    network: &str,
    client_id: Option<String>,
) -> Option<Withdrawal> {
    let mut request = WithdrawRequest::new(token, amount, address, network);
    request.client_id = client_id;

    match exchange.withdraw(&request).await {
        Ok(withdrawal) => {
            tracing::info!(
                id = %withdrawal.id,
                token = %token,
                amount = %amount,
                network = %network,
                "Withdrawal submitted"
            );
            Some(withdrawal)
        }
        Err(e) => {
            error!(
                exchange = exchange.name(),
                token = %token,
                kind = e.kind(),
                "Error withdrawing to {}: {}",
                network,
                e
            );
            None
        }
    }
}

pub async fn fetch_balance(exchange: &dyn Exchange) -> Option<BalanceSnapshot> {
    exchange
        .fetch_balance()
        .await
        .map_err(|e| {
            error!(exchange = exchange.name(), kind = e.kind(), "Error fetching balance: {}", e);
        })
        .ok()
}

pub async fn fetch_currencies(exchange: &dyn Exchange) -> Option<Vec<Currency>> {
    exchange
        .fetch_currencies()
        .await
        .map_err(|e| {
            error!(exchange = exchange.name(), kind = e.kind(), "Error fetching currencies: {}", e);
        })
        .ok()
}
