use crate::adapter;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, warn};

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/deposit-address", get(deposit_address))
        .route("/withdraw", get(withdraw))
        .route("/balance", get(balance))
        .route("/currencies", get(currencies))
}

/// Domain-level failure: reported in the body, with a 200 status.
fn error_body(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "error": message.into() }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DepositAddressParams {
    token: String,
    network: String,
}

async fn deposit_address(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DepositAddressParams>,
) -> Json<Value> {
    let address =
        adapter::fetch_deposit_address(state.exchange.as_ref(), &params.network, &params.token)
            .await;
    Json(json!({ "address": address }))
}

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WithdrawParams {
    token: String,
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
    network: String,
    address: Option<String>,
    account_name: Option<String>,
    /// Forwarded to the exchange as the withdrawal's client order ID.
    client_id: Option<String>,
}

async fn withdraw(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WithdrawParams>,
) -> Json<Value> {
    if params.amount < Decimal::ZERO {
        return error_body("Amount must be non-negative");
    }

    let address = match (params.address, params.account_name) {
        (Some(_), Some(_)) => {
            return error_body("Provide either 'address' or 'account_name', not both");
        }
        (None, None) => return error_body("Either 'address' or 'account_name' is required"),
        (Some(address), None) => address,
        (None, Some(name)) => {
            let address = match state.accounts.resolve_address(&name).await {
                Ok(Some(address)) => address,
                Ok(None) => return error_body(format!("Account '{}' not found", name)),
                Err(e) => {
                    error!(
                        path = %state.accounts.path().display(),
                        "Account directory unavailable: {}",
                        e
                    );
                    return error_body("Account directory unavailable");
                }
            };

            // Advisory only: nothing holds the funds between this check and
            // the withdrawal call.
            if state.balance_check {
                match adapter::fetch_balance(state.exchange.as_ref()).await {
                    Some(snapshot) if snapshot.free_of(&params.token) < params.amount => {
                        warn!(
                            account = %name,
                            token = %params.token,
                            amount = %params.amount,
                            free = %snapshot.free_of(&params.token),
                            "Withdrawal refused: insufficient balance"
                        );
                        return error_body(format!("Insufficient balance for {}", params.token));
                    }
                    Some(_) => {}
                    None => {
                        return error_body(format!(
                            "Unable to verify balance for {}",
                            params.token
                        ));
                    }
                }
            }

            address
        }
    };

    let withdrawal = adapter::withdraw_to_network(
        state.exchange.as_ref(),
        &params.token,
        params.amount,
        &address,
        &params.network,
        params.client_id,
    )
    .await;
    Json(json!({ "withdrawal": withdrawal }))
}

// ---------------------------------------------------------------------------
// Balances & Currencies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BalanceParams {
    token: Option<String>,
}

async fn balance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BalanceParams>,
) -> Json<Value> {
    let snapshot = adapter::fetch_balance(state.exchange.as_ref()).await;

    match (snapshot, params.token) {
        (Some(snapshot), Some(token)) => match snapshot.asset(&token) {
            Some(asset) => Json(json!({ "balance": asset })),
            None => error_body(format!("Balance for {} not found", token)),
        },
        (snapshot, _) => Json(json!({ "balance": snapshot })),
    }
}

async fn currencies(State(state): State<Arc<AppState>>) -> Json<Value> {
    let currencies = adapter::fetch_currencies(state.exchange.as_ref()).await;
    Json(json!({ "currencies": currencies }))
}
