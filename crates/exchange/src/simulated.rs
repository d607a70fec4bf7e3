use async_trait::async_trait;
use cexgate_core::*;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Exchange operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    DepositAddress,
    Withdraw,
    Balance,
    Currencies,
}

/// Failure to inject into a [`SimOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    Unauthorized,
    Unavailable,
    Timeout,
}

impl SimFault {
    fn to_error(self) -> ExchangeError {
        match self {
            SimFault::Unauthorized => ExchangeError::Unauthorized("simulated".to_string()),
            SimFault::Unavailable => ExchangeError::Unavailable("simulated".to_string()),
            SimFault::Timeout => ExchangeError::Timeout,
        }
    }
}

#[derive(Default)]
struct SimState {
    balances: BTreeMap<String, AssetBalance>,
    /// (token, network) → address.
    deposit_addresses: HashMap<(String, String), String>,
    currencies: Vec<Currency>,
    withdrawals: Vec<Withdrawal>,
    withdraw_calls: usize,
    faults: HashMap<SimOp, SimFault>,
}

/// An in-memory exchange account.
///
/// Withdrawals debit the free balance and are rejected the way a real
/// exchange would (insufficient funds, unsupported network). Faults can be
/// injected per operation to exercise upstream-failure handling.
pub struct SimulatedExchange {
    state: Mutex<SimState>,
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExchange {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
        }
    }

    /// A small account with BTC, ETH and USDT, for running the service locally.
    pub fn demo() -> Self {
        let btc = Decimal::new(5, 1);
        let eth = Decimal::new(4, 0);
        let usdt = Decimal::new(2_500, 0);
        Self::new()
            .with_balance("BTC", btc, Decimal::ZERO)
            .with_balance("ETH", eth, Decimal::ZERO)
            .with_balance("USDT", usdt, Decimal::new(100, 0))
            .with_deposit_address("BTC", "BTC", "bc1qsimulateddeposit0000000000000000000000")
            .with_deposit_address("ETH", "ETH", "0x000000000000000000000000000000000000dEaD")
            .with_deposit_address("USDT", "ETH", "0x000000000000000000000000000000000000dEaD")
            .with_currency(currency("BTC", "Bitcoin", &[("BTC", Decimal::new(5, 4))]))
            .with_currency(currency("ETH", "Ethereum", &[("ETH", Decimal::new(5, 3))]))
            .with_currency(currency(
                "USDT",
                "TetherUS",
                &[("ETH", Decimal::new(10, 0)), ("TRX", Decimal::ONE)],
            ))
    }

    pub fn with_balance(mut self, token: &str, free: Decimal, used: Decimal) -> Self {
        self.state
            .get_mut()
            .balances
            .insert(token.to_string(), AssetBalance::new(free, used));
        self
    }

    pub fn with_deposit_address(mut self, token: &str, network: &str, address: &str) -> Self {
        self.state
            .get_mut()
            .deposit_addresses
            .insert((token.to_string(), network.to_string()), address.to_string());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.state.get_mut().currencies.push(currency);
        self
    }

    /// Make `op` fail with `fault` until cleared.
    pub async fn set_fault(&self, op: SimOp, fault: SimFault) {
        self.state.lock().await.faults.insert(op, fault);
    }

    pub async fn clear_fault(&self, op: SimOp) {
        self.state.lock().await.faults.remove(&op);
    }

    /// Withdrawals accepted so far.
    pub async fn withdrawals(&self) -> Vec<Withdrawal> {
        self.state.lock().await.withdrawals.clone()
    }

    /// Number of times `withdraw` was called, accepted or not.
    pub async fn withdraw_calls(&self) -> usize {
        self.state.lock().await.withdraw_calls
    }
}

fn currency(coin: &str, name: &str, networks: &[(&str, Decimal)]) -> Currency {
    Currency {
        coin: coin.to_string(),
        name: name.to_string(),
        network_list: networks
            .iter()
            .map(|(network, fee)| NetworkInfo {
                network: network.to_string(),
                withdraw_fee: *fee,
                extra: serde_json::Map::new(),
            })
            .collect(),
        extra: serde_json::Map::new(),
    }
}

fn check_fault(state: &SimState, op: SimOp) -> Result<(), ExchangeError> {
    match state.faults.get(&op) {
        Some(fault) => Err(fault.to_error()),
        None => Ok(()),
    }
}

#[async_trait]
impl Exchange for SimulatedExchange {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn fetch_deposit_address(
        &self,
        token: &str,
        network: &str,
    ) -> Result<DepositAddress, ExchangeError> {
        let state = self.state.lock().await;
        check_fault(&state, SimOp::DepositAddress)?;

        let address = state
            .deposit_addresses
            .get(&(token.to_string(), network.to_string()))
            .cloned()
            .ok_or_else(|| {
                ExchangeError::NotFound(format!("No deposit address for {} on {}", token, network))
            })?;

        Ok(DepositAddress {
            token: token.to_string(),
            network: network.to_string(),
            address,
            tag: None,
        })
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<Withdrawal, ExchangeError> {
        let mut state = self.state.lock().await;
        state.withdraw_calls += 1;
        check_fault(&state, SimOp::Withdraw)?;

        if let Some(client_id) = &request.client_id {
            if let Some(existing) = state
                .withdrawals
                .iter()
                .find(|w| w.client_id.as_deref() == Some(client_id.as_str()))
            {
                return Ok(existing.clone());
            }
        }

        if request.amount <= Decimal::ZERO {
            return Err(ExchangeError::Rejected {
                code: -1102,
                message: "Amount must be greater than zero".to_string(),
            });
        }

        if let Some(currency) = state.currencies.iter().find(|c| c.coin == request.token) {
            if !currency
                .network_list
                .iter()
                .any(|n| n.network == request.network)
            {
                return Err(ExchangeError::Rejected {
                    code: -4019,
                    message: format!(
                        "Network {} not supported for {}",
                        request.network, request.token
                    ),
                });
            }
        }

        let balance = state
            .balances
            .get_mut(&request.token)
            .filter(|b| b.free >= request.amount)
            .ok_or_else(|| ExchangeError::Rejected {
                code: -4026,
                message: "User has insufficient balance".to_string(),
            })?;
        balance.free -= request.amount;
        balance.total -= request.amount;

        let id = Uuid::new_v4().simple().to_string();
        let withdrawal = Withdrawal {
            id: id.clone(),
            token: request.token.clone(),
            network: request.network.clone(),
            address: request.address.clone(),
            amount: request.amount,
            client_id: request.client_id.clone(),
            info: serde_json::json!({ "id": id }),
        };
        state.withdrawals.push(withdrawal.clone());

        info!(
            id = %withdrawal.id,
            token = %withdrawal.token,
            amount = %withdrawal.amount,
            "Simulated withdrawal accepted"
        );

        Ok(withdrawal)
    }

    async fn fetch_balance(&self) -> Result<BalanceSnapshot, ExchangeError> {
        let state = self.state.lock().await;
        check_fault(&state, SimOp::Balance)?;

        Ok(BalanceSnapshot::from_assets(
            serde_json::json!({}),
            Some(Utc::now()),
            state.balances.iter().map(|(k, v)| (k.clone(), *v)),
        ))
    }

    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        let state = self.state.lock().await;
        check_fault(&state, SimOp::Currencies)?;
        Ok(state.currencies.clone())
    }
}
