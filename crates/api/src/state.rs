use crate::accounts::AccountDirectory;
use crate::ServerConfig;
use cexgate_core::Exchange;
use std::sync::Arc;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    /// Long-lived exchange handle; its connection pool is shared by all requests.
    pub exchange: Arc<dyn Exchange>,
    pub accounts: AccountDirectory,
    pub balance_check: bool,
}

impl AppState {
    pub fn new(exchange: Arc<dyn Exchange>, config: &ServerConfig) -> Self {
        Self {
            exchange,
            accounts: AccountDirectory::new(&config.accounts_file),
            balance_check: config.balance_check,
        }
    }
}
