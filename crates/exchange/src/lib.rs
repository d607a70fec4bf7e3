//! Exchange clients.
//!
//! `BinanceClient` talks to the Binance.US REST API; `SimulatedExchange`
//! keeps an in-memory account for local runs and tests.

pub mod binance;
pub mod simulated;

pub use binance::{BinanceClient, BinanceConfig};
pub use simulated::{SimFault, SimOp, SimulatedExchange};
