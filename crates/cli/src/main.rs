use anyhow::{Context, Result};
use cexgate_api::accounts::AccountDirectory;
use cexgate_api::ServerConfig;
use cexgate_core::Exchange;
use cexgate_exchange::{BinanceClient, BinanceConfig, SimulatedExchange};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cexgate")]
#[command(about = "HTTP facade for deposits, withdrawals and balances on an exchange account")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExchangeKind {
    Binance,
    Simulated,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Server {
        /// Bind address
        #[arg(short, long, env = "CEXGATE_BIND", default_value = "0.0.0.0:8000")]
        bind: String,

        /// Account alias file (TOML, `[[accounts]]` with `name` and `address`)
        #[arg(long, env = "CEXGATE_ACCOUNTS_FILE", default_value = "accounts.toml")]
        accounts_file: PathBuf,

        /// Exchange backend
        #[arg(long, value_enum, default_value = "binance")]
        exchange: ExchangeKind,

        /// Binance API key
        #[arg(long, env = "BINANCE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Binance API secret
        #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
        api_secret: Option<String>,

        /// Binance REST base URL
        #[arg(long, env = "BINANCE_BASE_URL", default_value = "https://api.binance.us")]
        base_url: String,

        /// Skip the free-balance check before alias withdrawals
        #[arg(long)]
        no_balance_check: bool,

        /// Timeout for a single exchange call, in seconds
        #[arg(long, default_value = "10")]
        request_timeout_secs: u64,

        /// Validity window for signed exchange requests, in milliseconds
        #[arg(long, default_value = "5000")]
        recv_window_ms: u64,
    },

    /// List the account aliases in the alias file
    Accounts {
        #[arg(long, env = "CEXGATE_ACCOUNTS_FILE", default_value = "accounts.toml")]
        accounts_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may come from a local .env file.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.log_json {
        fmt().json().with_env_filter(filter).with_target(false).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    match cli.command {
        Commands::Server {
            bind,
            accounts_file,
            exchange,
            api_key,
            api_secret,
            base_url,
            no_balance_check,
            request_timeout_secs,
            recv_window_ms,
        } => {
            let exchange: Arc<dyn Exchange> = match exchange {
                ExchangeKind::Binance => {
                    let config = BinanceConfig {
                        api_key: api_key.context("BINANCE_API_KEY is not set")?,
                        api_secret: api_secret.context("BINANCE_API_SECRET is not set")?,
                        base_url,
                        recv_window_ms,
                        request_timeout_secs,
                    };
                    Arc::new(BinanceClient::new(config)?)
                }
                ExchangeKind::Simulated => {
                    tracing::warn!("Using the simulated exchange; no real funds move");
                    Arc::new(SimulatedExchange::demo())
                }
            };

            let config = ServerConfig {
                accounts_file,
                balance_check: !no_balance_check,
                request_timeout: router_timeout(request_timeout_secs),
            };
            cexgate_api::start_server(exchange, config, &bind).await?;
        }
        Commands::Accounts { accounts_file } => {
            let directory = AccountDirectory::new(accounts_file);
            let accounts = directory
                .load()
                .await
                .with_context(|| format!("Reading {}", directory.path().display()))?;

            if accounts.is_empty() {
                println!("No accounts defined in {}", directory.path().display());
            } else {
                println!("Accounts in {}:", directory.path().display());
                for account in accounts {
                    println!("  {:<20} {}", account.name, account.address);
                }
            }
        }
    }

    Ok(())
}

/// Time allowed for one HTTP request: room for the balance check plus the
/// withdrawal call, each bounded by the exchange timeout.
fn router_timeout(request_timeout_secs: u64) -> Duration {
    Duration::from_secs(request_timeout_secs.saturating_mul(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_router_timeout() {
        assert_eq!(router_timeout(10), Duration::from_secs(30));
        assert_eq!(router_timeout(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_server_defaults() {
        let cli = Cli::try_parse_from(["cexgate", "server", "--exchange", "simulated"]).unwrap();
        match cli.command {
            Commands::Server {
                exchange,
                no_balance_check,
                request_timeout_secs,
                ..
            } => {
                assert_eq!(exchange, ExchangeKind::Simulated);
                assert!(!no_balance_check);
                assert_eq!(request_timeout_secs, 10);
            }
            _ => panic!("expected server command"),
        }
    }
}
