pub mod accounts;
pub mod adapter;
pub mod routes;
pub mod state;

use axum::http::StatusCode;
use axum::Router;
use cexgate_core::Exchange;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Server-side settings that shape request handling.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TOML file mapping account aliases to withdrawal addresses.
    pub accounts_file: PathBuf,
    /// Refuse alias withdrawals whose amount exceeds the free balance.
    pub balance_check: bool,
    /// Upper bound on the time spent handling one request.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            accounts_file: PathBuf::from("accounts.toml"),
            balance_check: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Build the Axum application router.
pub fn build_router(exchange: Arc<dyn Exchange>, config: &ServerConfig) -> Router {
    let app_state = Arc::new(state::AppState::new(exchange, config));

    Router::new()
        .merge(routes::api_routes())
        .layer(timeout_layer(config.request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Requests running past `timeout` are answered with `408 Request Timeout`.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Start the API server.
pub async fn start_server(
    exchange: Arc<dyn Exchange>,
    config: ServerConfig,
    bind_addr: &str,
) -> anyhow::Result<()> {
    let app = build_router(exchange.clone(), &config);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(
        exchange = exchange.name(),
        accounts_file = %config.accounts_file.display(),
        balance_check = config.balance_check,
        "API server listening on {}",
        bind_addr
    );
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let app: Router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }))
            .layer(timeout_layer(Duration::from_millis(20)));

        let slow = app
            .clone()
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(slow.status(), StatusCode::REQUEST_TIMEOUT);

        let fast = app
            .oneshot(Request::builder().uri("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(fast.status(), StatusCode::OK);
    }
}
