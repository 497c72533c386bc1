//! HTTP surface using axum.
//!
//! - `GET /health`: liveness
//! - `GET /buy-the-dips?targetN=<n>`: run one evaluation

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::config::SessionConfig;
use crate::error::{BotError, BotResult};
use crate::exchange::BybitClient;
use crate::risk::InstrumentGate;
use crate::strategy::{Decision, Orchestrator, Stage, StageError};

/// Candle window used when `targetN` is absent or unusable.
pub const DEFAULT_TARGET_N: usize = 2;

/// Builds the request-scoped orchestrator.
pub trait SessionSource: Send + Sync {
    fn open(&self) -> BotResult<Orchestrator>;
}

/// Reads settings from the environment on every request and talks to Bybit.
pub struct EnvSessionSource;

impl SessionSource for EnvSessionSource {
    fn open(&self) -> BotResult<Orchestrator> {
        let session = SessionConfig::load()?;
        let client = BybitClient::new(&session.exchange)
            .map_err(|e| BotError::Configuration(format!("{:#}", e)))?;
        Ok(Orchestrator::new(session, Arc::new(client)))
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn SessionSource>,
    gate: InstrumentGate,
}

impl AppState {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        Self {
            source,
            gate: InstrumentGate::new(),
        }
    }

    pub fn gate(&self) -> &InstrumentGate {
        &self.gate
    }
}

/// JSON body of every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DipQuery {
    #[serde(rename = "targetN")]
    target_n: Option<String>,
}

type Reply = (StatusCode, Json<MessageBody>);

fn reply(status: StatusCode, message: impl Into<String>) -> Reply {
    (
        status,
        Json(MessageBody {
            message: message.into(),
        }),
    )
}

/// Candle window from the query; falls back to [`DEFAULT_TARGET_N`].
pub fn parse_target_n(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_TARGET_N)
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/buy-the-dips", get(buy_the_dips))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health() -> Reply {
    reply(StatusCode::OK, "OK")
}

async fn buy_the_dips(State(state): State<AppState>, Query(query): Query<DipQuery>) -> Reply {
    let target_n = parse_target_n(query.target_n.as_deref());

    let orchestrator = match state.source.open() {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            let err = StageError::new(Stage::GetArgs, e);
            error!(error = %err, "Session setup failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };

    let session = orchestrator.session();
    let key = format!("{}:{}", session.category, session.symbol);
    let Some(_guard) = state.gate.try_acquire(&key) else {
        warn!(%key, "Rejecting overlapping evaluation");
        return reply(
            StatusCode::CONFLICT,
            format!("evaluation already in progress for {}", session.symbol),
        );
    };

    match orchestrator.evaluate(target_n).await {
        Ok(Decision::Entered(_)) => reply(StatusCode::OK, "buy the dips"),
        Ok(Decision::Exited(_)) => reply(StatusCode::OK, "exit the position"),
        Ok(Decision::NoDip) => reply(StatusCode::NO_CONTENT, "not dip"),
        Err(e) => {
            error!(stage = %e.stage, kind = e.source.kind(), error = %e, "Evaluation failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_settings;
    use crate::config::Settings;
    use crate::exchange::{MockExchange, RET_CODE_ORDER_NOT_EXISTS};
    use crate::test_support::{candle_row, envelope, ok, position_row, ticker_row, NOW};
    use axum::body::Body;
    use axum::http::Request;
    use parking_lot::Mutex;
    use serde_json::json;
    use tower::ServiceExt;

    fn fixed_clock() -> i64 {
        NOW
    }

    /// Validates the given settings per request and hands out a prepared mock.
    struct TestSource {
        settings: Settings,
        exchange: Mutex<Option<MockExchange>>,
    }

    impl TestSource {
        fn new(settings: Settings, exchange: MockExchange) -> Arc<Self> {
            Arc::new(Self {
                settings,
                exchange: Mutex::new(Some(exchange)),
            })
        }
    }

    impl SessionSource for TestSource {
        fn open(&self) -> BotResult<Orchestrator> {
            let session = SessionConfig::from_settings(&self.settings)?;
            let exchange = self.exchange.lock().take().unwrap_or_default();
            Ok(Orchestrator::new(session, Arc::new(exchange)).with_clock(fixed_clock))
        }
    }

    async fn call(state: AppState, uri: &str) -> (StatusCode, Option<MessageBody>) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).ok())
    }

    fn exchange_with(closes: [&'static str; 2], positions: serde_json::Value) -> MockExchange {
        let mut exchange = MockExchange::new();
        exchange
            .expect_cancel_order()
            .returning(|_| Ok(envelope(RET_CODE_ORDER_NOT_EXISTS, json!({}), NOW)));
        exchange.expect_get_kline().returning(move |_, _, _, _| {
            Ok(ok(json!({"list": [
                candle_row(NOW - 60_000, closes[0]),
                candle_row(NOW - 120_000, closes[1]),
            ]})))
        });
        exchange
            .expect_get_positions()
            .returning(move |_, _| Ok(ok(json!({ "list": positions.clone() }))));
        exchange.expect_get_tickers().returning(|_, _| {
            Ok(ok(json!({"list": [ticker_row("BTCUSDT", "98", "98.1")]})))
        });
        exchange
    }

    fn settings_with_threshold(threshold: &str) -> Settings {
        Settings {
            dips_ratio: Some(threshold.to_string()),
            ..valid_settings()
        }
    }

    #[test]
    fn test_parse_target_n() {
        assert_eq!(parse_target_n(None), 2);
        assert_eq!(parse_target_n(Some("5")), 5);
        assert_eq!(parse_target_n(Some("0")), 2);
        assert_eq!(parse_target_n(Some("-3")), 2);
        assert_eq!(parse_target_n(Some("abc")), 2);
    }

    #[tokio::test]
    async fn test_health() {
        let state = AppState::new(TestSource::new(valid_settings(), MockExchange::new()));
        let (status, body) = call(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap().message, "OK");
    }

    #[tokio::test]
    async fn test_rise_is_not_dip() {
        // newest 100, oldest 98: ratio +0.0204
        let exchange = exchange_with(["100", "98"], json!([]));
        let state = AppState::new(TestSource::new(settings_with_threshold("-0.01"), exchange));

        let (status, _) = call(state, "/buy-the-dips?targetN=2").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_dip_buys() {
        let mut exchange = exchange_with(["98", "100"], json!([]));
        exchange
            .expect_place_order()
            .times(1)
            .returning(|_| Ok(ok(json!({"orderId": "1"}))));
        let state = AppState::new(TestSource::new(settings_with_threshold("-0.01"), exchange));

        let (status, body) = call(state, "/buy-the-dips").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap().message, "buy the dips");
    }

    #[tokio::test]
    async fn test_recent_position_exits() {
        let mut exchange = exchange_with(["98", "100"], json!([position_row("0.5", NOW - 1_000)]));
        exchange
            .expect_place_order()
            .withf(|order| order.reduce_only == Some(true))
            .times(1)
            .returning(|_| Ok(ok(json!({}))));
        let state = AppState::new(TestSource::new(valid_settings(), exchange));

        let (status, body) = call(state, "/buy-the-dips").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap().message, "exit the position");
    }

    #[tokio::test]
    async fn test_missing_configuration_fails_before_exchange() {
        let mut settings = valid_settings();
        settings.symbol = None;
        // no expectations: any exchange call would panic
        let state = AppState::new(TestSource::new(settings, MockExchange::new()));

        let (status, body) = call(state, "/buy-the-dips").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.unwrap().message, "failed to get args, SYMBOL is required");
    }

    #[tokio::test]
    async fn test_stage_failure_is_500() {
        let mut exchange = MockExchange::new();
        exchange
            .expect_cancel_order()
            .returning(|_| Ok(ok(json!({}))));
        exchange
            .expect_get_kline()
            .returning(|_, _, _, _| Err(anyhow::anyhow!("timed out")));
        let state = AppState::new(TestSource::new(valid_settings(), exchange));

        let (status, body) = call(state, "/buy-the-dips").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.unwrap().message.starts_with("failed to get ohlcv, "));
    }

    #[tokio::test]
    async fn test_overlapping_evaluation_is_rejected() {
        let state = AppState::new(TestSource::new(valid_settings(), MockExchange::new()));
        let _held = state.gate().try_acquire("linear:BTCUSDT").unwrap();

        let (status, body) = call(state.clone(), "/buy-the-dips").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body.unwrap().message,
            "evaluation already in progress for BTCUSDT"
        );
    }
}
