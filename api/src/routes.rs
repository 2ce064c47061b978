//! HTTP route handlers for the strategy engine

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vortex_engine::config::StrategyConfig;
use vortex_engine::engine::StrategyEngine;
use vortex_engine::error::EngineError;

pub fn router(engine: Arc<StrategyEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/history", get(history))
        .route("/api/symbols", get(symbols))
        .route("/api/create_bot", post(create_bot))
        .route("/api/start_strategy", post(start_strategy))
        .route("/api/stop_bot", post(stop_bot))
        .route("/api/panic_sell", post(panic_sell))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

/// Engine errors rendered as `{"status": "error", "message": ...}` with a
/// matching status code.
struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::InvalidConfig(_)
            | EngineError::DuplicateSymbol(_)
            | EngineError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::ExchangeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "status": "error", "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

fn success() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

async fn health(State(engine): State<Arc<StrategyEngine>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "active_bots": engine.active_bot_count().await,
        "time": Utc::now().to_rfc3339(),
    }))
}

async fn dashboard(State(engine): State<Arc<StrategyEngine>>) -> impl IntoResponse {
    Json(engine.dashboard().await)
}

async fn history(State(engine): State<Arc<StrategyEngine>>) -> impl IntoResponse {
    Json(engine.full_history(100).await)
}

async fn symbols(
    State(engine): State<Arc<StrategyEngine>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(engine.symbols().await?))
}

#[derive(Deserialize)]
struct CreateBotRequest {
    symbol: String,
    /// Overrides the base order size when set
    investment: Option<f64>,
    dca_config: Option<StrategyConfig>,
}

async fn create_bot(
    State(engine): State<Arc<StrategyEngine>>,
    Json(request): Json<CreateBotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut config = request.dca_config.unwrap_or_default();
    if let Some(investment) = request.investment {
        config.base_order_size = investment;
    }
    engine.create_bot(&request.symbol, config).await?;
    Ok(success())
}

#[derive(Deserialize)]
struct StartStrategyRequest {
    symbol: String,
    amount: Option<f64>,
}

/// One-click start with the default DCA configuration.
async fn start_strategy(
    State(engine): State<Arc<StrategyEngine>>,
    Json(request): Json<StartStrategyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut config = StrategyConfig::default();
    if let Some(amount) = request.amount {
        config.base_order_size = amount;
    }
    engine.create_bot(&request.symbol, config).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Vortex strategy activated"
    })))
}

#[derive(Deserialize)]
struct SymbolRequest {
    symbol: String,
}

async fn stop_bot(
    State(engine): State<Arc<StrategyEngine>>,
    Json(request): Json<SymbolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    engine.stop_bot(&request.symbol).await?;
    Ok(success())
}

async fn panic_sell(
    State(engine): State<Arc<StrategyEngine>>,
    Json(request): Json<SymbolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    engine.panic_sell(&request.symbol).await?;
    Ok(success())
}
