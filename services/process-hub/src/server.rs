//! HTTP Surface
//!
//! Axum router exposing the aggregated listing.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::aggregator::ProcessAggregator;
use crate::types::error_chain;

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<ProcessAggregator>,
}

impl AppState {
    pub fn new(aggregator: Arc<ProcessAggregator>) -> Self {
        Self { aggregator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/processes", get(list_processes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "process-hub",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.aggregator.registry().len()
    }))
}

async fn list_processes(State(state): State<AppState>) -> Response {
    match state.aggregator.all_processes().await {
        Ok(list) => Json(list).into_response(),
        Err(e) => {
            error!("Process listing failed: {}", error_chain(&e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
