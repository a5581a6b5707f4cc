// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::research::aggregator::AdapterStatus;
use crate::research::{get_summary, Aggregator, ResearchError, ResearchRequest, ResearchResult};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sources", get(sources))
        .route("/research", post(research))
        .route("/research/last", get(last_result))
        .route("/research/last/summary", get(last_summary))
        .route("/research/summary", post(summarize))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON error body with a status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }
}

impl From<ResearchError> for ApiError {
    fn from(e: ResearchError) -> Self {
        let status = match e {
            ResearchError::EmptyCompanyName => StatusCode::BAD_REQUEST,
            ResearchError::AdapterCancelled { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn sources(State(state): State<AppState>) -> Json<Vec<AdapterStatus>> {
    Json(state.aggregator.adapters_status())
}

async fn research(
    State(state): State<AppState>,
    Json(req): Json<ResearchRequest>,
) -> Result<Json<ResearchResult>, ApiError> {
    let result = state.aggregator.research(req).await.map_err(|e| {
        tracing::error!(target: "research", error = %e, "research request failed");
        ApiError::from(e)
    })?;
    Ok(Json(result))
}

async fn last_result(State(state): State<AppState>) -> Result<Json<ResearchResult>, ApiError> {
    state
        .aggregator
        .last_result()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no research has run yet"))
}

async fn last_summary(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .aggregator
        .last_result()
        .map(|r| get_summary(&r))
        .ok_or_else(|| ApiError::not_found("no research has run yet"))
}

async fn summarize(Json(result): Json<ResearchResult>) -> String {
    get_summary(&result)
}
