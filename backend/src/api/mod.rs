pub mod quote_api;
pub mod swap_api;
pub mod tokens_api;

pub use quote_api::{create_quote_router, create_route_router};
pub use swap_api::create_swap_router;
pub use tokens_api::create_tokens_router;

use axum::{
    extract::{rejection::QueryRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::aggregator::SwapAggregator;
use crate::dexes::DexError;
use crate::types::ErrorResponse;

#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<SwapAggregator>,
}

impl ApiState {
    pub fn new(aggregator: Arc<SwapAggregator>) -> Self {
        Self { aggregator }
    }
}

/// Full HTTP surface: health plus the versioned API.
pub fn create_app(state: ApiState) -> Router {
    let api = Router::new()
        .nest("/quote", create_quote_router())
        .merge(create_route_router())
        .merge(create_swap_router())
        .nest("/tokens", create_tokens_router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "swaprouter-backend",
        "chains": state.aggregator.chain_ids(),
        "defaultChainId": state.aggregator.default_chain_id(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// JSON error payload with the status the failure maps to.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details,
        }
    }

    pub fn missing_parameters(details: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Missing required parameters", Some(details.to_string()))
    }
}

impl From<DexError> for ApiError {
    fn from(err: DexError) -> Self {
        match err {
            DexError::InvalidToken(_)
            | DexError::InvalidAddress(_)
            | DexError::InvalidAmount(_)
            | DexError::UnsupportedChain(_)
            | DexError::InvalidPath { .. }
            | DexError::InvalidCalldata(_)
            | DexError::NoRouteProvided => {
                warn!("Rejected request: {}", err);
                Self::new(StatusCode::BAD_REQUEST, err.to_string(), None)
            }
            DexError::NoRouteFound { .. } => Self::new(
                StatusCode::NOT_FOUND,
                "No route found",
                Some("Unable to find a swap route for the given token pair".to_string()),
            ),
            DexError::Cancelled => Self::new(
                StatusCode::CONFLICT,
                "superseded",
                Some("A newer quote request for the same pair replaced this one".to_string()),
            ),
            other => {
                error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string(), None)
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!("Rejected query string: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, "Invalid query parameters", Some(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.error,
            details: self.details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (self.status, Json(body)).into_response()
    }
}
