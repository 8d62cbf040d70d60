use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
    routing::get,
    Router,
};
use tracing::{info, instrument};

use super::{ApiError, ApiState};
use crate::dexes::DexUtils;
use crate::types::{
    AmountsInQuery, AmountsInResponse, AmountsOutQuery, AmountsOutResponse, RouteQuery, RouteResponse,
    TradeDirection,
};

const ANONYMOUS_CLIENT: &str = "anonymous";

pub fn create_quote_router() -> Router<ApiState> {
    Router::new()
        .route("/amounts-out", get(get_amounts_out))
        .route("/amounts-in", get(get_amounts_in))
}

/// Mounted at the API root as `/route`.
pub fn create_route_router() -> Router<ApiState> {
    Router::new().route("/route", get(get_route))
}

/// Debounced exact-input quote; `amountOut` is null when no route exists
#[instrument(skip(state))]
async fn get_amounts_out(
    State(state): State<ApiState>,
    query: Result<Query<AmountsOutQuery>, QueryRejection>,
) -> Result<Json<AmountsOutResponse>, ApiError> {
    let Query(query) = query?;
    let aggregator = state.aggregator.as_ref();
    let query = &query;
    let client = query.client_id.as_deref().unwrap_or(ANONYMOUS_CLIENT);
    let key = aggregator.quote_key(client, query.chain_id, &query.token_in, &query.token_out, TradeDirection::ExactInput);
    let venue = query.venue.unwrap_or_default();

    let amount_out = aggregator
        .scheduled(key, move || {
            aggregator.get_amounts_out(&query.amount_in, &query.token_in, &query.token_out, query.chain_id, venue)
        })
        .await?;

    Ok(Json(AmountsOutResponse { amount_out }))
}

/// Debounced exact-output quote; `amountIn` is null when no route exists
#[instrument(skip(state))]
async fn get_amounts_in(
    State(state): State<ApiState>,
    query: Result<Query<AmountsInQuery>, QueryRejection>,
) -> Result<Json<AmountsInResponse>, ApiError> {
    let Query(query) = query?;
    let aggregator = state.aggregator.as_ref();
    let query = &query;
    let client = query.client_id.as_deref().unwrap_or(ANONYMOUS_CLIENT);
    let key = aggregator.quote_key(client, query.chain_id, &query.token_in, &query.token_out, TradeDirection::ExactOutput);
    let venue = query.venue.unwrap_or_default();

    let amount_in = aggregator
        .scheduled(key, move || {
            aggregator.get_amounts_in(&query.amount_out, &query.token_in, &query.token_out, query.chain_id, venue)
        })
        .await?;

    Ok(Json(AmountsInResponse { amount_in }))
}

/// Best V3 route plus SwapRouter02 method parameters when a recipient is given
#[instrument(skip(state))]
async fn get_route(
    State(state): State<ApiState>,
    query: Result<Query<RouteQuery>, QueryRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Query(query) = query?;
    let (Some(token_in), Some(token_out), Some(amount_in)) = (&query.token_in, &query.token_out, &query.amount_in) else {
        return Err(ApiError::missing_parameters("tokenIn, tokenOut, and amountIn are required"));
    };

    let slippage_bps = query
        .slippage
        .as_deref()
        .map(DexUtils::parse_slippage_bps)
        .transpose()?;
    let recipient = query
        .recipient
        .as_deref()
        .map(|recipient| DexUtils::require_address(recipient, "recipient"))
        .transpose()?;

    let route = state
        .aggregator
        .get_route(token_in, token_out, amount_in, slippage_bps, recipient, query.chain_id)
        .await?;

    info!("✅ Route {} -> {}: {} {}", token_in, token_out, route.quote, route.quote_currency);
    Ok(Json(route))
}
