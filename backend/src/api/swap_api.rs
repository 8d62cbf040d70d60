use axum::{extract::State, response::Json, routing::post, Router};
use tracing::{info, instrument};

use super::{ApiError, ApiState};
use crate::types::{SwapParams, SwapResponse};

pub fn create_swap_router() -> Router<ApiState> {
    Router::new().route("/swap", post(execute_swap))
}

/// Runs the swap pipeline with the server signer and reports the receipt
#[instrument(skip(state, params), fields(token_in = %params.token_in, token_out = %params.token_out))]
async fn execute_swap(
    State(state): State<ApiState>,
    Json(params): Json<SwapParams>,
) -> Result<Json<SwapResponse>, ApiError> {
    let outcome = state.aggregator.swap(&params).await?;
    info!("✅ Swap {} confirmed in block {:?}", outcome.tx_hash, outcome.receipt.block_number);

    Ok(Json(SwapResponse {
        attempt_id: outcome.attempt_id.to_string(),
        tx_hash: outcome.tx_hash.to_string(),
        approval_tx_hash: outcome.approval_tx_hash.map(|hash| hash.to_string()),
        block_number: outcome.receipt.block_number,
        gas_used: outcome.receipt.gas_used.to_string(),
        status: if outcome.receipt.success { "success" } else { "reverted" }.to_string(),
        states: outcome.states.iter().map(|state| state.to_string()).collect(),
    }))
}
