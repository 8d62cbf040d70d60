use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tracing::{info, warn};

use super::{ApiError, ApiState};
use crate::dexes::DexError;
use crate::types::Token;

pub fn create_tokens_router() -> Router<ApiState> {
    Router::new().route("/:chain_id/:address", get(get_token))
}

/// Resolve ERC-20 metadata through the shared cache
async fn get_token(
    State(state): State<ApiState>,
    Path((chain_id, address)): Path<(u64, String)>,
) -> Result<Json<Token>, ApiError> {
    info!("Token lookup {} on chain {}", address, chain_id);

    match state.aggregator.tokens().resolve(&address, chain_id).await {
        Ok(Some(token)) => Ok(Json(token)),
        Ok(None) => Err(DexError::InvalidAddress(address).into()),
        Err(e @ DexError::UnsupportedChain(_)) => Err(e.into()),
        Err(e) if e.is_transient() => Err(e.into()),
        Err(e) => {
            warn!("Token {} not resolvable on chain {}: {}", address, chain_id, e);
            Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "Token not found",
                Some(format!("{} does not answer ERC-20 metadata calls on chain {}", address, chain_id)),
            ))
        }
    }
}
