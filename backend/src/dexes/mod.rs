// Uniswap venue integrations (V2 constant-fee router, V3 tiered quoter)
pub mod utils;

pub mod chain_client;
pub mod erc20;
pub mod uniswap_v2;
pub mod uniswap_v3;

pub use chain_client::{ChainClient, RpcChainClient, TransactionPlan, TxReceiptSummary};
pub use uniswap_v2::UniswapV2Dex;
pub use uniswap_v3::UniswapV3Dex;

use crate::types::{CandidatePath, QuoteOutcome, SwapPlan, TradeDirection};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export framework components
pub use utils::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DexError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Invalid path: {tokens} tokens with {fees} fees")]
    InvalidPath { tokens: usize, fees: usize },
    #[error("No route found for {token_in} -> {token_out}")]
    NoRouteFound { token_in: String, token_out: String },
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,
    #[error("No route or calldata provided for swap")]
    NoRouteProvided,
    #[error("Invalid calldata: {0}")]
    InvalidCalldata(String),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
    #[error("Contract call failed: {0}")]
    ContractCallFailed(String),
    #[error("RPC transport error: {0}")]
    Rpc(String),
    #[error("ABI decode failed: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("No signer configured for chain {0}")]
    SignerUnavailable(u64),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl DexError {
    /// Failures worth retrying on a quote fetch. Cancellation never is.
    pub fn is_transient(&self) -> bool {
        matches!(self, DexError::Rpc(_) | DexError::Timeout(_))
    }

    /// Token resolution failures that mean "this is not a usable token" rather
    /// than an infrastructure fault. Transient and chain errors pass through.
    pub fn into_token_error(self, address: &str) -> DexError {
        match self {
            DexError::ContractCallFailed(_) | DexError::Decode(_) | DexError::InvalidAddress(_) => {
                DexError::InvalidToken(format!("{}: {}", address, self))
            }
            other => other,
        }
    }
}

/// Which Uniswap generation a route targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Venue {
    #[serde(rename = "v2", alias = "V2")]
    UniswapV2,
    #[default]
    #[serde(rename = "v3", alias = "V3")]
    UniswapV3,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::UniswapV2 => "UniswapV2",
            Venue::UniswapV3 => "UniswapV3",
        }
    }

    pub fn capabilities(&self) -> VenueCapabilities {
        match self {
            Venue::UniswapV2 => VenueCapabilities::constant_fee(),
            Venue::UniswapV3 => VenueCapabilities::fee_tiered(),
        }
    }
}

/// How a venue's contracts expect a multi-hop path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEncoding {
    /// `address[]` argument (V2 router)
    AddressArray,
    /// packed `address ‖ fee(3) ‖ address ...` bytes (V3 quoter/router)
    Packed,
}

/// Describes what the route generator may enumerate for a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueCapabilities {
    /// Empty for constant-fee venues.
    pub fee_tiers: Vec<u32>,
    /// Fee pairs tried for the wrapped-native two-hop leg. Deliberately a
    /// sample of the full cross-product.
    pub multi_hop_fee_pairs: Vec<(u32, u32)>,
    pub uses_common_intermediates: bool,
    pub path_encoding: PathEncoding,
}

impl VenueCapabilities {
    pub const FEE_LOW: u32 = 500;
    pub const FEE_MEDIUM: u32 = 3000;
    pub const FEE_HIGH: u32 = 10000;

    pub fn constant_fee() -> Self {
        Self {
            fee_tiers: Vec::new(),
            multi_hop_fee_pairs: Vec::new(),
            uses_common_intermediates: true,
            path_encoding: PathEncoding::AddressArray,
        }
    }

    pub fn fee_tiered() -> Self {
        Self {
            fee_tiers: vec![Self::FEE_LOW, Self::FEE_MEDIUM, Self::FEE_HIGH],
            multi_hop_fee_pairs: vec![
                (Self::FEE_LOW, Self::FEE_LOW),
                (Self::FEE_LOW, Self::FEE_MEDIUM),
                (Self::FEE_MEDIUM, Self::FEE_LOW),
                (Self::FEE_MEDIUM, Self::FEE_MEDIUM),
                (Self::FEE_MEDIUM, Self::FEE_HIGH),
            ],
            uses_common_intermediates: false,
            path_encoding: PathEncoding::Packed,
        }
    }

    pub fn supports_fee_tiers(&self) -> bool {
        !self.fee_tiers.is_empty()
    }
}

/// Read-only quoting for one candidate path. Implementations absorb every
/// per-candidate failure into `QuoteOutcome::Infeasible`.
#[async_trait]
pub trait QuoteSimulator: Send + Sync {
    fn venue(&self) -> Venue;

    async fn quote_candidate(
        &self,
        path: &CandidatePath,
        amount: U256,
        direction: TradeDirection,
    ) -> QuoteOutcome;
}

/// Builds the router call that executes a selected route.
pub trait SwapCallBuilder: Send + Sync {
    /// Contract that receives the swap call and therefore needs the allowance.
    fn router_address(&self) -> Address;

    fn build_swap_call(&self, plan: &SwapPlan) -> Result<alloy::primitives::Bytes, DexError>;
}
