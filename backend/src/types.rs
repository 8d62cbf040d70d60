use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::dexes::{utils::path_encoder, DexError, Venue};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Chain {
    Ethereum,
    Sepolia,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Sepolia => "sepolia",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Sepolia => 11_155_111,
        }
    }

    pub fn from_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Chain::Ethereum),
            11_155_111 => Some(Chain::Sepolia),
            _ => None,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" => Some(Chain::Ethereum),
            "sepolia" => Some(Chain::Sepolia),
            _ => None,
        }
    }
}

/// ERC-20 metadata, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    /// Amount in is fixed, maximise amount out.
    ExactInput,
    /// Amount out is fixed, minimise amount in.
    ExactOutput,
}

/// Where a candidate came from in the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    Direct,
    WrappedNative,
    CommonIntermediate,
}

/// Ordered token path with one fee per hop on fee-tiered venues, none otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePath {
    pub tokens: Vec<Address>,
    pub fees: Vec<u32>,
    pub kind: CandidateKind,
}

impl CandidatePath {
    pub fn direct(token_in: Address, token_out: Address, fee: Option<u32>) -> Self {
        Self {
            tokens: vec![token_in, token_out],
            fees: fee.into_iter().collect(),
            kind: CandidateKind::Direct,
        }
    }

    pub fn via(
        token_in: Address,
        intermediate: Address,
        token_out: Address,
        fees: Option<(u32, u32)>,
        kind: CandidateKind,
    ) -> Self {
        Self {
            tokens: vec![token_in, intermediate, token_out],
            fees: fees.map(|(a, b)| vec![a, b]).unwrap_or_default(),
            kind,
        }
    }

    /// `None` only for an empty path, which [`CandidatePath::validate`] rejects.
    pub fn token_in(&self) -> Option<Address> {
        self.tokens.first().copied()
    }

    pub fn token_out(&self) -> Option<Address> {
        self.tokens.last().copied()
    }

    pub fn hop_count(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    /// `len(fees) == len(tokens) - 1` whenever fees apply.
    pub fn validate(&self) -> Result<(), DexError> {
        if self.tokens.len() < 2 || (!self.fees.is_empty() && self.fees.len() + 1 != self.tokens.len()) {
            return Err(DexError::InvalidPath {
                tokens: self.tokens.len(),
                fees: self.fees.len(),
            });
        }
        Ok(())
    }

    pub fn reversed(&self) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.reverse();
        let mut fees = self.fees.clone();
        fees.reverse();
        Self { tokens, fees, kind: self.kind }
    }

    /// Packed path in the order the V3 quoter/router expect for `direction`:
    /// exact-output paths are encoded from tokenOut back to tokenIn.
    pub fn encode_for(&self, direction: TradeDirection) -> Result<Bytes, DexError> {
        match direction {
            TradeDirection::ExactInput => path_encoder::encode(&self.tokens, &self.fees),
            TradeDirection::ExactOutput => {
                let reversed = self.reversed();
                path_encoder::encode(&reversed.tokens, &reversed.fees)
            }
        }
    }
}

/// Simulation result for one candidate. Zero is a legitimate quoted value;
/// failure is its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOutcome {
    Quoted {
        amount: U256,
        /// Quoter gas estimate; constant-fee routers report none.
        gas_estimate: Option<U256>,
    },
    Infeasible,
}

impl QuoteOutcome {
    pub fn quoted(amount: U256) -> Self {
        QuoteOutcome::Quoted { amount, gas_estimate: None }
    }

    pub fn with_gas(amount: U256, gas_estimate: U256) -> Self {
        QuoteOutcome::Quoted {
            amount,
            gas_estimate: Some(gas_estimate),
        }
    }

    pub fn amount(&self) -> Option<U256> {
        match self {
            QuoteOutcome::Quoted { amount, .. } => Some(*amount),
            QuoteOutcome::Infeasible => None,
        }
    }

    pub fn gas_estimate(&self) -> Option<U256> {
        match self {
            QuoteOutcome::Quoted { gas_estimate, .. } => *gas_estimate,
            QuoteOutcome::Infeasible => None,
        }
    }

    /// A route worth executing: simulated successfully and moves a non-zero amount.
    pub fn viable_amount(&self) -> Option<U256> {
        self.amount().filter(|amount| !amount.is_zero())
    }
}

impl From<Option<U256>> for QuoteOutcome {
    fn from(value: Option<U256>) -> Self {
        value.map(QuoteOutcome::quoted).unwrap_or(QuoteOutcome::Infeasible)
    }
}

/// Winner of one route selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestRoute {
    pub venue: Venue,
    pub direction: TradeDirection,
    pub path: CandidatePath,
    /// Output amount for exact-input, required input for exact-output (base units).
    pub quoted_amount: U256,
    pub gas_estimate: Option<U256>,
    /// Packed path in execution order for `direction`; `None` on address-array venues.
    pub encoded_path: Option<Bytes>,
    pub candidates_considered: usize,
    pub candidates_feasible: usize,
}

impl BestRoute {
    pub fn fees(&self) -> &[u32] {
        &self.path.fees
    }
}

/// Parameters for a direct router invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub venue: Venue,
    pub direction: TradeDirection,
    pub path: CandidatePath,
    /// amountIn (exact-input) or amountOut (exact-output)
    pub amount_specified: U256,
    /// amountOutMin (exact-input) or amountInMax (exact-output)
    pub amount_limit: U256,
    pub recipient: Address,
    pub deadline: u64,
}

/// What the Swap Executor submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapInstruction {
    Router(SwapPlan),
    /// Pre-computed route calldata supplied by the caller.
    Passthrough { to: Address, calldata: Bytes, value: U256 },
}

// ---------------------------------------------------------------------------
// HTTP request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AmountsOutQuery {
    #[serde(rename = "amountIn")]
    pub amount_in: String,
    #[serde(rename = "tokenIn")]
    pub token_in: String,
    #[serde(rename = "tokenOut")]
    pub token_out: String,
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(rename = "clientId", default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountsInQuery {
    #[serde(rename = "amountOut")]
    pub amount_out: String,
    #[serde(rename = "tokenIn")]
    pub token_in: String,
    #[serde(rename = "tokenOut")]
    pub token_out: String,
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(rename = "clientId", default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountsOutResponse {
    #[serde(rename = "amountOut")]
    pub amount_out: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountsInResponse {
    #[serde(rename = "amountIn")]
    pub amount_in: Option<String>,
}

/// Every field optional so missing parameters surface as a 400 payload
/// rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteQuery {
    #[serde(rename = "tokenIn")]
    pub token_in: Option<String>,
    #[serde(rename = "tokenOut")]
    pub token_out: Option<String>,
    #[serde(rename = "amountIn")]
    pub amount_in: Option<String>,
    pub slippage: Option<String>,
    pub recipient: Option<String>,
    #[serde(rename = "chainId")]
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodParameters {
    pub calldata: String,
    pub value: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub success: bool,
    pub quote: String,
    #[serde(rename = "quoteCurrency")]
    pub quote_currency: String,
    #[serde(rename = "estimatedGasUsed")]
    pub estimated_gas_used: Option<String>,
    #[serde(rename = "inputAmount")]
    pub input_amount: String,
    #[serde(rename = "outputAmount")]
    pub output_amount: String,
    /// tokenOut per tokenIn, six significant digits
    #[serde(rename = "executionPrice")]
    pub execution_price: String,
    #[serde(rename = "minimumReceived")]
    pub minimum_received: String,
    pub path: Vec<String>,
    pub fees: Vec<u32>,
    #[serde(rename = "methodParameters")]
    pub method_parameters: Option<MethodParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapParams {
    #[serde(rename = "tokenIn")]
    pub token_in: String,
    #[serde(rename = "tokenOut")]
    pub token_out: String,
    /// amountIn for exact-input, amountInMax for exact-output
    #[serde(rename = "amountIn")]
    pub amount_in: String,
    /// amountOutMin for exact-input, amountOut for exact-output
    #[serde(rename = "amountOut")]
    pub amount_out: String,
    #[serde(default = "default_direction")]
    pub direction: TradeDirection,
    pub recipient: String,
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(rename = "methodParameters", default)]
    pub method_parameters: Option<MethodParameters>,
}

fn default_direction() -> TradeDirection {
    TradeDirection::ExactInput
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResponse {
    #[serde(rename = "attemptId")]
    pub attempt_id: String,
    #[serde(rename = "txHash")]
    pub tx_hash: String,
    #[serde(rename = "approvalTxHash")]
    pub approval_tx_hash: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<u64>,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    pub status: String,
    pub states: Vec<String>,
}
