#![allow(dead_code)]

use alloy::primitives::{address, Address, Bytes, TxHash, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use swaprouter_backend::aggregator::SwapAggregator;
use swaprouter_backend::config::{AppConfig, ChainDeployment};
use swaprouter_backend::dexes::utils::path_encoder;
use swaprouter_backend::dexes::{ChainClient, DexError, TransactionPlan, TxReceiptSummary};
use swaprouter_backend::types::TradeDirection;

pub const SEPOLIA: u64 = 11_155_111;
pub const WETH: Address = address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14");
pub const USDC: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");
pub const LINK: Address = address!("779877A7B0D9E8603169DdbD7836e478b4624789");
pub const SWAP_ROUTER: Address = address!("3bFA4769FB09eefC5a80d6E87c3B9C650f7Ae48E");
pub const V2_ROUTER: Address = address!("eE567Fe1712Faf6149d80dA1E6934E354124CfE3");
pub const WALLET: Address = address!("742d35Cc6634C0532925a3b8D4C9db96C4b4d8b6");

pub const SWAP_GAS_USED: u128 = 152_000;
/// QuoterV2 gas estimate: a base plus this much per hop.
pub const QUOTE_GAS_PER_HOP: u64 = 80_000;

sol! {
    interface IERC20 {
        function symbol() external view returns (string);
        function name() external view returns (string);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        struct QuoteExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amount;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);

        function quoteExactOutputSingle(QuoteExactOutputSingleParams memory params)
            external
            returns (uint256 amountIn, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);

        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (uint256 amountOut, uint160[] memory sqrtPriceX96AfterList, uint32[] memory initializedTicksCrossedList, uint256 gasEstimate);

        function quoteExactOutput(bytes memory path, uint256 amountOut)
            external
            returns (uint256 amountIn, uint160[] memory sqrtPriceX96AfterList, uint32[] memory initializedTicksCrossedList, uint256 gasEstimate);
    }

    interface IUniswapV2Router {
        function getAmountsOut(uint amountIn, address[] calldata path) external view returns (uint[] memory amounts);
        function getAmountsIn(uint amountOut, address[] calldata path) external view returns (uint[] memory amounts);
    }

    interface ISwapRouter02 {
        function multicall(uint256 deadline, bytes[] calldata data) external payable returns (bytes[] memory results);
    }
}

#[derive(Debug, Clone)]
struct TokenFixture {
    symbol: String,
    name: String,
    decimals: u8,
}

type V3Key = (Vec<Address>, Vec<u32>, TradeDirection);
type V2Key = (Vec<Address>, TradeDirection);

/// In-memory chain: canned token metadata and quotes, recorded submissions.
/// Any call it has no answer for reverts.
pub struct MockChainClient {
    chain_id: u64,
    sender: Option<Address>,
    tokens: HashMap<Address, TokenFixture>,
    v3_quotes: HashMap<V3Key, U256>,
    v2_quotes: HashMap<V2Key, U256>,
    allowance: U256,
    revert_swaps: bool,
    revert_approvals: bool,
    metadata_delay: Duration,
    transient_read_failures: AtomicUsize,
    metadata_reads: AtomicUsize,
    quote_calls: AtomicUsize,
    submissions: Mutex<Vec<TransactionPlan>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            chain_id: SEPOLIA,
            sender: Some(WALLET),
            tokens: HashMap::new(),
            v3_quotes: HashMap::new(),
            v2_quotes: HashMap::new(),
            allowance: U256::ZERO,
            revert_swaps: false,
            revert_approvals: false,
            metadata_delay: Duration::ZERO,
            transient_read_failures: AtomicUsize::new(0),
            metadata_reads: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// WETH, USDC and LINK registered with their Sepolia metadata.
    pub fn with_sepolia_tokens() -> Self {
        Self::new()
            .with_token(WETH, "WETH", "Wrapped Ether", 18)
            .with_token(USDC, "USDC", "USD Coin", 6)
            .with_token(LINK, "LINK", "ChainLink Token", 18)
    }

    pub fn with_token(mut self, address: Address, symbol: &str, name: &str, decimals: u8) -> Self {
        self.tokens.insert(
            address,
            TokenFixture {
                symbol: symbol.to_string(),
                name: name.to_string(),
                decimals,
            },
        );
        self
    }

    /// `tokens`/`fees` are in swap order regardless of direction.
    pub fn with_v3_quote(mut self, tokens: &[Address], fees: &[u32], direction: TradeDirection, amount: u64) -> Self {
        self.v3_quotes
            .insert((tokens.to_vec(), fees.to_vec(), direction), U256::from(amount));
        self
    }

    pub fn with_v2_quote(mut self, tokens: &[Address], direction: TradeDirection, amount: u64) -> Self {
        self.v2_quotes.insert((tokens.to_vec(), direction), U256::from(amount));
        self
    }

    pub fn with_allowance(mut self, allowance: U256) -> Self {
        self.allowance = allowance;
        self
    }

    pub fn without_signer(mut self) -> Self {
        self.sender = None;
        self
    }

    pub fn reverting_swaps(mut self) -> Self {
        self.revert_swaps = true;
        self
    }

    pub fn reverting_approvals(mut self) -> Self {
        self.revert_approvals = true;
        self
    }

    pub fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = delay;
        self
    }

    /// The next `count` token metadata reads fail with a transport error.
    pub fn with_transient_metadata_failures(self, count: usize) -> Self {
        self.transient_read_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Number of `symbol()` reads, i.e. metadata fetches that reached the chain.
    pub fn metadata_reads(&self) -> usize {
        self.metadata_reads.load(Ordering::SeqCst)
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<TransactionPlan> {
        self.submissions.lock().unwrap().clone()
    }

    fn revert() -> DexError {
        DexError::ContractCallFailed("execution reverted".to_string())
    }

    fn take_transient_failure(&self) -> Result<(), DexError> {
        let failed = self
            .transient_read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DexError::Rpc("connection reset".to_string()));
        }
        Ok(())
    }

    fn gas_estimate(hops: usize) -> U256 {
        U256::from(QUOTE_GAS_PER_HOP * hops as u64)
    }

    async fn answer(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, DexError> {
        let is_metadata = IERC20::symbolCall::abi_decode(data, true).is_ok()
            || IERC20::nameCall::abi_decode(data, true).is_ok()
            || IERC20::decimalsCall::abi_decode(data, true).is_ok();
        if is_metadata {
            self.take_transient_failure()?;
        }

        if IERC20::symbolCall::abi_decode(data, true).is_ok() {
            self.metadata_reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.metadata_delay).await;
            let token = self.tokens.get(&to).ok_or_else(Self::revert)?;
            return Ok(IERC20::symbolCall::abi_encode_returns(&(token.symbol.clone(),)));
        }
        if IERC20::nameCall::abi_decode(data, true).is_ok() {
            let token = self.tokens.get(&to).ok_or_else(Self::revert)?;
            return Ok(IERC20::nameCall::abi_encode_returns(&(token.name.clone(),)));
        }
        if IERC20::decimalsCall::abi_decode(data, true).is_ok() {
            let token = self.tokens.get(&to).ok_or_else(Self::revert)?;
            return Ok(IERC20::decimalsCall::abi_encode_returns(&(token.decimals,)));
        }
        if IERC20::allowanceCall::abi_decode(data, true).is_ok() {
            return Ok(IERC20::allowanceCall::abi_encode_returns(&(self.allowance,)));
        }

        if let Ok(call) = IQuoterV2::quoteExactInputSingleCall::abi_decode(data, true) {
            let params = call.params;
            let amount = self.v3_quote(vec![params.tokenIn, params.tokenOut], vec![params.fee], TradeDirection::ExactInput)?;
            return Ok(IQuoterV2::quoteExactInputSingleCall::abi_encode_returns(&(
                amount,
                U256::ZERO,
                0u32,
                Self::gas_estimate(1),
            )));
        }
        if let Ok(call) = IQuoterV2::quoteExactOutputSingleCall::abi_decode(data, true) {
            let params = call.params;
            let amount = self.v3_quote(vec![params.tokenIn, params.tokenOut], vec![params.fee], TradeDirection::ExactOutput)?;
            return Ok(IQuoterV2::quoteExactOutputSingleCall::abi_encode_returns(&(
                amount,
                U256::ZERO,
                0u32,
                Self::gas_estimate(1),
            )));
        }
        if let Ok(call) = IQuoterV2::quoteExactInputCall::abi_decode(data, true) {
            let (tokens, fees) = path_encoder::decode(&call.path)?;
            let hops = fees.len();
            let amount = self.v3_quote(tokens, fees, TradeDirection::ExactInput)?;
            return Ok(IQuoterV2::quoteExactInputCall::abi_encode_returns(&(
                amount,
                Vec::<U256>::new(),
                Vec::<u32>::new(),
                Self::gas_estimate(hops),
            )));
        }
        if let Ok(call) = IQuoterV2::quoteExactOutputCall::abi_decode(data, true) {
            // exact-output paths arrive tokenOut first
            let (mut tokens, mut fees) = path_encoder::decode(&call.path)?;
            tokens.reverse();
            fees.reverse();
            let hops = fees.len();
            let amount = self.v3_quote(tokens, fees, TradeDirection::ExactOutput)?;
            return Ok(IQuoterV2::quoteExactOutputCall::abi_encode_returns(&(
                amount,
                Vec::<U256>::new(),
                Vec::<u32>::new(),
                Self::gas_estimate(hops),
            )));
        }

        if let Ok(call) = IUniswapV2Router::getAmountsOutCall::abi_decode(data, true) {
            let amount = self.v2_quote(call.path.clone(), TradeDirection::ExactInput)?;
            let mut amounts = vec![call.amountIn; call.path.len() - 1];
            amounts.push(amount);
            return Ok(IUniswapV2Router::getAmountsOutCall::abi_encode_returns(&(amounts,)));
        }
        if let Ok(call) = IUniswapV2Router::getAmountsInCall::abi_decode(data, true) {
            let amount = self.v2_quote(call.path.clone(), TradeDirection::ExactOutput)?;
            let mut amounts = vec![amount];
            amounts.extend(std::iter::repeat(call.amountOut).take(call.path.len() - 1));
            return Ok(IUniswapV2Router::getAmountsInCall::abi_encode_returns(&(amounts,)));
        }

        Err(Self::revert())
    }

    fn v3_quote(&self, tokens: Vec<Address>, fees: Vec<u32>, direction: TradeDirection) -> Result<U256, DexError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.v3_quotes
            .get(&(tokens, fees, direction))
            .copied()
            .ok_or_else(Self::revert)
    }

    fn v2_quote(&self, tokens: Vec<Address>, direction: TradeDirection) -> Result<U256, DexError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.v2_quotes.get(&(tokens, direction)).copied().ok_or_else(Self::revert)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sender(&self) -> Option<Address> {
        self.sender
    }

    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes, DexError> {
        self.answer(to, &calldata).await.map(Bytes::from)
    }

    async fn simulate_call(&self, to: Address, calldata: Bytes) -> Result<Bytes, DexError> {
        self.answer(to, &calldata).await.map(Bytes::from)
    }

    async fn submit_transaction(&self, plan: TransactionPlan) -> Result<TxHash, DexError> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(plan);
        Ok(TxHash::with_last_byte(submissions.len() as u8))
    }

    async fn await_receipt(&self, tx_hash: TxHash) -> Result<TxReceiptSummary, DexError> {
        let submissions = self.submissions.lock().unwrap();
        let index = tx_hash[31] as usize - 1;
        let plan = submissions
            .get(index)
            .ok_or_else(|| DexError::Timeout(format!("unknown transaction {}", tx_hash)))?;

        let is_approval = self.tokens.contains_key(&plan.to);
        let success = if is_approval { !self.revert_approvals } else { !self.revert_swaps };

        Ok(TxReceiptSummary {
            tx_hash,
            success,
            block_number: Some(5_000_000 + index as u64),
            gas_used: if is_approval { 46_000 } else { SWAP_GAS_USED },
        })
    }
}

/// Sepolia-only config with no debounce so tests never wait on the scheduler.
pub fn test_config() -> AppConfig {
    let sepolia = ChainDeployment::sepolia();
    AppConfig {
        default_chain_id: SEPOLIA,
        deployments: HashMap::from([(SEPOLIA, sepolia)]),
        quote_debounce: Duration::ZERO,
        ..AppConfig::default()
    }
}

pub fn aggregator_with(client: Arc<MockChainClient>) -> SwapAggregator {
    let client: Arc<dyn ChainClient> = client;
    SwapAggregator::with_clients(&test_config(), HashMap::from([(SEPOLIA, client)]))
        .expect("aggregator wiring")
}

/// Checksummed hex, as clients send addresses.
pub fn checksum(address: Address) -> String {
    address.to_checksum(None)
}
