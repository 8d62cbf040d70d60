use crate::dexes::chain_client::{simulate_call, ChainClient};
use crate::dexes::{DexError, QuoteSimulator, SwapCallBuilder, Venue};
use crate::types::{CandidatePath, QuoteOutcome, SwapPlan, TradeDirection};
use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

// Uniswap V3 QuoterV2 ABI
sol! {
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
}

// SwapRouter02 ABI (no per-call deadline; deadline goes through multicall)
sol! {
    interface ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        struct ExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountOut;
            uint256 amountInMaximum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactOutputParams {
            bytes path;
            address recipient;
            uint256 amountOut;
            uint256 amountInMaximum;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function exactOutputSingle(ExactOutputSingleParams calldata params) external payable returns (uint256 amountIn);
        function exactOutput(ExactOutputParams calldata params) external payable returns (uint256 amountIn);
        function multicall(uint256 deadline, bytes[] calldata data) external payable returns (bytes[] memory results);
    }
}

/// Fee-tiered venue: QuoterV2 for simulation, SwapRouter02 for execution.
#[derive(Clone)]
pub struct UniswapV3Dex {
    client: Arc<dyn ChainClient>,
    quoter_address: Address,
    router_address: Address,
}

impl UniswapV3Dex {
    pub fn new(client: Arc<dyn ChainClient>, quoter_address: Address, router_address: Address) -> Self {
        Self {
            client,
            quoter_address,
            router_address,
        }
    }

    pub fn quoter_address(&self) -> Address {
        self.quoter_address
    }

    /// Simulated output of one pool. Reverts and transport errors are infeasible.
    pub async fn quote_single_exact_in(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> QuoteOutcome {
        let call = IQuoterV2::quoteExactInputSingleCall {
            params: IQuoterV2::QuoteExactInputSingleParams {
                tokenIn: token_in,
                tokenOut: token_out,
                amountIn: amount_in,
                fee,
                sqrtPriceLimitX96: U256::ZERO,
            },
        };

        match simulate_call(self.client.as_ref(), self.quoter_address, call).await {
            Ok(result) => QuoteOutcome::with_gas(result.amountOut, result.gasEstimate),
            Err(e) => {
                debug!(%token_in, %token_out, fee, "V3 exact-in single quote failed: {}", e);
                QuoteOutcome::Infeasible
            }
        }
    }

    /// Simulated input one pool needs to deliver `amount_out`.
    pub async fn quote_single_exact_out(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
        fee: u32,
    ) -> QuoteOutcome {
        let call = IQuoterV2::quoteExactOutputSingleCall {
            params: IQuoterV2::QuoteExactOutputSingleParams {
                tokenIn: token_in,
                tokenOut: token_out,
                amount: amount_out,
                fee,
                sqrtPriceLimitX96: U256::ZERO,
            },
        };

        match simulate_call(self.client.as_ref(), self.quoter_address, call).await {
            Ok(result) => QuoteOutcome::with_gas(result.amountIn, result.gasEstimate),
            Err(e) => {
                debug!(%token_in, %token_out, fee, "V3 exact-out single quote failed: {}", e);
                QuoteOutcome::Infeasible
            }
        }
    }

    /// `encoded_path` runs tokenIn → tokenOut.
    pub async fn quote_path_exact_in(&self, encoded_path: Bytes, amount_in: U256) -> QuoteOutcome {
        let call = IQuoterV2::quoteExactInputCall {
            path: encoded_path,
            amountIn: amount_in,
        };

        match simulate_call(self.client.as_ref(), self.quoter_address, call).await {
            Ok(result) => QuoteOutcome::with_gas(result.amountOut, result.gasEstimate),
            Err(e) => {
                debug!("V3 exact-in path quote failed: {}", e);
                QuoteOutcome::Infeasible
            }
        }
    }

    /// `encoded_path` runs tokenOut → tokenIn, as the quoter walks it backwards.
    pub async fn quote_path_exact_out(&self, encoded_path: Bytes, amount_out: U256) -> QuoteOutcome {
        let call = IQuoterV2::quoteExactOutputCall {
            path: encoded_path,
            amountOut: amount_out,
        };

        match simulate_call(self.client.as_ref(), self.quoter_address, call).await {
            Ok(result) => QuoteOutcome::with_gas(result.amountIn, result.gasEstimate),
            Err(e) => {
                debug!("V3 exact-out path quote failed: {}", e);
                QuoteOutcome::Infeasible
            }
        }
    }

    /// The bare router call for `plan`, before multicall wrapping.
    fn build_router_call(&self, plan: &SwapPlan) -> Result<Vec<u8>, DexError> {
        plan.path.validate()?;
        if plan.path.fees.is_empty() {
            return Err(DexError::InvalidPath {
                tokens: plan.path.tokens.len(),
                fees: 0,
            });
        }

        let path = &plan.path;
        let data = match (plan.direction, path.tokens.as_slice()) {
            (TradeDirection::ExactInput, &[token_in, token_out]) => ISwapRouter02::exactInputSingleCall {
                params: ISwapRouter02::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee: path.fees[0],
                    recipient: plan.recipient,
                    amountIn: plan.amount_specified,
                    amountOutMinimum: plan.amount_limit,
                    sqrtPriceLimitX96: U256::ZERO,
                },
            }
            .abi_encode(),
            (TradeDirection::ExactInput, _) => ISwapRouter02::exactInputCall {
                params: ISwapRouter02::ExactInputParams {
                    path: path.encode_for(TradeDirection::ExactInput)?,
                    recipient: plan.recipient,
                    amountIn: plan.amount_specified,
                    amountOutMinimum: plan.amount_limit,
                },
            }
            .abi_encode(),
            (TradeDirection::ExactOutput, &[token_in, token_out]) => ISwapRouter02::exactOutputSingleCall {
                params: ISwapRouter02::ExactOutputSingleParams {
                    tokenIn: token_in,
                    tokenOut: token_out,
                    fee: path.fees[0],
                    recipient: plan.recipient,
                    amountOut: plan.amount_specified,
                    amountInMaximum: plan.amount_limit,
                    sqrtPriceLimitX96: U256::ZERO,
                },
            }
            .abi_encode(),
            (TradeDirection::ExactOutput, _) => ISwapRouter02::exactOutputCall {
                params: ISwapRouter02::ExactOutputParams {
                    path: path.encode_for(TradeDirection::ExactOutput)?,
                    recipient: plan.recipient,
                    amountOut: plan.amount_specified,
                    amountInMaximum: plan.amount_limit,
                },
            }
            .abi_encode(),
        };

        Ok(data)
    }
}

#[async_trait]
impl QuoteSimulator for UniswapV3Dex {
    fn venue(&self) -> Venue {
        Venue::UniswapV3
    }

    async fn quote_candidate(
        &self,
        path: &CandidatePath,
        amount: U256,
        direction: TradeDirection,
    ) -> QuoteOutcome {
        if path.validate().is_err() || path.fees.is_empty() {
            debug!(tokens = path.tokens.len(), fees = path.fees.len(), "Skipping V3 candidate without fee tiers");
            return QuoteOutcome::Infeasible;
        }

        if let (&[token_in, token_out], &[fee]) = (path.tokens.as_slice(), path.fees.as_slice()) {
            return match direction {
                TradeDirection::ExactInput => self.quote_single_exact_in(token_in, token_out, amount, fee).await,
                TradeDirection::ExactOutput => self.quote_single_exact_out(token_in, token_out, amount, fee).await,
            };
        }

        let encoded = match path.encode_for(direction) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!("V3 path encoding failed: {}", e);
                return QuoteOutcome::Infeasible;
            }
        };

        match direction {
            TradeDirection::ExactInput => self.quote_path_exact_in(encoded, amount).await,
            TradeDirection::ExactOutput => self.quote_path_exact_out(encoded, amount).await,
        }
    }
}

impl SwapCallBuilder for UniswapV3Dex {
    fn router_address(&self) -> Address {
        self.router_address
    }

    /// SwapRouter02 `multicall(deadline, [call])` so the deadline is enforced on-chain.
    fn build_swap_call(&self, plan: &SwapPlan) -> Result<Bytes, DexError> {
        let inner = self.build_router_call(plan)?;
        let call = ISwapRouter02::multicallCall {
            deadline: U256::from(plan.deadline),
            data: vec![Bytes::from(inner)],
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}
