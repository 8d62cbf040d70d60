use crate::dexes::chain_client::{read_call, ChainClient};
use crate::dexes::{DexError, QuoteSimulator, SwapCallBuilder, Venue};
use crate::types::{CandidatePath, QuoteOutcome, SwapPlan, TradeDirection};
use async_trait::async_trait;
use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};
use std::sync::Arc;
use tracing::debug;

// Uniswap V2 Router02 ABI
sol! {
    interface IUniswapV2Router {
        function getAmountsOut(
            uint amountIn,
            address[] calldata path
        ) external view returns (uint[] memory amounts);

        function getAmountsIn(
            uint amountOut,
            address[] calldata path
        ) external view returns (uint[] memory amounts);

        function swapExactTokensForTokens(
            uint amountIn,
            uint amountOutMin,
            address[] calldata path,
            address to,
            uint deadline
        ) external returns (uint[] memory amounts);

        function swapTokensForExactTokens(
            uint amountOut,
            uint amountInMax,
            address[] calldata path,
            address to,
            uint deadline
        ) external returns (uint[] memory amounts);
    }
}

/// Constant-fee venue: every quote and swap goes through Router02 with an `address[]` path.
#[derive(Clone)]
pub struct UniswapV2Dex {
    client: Arc<dyn ChainClient>,
    router_address: Address,
}

impl UniswapV2Dex {
    pub fn new(client: Arc<dyn ChainClient>, router_address: Address) -> Self {
        Self { client, router_address }
    }

    /// Router output for `amount_in` along `path` (last element of `getAmountsOut`).
    pub async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, DexError> {
        let call = IUniswapV2Router::getAmountsOutCall {
            amountIn: amount_in,
            path: path.to_vec(),
        };
        let amounts = read_call(self.client.as_ref(), self.router_address, call).await?.amounts;
        amounts.last().copied().ok_or(DexError::InsufficientLiquidity)
    }

    /// Router input required for `amount_out` along `path` (first element of `getAmountsIn`).
    pub async fn get_amounts_in(&self, amount_out: U256, path: &[Address]) -> Result<U256, DexError> {
        let call = IUniswapV2Router::getAmountsInCall {
            amountOut: amount_out,
            path: path.to_vec(),
        };
        let amounts = read_call(self.client.as_ref(), self.router_address, call).await?.amounts;
        amounts.first().copied().ok_or(DexError::InsufficientLiquidity)
    }
}

#[async_trait]
impl QuoteSimulator for UniswapV2Dex {
    fn venue(&self) -> Venue {
        Venue::UniswapV2
    }

    async fn quote_candidate(
        &self,
        path: &CandidatePath,
        amount: U256,
        direction: TradeDirection,
    ) -> QuoteOutcome {
        if path.validate().is_err() {
            return QuoteOutcome::Infeasible;
        }

        let result = match direction {
            TradeDirection::ExactInput => self.get_amounts_out(amount, &path.tokens).await,
            TradeDirection::ExactOutput => self.get_amounts_in(amount, &path.tokens).await,
        };

        match result {
            Ok(amount) => QuoteOutcome::quoted(amount),
            Err(e) => {
                debug!(hops = path.hop_count(), ?direction, "V2 router quote failed: {}", e);
                QuoteOutcome::Infeasible
            }
        }
    }
}

impl SwapCallBuilder for UniswapV2Dex {
    fn router_address(&self) -> Address {
        self.router_address
    }

    fn build_swap_call(&self, plan: &SwapPlan) -> Result<Bytes, DexError> {
        plan.path.validate()?;
        let deadline = U256::from(plan.deadline);

        let data = match plan.direction {
            TradeDirection::ExactInput => IUniswapV2Router::swapExactTokensForTokensCall {
                amountIn: plan.amount_specified,
                amountOutMin: plan.amount_limit,
                path: plan.path.tokens.clone(),
                to: plan.recipient,
                deadline,
            }
            .abi_encode(),
            TradeDirection::ExactOutput => IUniswapV2Router::swapTokensForExactTokensCall {
                amountOut: plan.amount_specified,
                amountInMax: plan.amount_limit,
                path: plan.path.tokens.clone(),
                to: plan.recipient,
                deadline,
            }
            .abi_encode(),
        };

        Ok(Bytes::from(data))
    }
}
