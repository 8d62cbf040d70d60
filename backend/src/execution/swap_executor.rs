use crate::dexes::{erc20, ChainClient, DexError, DexUtils, SwapCallBuilder, TransactionPlan, TxReceiptSummary, Venue};
use crate::token_registry::TokenMetadataCache;
use crate::types::{SwapInstruction, Token};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapState {
    Idle,
    CheckingAllowance,
    Approving,
    AwaitingApprovalReceipt,
    Submitting,
    AwaitingReceipt,
    Confirmed,
    Failed,
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapState::Idle => "idle",
            SwapState::CheckingAllowance => "checking_allowance",
            SwapState::Approving => "approving",
            SwapState::AwaitingApprovalReceipt => "awaiting_approval_receipt",
            SwapState::Submitting => "submitting",
            SwapState::AwaitingReceipt => "awaiting_receipt",
            SwapState::Confirmed => "confirmed",
            SwapState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Cached data collaborators should refetch after a confirmed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationScope {
    Balance,
    TokenBalance,
    Route,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub chain_id: u64,
    pub tokens: Vec<Address>,
    pub scopes: Vec<InvalidationScope>,
}

/// What the caller wants executed.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub token_in: String,
    pub token_out: String,
    /// Allowance the spender needs: amountIn, or amountInMax for exact-output.
    pub max_amount_in: U256,
    /// `None` when the caller has neither a route nor calldata.
    pub instruction: Option<SwapInstruction>,
}

/// A single swap attempt. [`SwapExecutor::execute`] consumes it, so an attempt
/// can only ever be submitted once.
#[derive(Debug)]
pub struct SwapAttempt {
    id: Uuid,
    request: SwapRequest,
    states: Vec<SwapState>,
}

impl SwapAttempt {
    pub fn new(request: SwapRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            states: vec![SwapState::Idle],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SwapState {
        self.states.last().copied().unwrap_or(SwapState::Idle)
    }

    fn transition(&mut self, next: SwapState) {
        info!(attempt_id = %self.id, "🔄 Swap {} -> {}", self.state(), next);
        self.states.push(next);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub attempt_id: Uuid,
    pub tx_hash: TxHash,
    pub approval_tx_hash: Option<TxHash>,
    pub receipt: TxReceiptSummary,
    pub states: Vec<SwapState>,
}

/// Resolved submission target for an attempt.
struct PreparedSwap {
    spender: Address,
    transaction: TransactionPlan,
}

/// Allowance handling, submission and confirmation of swaps for one chain/account.
pub struct SwapExecutor {
    client: Arc<dyn ChainClient>,
    tokens: Arc<TokenMetadataCache>,
    builders: HashMap<Venue, Arc<dyn SwapCallBuilder>>,
    passthrough_gas_limit: u64,
    invalidations: broadcast::Sender<InvalidationEvent>,
    // one pipeline per account at a time
    account_lock: Mutex<()>,
}

impl SwapExecutor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        tokens: Arc<TokenMetadataCache>,
        builders: HashMap<Venue, Arc<dyn SwapCallBuilder>>,
        passthrough_gas_limit: u64,
    ) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            client,
            tokens,
            builders,
            passthrough_gas_limit,
            invalidations,
            account_lock: Mutex::new(()),
        }
    }

    /// Receives one event per confirmed swap.
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.invalidations.subscribe()
    }

    /// Drive `attempt` to `Confirmed` or fail. Nothing is retried automatically.
    #[instrument(skip(self, attempt), fields(attempt_id = %attempt.id, chain_id = self.client.chain_id()))]
    pub async fn execute(&self, mut attempt: SwapAttempt) -> Result<SwapOutcome, DexError> {
        let _guard = self.account_lock.lock().await;

        match self.run(&mut attempt).await {
            Ok((tx_hash, approval_tx_hash, receipt)) => {
                attempt.transition(SwapState::Confirmed);
                self.publish_invalidation(&attempt.request);
                info!("✅ Swap confirmed: {} (block {:?}, gas {})", tx_hash, receipt.block_number, receipt.gas_used);
                Ok(SwapOutcome {
                    attempt_id: attempt.id,
                    tx_hash,
                    approval_tx_hash,
                    receipt,
                    states: attempt.states,
                })
            }
            Err(e) => {
                attempt.transition(SwapState::Failed);
                error!("❌ Swap failed after {:?}: {}", attempt.states, e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        attempt: &mut SwapAttempt,
    ) -> Result<(TxHash, Option<TxHash>, TxReceiptSummary), DexError> {
        let chain_id = self.client.chain_id();
        let token_in = self.resolve_token(&attempt.request.token_in, chain_id).await?;
        let token_out = self.resolve_token(&attempt.request.token_out, chain_id).await?;

        let instruction = attempt.request.instruction.clone().ok_or(DexError::NoRouteProvided)?;
        let prepared = self.prepare(&instruction, &token_in, &token_out)?;
        let owner = self.client.sender().ok_or(DexError::SignerUnavailable(chain_id))?;
        let required = attempt.request.max_amount_in;

        attempt.transition(SwapState::CheckingAllowance);
        let current = erc20::allowance(self.client.as_ref(), token_in.address, owner, prepared.spender).await?;

        let mut approval_tx_hash = None;
        if current < required {
            info!("🔐 Allowance {} below {} for {}, approving {}", current, required, token_in.symbol, prepared.spender);
            attempt.transition(SwapState::Approving);
            let approval_hash = self
                .client
                .submit_transaction(TransactionPlan {
                    to: token_in.address,
                    calldata: erc20::approve_calldata(prepared.spender, required),
                    value: U256::ZERO,
                    gas_limit: None,
                })
                .await?;

            attempt.transition(SwapState::AwaitingApprovalReceipt);
            let approval = self.client.await_receipt(approval_hash).await?;
            if !approval.success {
                return Err(DexError::TransactionFailed(format!("approval {} reverted", approval_hash)));
            }
            approval_tx_hash = Some(approval_hash);
        }

        attempt.transition(SwapState::Submitting);
        let tx_hash = self.client.submit_transaction(prepared.transaction).await?;

        attempt.transition(SwapState::AwaitingReceipt);
        let receipt = self.client.await_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(DexError::TransactionFailed(format!("swap {} reverted", tx_hash)));
        }

        Ok((tx_hash, approval_tx_hash, receipt))
    }

    async fn resolve_token(&self, address: &str, chain_id: u64) -> Result<Token, DexError> {
        match self.tokens.resolve(address, chain_id).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(DexError::InvalidToken(address.to_string())),
            Err(e) => {
                warn!(address, chain_id, "Token resolution failed: {}", e);
                Err(e.into_token_error(address))
            }
        }
    }

    fn prepare(&self, instruction: &SwapInstruction, token_in: &Token, token_out: &Token) -> Result<PreparedSwap, DexError> {
        match instruction {
            SwapInstruction::Router(plan) => {
                plan.path.validate()?;
                let (Some(route_in), Some(route_out)) = (plan.path.token_in(), plan.path.token_out()) else {
                    return Err(DexError::NoRouteProvided);
                };
                if route_in != token_in.address || route_out != token_out.address {
                    return Err(DexError::InvalidToken(format!(
                        "route {} -> {} does not match {} -> {}",
                        route_in, route_out, token_in.symbol, token_out.symbol
                    )));
                }
                let builder = self
                    .builders
                    .get(&plan.venue)
                    .ok_or_else(|| DexError::ConfigError(format!("{} not deployed on chain {}", plan.venue.as_str(), token_in.chain_id)))?;

                Ok(PreparedSwap {
                    spender: builder.router_address(),
                    transaction: TransactionPlan {
                        to: builder.router_address(),
                        calldata: builder.build_swap_call(plan)?,
                        value: U256::ZERO,
                        gas_limit: None,
                    },
                })
            }
            SwapInstruction::Passthrough { to, calldata, value } => {
                if calldata.is_empty() {
                    return Err(DexError::NoRouteProvided);
                }
                Ok(PreparedSwap {
                    spender: *to,
                    transaction: TransactionPlan {
                        to: *to,
                        calldata: Bytes::clone(calldata),
                        value: *value,
                        gas_limit: Some(self.passthrough_gas_limit),
                    },
                })
            }
        }
    }

    fn publish_invalidation(&self, request: &SwapRequest) {
        let tokens = [&request.token_in, &request.token_out]
            .into_iter()
            .filter_map(|address| DexUtils::parse_address(address))
            .collect();

        let event = InvalidationEvent {
            chain_id: self.client.chain_id(),
            tokens,
            scopes: vec![InvalidationScope::Balance, InvalidationScope::TokenBalance, InvalidationScope::Route],
        };

        // no subscribers is fine
        let _ = self.invalidations.send(event);
    }
}
