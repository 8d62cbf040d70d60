use crate::config::{AppConfig, ChainDeployment};
use crate::dexes::{
    ChainClient, DexError, DexUtils, ProviderCache, QuoteSimulator, RpcChainClient, SwapCallBuilder,
    UniswapV2Dex, UniswapV3Dex, Venue,
};
use crate::execution::{InvalidationEvent, SwapAttempt, SwapExecutor, SwapOutcome, SwapRequest};
use crate::routing::{QuoteKey, QuoteScheduler, RouteGenerator, RouteSelector};
use crate::token_registry::TokenMetadataCache;
use crate::types::{
    BestRoute, MethodParameters, RouteResponse, SwapInstruction, SwapParams, SwapPlan, Token, TradeDirection,
};
use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// The route API quotes with a 30 minute deadline; direct swaps use the configured one.
const ROUTE_API_DEADLINE_SECS: u64 = 1800;

/// Everything needed to quote and swap on one chain.
pub struct ChainContext {
    pub deployment: ChainDeployment,
    pub client: Arc<dyn ChainClient>,
    pub v2: Arc<UniswapV2Dex>,
    pub v3: Arc<UniswapV3Dex>,
    pub selector: RouteSelector,
    pub executor: SwapExecutor,
}

impl ChainContext {
    pub fn simulator(&self, venue: Venue) -> &dyn QuoteSimulator {
        match venue {
            Venue::UniswapV2 => self.v2.as_ref(),
            Venue::UniswapV3 => self.v3.as_ref(),
        }
    }

    pub fn call_builder(&self, venue: Venue) -> &dyn SwapCallBuilder {
        match venue {
            Venue::UniswapV2 => self.v2.as_ref(),
            Venue::UniswapV3 => self.v3.as_ref(),
        }
    }
}

/// Route selection and swap execution across the configured chains.
pub struct SwapAggregator {
    chains: HashMap<u64, ChainContext>,
    tokens: Arc<TokenMetadataCache>,
    scheduler: QuoteScheduler,
    default_chain_id: u64,
    swap_deadline_secs: u64,
    default_slippage_bps: u16,
}

impl SwapAggregator {
    /// Builds JSON-RPC clients for every configured deployment.
    pub fn new(config: &AppConfig) -> Result<Self, DexError> {
        let rpc_endpoints: HashMap<u64, Vec<String>> = config
            .deployments
            .values()
            .map(|deployment| (deployment.chain_id, deployment.rpc_urls.clone()))
            .collect();
        let providers = ProviderCache::new(rpc_endpoints);

        let signer = match &config.private_key {
            Some(key) => Some(
                PrivateKeySigner::from_str(key.trim())
                    .map_err(|e| DexError::ConfigError(format!("Invalid PRIVATE_KEY: {}", e)))?,
            ),
            None => {
                warn!("⚠️ PRIVATE_KEY not set, swaps will be rejected");
                None
            }
        };

        let clients = config
            .deployments
            .keys()
            .map(|chain_id| {
                let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(
                    *chain_id,
                    providers.clone(),
                    signer.clone(),
                    config.receipt_poll_interval,
                    config.receipt_timeout,
                ));
                (*chain_id, client)
            })
            .collect();

        Self::with_clients(config, clients)
    }

    /// Wires the engine on top of caller-supplied chain clients.
    pub fn with_clients(config: &AppConfig, clients: HashMap<u64, Arc<dyn ChainClient>>) -> Result<Self, DexError> {
        let default_slippage_bps = DexUtils::parse_slippage_bps(&config.default_slippage_percent)
            .map_err(|e| DexError::ConfigError(e.to_string()))?;
        let tokens = Arc::new(TokenMetadataCache::new(clients.clone()));

        let mut chains = HashMap::new();
        for (chain_id, client) in clients {
            let deployment = config
                .deployments
                .get(&chain_id)
                .cloned()
                .ok_or_else(|| DexError::UnsupportedChain(format!("No deployment for chain {}", chain_id)))?;

            let v2 = Arc::new(UniswapV2Dex::new(client.clone(), deployment.v2_router));
            let v3 = Arc::new(UniswapV3Dex::new(client.clone(), deployment.v3_quoter, deployment.v3_swap_router));

            let mut builders: HashMap<Venue, Arc<dyn SwapCallBuilder>> = HashMap::new();
            builders.insert(Venue::UniswapV2, v2.clone());
            builders.insert(Venue::UniswapV3, v3.clone());

            let selector = RouteSelector::new(RouteGenerator::new(
                deployment.wrapped_native,
                deployment.common_intermediates.clone(),
            ));
            let executor = SwapExecutor::new(client.clone(), tokens.clone(), builders, config.swap_gas_limit);

            info!("✅ Chain {} ready (V2 router {}, V3 quoter {})", chain_id, v2.router_address(), v3.quoter_address());
            chains.insert(
                chain_id,
                ChainContext {
                    deployment,
                    client,
                    v2,
                    v3,
                    selector,
                    executor,
                },
            );
        }

        if !chains.contains_key(&config.default_chain_id) {
            return Err(DexError::UnsupportedChain(format!(
                "Default chain {} has no client",
                config.default_chain_id
            )));
        }

        Ok(Self {
            chains,
            tokens,
            scheduler: QuoteScheduler::new(config.quote_debounce, config.quote_max_attempts),
            default_chain_id: config.default_chain_id,
            swap_deadline_secs: config.swap_deadline_secs,
            default_slippage_bps,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenMetadataCache> {
        &self.tokens
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_chain_id
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn chain(&self, chain_id: Option<u64>) -> Result<&ChainContext, DexError> {
        let chain_id = chain_id.unwrap_or(self.default_chain_id);
        self.chains
            .get(&chain_id)
            .ok_or_else(|| DexError::UnsupportedChain(chain_id.to_string()))
    }

    /// Post-swap invalidation events for `chain_id`.
    pub fn subscribe_invalidations(&self, chain_id: Option<u64>) -> Result<broadcast::Receiver<InvalidationEvent>, DexError> {
        Ok(self.chain(chain_id)?.executor.subscribe())
    }

    pub fn quote_key(
        &self,
        client: &str,
        chain_id: Option<u64>,
        token_in: &str,
        token_out: &str,
        direction: TradeDirection,
    ) -> QuoteKey {
        QuoteKey {
            client: client.to_string(),
            chain_id: chain_id.unwrap_or(self.default_chain_id),
            token_in: DexUtils::parse_address(token_in).unwrap_or_default(),
            token_out: DexUtils::parse_address(token_out).unwrap_or_default(),
            direction,
        }
    }

    /// Run a quote through the debounce/supersede scheduler.
    pub async fn scheduled<T, F, Fut>(&self, key: QuoteKey, operation: F) -> Result<T, DexError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DexError>>,
    {
        self.scheduler.run(key, operation).await
    }

    /// Both tokens resolved, distinct and on a served chain, before any simulation.
    pub async fn resolve_pair(&self, token_in: &str, token_out: &str, chain_id: u64) -> Result<(Token, Token), DexError> {
        let (token_in, token_out) = tokio::try_join!(
            self.resolve_token(token_in, chain_id),
            self.resolve_token(token_out, chain_id),
        )?;
        DexUtils::validate_token_pair_addresses(&token_in.address, &token_out.address)?;
        Ok((token_in, token_out))
    }

    async fn resolve_token(&self, address: &str, chain_id: u64) -> Result<Token, DexError> {
        match self.tokens.resolve(address, chain_id).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(DexError::InvalidToken(format!("Malformed address: {}", address))),
            Err(e) => Err(e.into_token_error(address)),
        }
    }

    /// Winning route for a human-decimal `amount` (input for exact-input, output for exact-output).
    #[instrument(skip(self))]
    pub async fn get_best_route(
        &self,
        token_in: &str,
        token_out: &str,
        amount: &str,
        direction: TradeDirection,
        chain_id: Option<u64>,
        venue: Venue,
    ) -> Result<(BestRoute, Token, Token), DexError> {
        let chain = self.chain(chain_id)?;
        let (token_in, token_out) = self.resolve_pair(token_in, token_out, chain.deployment.chain_id).await?;

        let decimals = match direction {
            TradeDirection::ExactInput => token_in.decimals,
            TradeDirection::ExactOutput => token_out.decimals,
        };
        let amount = DexUtils::parse_amount_safe(amount, decimals)?;
        DexUtils::validate_amount(amount)?;

        let route = chain
            .selector
            .select_best_route(chain.simulator(venue), &token_in, &token_out, amount, direction)
            .await?;
        Ok((route, token_in, token_out))
    }

    /// Formatted output for `amount_in`, `None` when no candidate is viable.
    pub async fn get_amounts_out(
        &self,
        amount_in: &str,
        token_in: &str,
        token_out: &str,
        chain_id: Option<u64>,
        venue: Venue,
    ) -> Result<Option<String>, DexError> {
        match self
            .get_best_route(token_in, token_out, amount_in, TradeDirection::ExactInput, chain_id, venue)
            .await
        {
            Ok((route, _, token_out)) => Ok(Some(DexUtils::format_amount_safe(route.quoted_amount, token_out.decimals))),
            Err(DexError::NoRouteFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Formatted input required for `amount_out`, `None` when no candidate is viable.
    pub async fn get_amounts_in(
        &self,
        amount_out: &str,
        token_in: &str,
        token_out: &str,
        chain_id: Option<u64>,
        venue: Venue,
    ) -> Result<Option<String>, DexError> {
        match self
            .get_best_route(token_in, token_out, amount_out, TradeDirection::ExactOutput, chain_id, venue)
            .await
        {
            Ok((route, token_in, _)) => Ok(Some(DexUtils::format_amount_safe(route.quoted_amount, token_in.decimals))),
            Err(DexError::NoRouteFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Exact-input V3 route with SwapRouter02 method parameters for `recipient`.
    #[instrument(skip(self))]
    pub async fn get_route(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
        slippage_bps: Option<u16>,
        recipient: Option<Address>,
        chain_id: Option<u64>,
    ) -> Result<RouteResponse, DexError> {
        let slippage_bps = slippage_bps.unwrap_or(self.default_slippage_bps);
        let (route, token_in, token_out) = self
            .get_best_route(token_in, token_out, amount_in, TradeDirection::ExactInput, chain_id, Venue::UniswapV3)
            .await?;

        let amount_in = DexUtils::parse_amount_safe(amount_in, token_in.decimals)?;
        let minimum_received = DexUtils::calculate_min_amount_out(route.quoted_amount, slippage_bps);
        let quote = DexUtils::format_amount_safe(route.quoted_amount, token_out.decimals);
        let execution_price =
            DexUtils::format_price(route.quoted_amount, token_out.decimals, amount_in, token_in.decimals)?;

        let method_parameters = match recipient {
            Some(recipient) => {
                let chain = self.chain(Some(token_in.chain_id))?;
                let plan = SwapPlan {
                    venue: Venue::UniswapV3,
                    direction: TradeDirection::ExactInput,
                    path: route.path.clone(),
                    amount_specified: amount_in,
                    amount_limit: minimum_received,
                    recipient,
                    deadline: Self::deadline_from_now(ROUTE_API_DEADLINE_SECS),
                };
                let builder = chain.call_builder(Venue::UniswapV3);
                Some(method_parameters(builder.router_address(), builder.build_swap_call(&plan)?, U256::ZERO))
            }
            None => None,
        };

        Ok(RouteResponse {
            success: true,
            quote: quote.clone(),
            quote_currency: token_out.symbol.clone(),
            estimated_gas_used: route.gas_estimate.map(|gas| gas.to_string()),
            input_amount: DexUtils::format_amount_safe(amount_in, token_in.decimals),
            output_amount: quote,
            execution_price,
            minimum_received: DexUtils::format_amount_safe(minimum_received, token_out.decimals),
            path: route.path.tokens.iter().map(|token| token.to_checksum(None)).collect(),
            fees: route.fees().to_vec(),
            method_parameters,
        })
    }

    /// Exact-input swap: re-derives the best route and requires at least `amount_out_min`.
    #[allow(clippy::too_many_arguments)]
    pub async fn swap_exact_input(
        &self,
        amount_in: &str,
        amount_out_min: &str,
        token_in: &str,
        token_out: &str,
        recipient: &str,
        chain_id: Option<u64>,
        venue: Venue,
    ) -> Result<SwapOutcome, DexError> {
        let recipient = DexUtils::require_address(recipient, "recipient")?;
        let (route, token_in, token_out) = self
            .get_best_route(token_in, token_out, amount_in, TradeDirection::ExactInput, chain_id, venue)
            .await?;

        let amount_in = DexUtils::parse_amount_safe(amount_in, token_in.decimals)?;
        let amount_out_min = DexUtils::parse_amount_safe(amount_out_min, token_out.decimals)?;
        if route.quoted_amount < amount_out_min {
            warn!("Quoted {} below requested minimum {}, submitting anyway", route.quoted_amount, amount_out_min);
        }

        let plan = SwapPlan {
            venue,
            direction: TradeDirection::ExactInput,
            path: route.path,
            amount_specified: amount_in,
            amount_limit: amount_out_min,
            recipient,
            deadline: Self::deadline_from_now(self.swap_deadline_secs),
        };
        self.execute(&token_in, &token_out, amount_in, Some(SwapInstruction::Router(plan))).await
    }

    /// Exact-output swap: re-derives the exact-output route and spends at most `amount_in_max`.
    #[allow(clippy::too_many_arguments)]
    pub async fn swap_exact_output(
        &self,
        amount_out: &str,
        amount_in_max: &str,
        token_in: &str,
        token_out: &str,
        recipient: &str,
        chain_id: Option<u64>,
        venue: Venue,
    ) -> Result<SwapOutcome, DexError> {
        let recipient = DexUtils::require_address(recipient, "recipient")?;
        let (route, token_in, token_out) = self
            .get_best_route(token_in, token_out, amount_out, TradeDirection::ExactOutput, chain_id, venue)
            .await?;

        let amount_out = DexUtils::parse_amount_safe(amount_out, token_out.decimals)?;
        let amount_in_max = DexUtils::parse_amount_safe(amount_in_max, token_in.decimals)?;
        if route.quoted_amount > amount_in_max {
            warn!("Quoted input {} above allowed maximum {}, submitting anyway", route.quoted_amount, amount_in_max);
        }

        let plan = SwapPlan {
            venue,
            direction: TradeDirection::ExactOutput,
            path: route.path,
            amount_specified: amount_out,
            amount_limit: amount_in_max,
            recipient,
            deadline: Self::deadline_from_now(self.swap_deadline_secs),
        };
        self.execute(&token_in, &token_out, amount_in_max, Some(SwapInstruction::Router(plan))).await
    }

    /// Submits caller-supplied calldata after the allowance step.
    pub async fn swap_passthrough(
        &self,
        amount_in: &str,
        token_in: &str,
        token_out: &str,
        method_parameters: &MethodParameters,
        chain_id: Option<u64>,
    ) -> Result<SwapOutcome, DexError> {
        let chain = self.chain(chain_id)?;
        let (token_in, token_out) = self.resolve_pair(token_in, token_out, chain.deployment.chain_id).await?;
        let amount_in = DexUtils::parse_amount_safe(amount_in, token_in.decimals)?;

        let to = DexUtils::require_address(&method_parameters.to, "methodParameters.to")?;
        let calldata = Bytes::from_str(&method_parameters.calldata)
            .map_err(|e| DexError::InvalidCalldata(format!("methodParameters.calldata: {}", e)))?;
        let value = U256::from_str(&method_parameters.value)
            .map_err(|e| DexError::InvalidCalldata(format!("methodParameters.value: {}", e)))?;

        let instruction = SwapInstruction::Passthrough { to, calldata, value };
        self.execute(&token_in, &token_out, amount_in, Some(instruction)).await
    }

    /// Dispatch a `POST /swap` body.
    pub async fn swap(&self, params: &SwapParams) -> Result<SwapOutcome, DexError> {
        let venue = params.venue.unwrap_or_default();
        if let Some(method_parameters) = &params.method_parameters {
            return self
                .swap_passthrough(&params.amount_in, &params.token_in, &params.token_out, method_parameters, params.chain_id)
                .await;
        }

        match params.direction {
            TradeDirection::ExactInput => {
                self.swap_exact_input(
                    &params.amount_in,
                    &params.amount_out,
                    &params.token_in,
                    &params.token_out,
                    &params.recipient,
                    params.chain_id,
                    venue,
                )
                .await
            }
            TradeDirection::ExactOutput => {
                self.swap_exact_output(
                    &params.amount_out,
                    &params.amount_in,
                    &params.token_in,
                    &params.token_out,
                    &params.recipient,
                    params.chain_id,
                    venue,
                )
                .await
            }
        }
    }

    async fn execute(
        &self,
        token_in: &Token,
        token_out: &Token,
        max_amount_in: U256,
        instruction: Option<SwapInstruction>,
    ) -> Result<SwapOutcome, DexError> {
        let chain = self.chain(Some(token_in.chain_id))?;
        let attempt = SwapAttempt::new(SwapRequest {
            token_in: token_in.address.to_string(),
            token_out: token_out.address.to_string(),
            max_amount_in,
            instruction,
        });
        chain.executor.execute(attempt).await
    }

    fn deadline_from_now(secs: u64) -> u64 {
        (chrono::Utc::now().timestamp().max(0) as u64).saturating_add(secs)
    }
}

fn method_parameters(to: Address, calldata: Bytes, value: U256) -> MethodParameters {
    MethodParameters {
        calldata: calldata.to_string(),
        value: if value.is_zero() { "0x00".to_string() } else { format!("0x{:x}", value) },
        to: to.to_checksum(None),
    }
}
