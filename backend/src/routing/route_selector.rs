use crate::dexes::{DexError, PathEncoding, QuoteSimulator};
use crate::routing::RouteGenerator;
use crate::types::{BestRoute, CandidatePath, QuoteOutcome, Token, TradeDirection};
use alloy::primitives::U256;
use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Picks the best candidate for one (tokenIn, tokenOut, amount, direction) request.
#[derive(Debug, Clone)]
pub struct RouteSelector {
    generator: RouteGenerator,
}

impl RouteSelector {
    pub fn new(generator: RouteGenerator) -> Self {
        Self { generator }
    }

    /// Simulate every candidate concurrently, then compare in enumeration order.
    #[instrument(skip(self, simulator, token_in, token_out), fields(
        venue = simulator.venue().as_str(),
        token_in = %token_in.symbol,
        token_out = %token_out.symbol
    ))]
    pub async fn select_best_route(
        &self,
        simulator: &dyn QuoteSimulator,
        token_in: &Token,
        token_out: &Token,
        amount: U256,
        direction: TradeDirection,
    ) -> Result<BestRoute, DexError> {
        let start_time = Instant::now();

        if token_in.address == token_out.address {
            return Err(DexError::InvalidToken(format!("tokenIn and tokenOut are both {}", token_in.address)));
        }
        if token_in.chain_id != token_out.chain_id {
            return Err(DexError::InvalidToken(format!(
                "tokens on different chains ({} vs {})",
                token_in.chain_id, token_out.chain_id
            )));
        }
        if amount.is_zero() {
            return Err(DexError::InvalidAmount("Amount cannot be zero".into()));
        }

        let capabilities = simulator.venue().capabilities();
        let candidates = self.generator.generate(token_in.address, token_out.address, &capabilities);

        let quote_futures = candidates
            .iter()
            .map(|candidate| simulator.quote_candidate(candidate, amount, direction));
        let outcomes = join_all(quote_futures).await;

        let feasible = outcomes.iter().filter(|o| o.viable_amount().is_some()).count();
        debug!(candidates = candidates.len(), feasible, "Candidate simulations finished");

        let Some((winner, quoted_amount)) = pick_winner(&outcomes, direction) else {
            warn!(
                "❌ No route: all {} candidates infeasible for {} -> {}",
                candidates.len(),
                token_in.symbol,
                token_out.symbol
            );
            return Err(DexError::NoRouteFound {
                token_in: token_in.address.to_string(),
                token_out: token_out.address.to_string(),
            });
        };

        let path: CandidatePath = candidates[winner].clone();
        let gas_estimate = outcomes[winner].gas_estimate();
        let encoded_path = match capabilities.path_encoding {
            PathEncoding::Packed => Some(path.encode_for(direction)?),
            PathEncoding::AddressArray => None,
        };

        info!(
            "✅ Best route via {:?} ({} hops, fees {:?}): {} in {}ms",
            path.kind,
            path.hop_count(),
            path.fees,
            quoted_amount,
            start_time.elapsed().as_millis()
        );

        Ok(BestRoute {
            venue: simulator.venue(),
            direction,
            path,
            quoted_amount,
            gas_estimate,
            encoded_path,
            candidates_considered: candidates.len(),
            candidates_feasible: feasible,
        })
    }
}

/// Index and amount of the winning outcome, or `None` when nothing is viable.
///
/// Exact-input keeps the strictly greatest output, exact-output the strictly
/// smallest input; the earlier candidate keeps a tie. Zero and failed
/// simulations never compete.
pub fn pick_winner(outcomes: &[QuoteOutcome], direction: TradeDirection) -> Option<(usize, U256)> {
    let mut best: Option<(usize, U256)> = None;

    for (index, outcome) in outcomes.iter().enumerate() {
        let Some(amount) = outcome.viable_amount() else {
            continue;
        };

        let better = match (best, direction) {
            (None, _) => true,
            (Some((_, current)), TradeDirection::ExactInput) => amount > current,
            (Some((_, current)), TradeDirection::ExactOutput) => amount < current,
        };
        if better {
            best = Some((index, amount));
        }
    }

    best
}
