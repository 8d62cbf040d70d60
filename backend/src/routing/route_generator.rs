use crate::dexes::VenueCapabilities;
use crate::types::{CandidateKind, CandidatePath};
use alloy::primitives::Address;
use tracing::debug;

/// Enumerates candidate paths in a fixed order: direct tiers, wrapped-native
/// fee pairs, then common intermediates. The order decides ties downstream.
#[derive(Debug, Clone)]
pub struct RouteGenerator {
    wrapped_native: Address,
    common_intermediates: Vec<Address>,
}

impl RouteGenerator {
    pub fn new(wrapped_native: Address, common_intermediates: Vec<Address>) -> Self {
        Self {
            wrapped_native,
            common_intermediates,
        }
    }

    pub fn generate(
        &self,
        token_in: Address,
        token_out: Address,
        capabilities: &VenueCapabilities,
    ) -> Vec<CandidatePath> {
        let mut candidates = Vec::new();

        // 1. Direct routes, one per fee tier (or one feeless hop)
        if capabilities.supports_fee_tiers() {
            for fee in &capabilities.fee_tiers {
                candidates.push(CandidatePath::direct(token_in, token_out, Some(*fee)));
            }
        } else {
            candidates.push(CandidatePath::direct(token_in, token_out, None));
        }

        // 2. Through wrapped native, unless it is already an endpoint
        if token_in != self.wrapped_native && token_out != self.wrapped_native {
            self.push_two_hop(&mut candidates, token_in, self.wrapped_native, token_out, CandidateKind::WrappedNative, capabilities);
        }

        // 3. Other well-known intermediates
        if capabilities.uses_common_intermediates {
            let mut seen = Vec::with_capacity(self.common_intermediates.len());
            for intermediate in &self.common_intermediates {
                if *intermediate == token_in
                    || *intermediate == token_out
                    || *intermediate == self.wrapped_native
                    || seen.contains(intermediate)
                {
                    continue;
                }
                seen.push(*intermediate);
                self.push_two_hop(&mut candidates, token_in, *intermediate, token_out, CandidateKind::CommonIntermediate, capabilities);
            }
        }

        debug!(%token_in, %token_out, candidates = candidates.len(), "Generated candidate paths");
        candidates
    }

    fn push_two_hop(
        &self,
        candidates: &mut Vec<CandidatePath>,
        token_in: Address,
        intermediate: Address,
        token_out: Address,
        kind: CandidateKind,
        capabilities: &VenueCapabilities,
    ) {
        if capabilities.supports_fee_tiers() {
            for pair in &capabilities.multi_hop_fee_pairs {
                candidates.push(CandidatePath::via(token_in, intermediate, token_out, Some(*pair), kind));
            }
        } else {
            candidates.push(CandidatePath::via(token_in, intermediate, token_out, None, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const TOKEN_IN: Address = address!("1111111111111111111111111111111111111111");
    const TOKEN_OUT: Address = address!("2222222222222222222222222222222222222222");
    const WETH: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
    const DAI: Address = address!("dadadadadadadadadadadadadadadadadadadada");

    fn generator() -> RouteGenerator {
        RouteGenerator::new(WETH, vec![DAI, WETH, TOKEN_IN, DAI])
    }

    #[test]
    fn test_fee_tiered_enumeration_order() {
        let candidates = generator().generate(TOKEN_IN, TOKEN_OUT, &VenueCapabilities::fee_tiered());

        // 3 direct tiers + 5 wrapped-native pairs, no intermediates on this venue
        assert_eq!(candidates.len(), 8);
        let direct_fees: Vec<u32> = candidates[..3].iter().map(|c| c.fees[0]).collect();
        assert_eq!(direct_fees, vec![500, 3000, 10000]);

        let pairs: Vec<(u32, u32)> = candidates[3..].iter().map(|c| (c.fees[0], c.fees[1])).collect();
        assert_eq!(pairs, vec![(500, 500), (500, 3000), (3000, 500), (3000, 3000), (3000, 10000)]);
        assert!(candidates[3..].iter().all(|c| c.tokens == vec![TOKEN_IN, WETH, TOKEN_OUT]));
    }

    #[test]
    fn test_constant_fee_enumeration_skips_endpoint_and_native_intermediates() {
        let candidates = generator().generate(TOKEN_IN, TOKEN_OUT, &VenueCapabilities::constant_fee());

        let kinds: Vec<CandidateKind> = candidates.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CandidateKind::Direct, CandidateKind::WrappedNative, CandidateKind::CommonIntermediate]);
        assert_eq!(candidates[2].tokens, vec![TOKEN_IN, DAI, TOKEN_OUT]);
        assert!(candidates.iter().all(|c| c.fees.is_empty()));
    }

    #[test]
    fn test_no_wrapped_native_leg_when_endpoint_is_native() {
        for (token_in, token_out) in [(WETH, TOKEN_OUT), (TOKEN_IN, WETH)] {
            for capabilities in [VenueCapabilities::fee_tiered(), VenueCapabilities::constant_fee()] {
                let candidates = generator().generate(token_in, token_out, &capabilities);
                assert!(candidates.iter().all(|c| c.kind != CandidateKind::WrappedNative));
                assert!(candidates.iter().all(|c| c.tokens.len() == 2 || c.tokens[1] != WETH));
            }
        }
    }
}
