//! Packed Uniswap V3 path codec.
//!
//! Layout: `token0 ‖ fee0 ‖ token1 ‖ fee1 ‖ ... ‖ tokenN`, each token a raw
//! 20-byte address and each fee a 3-byte big-endian integer. This is what
//! `Path.sol` in the periphery contracts walks, so any deviation reverts
//! on-chain instead of failing here.

use alloy::primitives::{Address, Bytes};

use crate::dexes::DexError;

pub const ADDR_SIZE: usize = 20;
pub const FEE_SIZE: usize = 3;
const NEXT_OFFSET: usize = ADDR_SIZE + FEE_SIZE;

/// Largest value a `uint24` fee can hold.
pub const MAX_FEE: u32 = 0x00FF_FFFF;

pub fn encode(tokens: &[Address], fees: &[u32]) -> Result<Bytes, DexError> {
    if tokens.len() < 2 || tokens.len() != fees.len() + 1 {
        return Err(DexError::InvalidPath {
            tokens: tokens.len(),
            fees: fees.len(),
        });
    }

    let mut out = Vec::with_capacity(ADDR_SIZE + fees.len() * NEXT_OFFSET);
    out.extend_from_slice(tokens[0].as_slice());
    for (fee, token) in fees.iter().zip(&tokens[1..]) {
        if *fee > MAX_FEE {
            return Err(DexError::InvalidPath {
                tokens: tokens.len(),
                fees: fees.len(),
            });
        }
        out.extend_from_slice(&fee.to_be_bytes()[1..]);
        out.extend_from_slice(token.as_slice());
    }

    Ok(Bytes::from(out))
}

/// Inverse of [`encode`], following the contract's own decoding rule.
pub fn decode(path: &[u8]) -> Result<(Vec<Address>, Vec<u32>), DexError> {
    if path.len() < ADDR_SIZE + NEXT_OFFSET || (path.len() - ADDR_SIZE) % NEXT_OFFSET != 0 {
        return Err(DexError::Decode(format!("malformed packed path of {} bytes", path.len())));
    }

    let hops = (path.len() - ADDR_SIZE) / NEXT_OFFSET;
    let mut tokens = Vec::with_capacity(hops + 1);
    let mut fees = Vec::with_capacity(hops);

    tokens.push(Address::from_slice(&path[..ADDR_SIZE]));
    for hop in 0..hops {
        let fee_start = ADDR_SIZE + hop * NEXT_OFFSET;
        let fee = &path[fee_start..fee_start + FEE_SIZE];
        fees.push(u32::from_be_bytes([0, fee[0], fee[1], fee[2]]));

        let token_start = fee_start + FEE_SIZE;
        tokens.push(Address::from_slice(&path[token_start..token_start + ADDR_SIZE]));
    }

    Ok((tokens, fees))
}
