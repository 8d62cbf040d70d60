use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::dexes::chain_client::{read_call, ChainClient};
use crate::dexes::DexError;

sol! {
    interface IERC20 {
        function symbol() external view returns (string);
        function name() external view returns (string);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

pub async fn symbol(client: &dyn ChainClient, token: Address) -> Result<String, DexError> {
    Ok(read_call(client, token, IERC20::symbolCall {}).await?._0)
}

pub async fn name(client: &dyn ChainClient, token: Address) -> Result<String, DexError> {
    Ok(read_call(client, token, IERC20::nameCall {}).await?._0)
}

pub async fn decimals(client: &dyn ChainClient, token: Address) -> Result<u8, DexError> {
    Ok(read_call(client, token, IERC20::decimalsCall {}).await?._0)
}

pub async fn allowance(
    client: &dyn ChainClient,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, DexError> {
    Ok(read_call(client, token, IERC20::allowanceCall { owner, spender }).await?._0)
}

/// Calldata for `approve(spender, amount)` on the token contract.
pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    Bytes::from(IERC20::approveCall { spender, amount }.abi_encode())
}
