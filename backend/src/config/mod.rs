mod logging;
pub use logging::{default_log_filter, init_logging};

use alloy::primitives::{address, Address};
use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::Chain;

/// Contracts and well-known tokens for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDeployment {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub wrapped_native: Address,
    pub v2_router: Address,
    pub v3_quoter: Address,
    pub v3_swap_router: Address,
    /// Deep-liquidity tokens tried as a middle hop on constant-fee venues.
    pub common_intermediates: Vec<Address>,
}

impl ChainDeployment {
    pub fn sepolia() -> Self {
        Self {
            chain_id: Chain::Sepolia.id(),
            rpc_urls: vec![
                "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                "https://rpc.sepolia.org".to_string(),
            ],
            wrapped_native: address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14"),
            v2_router: address!("eE567Fe1712Faf6149d80dA1E6934E354124CfE3"),
            v3_quoter: address!("Ed1f6473345F45b75F8179591dd5bA1888cf2FB3"),
            v3_swap_router: address!("3bFA4769FB09eefC5a80d6E87c3B9C650f7Ae48E"),
            common_intermediates: vec![
                address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"), // USDC
                address!("779877A7B0D9E8603169DdbD7836e478b4624789"), // LINK
            ],
        }
    }

    pub fn ethereum() -> Self {
        Self {
            chain_id: Chain::Ethereum.id(),
            rpc_urls: vec![
                "https://ethereum-rpc.publicnode.com".to_string(),
                "https://eth.llamarpc.com".to_string(),
            ],
            wrapped_native: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            v2_router: address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
            v3_quoter: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
            v3_swap_router: address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"),
            common_intermediates: vec![
                address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), // USDC
                address!("dAC17F958D2ee523a2206206994597C13D831ec7"), // USDT
                address!("6B175474E89094C44Da98b954EedeAC495271d0F"), // DAI
            ],
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::sepolia(), Self::ethereum()]
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub default_chain_id: u64,
    pub deployments: HashMap<u64, ChainDeployment>,
    /// Hex private key used to sign swaps; swaps are rejected without one.
    pub private_key: Option<String>,
    pub quote_debounce: Duration,
    pub quote_max_attempts: u32,
    pub swap_deadline_secs: u64,
    pub swap_gas_limit: u64,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
    pub default_slippage_percent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_chain_id: Chain::Sepolia.id(),
            deployments: ChainDeployment::builtin()
                .into_iter()
                .map(|deployment| (deployment.chain_id, deployment))
                .collect(),
            private_key: None,
            quote_debounce: Duration::from_millis(500),
            quote_max_attempts: 3,
            swap_deadline_secs: 1200,
            swap_gas_limit: 8_000_000,
            receipt_poll_interval: Duration::from_millis(1000),
            receipt_timeout: Duration::from_secs(180),
            default_slippage_percent: "0.5".to_string(),
        }
    }
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    dotenv::dotenv().ok();

    let defaults = AppConfig::default();

    let host = env::var("HOST").unwrap_or(defaults.host);
    host.parse::<std::net::IpAddr>()
        .with_context(|| format!("Invalid HOST: {}", host))?;

    let mut deployments = defaults.deployments;
    for deployment in deployments.values_mut() {
        let Some(chain) = Chain::from_id(deployment.chain_id) else {
            continue;
        };
        let var = format!("RPC_URLS_{}", chain.as_str().to_uppercase());
        if let Ok(urls) = env::var(&var) {
            let urls: Vec<String> = urls
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect();
            if urls.is_empty() {
                return Err(anyhow!("{} is set but contains no URLs", var));
            }
            deployment.rpc_urls = urls;
        }
    }

    let default_chain_id = parse_var("DEFAULT_CHAIN_ID", defaults.default_chain_id)?;
    if !deployments.contains_key(&default_chain_id) {
        return Err(anyhow!("DEFAULT_CHAIN_ID {} has no deployment", default_chain_id));
    }

    let quote_max_attempts = parse_var("QUOTE_MAX_ATTEMPTS", defaults.quote_max_attempts)?;
    if quote_max_attempts == 0 {
        return Err(anyhow!("QUOTE_MAX_ATTEMPTS must be > 0"));
    }

    Ok(AppConfig {
        host,
        port: parse_var("PORT", defaults.port)?,
        default_chain_id,
        deployments,
        private_key: env::var("PRIVATE_KEY").ok().filter(|key| !key.trim().is_empty()),
        quote_debounce: Duration::from_millis(parse_var("QUOTE_DEBOUNCE_MS", 500u64)?),
        quote_max_attempts,
        swap_deadline_secs: parse_var("SWAP_DEADLINE_SECS", defaults.swap_deadline_secs)?,
        swap_gas_limit: parse_var("SWAP_GAS_LIMIT", defaults.swap_gas_limit)?,
        receipt_poll_interval: Duration::from_millis(parse_var("RECEIPT_POLL_INTERVAL_MS", 1000u64)?),
        receipt_timeout: Duration::from_secs(parse_var("RECEIPT_TIMEOUT_SECS", 180u64)?),
        default_slippage_percent: env::var("DEFAULT_SLIPPAGE_PERCENT").unwrap_or(defaults.default_slippage_percent),
    })
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}={}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}
