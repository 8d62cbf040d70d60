use alloy::primitives::Address;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::dexes::{erc20, ChainClient, DexError, DexUtils};
use crate::types::Token;

/// Addresses are compared as raw bytes, so the key is case-insensitive.
type CacheKey = (u64, Address);

/// Process-lifetime ERC-20 metadata cache. No TTL; entries only go away on [`TokenMetadataCache::clear`].
///
/// Each key owns a `OnceCell`, so concurrent first lookups of the same token
/// share one in-flight fetch. A failed fetch drops the empty cell, so junk
/// addresses leave nothing behind and the next caller retries.
pub struct TokenMetadataCache {
    clients: HashMap<u64, Arc<dyn ChainClient>>,
    entries: DashMap<CacheKey, Arc<OnceCell<Token>>>,
}

impl TokenMetadataCache {
    pub fn new(clients: HashMap<u64, Arc<dyn ChainClient>>) -> Self {
        Self {
            clients,
            entries: DashMap::new(),
        }
    }

    /// `Ok(None)` for anything that is not a well-formed address; no I/O is attempted.
    pub async fn resolve(&self, address: &str, chain_id: u64) -> Result<Option<Token>, DexError> {
        match DexUtils::parse_address(address) {
            Some(parsed) => self.resolve_address(parsed, chain_id).await.map(Some),
            None => {
                debug!(address, chain_id, "Rejecting malformed token address");
                Ok(None)
            }
        }
    }

    pub async fn resolve_address(&self, address: Address, chain_id: u64) -> Result<Token, DexError> {
        let client = self
            .clients
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| DexError::UnsupportedChain(chain_id.to_string()))?;

        let key = (chain_id, address);
        // guard dropped before any await
        let cell = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(token) = cell.get() {
            return Ok(token.clone());
        }

        match cell.get_or_try_init(|| Self::fetch_metadata(client, address)).await {
            Ok(token) => Ok(token.clone()),
            Err(e) => {
                // only our own cell, and only while nobody has filled it since
                self.entries
                    .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell) && !current.initialized());
                Err(e)
            }
        }
    }

    /// Lookup without I/O.
    pub fn get_cached(&self, address: &str, chain_id: u64) -> Option<Token> {
        let parsed = DexUtils::parse_address(address)?;
        self.entries
            .get(&(chain_id, parsed))
            .and_then(|cell| cell.get().cloned())
    }

    pub fn clear(&self) {
        let count = self.len();
        self.entries.clear();
        info!("🧹 Cleared {} cached tokens", count);
    }

    /// Number of fully resolved entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map entries including lookups still in flight.
    pub fn tracked_entries(&self) -> usize {
        self.entries.len()
    }

    async fn fetch_metadata(client: Arc<dyn ChainClient>, address: Address) -> Result<Token, DexError> {
        let chain_id = client.chain_id();
        let client = client.as_ref();

        let (symbol, name, decimals) = tokio::try_join!(
            erc20::symbol(client, address),
            erc20::name(client, address),
            erc20::decimals(client, address),
        )
        .map_err(|e| {
            warn!(%address, chain_id, "Token metadata fetch failed: {}", e);
            e
        })?;

        info!("✅ Resolved token {} ({} decimals) at {} on chain {}", symbol, decimals, address, chain_id);
        Ok(Token {
            chain_id,
            address,
            symbol,
            name,
            decimals,
        })
    }
}
