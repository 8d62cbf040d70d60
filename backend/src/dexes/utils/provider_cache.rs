use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};
use crate::dexes::DexError;

/// Cached providers live this long before being checked again.
const PROVIDER_TTL: Duration = Duration::from_secs(300);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider cache with health monitoring and fallback logic
#[derive(Clone)]
pub struct ProviderCache {
    providers: Arc<RwLock<HashMap<u64, CachedProvider>>>,
    rpc_endpoints: HashMap<u64, Vec<String>>,
    health_tracker: Arc<RwLock<HashMap<String, ProviderHealth>>>,
}

#[derive(Clone)]
struct CachedProvider {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
    created_at: Instant,
}

#[derive(Clone, Debug)]
struct ProviderHealth {
    success_rate: f32,
    last_failure: Option<Instant>,
    consecutive_failures: u32,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self {
            success_rate: 1.0,
            last_failure: None,
            consecutive_failures: 0,
        }
    }
}

impl ProviderCache {
    /// `rpc_endpoints` maps chain id to endpoints in preference order.
    pub fn new(rpc_endpoints: HashMap<u64, Vec<String>>) -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            rpc_endpoints,
            health_tracker: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn supports_chain(&self, chain_id: u64) -> bool {
        self.rpc_endpoints.get(&chain_id).map(|e| !e.is_empty()).unwrap_or(false)
    }

    /// Get provider for chain with automatic fallback and health monitoring
    pub async fn get_provider(&self, chain_id: u64) -> Result<RootProvider<Http<Client>>, DexError> {
        // Try to get cached provider first
        if let Some(provider) = self.get_cached_provider(chain_id) {
            return Ok(provider);
        }

        // Get RPC endpoints for chain
        let endpoints = self.rpc_endpoints.get(&chain_id)
            .ok_or_else(|| DexError::UnsupportedChain(format!("No RPCs configured for chain: {}", chain_id)))?;

        // Try each endpoint with health-based ordering
        let ordered_endpoints = self.order_endpoints_by_health(chain_id, endpoints);

        for (i, rpc_url) in ordered_endpoints.iter().enumerate() {
            match self.create_provider(rpc_url).await {
                Ok(provider) => {
                    // Cache the successful provider
                    self.cache_provider(chain_id, provider.clone(), rpc_url);
                    self.update_health_success(chain_id, rpc_url);
                    return Ok(provider);
                }
                Err(e) => {
                    warn!(chain_id, rpc_url = %rpc_url, "RPC endpoint health check failed: {}", e);
                    self.update_health_failure(chain_id, rpc_url);

                    // If not the last endpoint, wait before trying next
                    if i < ordered_endpoints.len() - 1 {
                        sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        Err(DexError::Rpc(format!("All RPC endpoints failed for chain: {}", chain_id)))
    }

    /// Drop the cached provider after a transport failure so the next call reconnects.
    pub fn report_failure(&self, chain_id: u64) {
        let evicted = self.providers.write().ok().and_then(|mut providers| providers.remove(&chain_id));
        if let Some(cached) = evicted {
            debug!(chain_id, rpc_url = %cached.rpc_url, "Evicting provider after transport failure");
            self.update_health_failure(chain_id, &cached.rpc_url);
        }
    }

    /// Create a new provider from RPC URL
    async fn create_provider(&self, rpc_url: &str) -> Result<RootProvider<Http<Client>>, DexError> {
        let parsed_url = rpc_url.parse()
            .map_err(|e| DexError::ConfigError(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let provider = ProviderBuilder::new().on_http(parsed_url);

        // Test the provider with a simple call
        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, provider.get_block_number()).await {
            Ok(Ok(_)) => Ok(provider),
            Ok(Err(e)) => Err(DexError::Rpc(format!("Provider test failed: {}", e))),
            Err(_) => Err(DexError::Timeout(format!("Provider health check of {}", rpc_url))),
        }
    }

    /// Get cached provider if available and not expired
    fn get_cached_provider(&self, chain_id: u64) -> Option<RootProvider<Http<Client>>> {
        let providers = self.providers.read().ok()?;
        let cached = providers.get(&chain_id)?;
        if cached.created_at.elapsed() < PROVIDER_TTL {
            Some(cached.provider.clone())
        } else {
            None
        }
    }

    fn cache_provider(&self, chain_id: u64, provider: RootProvider<Http<Client>>, rpc_url: &str) {
        if let Ok(mut providers) = self.providers.write() {
            providers.insert(chain_id, CachedProvider {
                provider,
                rpc_url: rpc_url.to_string(),
                created_at: Instant::now(),
            });
        }
    }

    /// Order endpoints by health score (best first). Stable, so configured order breaks ties.
    fn order_endpoints_by_health(&self, chain_id: u64, endpoints: &[String]) -> Vec<String> {
        let health = self.health_tracker.read().ok();
        let mut scored_endpoints: Vec<(String, f32)> = endpoints.iter().map(|url| {
            let score = health
                .as_ref()
                .and_then(|h| h.get(&Self::health_key(chain_id, url)).map(Self::calculate_health_score))
                .unwrap_or(1.0);
            (url.clone(), score)
        }).collect();

        scored_endpoints.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored_endpoints.into_iter().map(|(url, _)| url).collect()
    }

    /// Calculate health score from 0.0 (worst) to 1.0 (best)
    fn calculate_health_score(health: &ProviderHealth) -> f32 {
        let mut score = health.success_rate;

        // Penalize recent failures
        if let Some(last_failure) = health.last_failure {
            if last_failure.elapsed() < Duration::from_secs(60) {
                score *= 0.5;
            }
        }

        if health.consecutive_failures > 0 {
            score *= 0.9_f32.powi(health.consecutive_failures as i32);
        }

        score.clamp(0.0, 1.0)
    }

    fn health_key(chain_id: u64, rpc_url: &str) -> String {
        format!("{}:{}", chain_id, rpc_url)
    }

    fn update_health_success(&self, chain_id: u64, rpc_url: &str) {
        if let Ok(mut health) = self.health_tracker.write() {
            let entry = health.entry(Self::health_key(chain_id, rpc_url)).or_default();
            // exponential moving average
            entry.success_rate = entry.success_rate * 0.9 + 0.1;
            entry.consecutive_failures = 0;
        }
    }

    fn update_health_failure(&self, chain_id: u64, rpc_url: &str) {
        if let Ok(mut health) = self.health_tracker.write() {
            let entry = health.entry(Self::health_key(chain_id, rpc_url)).or_default();
            entry.success_rate *= 0.9;
            entry.last_failure = Some(Instant::now());
            entry.consecutive_failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ProviderCache {
        let mut endpoints = HashMap::new();
        endpoints.insert(11_155_111, vec![
            "https://first.example".to_string(),
            "https://second.example".to_string(),
        ]);
        ProviderCache::new(endpoints)
    }

    #[tokio::test]
    async fn test_unsupported_chain() {
        let cache = cache();
        assert!(cache.supports_chain(11_155_111));
        assert!(!cache.supports_chain(1));
        assert!(matches!(cache.get_provider(1).await, Err(DexError::UnsupportedChain(_))));
    }

    #[test]
    fn test_failing_endpoint_moves_to_back() {
        let cache = cache();
        let endpoints = cache.rpc_endpoints[&11_155_111].clone();

        assert_eq!(cache.order_endpoints_by_health(11_155_111, &endpoints), endpoints);

        cache.update_health_failure(11_155_111, "https://first.example");
        let ordered = cache.order_endpoints_by_health(11_155_111, &endpoints);
        assert_eq!(ordered[0], "https://second.example");
    }

    #[test]
    fn test_health_score_calculation() {
        let perfect_health = ProviderHealth::default();
        assert_eq!(ProviderCache::calculate_health_score(&perfect_health), 1.0);

        let poor_health = ProviderHealth {
            success_rate: 0.5,
            last_failure: Some(Instant::now()),
            consecutive_failures: 3,
        };
        assert!(ProviderCache::calculate_health_score(&poor_health) < 0.5);
    }
}
