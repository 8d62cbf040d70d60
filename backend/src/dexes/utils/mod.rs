// Shared DEX plumbing
pub mod dex_utils;
pub mod path_encoder;
pub mod provider_cache;

pub use dex_utils::DexUtils;
pub use provider_cache::ProviderCache;
