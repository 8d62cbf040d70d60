pub mod aggregator;
pub mod api;
pub mod config;
pub mod dexes;
pub mod execution;
pub mod routing;
pub mod token_registry;
pub mod types;

pub use aggregator::SwapAggregator;
pub use dexes::DexError;
