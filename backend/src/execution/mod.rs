pub mod swap_executor;

pub use swap_executor::{
    InvalidationEvent, InvalidationScope, SwapAttempt, SwapExecutor, SwapOutcome, SwapRequest, SwapState,
};
