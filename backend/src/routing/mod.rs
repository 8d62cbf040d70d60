// Candidate enumeration, best-route selection and quote request scheduling
pub mod quote_scheduler;
pub mod route_generator;
pub mod route_selector;

pub use quote_scheduler::{QuoteKey, QuoteScheduler};
pub use route_generator::RouteGenerator;
pub use route_selector::{pick_winner, RouteSelector};
