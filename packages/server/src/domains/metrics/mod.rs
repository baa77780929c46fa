//! AI usage accounting: pricing, the bounded in-memory sink and the read
//! projections served by the metrics routes.

pub mod pricing;
pub mod projections;
mod store;

pub use pricing::{calculate_cost, pricing_for, ModelPricing};
pub use store::MemoryMetricsStore;
