// HTTP routes
pub mod ai;
pub mod health;
pub mod metrics;
pub mod research;

pub use health::*;
