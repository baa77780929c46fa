// Business domains
pub mod metrics;
pub mod research;
