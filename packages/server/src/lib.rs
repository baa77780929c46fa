// Research Assistant - Core
//
// Accepts research topics, gathers articles from external sources, runs them
// through an AI provider and persists the results with an auditable workflow log.
// Long-running work happens in background jobs; see domains/research/jobs.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
