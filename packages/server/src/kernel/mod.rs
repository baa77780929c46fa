//! Kernel module - server infrastructure and dependencies.

pub mod ai;
pub mod deps;
pub mod hacker_news_client;
pub mod jobs;
pub mod news_api_client;
pub mod test_dependencies;
pub mod traits;
pub mod wikipedia_client;

pub use ai::ProviderAI;
pub use deps::ServerDeps;
pub use hacker_news_client::HackerNewsClient;
pub use news_api_client::NewsApiClient;
pub use test_dependencies::{
    AiCall, FailingJobQueue, FailingMetricsSink, MockAI, MockArticleSource, TestDependencies,
};
pub use traits::*;
pub use wikipedia_client::WikipediaClient;
