pub mod research_request;
pub mod research_result;
pub mod workflow_log;

pub use research_request::{ResearchRequest, ResearchStatus};
pub use research_result::ResearchResult;
pub use workflow_log::{WorkflowLog, WorkflowLogStatus};
