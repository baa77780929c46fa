//! Background jobs for the research domain.

mod run_research_job;

pub use run_research_job::RunResearchJob;

use crate::domains::research::activities::run_research;
use crate::kernel::jobs::JobRegistry;

/// Register every research job handler.
pub fn register_research_jobs(registry: &mut JobRegistry) {
    registry.register::<RunResearchJob, _, _>(
        RunResearchJob::JOB_TYPE,
        |job, ctx, deps| async move { run_research(&job, ctx, &deps).await },
    );
}
