//! Job infrastructure for background command execution.
//!
//! - [`PostgresJobQueue`] - database-backed queue (`FOR UPDATE SKIP LOCKED` claims, leases)
//! - [`MemoryJobQueue`] - same semantics in memory, for tests
//! - [`JobRegistry`] - job type string → typed handler
//! - [`JobRunner`] - polls the queue and executes claimed batches
//!
//! ```text
//! activity calls deps.jobs.enqueue(job)
//!     └─► JobQueue.enqueue_spec() (idempotency key checked)
//!
//! JobRunner
//!     ├─► JobQueue.claim()
//!     ├─► JobRegistry.execute()  (deserialize + handler)
//!     └─► mark_succeeded / mark_failed (retry row or dead letter)
//! ```
//!
//! Job payloads and handlers live in their domains; this module only provides
//! the machinery.

mod job;
mod memory_queue;
mod queue;
mod registry;
mod runner;

pub use job::{ErrorKind, Job, JobPriority, JobStatus};
pub use memory_queue::MemoryJobQueue;
pub use queue::{
    ClaimedJob, CommandMeta, EnqueueResult, FailureOutcome, JobQueue, JobQueueExt, JobSpec,
    PostgresJobQueue, RetryPolicy,
};
pub use registry::{JobContext, JobRegistry, RegistryError, SharedJobRegistry};
pub use runner::{JobRunner, JobRunnerConfig};
