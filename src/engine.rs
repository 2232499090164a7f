//! The engine wrapper (spec.md §2, §9.2): a thin admission-controlled
//! entry point over [`Pipeline::run`]. Listed as in-scope surface in
//! spec.md's overview table, not a Non-goal, but intentionally minimal —
//! no session store, no checkpointing, no cron (those remain external
//! collaborators per spec.md §1).
//!
//! Grounded on the teacher's `App` (static structure) vs. `AppRunner`
//! (runtime/admission) split in `app.rs`/`runtimes/runner.rs`: `Engine`
//! holds its own `tokio::sync::Semaphore`, independent of the walker's
//! per-pipeline parallelism semaphore (spec.md §5's explicit
//! independence note).

use crate::pipeline::{Pipeline, PipelineResult};
use crate::workspace::SharedWorkspace;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Admission-controlled wrapper around one or more [`Pipeline`]s sharing
/// a host-wide concurrency budget.
pub struct Engine {
    admission: Arc<Semaphore>,
}

impl Engine {
    /// `max_concurrent_pipelines` bounds how many pipeline runs may be
    /// in flight at once across this engine, independent of any single
    /// pipeline's own `concurrency` (which bounds task fan-out within one
    /// run).
    #[must_use]
    pub fn new(max_concurrent_pipelines: usize) -> Self {
        Self {
            admission: Arc::new(Semaphore::new(max_concurrent_pipelines.max(1))),
        }
    }

    /// Acquires an admission slot, then runs `pipeline` to completion
    /// against `workspace`. The slot is held for the run's whole
    /// duration and released on return, including on error paths, since
    /// `Pipeline::run` itself never returns `Result` (failures are
    /// reported in [`PipelineResult::status`]).
    #[tracing::instrument(skip(self, pipeline, workspace), fields(pipeline = %pipeline.name))]
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        workspace: Arc<SharedWorkspace>,
        request_id: impl Into<Arc<str>>,
    ) -> PipelineResult {
        let _permit = self.admission.acquire().await.expect("engine semaphore is never closed");
        pipeline.run(workspace, request_id).await
    }

    /// Current unused admission capacity, mainly for tests and metrics.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.admission.available_permits()
    }
}
