//! The built pipeline: a validated graph plus its per-task
//! configuration, task-status table, and environment, together with the
//! five-step `run` algorithm (spec.md §4.6).
//!
//! Grounded on `internal/core/pipeline.go`'s `Pipeline` struct (task
//! status map, env, name, timeout) and its `Run` method's shape: install
//! a deadline, hand off to the walker, aggregate failures, check for a
//! blocked outcome, assemble the result from leaf outputs.

use crate::context::ScopedDataContext;
use crate::errors::TaskError;
use crate::graph::{Graph, VertexId};
use crate::types::{FailureLevel, PipelineStatus, TaskConfigure, TaskStatus};
use crate::validate;
use crate::value::Value;
use crate::walker;
use crate::workspace::SharedWorkspace;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared, lock-protected `VertexId -> TaskStatus` map. Owned by the
/// pipeline; the walker only ever sees it through an `Arc`, resolving
/// the walker/pipeline module cycle without either owning the other.
///
/// Matches `internal/core/pipeline.go`'s `GetTaskStatus`/`SetTaskStatus`:
/// unset vertices read as `Init`, and a terminal status (`Success`,
/// `Skipped`, `Failure`) is never overwritten once set.
#[derive(Default)]
pub struct TaskStatusTable {
    inner: Mutex<FxHashMap<VertexId, TaskStatus>>,
}

impl TaskStatusTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the table from a prior run's snapshot, e.g. when resuming a
    /// blocked pipeline.
    #[must_use]
    pub fn seeded(initial: FxHashMap<VertexId, TaskStatus>) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    #[must_use]
    pub fn get(&self, id: &VertexId) -> TaskStatus {
        self.inner.lock().get(id).copied().unwrap_or(TaskStatus::Init)
    }

    pub fn set(&self, id: &VertexId, status: TaskStatus) {
        let mut guard = self.inner.lock();
        let current = guard.get(id).copied().unwrap_or(TaskStatus::Init);
        if !current.is_terminal() {
            guard.insert(id.clone(), status);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> FxHashMap<VertexId, TaskStatus> {
        self.inner.lock().clone()
    }
}

/// Outcome of a pipeline run: aggregate status, every contributing
/// error, the final per-task status table, and the assembled result
/// data (spec.md §4.6 step 5).
#[derive(Debug)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub errors: Vec<TaskError>,
    pub task_statuses: FxHashMap<VertexId, TaskStatus>,
    pub outputs: FxHashMap<String, Value>,
    /// Present iff `status == Blocked` (spec.md §6 "Result object"):
    /// the workspace marshalled via its configured codec, so a caller can
    /// rebuild an equivalent workspace and resume later.
    pub snapshot: Option<Vec<u8>>,
}

/// A validated, executable pipeline: graph, per-task configuration,
/// constant environment, optional end-to-end timeout, and concurrency
/// bound.
pub struct Pipeline {
    pub name: String,
    pub graph: Arc<Graph>,
    pub configs: Arc<FxHashMap<VertexId, TaskConfigure>>,
    pub env: Arc<FxHashMap<String, Value>>,
    pub timeout: Option<Duration>,
    pub concurrency: usize,
    pub statuses: Arc<TaskStatusTable>,
    /// Keys to surface in the assembled result (spec.md §4.6 step 5 /
    /// `assembleResult`). Empty means "report nothing" — the original
    /// returns `nil` rather than dumping the whole workspace, so callers
    /// must opt in to each key they want surfaced.
    pub result: Vec<String>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        graph: Arc<Graph>,
        configs: FxHashMap<VertexId, TaskConfigure>,
        env: FxHashMap<String, Value>,
        timeout: Option<Duration>,
        concurrency: usize,
        result: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            graph,
            configs: Arc::new(configs),
            env: Arc::new(env),
            timeout,
            concurrency,
            statuses: Arc::new(TaskStatusTable::new()),
            result,
        }
    }

    /// Seeds the task-status table for a resumed run. Vertices not
    /// present default to `Init`, so a fresh pipeline need not call this
    /// at all.
    #[must_use]
    pub fn with_statuses(mut self, initial: FxHashMap<VertexId, TaskStatus>) -> Self {
        self.statuses = Arc::new(TaskStatusTable::seeded(initial));
        self
    }

    #[must_use]
    pub fn task_status(&self, id: &VertexId) -> TaskStatus {
        self.statuses.get(id)
    }

    pub fn set_task_status(&self, id: &VertexId, status: TaskStatus) {
        self.statuses.set(id, status);
    }

    /// Runs every vertex to completion against `workspace`, then
    /// aggregates the walker's responses into a single [`PipelineResult`]
    /// (spec.md §4.6):
    ///
    /// 1. Install the pipeline-level timeout on the root context, if any.
    /// 2. Hand off to the walker.
    /// 3. Aggregate every `Error`-or-above, non-passing response into
    ///    `errors`.
    /// 4. Determine overall status: `Failure` if any error was
    ///    aggregated, else `Blocked` if any vertex's final status is
    ///    `Blocked`, else `Success`.
    /// 5. Assemble `outputs` by looking up each configured `result` key,
    ///    checking every leaf's recorded node data first and falling
    ///    back to the workspace's global data — an empty `result` list
    ///    yields an empty map rather than the whole workspace.
    #[tracing::instrument(skip(self, workspace), fields(pipeline = %self.name))]
    pub async fn run(&self, workspace: Arc<SharedWorkspace>, request_id: impl Into<Arc<str>>) -> PipelineResult {
        let mut root_ctx = ScopedDataContext::pipeline_root(workspace.clone(), self.env.clone(), request_id);
        if let Some(timeout) = self.timeout {
            root_ctx = root_ctx.with_timeout(timeout);
        }

        let responses = walker::run(
            self.graph.clone(),
            self.configs.clone(),
            self.statuses.clone(),
            root_ctx,
            self.concurrency,
        )
        .await;

        let mut errors = Vec::new();
        for response in responses.values() {
            if !response.pass && response.failure_level >= FailureLevel::Error {
                if let Some(error) = &response.error {
                    errors.push(error.clone());
                }
            }
        }

        let statuses = self.statuses.snapshot();
        let status = if !errors.is_empty() {
            PipelineStatus::Failure
        } else if statuses.values().any(|s| *s == TaskStatus::Blocked) {
            PipelineStatus::Blocked
        } else {
            PipelineStatus::Success
        };

        let snapshot = if status == PipelineStatus::Blocked {
            match workspace.marshal() {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    tracing::error!(pipeline = %self.name, error = %err, "failed to marshal blocked workspace snapshot");
                    None
                }
            }
        } else {
            None
        };

        let outputs = if status == PipelineStatus::Blocked {
            FxHashMap::default()
        } else {
            self.assemble_outputs(&workspace)
        };

        PipelineResult {
            status,
            errors,
            task_statuses: statuses,
            outputs,
            snapshot,
        }
    }

    fn assemble_outputs(&self, workspace: &SharedWorkspace) -> FxHashMap<String, Value> {
        if self.result.is_empty() {
            return FxHashMap::default();
        }

        let leaves = validate::leaves(&self.graph);
        let mut outputs = FxHashMap::default();
        for key in &self.result {
            let from_leaf = leaves.iter().find_map(|leaf| workspace.get_node_value(leaf.as_str(), key));
            match from_leaf.or_else(|| workspace.get(key)) {
                Some(value) => {
                    outputs.insert(key.clone(), value);
                }
                None => tracing::warn!(pipeline = %self.name, result_key = %key, "result key not found"),
            }
        }
        outputs
    }
}
