//! Scoped per-vertex data context: the read view a task sees, layering
//! edge properties over predecessor outputs over the shared workspace
//! (spec.md §4.2), plus the derived cancellation/timeout it exclusively
//! owns.
//!
//! Grounded on `internal/core/data_context.go` (pipeline-level cancel,
//! env, request id) and `internal/dag/data_context.go` (the per-vertex
//! `nodeDataContext` layering). The Go source's `sync.Pool` reuse is
//! dropped — a fresh struct per vertex costs nothing here worth pooling
//! for.

use crate::graph::VertexId;
use crate::value::Value;
use crate::workspace::SharedWorkspace;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Per-vertex read/write view over the pipeline's shared state.
///
/// Lookup precedence for `get`: edge properties (later edge wins) ->
/// per-predecessor outputs (first hit wins, predecessor iteration
/// order) -> shared workspace. Writes always target the shared
/// workspace; there is no local-write path.
#[derive(Clone)]
pub struct ScopedDataContext {
    workspace: Arc<SharedWorkspace>,
    env: Arc<FxHashMap<String, Value>>,
    properties: FxHashMap<String, Value>,
    prev_tasks: Vec<VertexId>,
    request_id: Arc<str>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ScopedDataContext {
    /// Builds the pipeline-level root context: no properties, no
    /// predecessors, a fresh cancellation token.
    #[must_use]
    pub fn pipeline_root(
        workspace: Arc<SharedWorkspace>,
        env: Arc<FxHashMap<String, Value>>,
        request_id: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            workspace,
            env,
            properties: FxHashMap::default(),
            prev_tasks: Vec::new(),
            request_id: request_id.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derives a fresh per-vertex context from the pipeline-level (or
    /// another vertex's) context: a child cancellation token, and an
    /// optional deadline if the vertex's `TaskConfigure.timeout` is set.
    #[must_use]
    pub fn derive_for_vertex(&self, timeout: Option<Duration>) -> Self {
        let cancel = self.cancel.child_token();
        let deadline = timeout.map(|d| Instant::now() + d);
        Self {
            workspace: self.workspace.clone(),
            env: self.env.clone(),
            properties: FxHashMap::default(),
            prev_tasks: Vec::new(),
            request_id: self.request_id.clone(),
            cancel,
            deadline,
        }
    }

    pub fn append_properties(&mut self, properties: impl IntoIterator<Item = (String, Value)>) {
        for (k, v) in properties {
            self.properties.insert(k, v);
        }
    }

    pub fn append_prev_task(&mut self, id: VertexId) {
        self.prev_tasks.push(id);
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Reads a constant from the pipeline's immutable `env` map set at
    /// build time. No mutation path exists.
    #[must_use]
    pub fn env(&self, key: &str) -> Option<&Value> {
        self.env.get(key)
    }

    /// Layered lookup: edge properties, then predecessor outputs (first
    /// hit wins, in predecessor order), then the shared workspace.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.properties.get(key) {
            return Some(v.clone());
        }
        for prev in &self.prev_tasks {
            if let Some(v) = self.workspace.get_node_value(prev.as_str(), key) {
                return Some(v);
            }
        }
        self.workspace.get(key)
    }

    /// Looks up `key` within a specific predecessor's recorded output,
    /// bypassing layering (used by the pipeline's result assembly,
    /// which looks at leaf outputs specifically).
    #[must_use]
    pub fn get_depend_node_value(&self, node_id: &str, key: &str) -> Option<Value> {
        self.workspace.get_node_value(node_id, key)
    }

    /// Writes always target the shared workspace, regardless of this
    /// context's layering.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.workspace.put(key, value);
    }

    pub fn set_current_node_data(&self, node_id: impl Into<String>, data: FxHashMap<String, Value>) {
        self.workspace.set_node_data(node_id, data);
    }

    #[must_use]
    pub fn workspace(&self) -> &Arc<SharedWorkspace> {
        &self.workspace
    }

    /// Cancels this context's scope. For the pipeline-level context this
    /// cancels the whole pipeline (fatal response, explicit stop, or
    /// timeout); for a per-vertex context it only cancels that vertex's
    /// derived token, since cancellation tokens form a tree and a child
    /// cancelling itself never reaches its parent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this context is cancelled or its deadline (if any)
    /// elapses, whichever comes first.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.cancel.cancelled() => {},
                    () = tokio::time::sleep_until(deadline.into()) => {},
                }
            }
            None => self.cancel.cancelled().await,
        }
    }

    /// A human-readable reason for the most recent cancellation,
    /// distinguishing an elapsed per-task deadline from an upstream
    /// stop/fatal/pipeline-timeout.
    #[must_use]
    pub fn cancel_reason(&self) -> String {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return "deadline exceeded".to_string();
            }
        }
        "context cancelled".to_string()
    }

    /// Installs a deadline on this context directly (used by the
    /// pipeline root when `PipelineConf.timeout` is set).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }
}
