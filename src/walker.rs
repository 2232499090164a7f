//! The walker: concurrency-bounded parallel DAG traversal (spec.md
//! §4.4). Two cooperating fibers per vertex — a waiter that resolves
//! the deps-verdict, an executor that runs the vertex body once the
//! verdict lands — communicating over a one-shot channel, with
//! completion broadcast over a `watch` channel (Rust has no "close a
//! channel to broadcast" primitive; `watch`'s commit-then-drop is the
//! closest analogue, following the teacher's own `event_bus` module
//! reaching for the same primitive for multi-consumer signalling).
//!
//! Grounded on `internal/dag/walk.go` (`Walker`/`walkVertex`/`waitDeps`)
//! and `internal/core/graph_walker.go` (`GraphWalker.callback`/`execute`),
//! merged into one type since Rust's ownership model makes keeping them
//! as two cooperating structs mostly ceremony without Go's implicit
//! interfaces.

use crate::context::ScopedDataContext;
use crate::errors::TaskError;
use crate::graph::{Edge, Graph, LogicalKind, Vertex, VertexId, VertexKind};
use crate::logical::deps_verdict;
use crate::params::ParameterAssembler;
use crate::pipeline::TaskStatusTable;
use crate::types::{FailureLevel, Response, TaskConfigure, TaskStatus};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Semaphore};

#[derive(Default)]
struct WalkerState {
    responses: FxHashMap<VertexId, Response>,
    upstream_failed: FxHashSet<VertexId>,
}

/// Runs every vertex of `graph` to completion, honoring dependency
/// ordering, condition gating, the any/not join algebra, bounded
/// parallelism, and cancellation. Returns every recorded response
/// *excluding* ids in the upstream-failed set (spec.md §4.4
/// "Completion"), so a task's own outcome is distinguishable from the
/// cascade of blocked/upstream-failed descendants when the caller
/// aggregates errors.
#[tracing::instrument(skip(graph, configs, statuses, root_ctx))]
pub async fn run(
    graph: Arc<Graph>,
    configs: Arc<FxHashMap<VertexId, TaskConfigure>>,
    statuses: Arc<TaskStatusTable>,
    root_ctx: ScopedDataContext,
    concurrency: usize,
) -> FxHashMap<VertexId, Response> {
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let state = Arc::new(Mutex::new(WalkerState::default()));

    let ids = graph.vertex_ids();
    let mut senders: FxHashMap<VertexId, watch::Sender<bool>> = FxHashMap::default();
    let mut receivers: FxHashMap<VertexId, watch::Receiver<bool>> = FxHashMap::default();
    for id in &ids {
        let (tx, rx) = watch::channel(false);
        senders.insert(id.clone(), tx);
        receivers.insert(id.clone(), rx);
    }

    let mut handles = Vec::with_capacity(ids.len());
    for id in &ids {
        let vertex = graph.vertex(id).expect("vertex_ids only yields known ids").clone();
        let inbound: Vec<Edge> = graph.inbound(id).into_iter().cloned().collect();
        let done_tx = senders.remove(id).expect("one sender per vertex");
        let pred_rxs: Vec<(VertexId, watch::Receiver<bool>)> = inbound
            .iter()
            .map(|e| (e.source.clone(), receivers[&e.source].clone()))
            .collect();

        let config = configs.get(id).cloned().unwrap_or_default();
        let state = state.clone();
        let statuses = statuses.clone();
        let root_ctx = root_ctx.clone();
        let sem = sem.clone();

        let (verdict_tx, verdict_rx) = oneshot::channel::<bool>();

        // Waiter fiber: resolves predecessor done-channels, then this
        // vertex's deps-verdict, and hands it to the executor.
        let waiter_state = state.clone();
        let waiter_cancel = root_ctx.clone();
        let waiter_kind = logical_kind(&vertex);
        let waiter_pred_ids: Vec<VertexId> = pred_rxs.iter().map(|(id, _)| id.clone()).collect();
        tokio::spawn(async move {
            for (pred_id, mut rx) in pred_rxs {
                tokio::select! {
                    result = rx.wait_for(|done| *done) => {
                        if result.is_ok() {
                            tracing::debug!(dependency = %pred_id, "dependency satisfied");
                        }
                    }
                    () = waiter_cancel.cancelled() => {
                        let _ = verdict_tx.send(false);
                        return;
                    }
                }
            }
            let verdict = {
                let mut guard = waiter_state.lock();
                deps_verdict(waiter_kind, &waiter_pred_ids, &mut guard.responses)
            };
            tracing::debug!(vertex = %vertex_id_for_log(&waiter_pred_ids), verdict, "all dependencies resolved");
            let _ = verdict_tx.send(verdict);
        });

        // Executor fiber: waits for cancellation or the deps-verdict,
        // runs the vertex, records its response, signals completion.
        let vertex_id = id.clone();
        let handle = tokio::spawn(async move {
            let (response, upstream_failed) = tokio::select! {
                verdict = verdict_rx => {
                    match verdict {
                        Ok(verdict) => {
                            run_vertex(&vertex, &config, &inbound, verdict, &root_ctx, &statuses, &sem).await
                        }
                        Err(_) => (
                            Response::upstream_failed(TaskError::Cancelled(root_ctx.cancel_reason())),
                            true,
                        ),
                    }
                }
                () = root_ctx.cancelled() => (
                    Response::upstream_failed(TaskError::Cancelled(root_ctx.cancel_reason())),
                    true,
                ),
            };

            {
                let mut guard = state.lock();
                guard.responses.insert(vertex_id.clone(), response);
                if upstream_failed {
                    guard.upstream_failed.insert(vertex_id);
                }
            }
            let _ = done_tx.send(true);
        });
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.await;
    }

    let guard = state.lock();
    guard
        .responses
        .iter()
        .filter(|(id, _)| !guard.upstream_failed.contains(*id))
        .map(|(id, resp)| (id.clone(), resp.clone()))
        .collect()
}

fn logical_kind(vertex: &Vertex) -> Option<LogicalKind> {
    match &vertex.kind {
        VertexKind::Logical(kind) => Some(*kind),
        VertexKind::Task(_) => None,
    }
}

fn vertex_id_for_log(pred_ids: &[VertexId]) -> String {
    pred_ids.iter().map(VertexId::as_str).collect::<Vec<_>>().join(",")
}

/// The per-vertex life cycle (spec.md §4.4, steps 1-6). Step 7
/// (recording into the shared response/upstream-failed maps) is the
/// caller's responsibility.
async fn run_vertex(
    vertex: &Vertex,
    config: &TaskConfigure,
    inbound: &[Edge],
    verdict: bool,
    root_ctx: &ScopedDataContext,
    statuses: &TaskStatusTable,
    sem: &Semaphore,
) -> (Response, bool) {
    // Step 1: terminal statuses bypass execution entirely.
    match statuses.get(&vertex.id) {
        TaskStatus::Success | TaskStatus::Skipped => return (Response::success(), false),
        TaskStatus::Failure => return (Response::error(TaskError::Provider("previously failed".into())), false),
        TaskStatus::Init | TaskStatus::Blocked => {}
    }

    // Step 2: skip_execution bypasses condition/deps evaluation too.
    if config.skip_execution {
        statuses.set(&vertex.id, TaskStatus::Skipped);
        return (Response::skipped(), false);
    }

    // Step 3: scoped data context with this vertex's timeout deadline.
    let mut ctx = root_ctx.derive_for_vertex(config.timeout);

    // Step 4: merge inbound edge properties/predecessors, evaluate conditions.
    for edge in inbound {
        ctx.append_prev_task(edge.source.clone());
        ctx.append_properties(edge.properties.clone());
    }
    for edge in inbound {
        if let Some(condition) = &edge.condition {
            match condition.matches(&ctx) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(vertex = %vertex.id, key = %condition.key, "condition not match");
                    return (Response::upstream_failed(TaskError::ConditionNotMatch), true);
                }
                Err(err) => {
                    tracing::warn!(vertex = %vertex.id, key = %condition.key, error = %err, "condition eval error");
                    return (Response::upstream_failed(TaskError::ConditionNotMatch), true);
                }
            }
        }
    }

    // Step 5: act on the already-computed deps-verdict.
    let mut response = match &vertex.kind {
        VertexKind::Task(task) => {
            if !verdict {
                tracing::debug!(vertex = %vertex.id, "upstream is failure");
                return (Response::upstream_failed(TaskError::UpstreamFailed), true);
            }

            let params = match ParameterAssembler::assemble(&ctx, &config.params) {
                Ok(params) => params,
                Err(err) => {
                    let resp = Response::error(err.into());
                    statuses.set(&vertex.id, resp.status);
                    return (resp, false);
                }
            };

            if let Some(before) = task.as_before() {
                before.before(&ctx);
            }

            let _permit = sem.acquire().await.expect("walker semaphore is never closed");
            let task_clone = task.clone();
            let ctx_clone = ctx.clone();
            let params_clone = params.clone();
            let joined = tokio::spawn(async move { task_clone.run(&ctx_clone, &params_clone).await }).await;
            drop(_permit);

            let mut resp = match joined {
                Ok(resp) => resp,
                Err(join_err) if join_err.is_panic() => {
                    let message = panic_message(join_err.into_panic());
                    Response::error(TaskError::Panicked { message })
                }
                Err(join_err) => Response::warning(TaskError::Cancelled(join_err.to_string())),
            };

            if config.abort_if_error && resp.failure_level > FailureLevel::Warning {
                resp.failure_level = FailureLevel::Fatal;
            }
            if config.always_pass {
                resp.pass = true;
            }

            if let Some(after) = task.as_after() {
                after.after(&ctx, &resp);
            }
            if let Some(listener) = task.as_listener() {
                match (&resp.failure_level, &resp.data, &resp.error) {
                    (FailureLevel::Normal, Some(data), _) => listener.on_success(&ctx, data),
                    (FailureLevel::Normal, None, _) => {
                        listener.on_success(&ctx, &Default::default());
                    }
                    (_, _, Some(error)) => listener.on_failure(&ctx, error),
                    _ => {}
                }
            }

            resp
        }
        VertexKind::Logical(_) => {
            if verdict {
                Response::success()
            } else {
                Response::error(TaskError::UpstreamFailed)
            }
        }
    };

    statuses.set(&vertex.id, response.status);
    if let Some(data) = response.data.clone() {
        ctx.set_current_node_data(vertex.id.as_str(), data);
    }

    let upstream_failed = response.status == TaskStatus::Blocked;
    if config.always_pass && !upstream_failed {
        response.pass = true;
    }
    if response.failure_level == FailureLevel::Fatal {
        root_ctx.stop();
    }

    (response, upstream_failed)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
