//! End-to-end scenarios and boundary behaviors from spec.md §8, run
//! against the public `Builder` -> `Pipeline` -> `Engine` surface.

mod common;

use common::{registry_of, Script, ScriptedTask};
use pipeliner::builder::Builder;
use pipeliner::config::PipelineConf;
use pipeliner::errors::BuildError;
use pipeliner::graph::VertexId;
use pipeliner::types::{PipelineStatus, TaskStatus};
use pipeliner::value::Value;
use pipeliner::workspace::SharedWorkspace;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;

fn conf(json: &str) -> PipelineConf {
    serde_json::from_str(json).unwrap()
}

/// Scenario 1: three tasks `t1 -> t2 -> t3`, each passes and carries data;
/// `result: [x]` surfaces `t3`'s output.
#[tokio::test]
async fn linear_success() {
    let registry = registry_of(vec![
        ScriptedTask::new("t1", Script::Pass(FxHashMap::from_iter([("x".into(), Value::from("vt1"))]))),
        ScriptedTask::new("t2", Script::Pass(FxHashMap::from_iter([("x".into(), Value::from("vt2"))]))),
        ScriptedTask::new("t3", Script::Pass(FxHashMap::from_iter([("x".into(), Value::from("vt3"))]))),
    ]);
    let conf = conf(
        r#"{
            "name": "linear",
            "result": ["x"],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": []},
                {"task": "t2", "name": "t2", "depends": [{"task": "t1"}]},
                {"task": "t3", "name": "t3", "depends": [{"task": "t2"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(result.status, PipelineStatus::Success);
    assert_eq!(result.outputs.get("x"), Some(&Value::from("vt3")));
    for id in ["t1", "t2", "t3"] {
        assert_eq!(pipeline.task_status(&VertexId::new(id)), TaskStatus::Success);
    }
}

/// Scenario 2: conditional branch — `router` sets `branch = "B"`; only the
/// `B`-conditioned edge's target runs.
#[tokio::test]
async fn conditional_branch_chosen() {
    let registry = registry_of(vec![
        ScriptedTask::new("router", Script::SetAndPass("branch".into(), Value::from("B"))),
        ScriptedTask::new("a", Script::Pass(FxHashMap::default())),
        ScriptedTask::new("b", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "branch",
            "result": [],
            "pipeline": [
                {"task": "router", "name": "router", "depends": []},
                {"task": "a", "name": "a", "depends": [
                    {"task": "router", "condition": {"key": "branch", "value": "A", "operator": "=="}}
                ]},
                {"task": "b", "name": "b", "depends": [
                    {"task": "router", "condition": {"key": "branch", "value": "B", "operator": "=="}}
                ]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(result.status, PipelineStatus::Success);
    assert_eq!(pipeline.task_status(&VertexId::new("a")), TaskStatus::Init);
    assert_eq!(pipeline.task_status(&VertexId::new("b")), TaskStatus::Success);
}

/// Scenario 3: `any` salvage — one predecessor fails, the other passes;
/// the `any` join still passes and the downstream task runs.
#[tokio::test]
async fn any_salvage() {
    let registry = registry_of(vec![
        ScriptedTask::new("t1", Script::Pass(FxHashMap::default())),
        ScriptedTask::new("t2", Script::Fail),
        ScriptedTask::new("t3", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "any",
            "result": [],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": []},
                {"task": "t2", "name": "t2", "depends": []},
                {"task": "joined", "name": "@any", "depends": [{"task": "t1"}, {"task": "t2"}]},
                {"task": "t3", "name": "t3", "depends": [{"task": "joined"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(pipeline.task_status(&VertexId::new("t1")), TaskStatus::Success);
    assert_eq!(pipeline.task_status(&VertexId::new("t2")), TaskStatus::Failure);
    assert_eq!(pipeline.task_status(&VertexId::new("joined")), TaskStatus::Success);
    assert_eq!(pipeline.task_status(&VertexId::new("t3")), TaskStatus::Success);
    assert_eq!(result.status, PipelineStatus::Success);
}

/// Scenario 4: `not` inversion — a failing predecessor makes the `not`
/// join pass.
#[tokio::test]
async fn not_inversion() {
    let registry = registry_of(vec![
        ScriptedTask::new("t1", Script::Fail),
        ScriptedTask::new("t2", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "not",
            "result": [],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": []},
                {"task": "negated", "name": "@not", "depends": [{"task": "t1"}]},
                {"task": "t2", "name": "t2", "depends": [{"task": "negated"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(pipeline.task_status(&VertexId::new("t1")), TaskStatus::Failure);
    assert_eq!(pipeline.task_status(&VertexId::new("negated")), TaskStatus::Success);
    assert_eq!(pipeline.task_status(&VertexId::new("t2")), TaskStatus::Success);
    assert_eq!(result.status, PipelineStatus::Success);
}

/// Scenario 5: blocked resume — `t1` blocks on the first run (snapshot
/// produced); rebuilding with the prior status map and snapshot, with
/// `t1` upgraded to succeed, completes the pipeline.
#[tokio::test]
async fn blocked_resume() {
    let blocking_registry = registry_of(vec![ScriptedTask::new("t1", Script::Blocked)]);
    let conf = conf(
        r#"{"name": "resume", "result": [], "pipeline": [{"task": "t1", "name": "t1", "depends": []}]}"#,
    );
    let pipeline = Builder::new(&blocking_registry).build(&conf, FxHashMap::default()).unwrap();
    let workspace = Arc::new(SharedWorkspace::new());
    let first = pipeline.run(workspace.clone(), "req-1").await;

    assert_eq!(first.status, PipelineStatus::Blocked);
    assert_eq!(*first.task_statuses.get(&VertexId::new("t1")).unwrap(), TaskStatus::Blocked);
    let snapshot_bytes = first.snapshot.clone().expect("blocked result carries a snapshot");
    assert!(!snapshot_bytes.is_empty());

    let resuming_registry = registry_of(vec![ScriptedTask::new("t1", Script::Pass(FxHashMap::default()))]);
    let prior_statuses: FxHashMap<VertexId, TaskStatus> = first.task_statuses.clone();
    let resumed_pipeline = Builder::new(&resuming_registry).build(&conf, prior_statuses).unwrap();
    let resumed_workspace = Arc::new(SharedWorkspace::new());
    resumed_workspace.unmarshal(&snapshot_bytes).unwrap();

    let second = resumed_pipeline.run(resumed_workspace, "req-1").await;
    assert_eq!(second.status, PipelineStatus::Success);
    assert_eq!(*second.task_statuses.get(&VertexId::new("t1")).unwrap(), TaskStatus::Success);
}

/// Scenario 6: fatal abort — a fatal response cancels the pipeline, and a
/// concurrently running long sleep observes cancellation instead of
/// completing.
#[tokio::test]
async fn fatal_abort_cancels_in_flight_siblings() {
    let registry = registry_of(vec![
        ScriptedTask::new("root", Script::Pass(FxHashMap::default())),
        ScriptedTask::new("t_fatal", Script::Fatal),
        ScriptedTask::new("t_slow", Script::Sleep(Duration::from_secs(5))),
    ]);
    let conf = conf(
        r#"{
            "name": "fatal",
            "result": [],
            "pipeline": [
                {"task": "root", "name": "root", "depends": []},
                {"task": "t_fatal", "name": "t_fatal", "depends": [{"task": "root"}]},
                {"task": "t_slow", "name": "t_slow", "depends": [{"task": "root"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();

    let started = std::time::Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        pipeline.run(Arc::new(SharedWorkspace::new()), "req-1"),
    )
    .await
    .expect("pipeline should finish well before the 5s sleep");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.status, PipelineStatus::Failure);
}

/// Boundary: two roots is a build error.
#[tokio::test]
async fn two_roots_is_a_build_error() {
    let registry = registry_of(vec![
        ScriptedTask::new("a", Script::Pass(FxHashMap::default())),
        ScriptedTask::new("b", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "two-roots",
            "result": [],
            "pipeline": [
                {"task": "a", "name": "a", "depends": []},
                {"task": "b", "name": "b", "depends": []}
            ]
        }"#,
    );
    assert!(matches!(
        Builder::new(&registry).build(&conf, FxHashMap::default()),
        Err(BuildError::MultipleRoots { .. })
    ));
}

/// Boundary: a cycle A -> B -> A is a build error naming both ids.
#[tokio::test]
async fn cycle_is_a_build_error_naming_both_ids() {
    let registry = registry_of(vec![
        ScriptedTask::new("a", Script::Pass(FxHashMap::default())),
        ScriptedTask::new("b", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "cycle",
            "result": [],
            "pipeline": [
                {"task": "a", "name": "a", "depends": [{"task": "b"}]},
                {"task": "b", "name": "b", "depends": [{"task": "a"}]}
            ]
        }"#,
    );
    match Builder::new(&registry).build(&conf, FxHashMap::default()) {
        Err(BuildError::Cycle { members }) => {
            assert!(members.contains(&VertexId::new("a")));
            assert!(members.contains(&VertexId::new("b")));
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
}

/// Boundary: an edge A -> A is rejected as a self-loop.
#[tokio::test]
async fn self_loop_is_a_build_error() {
    let registry = registry_of(vec![ScriptedTask::new("a", Script::Pass(FxHashMap::default()))]);
    let conf = conf(
        r#"{
            "name": "self-loop",
            "result": [],
            "pipeline": [
                {"task": "a", "name": "a", "depends": [{"task": "a"}]}
            ]
        }"#,
    );
    assert!(matches!(
        Builder::new(&registry).build(&conf, FxHashMap::default()),
        Err(BuildError::SelfLoop { .. })
    ));
}

/// Boundary: `any` with zero passing predecessors fails, and its
/// descendant is left un-started (upstream-failed).
#[tokio::test]
async fn any_with_zero_passes_fails_and_blocks_descendant() {
    let registry = registry_of(vec![
        ScriptedTask::new("t1", Script::Fail),
        ScriptedTask::new("t2", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "any-empty",
            "result": [],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": []},
                {"task": "joined", "name": "@any", "depends": [{"task": "t1"}]},
                {"task": "t2", "name": "t2", "depends": [{"task": "joined"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(pipeline.task_status(&VertexId::new("joined")), TaskStatus::Failure);
    assert_eq!(pipeline.task_status(&VertexId::new("t2")), TaskStatus::Init);
    // The `any` join's own response is a real failure (not demoted), so it
    // contributes to pipeline-level error aggregation (spec.md §4.6 step 3) —
    // unlike an upstream-failed task, which is excluded.
    assert_eq!(result.status, PipelineStatus::Failure);
}

/// Boundary: `not` with a passing predecessor fails.
#[tokio::test]
async fn not_with_a_passing_predecessor_fails() {
    let registry = registry_of(vec![ScriptedTask::new("t1", Script::Pass(FxHashMap::default()))]);
    let conf = conf(
        r#"{
            "name": "not-pass",
            "result": [],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": []},
                {"task": "negated", "name": "@not", "depends": [{"task": "t1"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;
    assert_eq!(pipeline.task_status(&VertexId::new("negated")), TaskStatus::Failure);
}

/// Boundary: a missing required variable parameter is an error response,
/// and the pipeline still succeeds overall since `abort_if_error` isn't set.
#[tokio::test]
async fn missing_required_param_is_a_task_error_not_a_crash() {
    let registry = registry_of(vec![ScriptedTask::new("t1", Script::Pass(FxHashMap::default()))]);
    let conf = conf(
        r#"{
            "name": "missing-param",
            "result": [],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": [], "config": {
                    "params": [{"name": "x", "type": "variable", "variable": "absent", "required": true}]
                }}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(pipeline.task_status(&VertexId::new("t1")), TaskStatus::Failure);
    assert_eq!(result.status, PipelineStatus::Failure);
}

/// The `always_pass`/status asymmetry (spec.md §9 open question): the
/// response is forced to pass, but `state[id]` still reports the true
/// outcome.
#[tokio::test]
async fn always_pass_forces_response_but_not_recorded_status() {
    let registry = registry_of(vec![
        ScriptedTask::new("t1", Script::Fail),
        ScriptedTask::new("t2", Script::Pass(FxHashMap::default())),
    ]);
    let conf = conf(
        r#"{
            "name": "always-pass",
            "result": [],
            "pipeline": [
                {"task": "t1", "name": "t1", "depends": [], "config": {"always_pass": true}},
                {"task": "t2", "name": "t2", "depends": [{"task": "t1"}]}
            ]
        }"#,
    );
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(pipeline.task_status(&VertexId::new("t1")), TaskStatus::Failure);
    assert_eq!(pipeline.task_status(&VertexId::new("t2")), TaskStatus::Success);
    assert_eq!(result.status, PipelineStatus::Success);
}
