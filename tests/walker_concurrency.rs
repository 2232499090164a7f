mod common;

use common::{Script, ScriptedTask};
use pipeliner::builder::Builder;
use pipeliner::config::PipelineConf;
use pipeliner::types::PipelineStatus;
use pipeliner::workspace::SharedWorkspace;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn conf(json: &str) -> PipelineConf {
    serde_json::from_str(json).unwrap()
}

/// Concurrency bound: no more tasks run concurrently than `concurrency`.
#[tokio::test]
async fn concurrency_never_exceeds_the_configured_bound() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));

    let mut registry = pipeliner::registry::InMemoryRegistry::new();
    registry = registry.register(
        "root",
        None,
        Arc::new(ScriptedTask::new("root", Script::Pass(FxHashMap::default()))),
        None,
    );
    let mut pipeline_tasks = vec![r#"{"task": "root", "name": "root", "depends": []}"#.to_string()];
    for i in 0..8 {
        let id = format!("t{i}");
        pipeline_tasks.push(format!(
            r#"{{"task": "{id}", "name": "{id}", "depends": [{{"task": "root"}}]}}"#
        ));
        let task = ScriptedTask::new(id.clone(), Script::Sleep(Duration::from_millis(30)))
            .with_concurrency_tracking(in_flight.clone(), max_observed.clone());
        registry = registry.register(id, None, Arc::new(task), None);
    }
    let conf_json = format!(
        r#"{{"name": "fanout", "concurrency": 2, "result": [], "pipeline": [{}]}}"#,
        pipeline_tasks.join(",")
    );
    let conf = conf(&conf_json);
    let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
    let result = pipeline.run(Arc::new(SharedWorkspace::new()), "req-1").await;

    assert_eq!(result.status, PipelineStatus::Success);
    assert!(max_observed.load(Ordering::SeqCst) <= 2, "observed {} concurrent tasks", max_observed.load(Ordering::SeqCst));
}
