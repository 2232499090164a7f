//! # Pipeliner: a concurrent DAG task-pipeline execution engine
//!
//! Pipeliner schedules and runs a declarative pipeline — a directed
//! acyclic graph of named tasks with data and control dependencies,
//! optional conditions on edges, per-task configuration, and a shared
//! workspace — in parallel, honoring dependency ordering, condition
//! gating, cancellation, timeouts, resumption from a prior run, and
//! bounded concurrency.
//!
//! ## Core concepts
//!
//! - [`graph`] — vertices, edges, and the DAG they form
//! - [`validate`] — structural invariants (single root, acyclic, no
//!   self-loops) and graph queries (ancestors, leaves, topological order)
//! - [`workspace`] + [`codec`] + [`value`] — the concurrent shared
//!   key-value store and its pluggable snapshot serialization
//! - [`context`] — the per-vertex scoped read view over edge properties,
//!   predecessor outputs, and the workspace
//! - [`params`] — assembles a task's input object from declarative
//!   parameter specs
//! - [`walker`] + [`logical`] — the concurrency-bounded scheduler and its
//!   AND/`any`/`not` join algebra
//! - [`pipeline`] — owns the graph, per-task status, and the `run` algorithm
//! - [`builder`] + [`config`] — turns declarative configuration into a
//!   validated [`pipeline::Pipeline`]
//! - [`engine`] — a thin admission-controlled entry point over a pipeline
//! - [`registry`] + [`task`] — the external-collaborator seam for
//!   resolving and running user task implementations
//!
//! ## Quick start
//!
//! ```
//! use pipeliner::builder::Builder;
//! use pipeliner::config::PipelineConf;
//! use pipeliner::engine::Engine;
//! use pipeliner::registry::InMemoryRegistry;
//! use pipeliner::task::EchoTask;
//! use pipeliner::value::Value;
//! use pipeliner::workspace::SharedWorkspace;
//! use rustc_hash::FxHashMap;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = InMemoryRegistry::new().register(
//!     "echo",
//!     None,
//!     Arc::new(EchoTask::new("t1", "greeting", Value::from("hello"))),
//!     None,
//! );
//!
//! let conf: PipelineConf = serde_json::from_str(
//!     r#"{
//!         "name": "greet",
//!         "result": ["greeting"],
//!         "pipeline": [{"task": "t1", "name": "echo", "depends": []}]
//!     }"#,
//! )
//! .unwrap();
//!
//! let pipeline = Builder::new(&registry).build(&conf, FxHashMap::default()).unwrap();
//! let engine = Engine::new(10);
//! let result = engine.run(&pipeline, Arc::new(SharedWorkspace::new()), "req-1").await;
//! assert_eq!(result.outputs.get("greeting"), Some(&Value::from("hello")));
//! # }
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod logical;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod task;
pub mod types;
pub mod validate;
pub mod value;
pub mod walker;
pub mod workspace;
