//! Turns a declarative [`PipelineConf`] into a validated, runnable
//! [`Pipeline`] (spec.md §4.7).
//!
//! Grounded on `internal/core/builder.go::BuildPipeline`: builtin-prefix
//! detection (`@`), registry resolution by `(name, namespace)`, component
//! default-timeout inheritance, graph assembly followed by validation, and
//! panic-capture-as-build-error via `defer recover()` — reproduced here
//! with `std::panic::catch_unwind`.

use crate::config::{PipelineConf, TaskConf};
use crate::errors::BuildError;
use crate::graph::{Condition, Edge, Graph, LogicalKind, Vertex, VertexId};
use crate::pipeline::Pipeline;
use crate::registry::ComponentRegistry;
use crate::types::{TaskConfigure, TaskStatus, BUILTIN_NODE_PREFIX};
use crate::validate;
use rustc_hash::FxHashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub struct Builder<'a> {
    registry: &'a dyn ComponentRegistry,
}

impl<'a> Builder<'a> {
    #[must_use]
    pub fn new(registry: &'a dyn ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Builds a [`Pipeline`] from `conf`. `initial_statuses` seeds the
    /// per-task status table for a resumed run (empty for a first run; any
    /// task id not present defaults to `Init`, per spec.md §4.7 step 4).
    ///
    /// Any panic raised while constructing the graph is caught and
    /// returned as [`BuildError::Panic`] rather than propagating, matching
    /// the original's `defer recover()` in `BuildPipeline`.
    #[tracing::instrument(skip(self, conf, initial_statuses), fields(pipeline = %conf.name))]
    pub fn build(
        &self,
        conf: &PipelineConf,
        initial_statuses: FxHashMap<VertexId, TaskStatus>,
    ) -> Result<Pipeline, BuildError> {
        match catch_unwind(AssertUnwindSafe(|| self.build_inner(conf))) {
            Ok(result) => {
                let pipeline = result?;
                Ok(pipeline.with_statuses(initial_statuses))
            }
            Err(payload) => Err(BuildError::Panic {
                message: panic_message(payload),
            }),
        }
    }

    fn build_inner(&self, conf: &PipelineConf) -> Result<Pipeline, BuildError> {
        let mut graph = Graph::new();
        let mut configs = FxHashMap::default();

        for task in &conf.pipeline {
            let id = VertexId::new(task.task.clone());
            let vertex = self.build_vertex(&id, task)?;
            graph.add_vertex(vertex);

            if !matches!(graph.vertex(&id).expect("just inserted").kind, crate::graph::VertexKind::Logical(_)) {
                configs.insert(id.clone(), self.build_task_configure(task)?);
            }
        }

        for task in &conf.pipeline {
            let target = VertexId::new(task.task.clone());
            for dep in &task.depends {
                let source = VertexId::new(dep.task.clone());
                let mut edge = Edge::new(source, target.clone())
                    .with_properties(dep.properties.clone());
                if let Some(cond) = &dep.condition {
                    edge = edge.with_condition(Condition {
                        key: cond.key.clone(),
                        value: cond.value.clone(),
                        operator: cond.operator.into(),
                    });
                }
                graph.add_edge(edge);
            }
        }

        validate::validate(&graph)?;

        let timeout = conf.timeout_duration().map_err(BuildError::Config)?;

        Ok(Pipeline::new(
            conf.name.clone(),
            Arc::new(graph),
            configs,
            conf.env.clone(),
            timeout,
            conf.concurrency,
            conf.result.clone(),
        ))
    }

    fn build_vertex(&self, id: &VertexId, task: &TaskConf) -> Result<Vertex, BuildError> {
        if let Some(suffix) = task.name.strip_prefix(BUILTIN_NODE_PREFIX) {
            let kind = LogicalKind::from_suffix(suffix).ok_or_else(|| BuildError::UnknownComponent {
                name: task.name.clone(),
                namespace: task.namespace.clone(),
            })?;
            return Ok(Vertex::logical(id.clone(), kind));
        }

        let component = self
            .registry
            .resolve(&task.name, task.namespace.as_deref())
            .ok_or_else(|| BuildError::UnknownComponent {
                name: task.name.clone(),
                namespace: task.namespace.clone(),
            })?;
        Ok(Vertex::task(id.clone(), component))
    }

    fn build_task_configure(&self, task: &TaskConf) -> Result<TaskConfigure, BuildError> {
        let explicit_timeout = task.config.timeout_duration().map_err(BuildError::Config)?;
        let timeout = explicit_timeout.or_else(|| self.registry.default_timeout(&task.name, task.namespace.as_deref()));

        let params = task
            .config
            .params
            .iter()
            .cloned()
            .map(|p| p.into_spec().map_err(BuildError::Config))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TaskConfigure {
            timeout,
            always_pass: task.config.always_pass,
            skip_execution: task.config.skip_execution,
            abort_if_error: task.config.abort_if_error,
            params,
        })
    }
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
