//! Shared fixtures for the integration test suite: a configurable test
//! `Task` and a tiny `ComponentRegistry` builder, mirroring the teacher
//! pack's `tests/common/` role for this crate's own domain.

use async_trait::async_trait;
use pipeliner::context::ScopedDataContext;
use pipeliner::errors::TaskError;
use pipeliner::registry::InMemoryRegistry;
use pipeliner::task::{Params, Task};
use pipeliner::types::Response;
use pipeliner::value::Value;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a [`ScriptedTask`] does when run.
#[derive(Clone)]
pub enum Script {
    Pass(FxHashMap<String, Value>),
    Fail,
    Fatal,
    Blocked,
    /// Sets `key = value` in the workspace, always passes.
    SetAndPass(String, Value),
    /// Sleeps for the given duration, observing cancellation.
    Sleep(Duration),
}

/// A `Task` whose behavior is fixed at construction, for deterministic
/// end-to-end scenarios. Optionally counts concurrent in-flight
/// invocations via a shared `Arc<AtomicUsize>` for concurrency-bound
/// assertions.
pub struct ScriptedTask {
    id: String,
    script: Script,
    in_flight: Option<Arc<AtomicUsize>>,
    max_observed: Option<Arc<AtomicUsize>>,
}

impl ScriptedTask {
    #[must_use]
    pub fn new(id: impl Into<String>, script: Script) -> Self {
        Self {
            id: id.into(),
            script,
            in_flight: None,
            max_observed: None,
        }
    }

    #[must_use]
    pub fn with_concurrency_tracking(mut self, in_flight: Arc<AtomicUsize>, max_observed: Arc<AtomicUsize>) -> Self {
        self.in_flight = Some(in_flight);
        self.max_observed = Some(max_observed);
        self
    }
}

#[async_trait]
impl Task for ScriptedTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, ctx: &ScopedDataContext, _params: &Params) -> Response {
        if let (Some(in_flight), Some(max_observed)) = (&self.in_flight, &self.max_observed) {
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_observed.fetch_max(current, Ordering::SeqCst);
        }

        let response = match &self.script {
            Script::Pass(data) => Response::success_with_data(data.clone()),
            Script::Fail => Response::error(TaskError::Provider("scripted failure".into())),
            Script::Fatal => Response::fatal(TaskError::Provider("scripted fatal".into())),
            Script::Blocked => Response::blocked(),
            Script::SetAndPass(key, value) => {
                ctx.set(key.clone(), value.clone());
                Response::success()
            }
            Script::Sleep(duration) => {
                tokio::select! {
                    () = tokio::time::sleep(*duration) => Response::success(),
                    () = ctx.cancelled() => Response::warning(TaskError::Cancelled(ctx.cancel_reason())),
                }
            }
        };

        if let Some(in_flight) = &self.in_flight {
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        response
    }
}

/// Builds an [`InMemoryRegistry`] with one `ScriptedTask` registered under
/// its own id as the component name, the convention every fixture test in
/// this suite uses.
#[must_use]
pub fn registry_of(tasks: Vec<ScriptedTask>) -> InMemoryRegistry {
    let mut registry = InMemoryRegistry::new();
    for task in tasks {
        let name = task.id().to_string();
        registry = registry.register(name, None, Arc::new(task), None);
    }
    registry
}
