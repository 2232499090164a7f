//! The `Task` trait: the seam between the scheduler and user-authored
//! business logic. Everything else in this crate is a collaborator of
//! `Task`, not a replacement for it — component implementations
//! (HTTP calls, template rendering, regex, sleep, ...) are external to
//! the core per spec.md §1; this module only defines the trait and a
//! couple of illustrative reference implementations used by tests and
//! demos.
//!
//! Before/after/listener hooks are expressed as optional capabilities a
//! task may *also* implement, probed for via accessor methods that
//! default to `None` — the idiomatic substitute for the original's
//! `if be, ok := executable.(starriver.BeforeExecute); ok` interface
//! assertion (spec.md §9, §9.1).

use crate::context::ScopedDataContext;
use crate::errors::TaskError;
use crate::types::Response;
use crate::value::Value;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::time::Duration;

/// A task's assembled parameter object: a flat keyed map, per the
/// parameter assembler's design note (spec.md §4.3 realization) — no
/// reflection-based binding into a caller struct.
pub type Params = FxHashMap<String, Value>;

/// Runs before a task's body, after parameters are assembled. Absence
/// is a no-op.
pub trait BeforeExecute: Send + Sync {
    fn before(&self, ctx: &ScopedDataContext);
}

/// Runs after a task's response is finalized, even if the body panicked.
pub trait AfterExecute: Send + Sync {
    fn after(&self, ctx: &ScopedDataContext, response: &Response);
}

/// Notified of the task's terminal outcome. Distinct from `AfterExecute`:
/// a listener only fires for the two outcomes a caller usually cares
/// about reporting (success data vs. failure), not every response shape.
pub trait Listener: Send + Sync {
    fn on_success(&self, ctx: &ScopedDataContext, data: &FxHashMap<String, Value>);
    fn on_failure(&self, ctx: &ScopedDataContext, error: &TaskError);
}

/// A unit of user-authored work attached to a non-logical vertex.
///
/// `id` is stable across the task's lifetime (mirrors `Executable.ID()`
/// in the original). `run` is the only required method; `as_before`,
/// `as_after`, and `as_listener` are optional-capability accessors the
/// walker probes before/after invoking `run`.
#[async_trait]
pub trait Task: Send + Sync {
    fn id(&self) -> &str;

    async fn run(&self, ctx: &ScopedDataContext, params: &Params) -> Response;

    /// A default timeout this task's component wants when the task's
    /// own `TaskConfigure` doesn't set one explicitly (spec.md §4.7,
    /// "inherit component's default timeout when task has none").
    fn default_timeout(&self) -> Option<Duration> {
        None
    }

    fn as_before(&self) -> Option<&dyn BeforeExecute> {
        None
    }

    fn as_after(&self) -> Option<&dyn AfterExecute> {
        None
    }

    fn as_listener(&self) -> Option<&dyn Listener> {
        None
    }
}

/// Reference task: succeeds immediately, optionally echoing a literal
/// value under `data_key`. Used by tests/demos in place of a real
/// component (HTTP, template, etc.), which are external collaborators.
pub struct EchoTask {
    id: String,
    data_key: String,
    value: Value,
}

impl EchoTask {
    #[must_use]
    pub fn new(id: impl Into<String>, data_key: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            data_key: data_key.into(),
            value,
        }
    }
}

#[async_trait]
impl Task for EchoTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, _ctx: &ScopedDataContext, _params: &Params) -> Response {
        let mut data = FxHashMap::default();
        data.insert(self.data_key.clone(), self.value.clone());
        Response::success_with_data(data)
    }
}

/// Reference task: sleeps for a fixed duration, observing cancellation
/// promptly (spec.md scenario 6, "fatal abort"). Used by the `t_slow`
/// fixture in integration tests.
pub struct SleepTask {
    id: String,
    duration: Duration,
}

impl SleepTask {
    #[must_use]
    pub fn new(id: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            duration,
        }
    }
}

#[async_trait]
impl Task for SleepTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, ctx: &ScopedDataContext, _params: &Params) -> Response {
        tokio::select! {
            () = tokio::time::sleep(self.duration) => Response::success(),
            () = ctx.cancelled() => Response::warning(TaskError::Cancelled(ctx.cancel_reason())),
        }
    }
}
