//! The component registry: resolves a task's `(name, namespace)` to a
//! runnable [`Task`], plus that component's default timeout.
//!
//! Out of scope per spec.md §1 ("the component registry... External
//! collaborators"); shipped here only as a thin seam `builder.rs` depends
//! on, plus an in-memory reference implementation for tests and demos.
//!
//! Grounded on `registry/registry.go`: components are keyed by name in one
//! map, or by `(namespace, name)` in a nested map when a namespace is
//! given; builtin logical-node constructors (`@any`, `@not`) are handled
//! separately by the builder via [`crate::graph::LogicalKind::from_suffix`],
//! matching the Go source registering them at `init()` time into the same
//! map this crate keeps as a distinct, non-registry-backed path.

use crate::task::Task;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a declarative `(name, namespace?)` pair to a component.
/// External collaborator: implementations typically wrap a host
/// application's real task catalogue (HTTP calls, template rendering,
/// etc.), none of which belong to this crate's core.
pub trait ComponentRegistry: Send + Sync {
    fn resolve(&self, name: &str, namespace: Option<&str>) -> Option<Arc<dyn Task>>;

    /// The component's default timeout, inherited by a task whose own
    /// `TaskConfigure.timeout` is unset (spec.md §4.7).
    fn default_timeout(&self, name: &str, namespace: Option<&str>) -> Option<Duration> {
        let _ = (name, namespace);
        None
    }
}

#[derive(Clone)]
struct Entry {
    task: Arc<dyn Task>,
    default_timeout: Option<Duration>,
}

/// A simple in-memory [`ComponentRegistry`], keyed `(namespace, name)` with
/// `namespace = None` for the unnamespaced map. Used by tests, demos, and
/// any embedding host that doesn't need a more elaborate catalogue.
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: FxHashMap<(Option<String>, String), Entry>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` under `(namespace, name)`, optionally with a
    /// component-level default timeout.
    #[must_use]
    pub fn register(
        mut self,
        name: impl Into<String>,
        namespace: Option<&str>,
        task: Arc<dyn Task>,
        default_timeout: Option<Duration>,
    ) -> Self {
        self.entries.insert(
            (namespace.map(str::to_string), name.into()),
            Entry { task, default_timeout },
        );
        self
    }
}

impl ComponentRegistry for InMemoryRegistry {
    fn resolve(&self, name: &str, namespace: Option<&str>) -> Option<Arc<dyn Task>> {
        self.entries
            .get(&(namespace.map(str::to_string), name.to_string()))
            .map(|e| e.task.clone())
    }

    fn default_timeout(&self, name: &str, namespace: Option<&str>) -> Option<Duration> {
        self.entries
            .get(&(namespace.map(str::to_string), name.to_string()))
            .and_then(|e| e.default_timeout)
    }
}
