//! Core status/result vocabulary shared across the scheduler: task and
//! pipeline state machines, failure levels, condition operators, and the
//! per-vertex `Response`.

use crate::errors::TaskError;
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix identifying a builtin logical-node component name in config
/// (`@any`, `@not`).
pub const BUILTIN_NODE_PREFIX: &str = "@";

/// Per-task lifecycle state.
///
/// State machine: `Init -> {Success, Failure, Blocked, Skipped}`;
/// `Blocked -> {Success, Failure, Skipped}` on resume. `Success`,
/// `Failure`, and `Skipped` are terminal and are never overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Init,
    Blocked,
    Skipped,
    Success,
    Failure,
}

impl TaskStatus {
    /// Terminal statuses can never be overwritten by `Pipeline::set_task_status`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Skipped | TaskStatus::Failure)
    }
}

/// Whole-pipeline lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Init,
    Blocked,
    Failure,
    Success,
}

/// Ordered failure severity: `Normal < Warning < Error < Fatal`.
///
/// Warning does not count as failure at aggregation. Error contributes
/// to the aggregated pipeline failure. Fatal additionally cancels the
/// pipeline context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureLevel {
    Normal,
    Warning,
    Error,
    Fatal,
}

/// Comparison/equality operator carried by a conditional edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    In,
    Gt,
    Lt,
    Ge,
    Le,
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConditionOperator::Eq => "==",
            ConditionOperator::Ne => "!=",
            ConditionOperator::In => "in",
            ConditionOperator::Gt => ">",
            ConditionOperator::Lt => "<",
            ConditionOperator::Ge => ">=",
            ConditionOperator::Le => "<=",
        };
        write!(f, "{s}")
    }
}

/// Per-task configuration, keyed by task id in the pipeline's config.
#[derive(Clone, Debug, Default)]
pub struct TaskConfigure {
    /// Per-task execution timeout; installs a deadline on the scoped
    /// data context.
    pub timeout: Option<Duration>,
    /// Force the response to `pass = true` regardless of the task's
    /// actual outcome. The recorded `TaskStatus` is left unchanged (see
    /// the AlwaysPass/status asymmetry design note).
    pub always_pass: bool,
    /// Skip the task body entirely; status becomes `Skipped` and the
    /// response passes.
    pub skip_execution: bool,
    /// Promote a non-warning failure level to `Fatal`, cancelling the
    /// whole pipeline.
    pub abort_if_error: bool,
    /// Parameter specs used to assemble this task's input object.
    pub params: Vec<crate::params::ParamSpec>,
}

/// Outcome of running (or not running) a single vertex.
#[derive(Clone, Debug)]
pub struct Response {
    pub pass: bool,
    pub failure_level: FailureLevel,
    pub error: Option<TaskError>,
    pub data: Option<FxHashMap<String, Value>>,
    pub status: TaskStatus,
}

impl Response {
    #[must_use]
    pub fn success() -> Self {
        Self {
            pass: true,
            failure_level: FailureLevel::Normal,
            error: None,
            data: None,
            status: TaskStatus::Success,
        }
    }

    #[must_use]
    pub fn success_with_data(data: FxHashMap<String, Value>) -> Self {
        Self {
            data: Some(data),
            ..Self::success()
        }
    }

    #[must_use]
    pub fn warning(error: TaskError) -> Self {
        Self {
            pass: false,
            failure_level: FailureLevel::Warning,
            error: Some(error),
            data: None,
            status: TaskStatus::Failure,
        }
    }

    /// The synthetic response recorded for a vertex that did not run
    /// because its join rule or an inbound condition wasn't satisfied
    /// (spec.md §4.4 step 4, §4.5). `status` is left at `Init` since the
    /// pipeline's task-status map is never written for a vertex that
    /// never executed its body (see the builtin conditional-branch
    /// scenario: the untaken branch's status stays `init`).
    ///
    /// `pass` is `false` so failure cascades to further descendants
    /// rather than stopping at one hop — a deliberate divergence from
    /// the original Go source (which sets this response's `pass` to
    /// `true`, so an upstream-failed vertex reads as passing to *its*
    /// own descendants); see DESIGN.md for the rationale.
    #[must_use]
    pub fn upstream_failed(error: TaskError) -> Self {
        Self {
            pass: false,
            failure_level: FailureLevel::Warning,
            error: Some(error),
            data: None,
            status: TaskStatus::Init,
        }
    }

    #[must_use]
    pub fn error(error: TaskError) -> Self {
        Self {
            pass: false,
            failure_level: FailureLevel::Error,
            error: Some(error),
            data: None,
            status: TaskStatus::Failure,
        }
    }

    #[must_use]
    pub fn fatal(error: TaskError) -> Self {
        Self {
            pass: false,
            failure_level: FailureLevel::Fatal,
            error: Some(error),
            data: None,
            status: TaskStatus::Failure,
        }
    }

    #[must_use]
    pub fn blocked() -> Self {
        Self {
            pass: false,
            failure_level: FailureLevel::Warning,
            error: None,
            data: None,
            status: TaskStatus::Blocked,
        }
    }

    #[must_use]
    pub fn skipped() -> Self {
        Self {
            pass: true,
            failure_level: FailureLevel::Normal,
            error: None,
            data: None,
            status: TaskStatus::Skipped,
        }
    }

    /// Demote this response's failure level to `Warning` in place,
    /// as `any`/`not` joins do to predecessors that don't satisfy them
    /// (so they are excluded from pipeline error aggregation).
    pub fn demote_to_warning(&mut self) {
        if self.failure_level > FailureLevel::Warning {
            self.failure_level = FailureLevel::Warning;
        }
    }
}
