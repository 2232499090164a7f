//! Crate-wide error taxonomy.
//!
//! One `thiserror` enum per concern, each carrying a `miette::Diagnostic`
//! impl behind the `diagnostics` feature, matching error code/help pairs
//! to the concern they belong to.

use crate::graph::VertexId;
use crate::types::ConditionOperator;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors raised while validating or building a DAG from configuration.
/// Reported by the builder; the pipeline is never created when this
/// occurs.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum BuildError {
    #[error("graph has no root vertex")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pipeliner::build::no_root),
            help("every vertex has at least one inbound edge; add an entry point")
        )
    )]
    NoRoot,

    #[error("graph has multiple roots: {ids:?}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pipeliner::build::multiple_roots),
            help("only one vertex may have in-degree zero")
        )
    )]
    MultipleRoots { ids: Vec<VertexId> },

    #[error("cycle: {}", members.iter().map(VertexId::as_str).collect::<Vec<_>>().join(", "))]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pipeliner::build::cycle),
            help("remove one of the listed edges to break the cycle")
        )
    )]
    Cycle { members: Vec<VertexId> },

    #[error("self reference: {id}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pipeliner::build::self_loop),
            help("an edge may not target its own source vertex")
        )
    )]
    SelfLoop { id: VertexId },

    #[error("can not found node with name {name:?} (namespace {namespace:?})")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pipeliner::build::unknown_component),
            help("register a component under this (name, namespace) before building")
        )
    )]
    UnknownComponent {
        name: String,
        namespace: Option<String>,
    },

    #[error("build pipeline panic: {message}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(pipeliner::build::panic))
    )]
    Panic { message: String },

    #[error("invalid configuration: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::build::config)))]
    Config(#[from] ConfigError),
}

/// Errors raised while assembling a task's parameter object.
/// Surfaced as a task-level error response; never crashes the pipeline.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParamError {
    #[error("required parameter {field:?} missing")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(pipeliner::params::missing_required),
            help("the scoped context has no value for this variable and `required: true` was set")
        )
    )]
    MissingRequired { field: String },
}

/// Errors raised while evaluating an edge condition.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ConditionError {
    #[error("condition eval fail, key={key:?} not exist")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::condition::missing_key)))]
    MissingKey { key: String },

    #[error("condition eval error: operator {operator:?} not comparable for these operands")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::condition::not_comparable)))]
    NotComparable { operator: ConditionOperator },
}

/// Errors raised while parsing pipeline configuration.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ConfigError {
    #[error("invalid duration string: {0:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::config::invalid_duration)))]
    InvalidDuration(String),

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::config::serde)))]
    Serde(#[from] serde_json::Error),
}

/// Errors raised by a `Codec` implementation while encoding or decoding
/// a workspace snapshot.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum CodecError {
    #[error("snapshot encode failed: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::codec::encode)))]
    Encode(String),

    #[error("snapshot decode failed: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::codec::decode)))]
    Decode(String),
}

/// A task-level error: the error payload carried by a non-passing
/// `Response`.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum TaskError {
    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::task::param)))]
    Param(#[from] ParamError),

    #[error("condition not match")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::task::condition_not_match)))]
    ConditionNotMatch,

    #[error("upstream is failure")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::task::upstream_failed)))]
    UpstreamFailed,

    #[error("cancelled: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::task::cancelled)))]
    Cancelled(String),

    #[error("{0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::task::provider)))]
    Provider(String),

    #[error("{message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(pipeliner::task::panicked)))]
    Panicked { message: String },
}
