//! Basic directed-graph primitives: vertex identity, edges (with
//! optional conditions and properties), and the graph container itself.
//!
//! Polymorphism over vertex capability (plain task vs. logical join node)
//! is expressed as a variant (`VertexKind`), not inheritance, per the
//! design note on polymorphic vertices.

use crate::context::ScopedDataContext;
use crate::errors::ConditionError;
use crate::task::Task;
use crate::types::ConditionOperator;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Stable string identifier for a vertex, unique within a pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(String);

impl VertexId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A vertex's logical join kind, for builtin nodes with no task body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalKind {
    /// Pass iff at least one predecessor passed. Non-passing
    /// predecessors are demoted to warning.
    Any,
    /// Exactly one predecessor; pass iff it did not pass (demoted to
    /// warning).
    Not,
}

impl LogicalKind {
    #[must_use]
    pub fn builtin_name(self) -> &'static str {
        match self {
            LogicalKind::Any => "@any",
            LogicalKind::Not => "@not",
        }
    }

    /// Parse the suffix following the builtin prefix (`any`, `not`).
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "any" => Some(LogicalKind::Any),
            "not" => Some(LogicalKind::Not),
            _ => None,
        }
    }
}

/// Whether a vertex runs user task code or is a builtin logical join.
#[derive(Clone)]
pub enum VertexKind {
    Task(Arc<dyn Task>),
    Logical(LogicalKind),
}

impl fmt::Debug for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexKind::Task(_) => write!(f, "VertexKind::Task(..)"),
            VertexKind::Logical(kind) => write!(f, "VertexKind::Logical({kind:?})"),
        }
    }
}

/// A node in the pipeline DAG.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub id: VertexId,
    pub kind: VertexKind,
}

impl Vertex {
    #[must_use]
    pub fn task(id: impl Into<VertexId>, task: Arc<dyn Task>) -> Self {
        Self {
            id: id.into(),
            kind: VertexKind::Task(task),
        }
    }

    #[must_use]
    pub fn logical(id: impl Into<VertexId>, kind: LogicalKind) -> Self {
        Self {
            id: id.into(),
            kind: VertexKind::Logical(kind),
        }
    }

    #[must_use]
    pub fn is_logical(&self) -> bool {
        matches!(self.kind, VertexKind::Logical(_))
    }
}

/// A directed, optionally conditional dependency between two vertices.
#[derive(Clone, Debug)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    /// Visible to the target as part of its scoped context. Later edges
    /// (in insertion order) overwrite earlier ones by key.
    pub properties: FxHashMap<String, Value>,
    pub condition: Option<Condition>,
}

impl Edge {
    #[must_use]
    pub fn new(source: impl Into<VertexId>, target: impl Into<VertexId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            properties: FxHashMap::default(),
            condition: None,
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: FxHashMap<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// A condition gating a conditional edge: `key <operator> value` is
/// evaluated against the target vertex's scoped context.
#[derive(Clone, Debug)]
pub struct Condition {
    pub key: String,
    pub value: Value,
    pub operator: ConditionOperator,
}

impl Condition {
    /// Evaluates this condition against a vertex's scoped context.
    /// A missing key or an uncoercible numeric comparison is reported as
    /// a [`ConditionError`] rather than silently returning `false`; the
    /// call site (`walker.rs`) logs it and treats the edge as
    /// non-matching, mirroring the original `conditionEdge.Match`'s
    /// `dc.Errorf(...); return false` pattern.
    pub fn matches(&self, ctx: &ScopedDataContext) -> Result<bool, ConditionError> {
        let Some(actual) = ctx.get(&self.key) else {
            return Err(ConditionError::MissingKey { key: self.key.clone() });
        };
        match self.operator {
            ConditionOperator::Eq => Ok(actual == self.value),
            ConditionOperator::Ne => Ok(actual != self.value),
            ConditionOperator::In => Ok(self.value.contains(&actual)),
            ConditionOperator::Gt | ConditionOperator::Lt | ConditionOperator::Ge | ConditionOperator::Le => {
                match (actual.as_f64(), self.value.as_f64()) {
                    (Some(a), Some(b)) => Ok(match self.operator {
                        ConditionOperator::Gt => a > b,
                        ConditionOperator::Lt => a < b,
                        ConditionOperator::Ge => a >= b,
                        ConditionOperator::Le => a <= b,
                        _ => unreachable!(),
                    }),
                    _ => Err(ConditionError::NotComparable { operator: self.operator }),
                }
            }
        }
    }
}

/// Set of vertices + set of edges. No invariants are enforced here;
/// `crate::validate` checks single-root/acyclic/no-self-loop.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub vertices: FxHashMap<VertexId, Vertex>,
    pub edges: Vec<Edge>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.vertices.insert(vertex.id.clone(), vertex);
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    #[must_use]
    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// Edges whose target is `id`, in insertion order.
    #[must_use]
    pub fn inbound(&self, id: &VertexId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| &e.target == id).collect()
    }

    /// Edges whose source is `id`, in insertion order.
    #[must_use]
    pub fn outbound(&self, id: &VertexId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| &e.source == id).collect()
    }

    #[must_use]
    pub fn in_degree(&self, id: &VertexId) -> usize {
        self.inbound(id).len()
    }

    #[must_use]
    pub fn out_degree(&self, id: &VertexId) -> usize {
        self.outbound(id).len()
    }

    #[must_use]
    pub fn vertex_ids(&self) -> Vec<VertexId> {
        let mut ids: Vec<VertexId> = self.vertices.keys().cloned().collect();
        ids.sort();
        ids
    }
}
