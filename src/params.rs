//! Parameter assembler: builds a task's input object from literal,
//! variable, complex, and mapping specs (spec.md §4.3), grounded on
//! `internal/core/parameter.go`'s `assembleParam.getValue`.
//!
//! The Go source reflects into a caller-supplied struct pointer
//! (`reflect.ValueOf(paramObj).Elem()` / `FieldByName`); this crate has
//! no analogue for that and instead assembles into a plain
//! `FxHashMap<String, Value>` (`task::Params`), which task
//! implementations pattern-match or `.get()` out of — matching the
//! teacher's own preference for keyed extras maps over reflection-based
//! binding (see SPEC_FULL.md §4.3).

use crate::context::ScopedDataContext;
use crate::errors::ParamError;
use crate::task::Params;
use crate::value::Value;
use rustc_hash::FxHashMap;

/// One parameter's resolution recipe, keyed by the task-facing field
/// name it targets.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    /// If the resolved value is absent and `required`, resolution fails
    /// with [`ParamError::MissingRequired`]; otherwise the field is left
    /// unset.
    pub required: bool,
}

#[derive(Clone, Debug)]
pub enum ParamKind {
    Literal(Value),
    Variable(String),
    Complex(Vec<ParamSpec>),
    Mapping(FxHashMap<String, ParamSpec>),
}

impl ParamSpec {
    #[must_use]
    pub fn literal(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Literal(value),
            required: false,
        }
    }

    #[must_use]
    pub fn variable(name: impl Into<String>, key: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Variable(key.into()),
            required,
        }
    }

    #[must_use]
    pub fn complex(name: impl Into<String>, children: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Complex(children),
            required: false,
        }
    }

    #[must_use]
    pub fn mapping(name: impl Into<String>, children: FxHashMap<String, ParamSpec>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Mapping(children),
            required: false,
        }
    }
}

/// Assembles a task's [`Params`] object from its configured
/// [`ParamSpec`] list against a vertex's scoped data context.
pub struct ParameterAssembler;

impl ParameterAssembler {
    /// Resolves each top-level spec into `params[spec.name]`. A missing
    /// required value anywhere in the recursion aborts the whole
    /// assembly with that spec's error — surfaced by the caller as a
    /// task-level error response, never a crash (spec.md §4.3).
    pub fn assemble(ctx: &ScopedDataContext, specs: &[ParamSpec]) -> Result<Params, ParamError> {
        let mut params = Params::default();
        for spec in specs {
            if let Some(value) = Self::resolve(ctx, spec)? {
                params.insert(spec.name.clone(), value);
            }
        }
        Ok(params)
    }

    /// Resolves a single spec to `Some(value)`, or `None` when an
    /// optional variable is absent (the field is left at its default).
    fn resolve(ctx: &ScopedDataContext, spec: &ParamSpec) -> Result<Option<Value>, ParamError> {
        match &spec.kind {
            ParamKind::Literal(value) => Ok(Some(value.clone())),
            ParamKind::Variable(key) => match ctx.get(key) {
                Some(value) => Ok(Some(value)),
                None if spec.required => Err(ParamError::MissingRequired {
                    field: spec.name.clone(),
                }),
                None => Ok(None),
            },
            ParamKind::Complex(children) => {
                let mut list = Vec::with_capacity(children.len());
                for child in children {
                    match Self::resolve(ctx, child)? {
                        Some(value) => list.push(value),
                        None => list.push(Value::Null),
                    }
                }
                Ok(Some(Value::List(list)))
            }
            ParamKind::Mapping(children) => {
                let mut map = FxHashMap::default();
                for (key, child) in children {
                    if let Some(value) = Self::resolve(ctx, child)? {
                        map.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Map(map)))
            }
        }
    }
}
