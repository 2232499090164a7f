//! Declarative pipeline configuration (spec.md §6): the serde-deserializable
//! shape a caller loads from YAML/JSON and hands to [`crate::builder::Builder`].
//!
//! Grounded on `conf.go`'s `PipelineConf`/`TaskConf`/
//! `TaskConfigureConf`/`DependConf`/`ConditionConf`/`ParamConf` structs —
//! this crate keeps the same field names and nesting so a YAML file written
//! against the original would deserialize here unchanged (modulo the
//! duration grammar, which is spelled out below since the Go source parses
//! it via a custom `UnmarshalYAML`, not reproduced verbatim).

use crate::errors::ConfigError;
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::time::Duration;

/// Top-level declarative pipeline configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConf {
    pub name: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub result: Vec<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub env: FxHashMap<String, Value>,
    pub pipeline: Vec<TaskConf>,
}

fn default_concurrency() -> usize {
    10
}

impl PipelineConf {
    /// Parses [`Self::timeout`] via [`parse_duration`], if set.
    pub fn timeout_duration(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout.as_deref().map(parse_duration).transpose()
    }
}

/// One task entry in `pipeline.pipeline`.
#[derive(Clone, Debug, Deserialize)]
pub struct TaskConf {
    pub task: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub config: TaskConfigureConf,
    #[serde(default)]
    pub depends: Vec<DependConf>,
}

/// `Task.config` — per-task execution knobs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskConfigureConf {
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub always_pass: bool,
    #[serde(default)]
    pub skip_execution: bool,
    #[serde(default)]
    pub abort_if_error: bool,
    #[serde(default)]
    pub params: Vec<ParamConf>,
}

impl TaskConfigureConf {
    pub fn timeout_duration(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout.as_deref().map(parse_duration).transpose()
    }
}

/// `Task.depends[i]` — a dependency on another task, optionally gated by a
/// condition and/or carrying properties visible to the target.
#[derive(Clone, Debug, Deserialize)]
pub struct DependConf {
    pub task: String,
    #[serde(default)]
    pub condition: Option<ConditionConf>,
    #[serde(default)]
    pub properties: FxHashMap<String, Value>,
}

/// `Task.depends[i].condition` — gates the edge on `key <operator> value`
/// evaluated against the target's scoped context.
#[derive(Clone, Debug, Deserialize)]
pub struct ConditionConf {
    pub key: String,
    pub value: Value,
    pub operator: ConditionOperatorConf,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperatorConf {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "in")]
    In,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl From<ConditionOperatorConf> for crate::types::ConditionOperator {
    fn from(op: ConditionOperatorConf) -> Self {
        use crate::types::ConditionOperator as Op;
        match op {
            ConditionOperatorConf::Eq => Op::Eq,
            ConditionOperatorConf::Ne => Op::Ne,
            ConditionOperatorConf::In => Op::In,
            ConditionOperatorConf::Gt => Op::Gt,
            ConditionOperatorConf::Lt => Op::Lt,
            ConditionOperatorConf::Ge => Op::Ge,
            ConditionOperatorConf::Le => Op::Le,
        }
    }
}

/// One parameter spec in `config.params`. Exactly one of `literal`,
/// `variable`, `complex`, `mapping` is populated, matching the
/// `type`-tagged shape of spec.md §6's `Param`.
#[derive(Clone, Debug, Deserialize)]
pub struct ParamConf {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKindConf,
    #[serde(default)]
    pub literal: Option<Value>,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub complex: Vec<ParamConf>,
    #[serde(default)]
    pub mapping: FxHashMap<String, ParamConf>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKindConf {
    Literal,
    Variable,
    Complex,
    Mapping,
}

impl ParamConf {
    /// Converts this declarative spec into the [`crate::params::ParamSpec`]
    /// the assembler consumes, recursively for `complex`/`mapping`.
    pub fn into_spec(self) -> Result<crate::params::ParamSpec, ConfigError> {
        use crate::params::{ParamKind, ParamSpec};
        let kind = match self.kind {
            ParamKindConf::Literal => {
                let value = self.literal.ok_or_else(|| {
                    ConfigError::InvalidDuration(format!("param {:?}: type=literal requires `literal`", self.name))
                })?;
                ParamKind::Literal(value)
            }
            ParamKindConf::Variable => {
                let key = self.variable.ok_or_else(|| {
                    ConfigError::InvalidDuration(format!("param {:?}: type=variable requires `variable`", self.name))
                })?;
                ParamKind::Variable(key)
            }
            ParamKindConf::Complex => {
                let children = self
                    .complex
                    .into_iter()
                    .map(ParamConf::into_spec)
                    .collect::<Result<Vec<_>, _>>()?;
                ParamKind::Complex(children)
            }
            ParamKindConf::Mapping => {
                let mut children = FxHashMap::default();
                for (key, conf) in self.mapping {
                    children.insert(key, conf.into_spec()?);
                }
                ParamKind::Mapping(children)
            }
        };
        Ok(ParamSpec {
            name: self.name,
            kind,
            required: self.required,
        })
    }
}

/// Parses a duration string of the form `<integer><unit>` with
/// `unit ∈ {ms, s, m, h, d}`, case-sensitive (spec.md §6). Anything else,
/// including a missing unit or a negative/non-integer magnitude, is a
/// [`ConfigError::InvalidDuration`] (surfaced as a parameter/config error,
/// never a panic).
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let split_at = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(|| ConfigError::InvalidDuration(s.to_string()))?;
    let (magnitude, unit) = s.split_at(split_at);
    let magnitude: u64 = magnitude.parse().map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
    let per_unit = match unit {
        "ms" => Duration::from_millis(1),
        "s" => Duration::from_secs(1),
        "m" => Duration::from_secs(60),
        "h" => Duration::from_secs(60 * 60),
        "d" => Duration::from_secs(24 * 60 * 60),
        _ => return Err(ConfigError::InvalidDuration(s.to_string())),
    };
    Ok(per_unit * magnitude as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_known_unit() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
    }

    #[test]
    fn rejects_unknown_unit_and_case() {
        assert!(parse_duration("5S").is_err());
        assert!(parse_duration("5 seconds").is_err());
        assert!(parse_duration("five").is_err());
        assert!(parse_duration("5").is_err());
    }

    #[test]
    fn deserializes_a_minimal_pipeline_conf_from_json() {
        let json = r#"{
            "name": "demo",
            "result": ["x"],
            "pipeline": [
                {"task": "t1", "name": "@any", "depends": []}
            ]
        }"#;
        let conf: PipelineConf = serde_json::from_str(json).unwrap();
        assert_eq!(conf.name, "demo");
        assert_eq!(conf.concurrency, 10);
        assert_eq!(conf.pipeline.len(), 1);
    }

    #[test]
    fn deserializes_a_full_param_conf_tree() {
        let json = r#"{
            "name": "x",
            "type": "complex",
            "complex": [
                {"name": "a", "type": "literal", "literal": 1},
                {"name": "b", "type": "variable", "variable": "k", "required": true}
            ]
        }"#;
        let conf: ParamConf = serde_json::from_str(json).unwrap();
        let spec = conf.into_spec().unwrap();
        match spec.kind {
            crate::params::ParamKind::Complex(children) => assert_eq!(children.len(), 2),
            other => panic!("expected complex, got {other:?}"),
        }
    }
}
