//! Run definitions: the forecast-model configurations under evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::{EvalError, Result};

/// Dependency tag used in identifiers of interpolators fed by analysis data.
pub const ANALYSIS_SENTINEL: &str = "analysis";

/// Kind tag of a run entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Forecaster,
    Interpolator,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Forecaster => "forecaster",
            RunKind::Interpolator => "interpolator",
        }
    }

    /// Decode a kind tag, reporting `location` on failure.
    pub fn from_tag(tag: &str, location: &str) -> Result<Self> {
        match tag {
            "forecaster" => Ok(RunKind::Forecaster),
            "interpolator" => Ok(RunKind::Interpolator),
            other => Err(EvalError::UnsupportedModelType {
                location: location.to_string(),
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s, "kind")
    }
}

/// Content-derived identifier of a run. Safe to use as a path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub(crate) fn from_parts(
        kind: RunKind,
        source_hash: &str,
        body_hash: &str,
        upstream: Option<&Upstream>,
    ) -> Self {
        let mut id = format!("{}-{}-{}", kind.as_str(), source_hash, body_hash);
        if let Some(upstream) = upstream {
            id.push_str("-on-");
            id.push_str(upstream.tag());
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Where a run's trained weights come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// MLflow run id; the checkpoint is looked up in the tracking server.
    MlflowId(String),
    /// Direct checkpoint path or URI.
    Checkpoint(String),
}

impl ModelSource {
    pub(crate) fn from_body(body: &Map<String, Value>, location: &str) -> Result<Self> {
        let mlflow = string_field(body, "mlflow_id", location)?;
        let checkpoint = string_field(body, "checkpoint", location)?;
        match (mlflow, checkpoint) {
            (Some(id), None) => Ok(ModelSource::MlflowId(id)),
            (None, Some(path)) => Ok(ModelSource::Checkpoint(path)),
            (Some(_), Some(_)) => Err(EvalError::Configuration(format!(
                "{location}: `mlflow_id` and `checkpoint` are mutually exclusive"
            ))),
            (None, None) => Err(EvalError::missing(location, "mlflow_id")),
        }
    }

    /// The raw identifier string, as hashed into the run id prefix.
    pub fn identifier(&self) -> &str {
        match self {
            ModelSource::MlflowId(id) | ModelSource::Checkpoint(id) => id,
        }
    }
}

fn string_field(body: &Map<String, Value>, key: &str, location: &str) -> Result<Option<String>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Err(EvalError::Configuration(format!(
            "{location}: `{key}` must not be empty"
        ))),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(EvalError::Configuration(format!(
            "{location}: `{key}` must be a string"
        ))),
    }
}

/// Input of an interpolator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upstream {
    /// Inputs come straight from analysis data.
    Analysis,
    /// Inputs are the outputs of another run at the same init time.
    Run(RunId),
}

impl Upstream {
    /// Tag embedded in the dependent run's identifier.
    pub fn tag(&self) -> &str {
        match self {
            Upstream::Analysis => ANALYSIS_SENTINEL,
            Upstream::Run(id) => id.as_str(),
        }
    }

    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            Upstream::Analysis => None,
            Upstream::Run(id) => Some(id),
        }
    }
}

/// Kind-specific part of a [`RunDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunVariant {
    Forecaster,
    Interpolator { forecaster: Upstream },
}

impl RunVariant {
    pub fn kind(&self) -> RunKind {
        match self {
            RunVariant::Forecaster => RunKind::Forecaster,
            RunVariant::Interpolator { .. } => RunKind::Interpolator,
        }
    }
}

/// A resolved run entry as stored in the registry.
///
/// `body` is the resolved copy of the declaration: for interpolators the
/// nested `forecaster` object is replaced by `{"run_id": ...}` (or `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDefinition {
    pub run_id: RunId,
    #[serde(flatten)]
    pub variant: RunVariant,
    pub model_source: ModelSource,
    pub label: Option<String>,
    pub is_candidate: bool,
    pub body: Map<String, Value>,
}

impl RunDefinition {
    pub fn kind(&self) -> RunKind {
        self.variant.kind()
    }

    /// Upstream of an interpolator; `None` for forecasters.
    pub fn upstream(&self) -> Option<&Upstream> {
        match &self.variant {
            RunVariant::Forecaster => None,
            RunVariant::Interpolator { forecaster } => Some(forecaster),
        }
    }

    /// Label if declared, otherwise the identifier.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(self.run_id.as_str())
    }

    /// Inference config path (`config`).
    pub fn config_path(&self) -> Option<&str> {
        self.body.get("config").and_then(Value::as_str)
    }

    /// Extra Python requirements installed into the run environment.
    pub fn extra_dependencies(&self) -> Vec<&str> {
        self.body
            .get("extra_dependencies")
            .and_then(Value::as_array)
            .map(|deps| deps.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Output step schedule (`steps`), when declared.
    pub fn steps(&self) -> Option<&str> {
        self.body.get("steps").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_run_kind_from_tag() {
        assert_eq!(
            RunKind::from_tag("forecaster", "runs[0]").expect("forecaster"),
            RunKind::Forecaster
        );
        let err = RunKind::from_tag("downscaler", "runs[3]").expect_err("unknown kind");
        match err {
            EvalError::UnsupportedModelType { location, kind } => {
                assert_eq!(location, "runs[3]");
                assert_eq!(kind, "downscaler");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_model_source_variants() {
        let src = ModelSource::from_body(&body(json!({"mlflow_id": "abc"})), "runs[0]")
            .expect("mlflow");
        assert_eq!(src, ModelSource::MlflowId("abc".to_string()));

        let src = ModelSource::from_body(&body(json!({"checkpoint": "/ckpt/a.ckpt"})), "runs[0]")
            .expect("checkpoint");
        assert_eq!(src.identifier(), "/ckpt/a.ckpt");
    }

    #[test]
    fn test_model_source_missing_names_field() {
        let err = ModelSource::from_body(&body(json!({"label": "A"})), "runs[4]")
            .expect_err("missing source");
        assert!(matches!(
            err,
            EvalError::MissingField { ref location, ref field } if location == "runs[4]" && field == "mlflow_id"
        ));
    }

    #[test]
    fn test_model_source_ambiguous_is_rejected() {
        let err = ModelSource::from_body(
            &body(json!({"mlflow_id": "abc", "checkpoint": "/x"})),
            "runs[0]",
        )
        .expect_err("ambiguous");
        assert!(matches!(err, EvalError::Configuration(_)));
    }

    #[test]
    fn test_run_id_composition() {
        let fct = RunId::from_parts(RunKind::Forecaster, "1a2b", "deadbeef", None);
        assert_eq!(fct.as_str(), "forecaster-1a2b-deadbeef");

        let interp = RunId::from_parts(
            RunKind::Interpolator,
            "3c4d",
            "cafef00d",
            Some(&Upstream::Run(fct.clone())),
        );
        assert_eq!(
            interp.as_str(),
            "interpolator-3c4d-cafef00d-on-forecaster-1a2b-deadbeef"
        );

        let on_analysis = RunId::from_parts(
            RunKind::Interpolator,
            "3c4d",
            "cafef00d",
            Some(&Upstream::Analysis),
        );
        assert!(on_analysis.as_str().ends_with("-on-analysis"));
    }
}
