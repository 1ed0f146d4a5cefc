//! Run registry: expands raw run declarations into a deduplicated,
//! content-addressed map of [`RunDefinition`]s.
//!
//! Each raw entry is a single-key mapping `{<kind>: <body>}`. Interpolators
//! may nest a forecaster body under `forecaster`; that forecaster is
//! resolved first and registered as a non-candidate, and the interpolator
//! identifier then depends on the forecaster's identifier only.
//!
//! Two declarations with the same functional content (everything except
//! `label` and `is_candidate`) resolve to the same [`RunId`] and are stored
//! once. A run first reached as a dependency becomes a candidate as soon as
//! it is also declared at top level.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::domain::digest::{fingerprint_with_canonical, sha256_hex, strip_keys};
use crate::domain::error::{EvalError, Result};
use crate::domain::run::{ModelSource, RunDefinition, RunId, RunKind, RunVariant, Upstream};
use crate::obs;

/// Keys that never contribute to a run identifier.
pub const NON_FUNCTIONAL_KEYS: &[&str] = &["label", "is_candidate"];

/// Hex characters of the model-source hash in the identifier prefix.
pub const SOURCE_HASH_LEN: usize = 4;

/// A forecaster nested under an interpolator sits at depth 1; nothing deeper.
const MAX_DEPENDENCY_DEPTH: usize = 1;

/// Resolved runs keyed by identifier, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    runs: IndexMap<RunId, RunDefinition>,
    /// Canonical functional serialization per id, for collision detection.
    canonical: HashMap<RunId, String>,
}

impl RunRegistry {
    /// Build the registry from raw `runs` entries.
    ///
    /// Fails on the first malformed entry; no partial registry is returned.
    pub fn build(entries: &[Value]) -> Result<Self> {
        let mut registry = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            let location = format!("runs[{index}]");
            let (tag, body) = split_tagged(entry, &location)?;
            let kind = RunKind::from_tag(tag, &location)?;
            registry.resolve(kind, body, true, &location, 0)?;
        }

        obs::emit_registry_built(
            registry.runs.len(),
            registry.candidates().count(),
            entries.len(),
        );
        Ok(registry)
    }

    pub fn get(&self, run_id: &RunId) -> Option<&RunDefinition> {
        self.runs.get(run_id)
    }

    pub fn contains(&self, run_id: &RunId) -> bool {
        self.runs.contains_key(run_id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Identifiers in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &RunId> {
        self.runs.keys()
    }

    /// Definitions in discovery order.
    pub fn definitions(&self) -> impl Iterator<Item = &RunDefinition> {
        self.runs.values()
    }

    /// Runs that take part in the comparison report.
    pub fn candidates(&self) -> impl Iterator<Item = &RunDefinition> {
        self.runs.values().filter(|run| run.is_candidate)
    }

    /// Resolve one declaration (and its dependency) and merge it in.
    fn resolve(
        &mut self,
        kind: RunKind,
        body: &Map<String, Value>,
        is_candidate: bool,
        location: &str,
        depth: usize,
    ) -> Result<RunId> {
        let model_source = ModelSource::from_body(body, location)?;
        let label = match body.get("label") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(EvalError::Configuration(format!(
                    "{location}: `label` must be a string"
                )))
            }
        };

        let mut resolved = body.clone();
        let variant = match kind {
            RunKind::Forecaster => {
                match resolved.remove("forecaster") {
                    None | Some(Value::Null) => {}
                    Some(_) => {
                        return Err(EvalError::dependency(
                            location,
                            "a forecaster cannot itself depend on a forecaster",
                        ))
                    }
                }
                RunVariant::Forecaster
            }
            RunKind::Interpolator => {
                let upstream = match body.get("forecaster") {
                    None | Some(Value::Null) => Upstream::Analysis,
                    Some(Value::Object(dependency)) => {
                        let dep_location = format!("{location}.forecaster");
                        if depth >= MAX_DEPENDENCY_DEPTH {
                            return Err(EvalError::dependency(
                                dep_location,
                                "dependency chain is nested too deeply",
                            ));
                        }
                        let dep_id = self.resolve(
                            RunKind::Forecaster,
                            dependency,
                            false,
                            &dep_location,
                            depth + 1,
                        )?;
                        Upstream::Run(dep_id)
                    }
                    Some(other) => {
                        return Err(EvalError::dependency(
                            format!("{location}.forecaster"),
                            format!("expected a forecaster mapping or null, found {}", type_name(other)),
                        ))
                    }
                };
                let reference = match &upstream {
                    Upstream::Analysis => Value::Null,
                    Upstream::Run(id) => json!({ "run_id": id }),
                };
                resolved.insert("forecaster".to_string(), reference);
                RunVariant::Interpolator {
                    forecaster: upstream,
                }
            }
        };

        let exclude: BTreeSet<&str> = NON_FUNCTIONAL_KEYS.iter().copied().collect();
        let functional = match strip_keys(&Value::Object(resolved), &exclude) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let (canonical, body_hash) = fingerprint_with_canonical(
            &json!({ "kind": kind.as_str(), "body": &functional }),
            NON_FUNCTIONAL_KEYS,
        )?;

        let source_hash = &sha256_hex(model_source.identifier().as_bytes())[..SOURCE_HASH_LEN];
        let run_id = RunId::from_parts(
            kind,
            source_hash,
            &body_hash,
            match &variant {
                RunVariant::Forecaster => None,
                RunVariant::Interpolator { forecaster } => Some(forecaster),
            },
        );

        self.merge(
            RunDefinition {
                run_id,
                variant,
                model_source,
                label,
                is_candidate,
                body: functional,
            },
            canonical,
        )
    }

    /// Insert `run`, or fold it into an existing entry with the same id.
    fn merge(&mut self, run: RunDefinition, canonical: String) -> Result<RunId> {
        let run_id = run.run_id.clone();

        if let Some(existing) = self.runs.get_mut(&run_id) {
            if self.canonical.get(&run_id) != Some(&canonical) {
                return Err(EvalError::IdentifierCollision {
                    run_id: run_id.to_string(),
                });
            }
            if run.is_candidate && !existing.is_candidate {
                // The label now comes from the top-level declaration only.
                existing.is_candidate = true;
                existing.label = run.label;
                obs::emit_candidate_upgraded(run_id.as_str());
            } else {
                obs::emit_run_deduplicated(run_id.as_str());
            }
            return Ok(run_id);
        }

        obs::emit_run_registered(run_id.as_str(), run.kind().as_str(), run.is_candidate);
        self.canonical.insert(run_id.clone(), canonical);
        self.runs.insert(run_id.clone(), run);
        Ok(run_id)
    }
}

/// Split a single-key `{<kind>: <body>}` entry.
pub(crate) fn split_tagged<'a>(
    entry: &'a Value,
    location: &str,
) -> Result<(&'a str, &'a Map<String, Value>)> {
    let map = entry.as_object().ok_or_else(|| {
        EvalError::Configuration(format!(
            "{location}: expected a single-key mapping `{{<kind>: {{...}}}}`, found {}",
            type_name(entry)
        ))
    })?;
    let mut iter = map.iter();
    let (tag, body) = match (iter.next(), iter.next()) {
        (Some(pair), None) => pair,
        _ => {
            return Err(EvalError::Configuration(format!(
                "{location}: expected exactly one kind key, found {}",
                map.len()
            )))
        }
    };
    let body = body.as_object().ok_or_else(|| {
        EvalError::Configuration(format!(
            "{location}: body of `{tag}` must be a mapping, found {}",
            type_name(body)
        ))
    })?;
    Ok((tag.as_str(), body))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entries: Value) -> Result<RunRegistry> {
        match entries {
            Value::Array(list) => RunRegistry::build(&list),
            _ => panic!("fixture must be a list"),
        }
    }

    #[test]
    fn test_single_forecaster() {
        let registry = build(json!([{ "forecaster": { "mlflow_id": "abc123", "label": "A" } }]))
            .expect("build");
        assert_eq!(registry.len(), 1);
        let run = registry.definitions().next().expect("one run");
        assert_eq!(run.kind(), RunKind::Forecaster);
        assert!(run.is_candidate);
        assert_eq!(run.label.as_deref(), Some("A"));
        assert!(run.run_id.as_str().starts_with("forecaster-"));
        assert!(!run.body.contains_key("label"));
    }

    #[test]
    fn test_run_id_is_path_safe() {
        let registry = build(json!([
            { "forecaster": { "checkpoint": "s3://bucket/a/b/inference-last.ckpt" } },
            { "interpolator": {
                "mlflow_id": "i1",
                "forecaster": { "checkpoint": "s3://bucket/a/b/inference-last.ckpt" }
            } }
        ]))
        .expect("build");
        for id in registry.ids() {
            assert!(id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }

    #[test]
    fn test_nested_forecaster_registered_first_as_dependency() {
        let registry = build(json!([{ "interpolator": {
            "mlflow_id": "interp",
            "forecaster": { "mlflow_id": "fct", "label": "F" }
        } }]))
        .expect("build");

        let runs: Vec<_> = registry.definitions().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].kind(), RunKind::Forecaster);
        assert!(!runs[0].is_candidate);
        assert_eq!(runs[1].kind(), RunKind::Interpolator);
        assert!(runs[1].is_candidate);
        assert_eq!(
            runs[1].upstream(),
            Some(&Upstream::Run(runs[0].run_id.clone()))
        );
        assert_eq!(
            runs[1].body.get("forecaster"),
            Some(&json!({ "run_id": runs[0].run_id.as_str() }))
        );
        assert!(runs[1]
            .run_id
            .as_str()
            .ends_with(&format!("-on-{}", runs[0].run_id)));
    }

    #[test]
    fn test_is_candidate_flag_in_nested_body_is_ignored() {
        let registry = build(json!([{ "interpolator": {
            "mlflow_id": "interp",
            "forecaster": { "mlflow_id": "fct", "is_candidate": true }
        } }]))
        .expect("build");
        assert_eq!(registry.candidates().count(), 1);
    }

    #[test]
    fn test_candidate_upgrade_keeps_single_entry() {
        let registry = build(json!([
            { "interpolator": { "mlflow_id": "interp", "forecaster": { "mlflow_id": "fct" } } },
            { "forecaster": { "mlflow_id": "fct", "label": "Forecaster" } }
        ]))
        .expect("build");
        assert_eq!(registry.len(), 2);
        let fct = registry.definitions().next().expect("forecaster");
        assert!(fct.is_candidate);
        assert_eq!(fct.label.as_deref(), Some("Forecaster"));
    }

    #[test]
    fn test_candidate_upgrade_drops_dependency_label() {
        let registry = build(json!([
            { "interpolator": {
                "mlflow_id": "interp",
                "forecaster": { "mlflow_id": "fct", "label": "nested" }
            } },
            { "forecaster": { "mlflow_id": "fct" } }
        ]))
        .expect("build");
        let fct = registry.definitions().next().expect("forecaster");
        assert!(fct.is_candidate);
        assert_eq!(fct.label, None);
        assert_eq!(fct.display_name(), fct.run_id.as_str());
    }

    #[test]
    fn test_body_hash_matches_fingerprint() {
        let registry = build(json!([{ "forecaster": { "mlflow_id": "abc", "label": "A" } }]))
            .expect("build");
        let run = registry.definitions().next().expect("run");
        let expected = crate::domain::digest::fingerprint(
            &json!({ "kind": "forecaster", "body": { "mlflow_id": "abc" } }),
            &[],
        )
        .expect("fingerprint");
        assert!(run.run_id.as_str().ends_with(&format!("-{expected}")));
    }

    #[test]
    fn test_candidate_never_downgraded() {
        let registry = build(json!([
            { "forecaster": { "mlflow_id": "fct", "label": "F" } },
            { "interpolator": { "mlflow_id": "interp", "forecaster": { "mlflow_id": "fct" } } }
        ]))
        .expect("build");
        let fct = registry.definitions().next().expect("forecaster");
        assert!(fct.is_candidate);
        assert_eq!(fct.label.as_deref(), Some("F"));
    }

    #[test]
    fn test_interpolator_on_analysis() {
        let registry = build(json!([{ "interpolator": { "mlflow_id": "interp", "forecaster": null } }]))
            .expect("build");
        let run = registry.definitions().next().expect("run");
        assert_eq!(run.upstream(), Some(&Upstream::Analysis));
        assert!(run.run_id.as_str().ends_with("-on-analysis"));

        let implicit = build(json!([{ "interpolator": { "mlflow_id": "interp" } }])).expect("build");
        assert_eq!(implicit.ids().next(), registry.ids().next());
    }

    #[test]
    fn test_unknown_kind_reports_position() {
        let err = build(json!([
            { "forecaster": { "mlflow_id": "a" } },
            { "downscaler": { "mlflow_id": "b" } }
        ]))
        .expect_err("unknown kind");
        match err {
            EvalError::UnsupportedModelType { location, kind } => {
                assert_eq!(location, "runs[1]");
                assert_eq!(kind, "downscaler");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_model_source_in_dependency_reports_nested_location() {
        let err = build(json!([{ "interpolator": {
            "mlflow_id": "interp",
            "forecaster": { "label": "no source" }
        } }]))
        .expect_err("missing source");
        assert!(matches!(
            err,
            EvalError::MissingField { ref location, .. } if location == "runs[0].forecaster"
        ));
    }

    #[test]
    fn test_interpolator_chain_is_rejected() {
        let err = build(json!([{ "interpolator": {
            "mlflow_id": "outer",
            "forecaster": { "mlflow_id": "inner", "forecaster": { "mlflow_id": "deeper" } }
        } }]))
        .expect_err("chain");
        assert!(matches!(err, EvalError::DependencyResolution { .. }));
    }

    #[test]
    fn test_non_mapping_forecaster_is_rejected() {
        let err = build(json!([{ "interpolator": { "mlflow_id": "i", "forecaster": "fct" } }]))
            .expect_err("string dependency");
        assert!(matches!(
            err,
            EvalError::DependencyResolution { ref location, .. } if location == "runs[0].forecaster"
        ));
    }

    #[test]
    fn test_malformed_entries() {
        assert!(matches!(
            build(json!(["forecaster"])),
            Err(EvalError::Configuration(_))
        ));
        assert!(matches!(
            build(json!([{ "forecaster": { "mlflow_id": "a" }, "interpolator": {} }])),
            Err(EvalError::Configuration(_))
        ));
        assert!(matches!(
            build(json!([{ "forecaster": null }])),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn test_collision_detected_on_merge() {
        let mut registry = build(json!([{ "forecaster": { "mlflow_id": "a" } }])).expect("build");
        let mut forged = registry.definitions().next().expect("run").clone();
        forged.body.insert("steps".to_string(), json!("0/6/1"));
        let err = registry
            .merge(forged, "{\"different\":true}".to_string())
            .expect_err("collision");
        assert!(matches!(err, EvalError::IdentifierCollision { .. }));
    }
}
