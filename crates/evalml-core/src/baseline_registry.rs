//! Baseline registry: flat `baseline_id → definition` map.
//!
//! Unlike runs, baselines are keyed by their declared `baseline_id`
//! verbatim and have no dependencies.

use indexmap::IndexMap;
use serde_json::Value;

use crate::domain::baseline::BaselineDefinition;
use crate::domain::error::{EvalError, Result};
use crate::obs;
use crate::run_registry::split_tagged;

/// Baselines keyed by id, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineRegistry {
    baselines: IndexMap<String, BaselineDefinition>,
}

impl BaselineRegistry {
    /// Build the registry from raw `baselines` entries.
    ///
    /// A repeated `baseline_id` is accepted only when kind and body are
    /// identical to the first declaration.
    pub fn build(entries: &[Value]) -> Result<Self> {
        let mut baselines: IndexMap<String, BaselineDefinition> = IndexMap::new();

        for (index, entry) in entries.iter().enumerate() {
            let location = format!("baselines[{index}]");
            let (kind, body) = split_tagged(entry, &location)?;

            let mut body = body.clone();
            let baseline_id = match body.remove("baseline_id") {
                Some(Value::String(id)) if !id.is_empty() => id,
                None | Some(Value::Null) => return Err(EvalError::missing(location, "baseline_id")),
                Some(_) => {
                    return Err(EvalError::Configuration(format!(
                        "{location}: `baseline_id` must be a non-empty string"
                    )))
                }
            };
            if baseline_id.contains('/') {
                return Err(EvalError::Configuration(format!(
                    "{location}: `baseline_id` `{baseline_id}` must not contain `/`"
                )));
            }

            let definition = BaselineDefinition {
                baseline_id: baseline_id.clone(),
                kind: kind.to_string(),
                body,
            };
            definition.step_schedule()?;

            match baselines.get(&baseline_id) {
                Some(existing) if *existing == definition => {
                    tracing::debug!(baseline_id = %baseline_id, "ignoring identical duplicate baseline");
                }
                Some(_) => {
                    return Err(EvalError::Configuration(format!(
                        "{location}: baseline `{baseline_id}` is declared twice with different settings"
                    )))
                }
                None => {
                    obs::emit_baseline_registered(&baseline_id, kind);
                    baselines.insert(baseline_id, definition);
                }
            }
        }

        Ok(Self { baselines })
    }

    pub fn get(&self, baseline_id: &str) -> Option<&BaselineDefinition> {
        self.baselines.get(baseline_id)
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.baselines.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &BaselineDefinition> {
        self.baselines.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(entries: Value) -> Result<BaselineRegistry> {
        match entries {
            Value::Array(list) => BaselineRegistry::build(&list),
            _ => panic!("fixture must be a list"),
        }
    }

    #[test]
    fn test_id_is_popped_from_body() {
        let registry = build(json!([
            { "cosmoe": { "baseline_id": "COSMO-E", "label": "Baseline", "steps": "0/120/6" } }
        ]))
        .expect("build");
        let b = registry.get("COSMO-E").expect("present");
        assert_eq!(b.kind, "cosmoe");
        assert_eq!(b.label(), "Baseline");
        assert!(!b.body.contains_key("baseline_id"));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let registry = build(json!([
            { "cosmoe": { "baseline_id": "Z" } },
            { "icon": { "baseline_id": "A" } }
        ]))
        .expect("build");
        assert_eq!(registry.ids().collect::<Vec<_>>(), ["Z", "A"]);
    }

    #[test]
    fn test_missing_id_is_fatal() {
        let err = build(json!([
            { "cosmoe": { "baseline_id": "COSMO-E" } },
            { "cosmoe": { "label": "no id" } }
        ]))
        .expect_err("missing id");
        assert!(matches!(
            err,
            EvalError::MissingField { ref location, ref field }
                if location == "baselines[1]" && field == "baseline_id"
        ));
    }

    #[test]
    fn test_identical_duplicate_is_noop() {
        let registry = build(json!([
            { "cosmoe": { "baseline_id": "COSMO-E", "label": "Baseline" } },
            { "cosmoe": { "label": "Baseline", "baseline_id": "COSMO-E" } }
        ]))
        .expect("identical duplicate");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_duplicate_is_rejected() {
        let err = build(json!([
            { "cosmoe": { "baseline_id": "COSMO-E", "label": "Baseline" } },
            { "cosmoe": { "baseline_id": "COSMO-E", "label": "Other" } }
        ]))
        .expect_err("conflict");
        assert!(matches!(err, EvalError::Configuration(_)));

        let err = build(json!([
            { "cosmoe": { "baseline_id": "X" } },
            { "icon": { "baseline_id": "X" } }
        ]))
        .expect_err("kind conflict");
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_path_unsafe_id_is_rejected() {
        assert!(build(json!([{ "cosmoe": { "baseline_id": "a/b" } }])).is_err());
    }

    #[test]
    fn test_malformed_steps_rejected_at_build() {
        let err = build(json!([{ "cosmoe": { "baseline_id": "COSMO-E", "steps": "0/120" } }]))
            .expect_err("bad steps");
        assert!(err.to_string().contains("0/120"));
    }
}
