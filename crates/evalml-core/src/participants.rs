//! Participants of the comparison report.
//!
//! Baselines come first (declaration order), then candidate runs
//! (discovery order). Entries are keyed by display label: the baseline's
//! `label` (or its id) and the run's `label` (or its run id). The dashboard
//! uses the same key as its legend, so two participants sharing a label
//! are rejected.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::baseline_registry::BaselineRegistry;
use crate::domain::error::{EvalError, Result};
use crate::layout::ArtifactLayout;
use crate::run_registry::RunRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Baseline,
    Run,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub kind: ParticipantKind,
    /// `baseline_id` or run id.
    pub id: String,
    /// Aggregated verification artifact.
    pub artifact: PathBuf,
}

/// Ordered `label → participant` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipantSet {
    entries: IndexMap<String, Participant>,
}

impl ParticipantSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&Participant> {
        self.entries.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(label, artifact path)` pairs in report order.
    pub fn artifacts(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(label, p)| (label.as_str(), p.artifact.as_path()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Participant)> {
        self.entries.iter().map(|(label, p)| (label.as_str(), p))
    }

    fn insert(&mut self, label: &str, participant: Participant) -> Result<()> {
        if let Some(existing) = self.entries.get(label) {
            return Err(EvalError::Configuration(format!(
                "participant label `{label}` is used by both `{}` and `{}`",
                existing.id, participant.id
            )));
        }
        self.entries.insert(label.to_string(), participant);
        Ok(())
    }
}

/// Compose the participant set. Pure path composition.
pub fn collect(
    runs: &RunRegistry,
    baselines: &BaselineRegistry,
    layout: &ArtifactLayout,
) -> Result<ParticipantSet> {
    let mut set = ParticipantSet::default();

    for baseline in baselines.definitions() {
        set.insert(
            baseline.label(),
            Participant {
                kind: ParticipantKind::Baseline,
                id: baseline.baseline_id.clone(),
                artifact: layout.baseline_aggregated(&baseline.baseline_id),
            },
        )?;
    }

    for run in runs.candidates() {
        set.insert(
            run.display_name(),
            Participant {
                kind: ParticipantKind::Run,
                id: run.run_id.to_string(),
                artifact: layout.run_aggregated(&run.run_id),
            },
        )?;
    }

    Ok(set)
}
