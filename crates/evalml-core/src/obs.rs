//! Structured observability hooks for registry and plan construction.
//!
//! Events carry an `event` field (`registry.built`, `run.registered`, ...)
//! so they can be filtered in JSON log output. Per-entry events are emitted
//! at `debug!`, summaries at `info!`.

use std::path::Path;

use tracing::{debug, info};

/// RAII guard that tags everything logged while a configuration is being
/// resolved with its path.
pub struct ContextSpan {
    _span: tracing::span::EnteredSpan,
}

impl ContextSpan {
    pub fn enter(config_path: &Path) -> Self {
        let span = tracing::info_span!("evalml.context", config = %config_path.display());
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_registered(run_id: &str, kind: &str, is_candidate: bool) {
    debug!(event = "run.registered", run_id = %run_id, kind = %kind, is_candidate = is_candidate);
}

pub fn emit_run_deduplicated(run_id: &str) {
    debug!(event = "run.deduplicated", run_id = %run_id);
}

/// A run first reached as a dependency was declared at top level.
pub fn emit_candidate_upgraded(run_id: &str) {
    info!(event = "run.candidate_upgraded", run_id = %run_id);
}

pub fn emit_baseline_registered(baseline_id: &str, kind: &str) {
    debug!(event = "baseline.registered", baseline_id = %baseline_id, kind = %kind);
}

pub fn emit_registry_built(runs: usize, candidates: usize, entries: usize) {
    info!(
        event = "registry.built",
        runs = runs,
        candidates = candidates,
        entries = entries,
    );
}

pub fn emit_plan_built(runs: usize, init_times: usize, tasks: usize) {
    info!(
        event = "plan.built",
        runs = runs,
        init_times = init_times,
        tasks = tasks,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_span_create() {
        let _span = ContextSpan::enter(Path::new("config/experiment.yaml"));
        emit_run_registered("forecaster-0000-00000000", "forecaster", true);
    }
}
