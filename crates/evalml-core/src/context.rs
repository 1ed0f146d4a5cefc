//! Pipeline context: everything derived from one configuration, computed
//! once and shared read-only by all consumers.

use std::path::Path;

use crate::baseline_registry::BaselineRegistry;
use crate::config::{load_config, ExperimentConfig};
use crate::domain::error::Result;
use crate::domain::run::RunId;
use crate::domain::time_grid::{generate, InitTime};
use crate::layout::ArtifactLayout;
use crate::obs::ContextSpan;
use crate::participants::{collect, ParticipantSet};
use crate::plan::ExecutionPlan;
use crate::router::{route, TaskDescriptor};
use crate::run_registry::RunRegistry;

#[derive(Debug, Clone)]
pub struct PipelineContext {
    config: ExperimentConfig,
    init_times: Vec<InitTime>,
    runs: RunRegistry,
    baselines: BaselineRegistry,
    layout: ArtifactLayout,
}

impl PipelineContext {
    /// Resolve `config`. Fails before anything is scheduled.
    pub fn from_config(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let init_times = generate(&config.dates)?;
        let runs = RunRegistry::build(&config.runs)?;
        let baselines = BaselineRegistry::build(&config.baselines)?;
        let layout = ArtifactLayout::new(config.locations.output_root.clone());

        tracing::info!(
            init_times = init_times.len(),
            runs = runs.len(),
            baselines = baselines.len(),
            "pipeline context ready"
        );

        Ok(Self {
            config,
            init_times,
            runs,
            baselines,
            layout,
        })
    }

    /// Load the configuration file at `path` and resolve it.
    pub fn load(path: &Path) -> Result<Self> {
        let _span = ContextSpan::enter(path);
        Self::from_config(load_config(path)?)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn init_times(&self) -> &[InitTime] {
        &self.init_times
    }

    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    pub fn baselines(&self) -> &BaselineRegistry {
        &self.baselines
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn participants(&self) -> Result<ParticipantSet> {
        collect(&self.runs, &self.baselines, &self.layout)
    }

    pub fn route(&self, run_id: &RunId, init_time: InitTime) -> Result<TaskDescriptor> {
        route(&self.runs, run_id, init_time)
    }

    pub fn plan(&self) -> Result<ExecutionPlan> {
        ExecutionPlan::build(&self.runs, &self.init_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_context_is_shareable() {
        assert_send_sync::<PipelineContext>();
    }

    #[test]
    fn test_from_config_builds_everything() {
        let config = ExperimentConfig::from_json_str(
            r#"{
                "dates": {"start": "2024-01-01T00:00", "end": "2024-01-01T18:00", "frequency": "6h"},
                "runs": [{"forecaster": {"mlflow_id": "abc123", "label": "A"}}],
                "baselines": [{"cosmoe": {"baseline_id": "COSMO-E"}}],
                "locations": {"output_root": "/out"}
            }"#,
        )
        .expect("parse");
        let ctx = PipelineContext::from_config(config).expect("context");
        assert_eq!(ctx.init_times().len(), 4);
        assert_eq!(ctx.runs().len(), 1);
        assert_eq!(ctx.baselines().len(), 1);
        assert_eq!(ctx.plan().expect("plan").len(), 4);
        assert_eq!(ctx.participants().expect("participants").len(), 2);
    }

    #[test]
    fn test_from_config_fails_fast_on_bad_run() {
        let config = ExperimentConfig::from_json_str(
            r#"{
                "dates": ["2024-01-01T00:00"],
                "runs": [{"nowcaster": {"mlflow_id": "abc"}}],
                "locations": {"output_root": "/out"}
            }"#,
        )
        .expect("parse");
        assert!(PipelineContext::from_config(config).is_err());
    }
}
