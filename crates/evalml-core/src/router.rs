//! Task routing: which pipeline stage handles a `(run, init time)` pair,
//! and which upstream task must complete first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{EvalError, Result};
use crate::domain::run::{RunId, RunKind, RunVariant, Upstream};
use crate::domain::time_grid::InitTime;
use crate::run_registry::RunRegistry;

/// Pipeline variant executed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Forecaster,
    Interpolator,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Forecaster => "inference_forecaster",
            Stage::Interpolator => "inference_interpolator",
        }
    }

    pub fn for_kind(kind: RunKind) -> Self {
        match kind {
            RunKind::Forecaster => Stage::Forecaster,
            RunKind::Interpolator => Stage::Interpolator,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of work for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub stage: Stage,
    pub run_id: RunId,
    pub init_time: InitTime,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}@{}]", self.stage, self.run_id, self.init_time)
    }
}

/// A task and the zero-or-one task it waits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task: TaskKey,
    /// Forecaster task at the *same* init time, for interpolators fed by a run.
    pub upstream: Option<TaskKey>,
}

/// Route `run_id` at `init_time` to its stage and upstream dependency.
pub fn route(registry: &RunRegistry, run_id: &RunId, init_time: InitTime) -> Result<TaskDescriptor> {
    let run = registry
        .get(run_id)
        .ok_or_else(|| EvalError::RunNotFound(run_id.to_string()))?;

    let upstream = match &run.variant {
        RunVariant::Forecaster => None,
        RunVariant::Interpolator {
            forecaster: Upstream::Analysis,
        } => None,
        RunVariant::Interpolator {
            forecaster: Upstream::Run(forecaster_id),
        } => Some(TaskKey {
            stage: Stage::Forecaster,
            run_id: forecaster_id.clone(),
            init_time,
        }),
    };

    Ok(TaskDescriptor {
        task: TaskKey {
            stage: Stage::for_kind(run.kind()),
            run_id: run_id.clone(),
            init_time,
        },
        upstream,
    })
}
