//! Execution plan: every `(run, init time)` task with its upstream.
//!
//! Tasks are ordered run by run in registry order, which already places a
//! dependency forecaster before any interpolator that consumes it.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::error::{EvalError, Result};
use crate::domain::run::RunId;
use crate::domain::time_grid::InitTime;
use crate::obs;
use crate::router::{route, TaskDescriptor, TaskKey};
use crate::run_registry::RunRegistry;

/// Ordered task list handed to the external scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub tasks: Vec<TaskDescriptor>,
}

impl ExecutionPlan {
    /// Expand every run over `init_times` and check upstream alignment.
    ///
    /// A repeated init time yields one task: each `(run, init time)` pair
    /// is a single scheduler job.
    ///
    /// Returns [`EvalError::DependencyResolution`] if a task's upstream is
    /// not scheduled earlier in the plan at the same init time.
    pub fn build(runs: &RunRegistry, init_times: &[InitTime]) -> Result<Self> {
        let mut tasks = Vec::with_capacity(runs.len() * init_times.len());
        let mut scheduled: HashSet<TaskKey> = HashSet::new();

        for run_id in runs.ids() {
            for &init_time in init_times {
                let descriptor = route(runs, run_id, init_time)?;
                if scheduled.contains(&descriptor.task) {
                    continue;
                }
                if let Some(upstream) = &descriptor.upstream {
                    if !scheduled.contains(upstream) {
                        return Err(EvalError::dependency(
                            descriptor.task.to_string(),
                            format!("upstream task {upstream} is not scheduled before it"),
                        ));
                    }
                }
                scheduled.insert(descriptor.task.clone());
                tasks.push(descriptor);
            }
        }

        obs::emit_plan_built(runs.len(), init_times.len(), tasks.len());
        Ok(Self { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks belonging to `run_id`, in init-time order.
    pub fn for_run<'a>(&'a self, run_id: &'a RunId) -> impl Iterator<Item = &'a TaskDescriptor> {
        self.tasks.iter().filter(move |d| &d.task.run_id == run_id)
    }

    /// Chunk a run's init times into scheduler job groups of `group_size`.
    ///
    /// A `group_size` of zero is treated as one.
    pub fn groups(&self, run_id: &RunId, group_size: usize) -> Vec<Vec<InitTime>> {
        let times: Vec<InitTime> = self.for_run(run_id).map(|d| d.task.init_time).collect();
        times
            .chunks(group_size.max(1))
            .map(<[InitTime]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_grid::{generate, TimeGridSpec};
    use crate::router::Stage;
    use serde_json::json;

    fn times(n: usize) -> Vec<InitTime> {
        let end = format!("2024-01-01T{:02}:00", (n - 1) * 6);
        generate(&TimeGridSpec::Range {
            start: "2024-01-01T00:00".to_string(),
            end,
            frequency: "6h".to_string(),
        })
        .expect("grid")
    }

    fn registry() -> RunRegistry {
        let entries = json!([
            { "interpolator": { "mlflow_id": "i", "forecaster": { "mlflow_id": "f" } } },
            { "interpolator": { "mlflow_id": "j", "forecaster": null } }
        ]);
        RunRegistry::build(entries.as_array().map(Vec::as_slice).unwrap_or_default())
            .expect("registry")
    }

    #[test]
    fn test_plan_covers_every_run_and_time() {
        let runs = registry();
        let plan = ExecutionPlan::build(&runs, &times(3)).expect("plan");
        assert_eq!(plan.len(), 9);
    }

    #[test]
    fn test_upstream_precedes_dependent() {
        let runs = registry();
        let plan = ExecutionPlan::build(&runs, &times(4)).expect("plan");
        for (pos, desc) in plan.tasks.iter().enumerate() {
            if let Some(up) = &desc.upstream {
                let up_pos = plan
                    .tasks
                    .iter()
                    .position(|d| &d.task == up)
                    .expect("upstream present");
                assert!(up_pos < pos);
                assert_eq!(up.init_time, desc.task.init_time);
                assert_eq!(up.stage, Stage::Forecaster);
            }
        }
    }

    #[test]
    fn test_empty_time_axis_yields_empty_plan() {
        let plan = ExecutionPlan::build(&registry(), &[]).expect("plan");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_repeated_init_time_scheduled_once() {
        let runs = RunRegistry::build(&[json!({ "forecaster": { "mlflow_id": "f" } })])
            .expect("registry");
        let init_times = generate(&TimeGridSpec::Explicit(vec![
            "2024-01-01T00:00".to_string(),
            "2024-01-01T06:00".to_string(),
            "2024-01-01T00:00".to_string(),
        ]))
        .expect("grid");
        assert_eq!(init_times.len(), 3);

        let plan = ExecutionPlan::build(&runs, &init_times).expect("plan");
        assert_eq!(plan.len(), 2);
        let distinct: HashSet<&TaskKey> = plan.tasks.iter().map(|d| &d.task).collect();
        assert_eq!(distinct.len(), plan.len());

        let run_id = runs.ids().next().expect("id");
        let groups = plan.groups(run_id, 4);
        assert_eq!(groups, vec![vec![init_times[0], init_times[1]]]);
    }

    #[test]
    fn test_groups_chunk_init_times() {
        let runs = registry();
        let plan = ExecutionPlan::build(&runs, &times(4)).expect("plan");
        let first = runs.ids().next().expect("id").clone();

        let groups = plan.groups(&first, 3);
        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), [3, 1]);
        assert_eq!(plan.groups(&first, 0).len(), 4);
    }
}
