//! Output directory layout shared with the execution layer.
//!
//! ```text
//! <output_root>/
//!   data/
//!     runs/<run_id>/verif_aggregated.csv
//!     runs/<run_id>/<YYYYMMDDHHMM>/grib/
//!     runs/<run_id>/<YYYYMMDDHHMM>/verif.csv
//!     runs/<run_id>/<YYYYMMDDHHMM>/<stage>.ok
//!     baselines/<baseline_id>/verif_aggregated.csv
//!   results/dashboard.html
//! ```
//!
//! Pure path composition; nothing here touches the filesystem.

use std::path::{Path, PathBuf};

use crate::domain::run::RunId;
use crate::domain::time_grid::InitTime;
use crate::router::TaskKey;

/// File name of the per-participant aggregated verification artifact.
pub const AGGREGATED_FILE: &str = "verif_aggregated.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    output_root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn data_root(&self) -> PathBuf {
        self.output_root.join("data")
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.data_root().join("runs").join(run_id.as_str())
    }

    pub fn run_init_dir(&self, run_id: &RunId, init_time: InitTime) -> PathBuf {
        self.run_dir(run_id).join(init_time.to_string())
    }

    pub fn grib_dir(&self, run_id: &RunId, init_time: InitTime) -> PathBuf {
        self.run_init_dir(run_id, init_time).join("grib")
    }

    pub fn run_verification(&self, run_id: &RunId, init_time: InitTime) -> PathBuf {
        self.run_init_dir(run_id, init_time).join("verif.csv")
    }

    /// One aggregated artifact per run, independent of init time.
    pub fn run_aggregated(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join(AGGREGATED_FILE)
    }

    pub fn baseline_dir(&self, baseline_id: &str) -> PathBuf {
        self.data_root().join("baselines").join(baseline_id)
    }

    pub fn baseline_aggregated(&self, baseline_id: &str) -> PathBuf {
        self.baseline_dir(baseline_id).join(AGGREGATED_FILE)
    }

    /// Marker touched by the execution layer once `task` has completed.
    pub fn completion_marker(&self, task: &TaskKey) -> PathBuf {
        self.run_init_dir(&task.run_id, task.init_time)
            .join(format!("{}.ok", task.stage.name()))
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_root.join("results").join("dashboard.html")
    }
}
