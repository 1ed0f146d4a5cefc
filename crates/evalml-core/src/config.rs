//! Experiment configuration document and loader.
//!
//! Unknown top-level keys are rejected so that misspelled settings fail
//! loudly. `runs` and `baselines` stay as raw values here; their structure
//! is checked by the registry builders, which know entry positions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{EvalError, Result};
use crate::domain::time_grid::{LeadTime, TimeGridSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub description: String,
    pub dates: TimeGridSpec,
    #[serde(default)]
    pub lead_time: Option<String>,
    pub runs: Vec<Value>,
    #[serde(default)]
    pub baselines: Vec<Value>,
    pub locations: Locations,
    #[serde(default)]
    pub execution: Execution,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Locations {
    pub output_root: PathBuf,
    /// MLflow tracking URI(s) used to resolve `mlflow_id` sources.
    #[serde(default)]
    pub mlflow_uri: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Execution {
    /// Init times executed inside one scheduler job.
    pub run_group_size: usize,
}

impl Default for Execution {
    fn default() -> Self {
        Self { run_group_size: 1 }
    }
}

/// Workflow-executor profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub executor: String,
    pub default_resources: DefaultResources,
    pub jobs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultResources {
    pub slurm_partition: String,
    pub cpus_per_task: u32,
    pub mem_mb_per_cpu: u32,
    pub runtime: String,
}

impl DefaultResources {
    /// `key=value` pairs in declaration order.
    pub fn to_pairs(&self) -> Vec<String> {
        vec![
            format!("slurm_partition={}", self.slurm_partition),
            format!("cpus_per_task={}", self.cpus_per_task),
            format!("mem_mb_per_cpu={}", self.mem_mb_per_cpu),
            format!("runtime={}", self.runtime),
        ]
    }
}

impl Profile {
    /// Executor command-line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--executor".to_string(), self.executor.clone()];
        args.push("--default-resources".to_string());
        args.extend(self.default_resources.to_pairs());
        args.push("--jobs".to_string());
        args.push(self.jobs.to_string());
        args
    }
}

impl ExperimentConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parse the optional `lead_time`.
    pub fn lead_time(&self) -> Result<Option<LeadTime>> {
        self.lead_time.as_deref().map(str::parse).transpose()
    }

    /// Check bounds that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.execution.run_group_size == 0 {
            return Err(EvalError::Configuration(
                "execution.run_group_size must be >= 1".to_string(),
            ));
        }
        if let Some(profile) = &self.profile {
            let res = &profile.default_resources;
            if profile.jobs == 0 || res.cpus_per_task == 0 || res.mem_mb_per_cpu == 0 {
                return Err(EvalError::Configuration(
                    "profile: jobs, cpus_per_task and mem_mb_per_cpu must be >= 1".to_string(),
                ));
            }
        }
        if self.locations.output_root.as_os_str().is_empty() {
            return Err(EvalError::missing("locations", "output_root"));
        }
        self.lead_time()?;
        Ok(())
    }
}

/// Load and validate a configuration file (`.yaml`, `.yml` or `.json`).
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => ExperimentConfig::from_yaml_str(&content)?,
        Some("json") => ExperimentConfig::from_json_str(&content)?,
        _ => {
            return Err(EvalError::Configuration(format!(
                "unsupported config format for {}: expected .yaml, .yml or .json",
                path.display()
            )))
        }
    };
    config.validate()?;
    tracing::debug!(path = %path.display(), runs = config.runs.len(), "loaded experiment config");
    Ok(config)
}
