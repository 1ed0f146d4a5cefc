//! Baseline definitions: reference datasets evaluated alongside runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::{EvalError, Result};

/// A baseline entry. Its identifier is the user-supplied `baseline_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineDefinition {
    pub baseline_id: String,
    /// Kind tag as declared (e.g. `cosmoe`); informational only.
    pub kind: String,
    /// Declaration body with `baseline_id` removed.
    pub body: Map<String, Value>,
}

impl BaselineDefinition {
    /// Declared label, falling back to the identifier.
    pub fn label(&self) -> &str {
        self.body
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&self.baseline_id)
    }

    /// Source location of the baseline data (`root`).
    pub fn source_location(&self) -> Option<&str> {
        self.body.get("root").and_then(Value::as_str)
    }

    /// Parsed `steps` schedule, if declared.
    pub fn step_schedule(&self) -> Result<Option<StepSchedule>> {
        match self.body.get("steps") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s.parse().map(Some),
            Some(_) => Err(EvalError::Configuration(format!(
                "baseline `{}`: `steps` must be a string like `0/120/6`",
                self.baseline_id
            ))),
        }
    }
}

/// Lead-time schedule `start/end/step`, in hours, end inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepSchedule {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl StepSchedule {
    /// Lead times in hours covered by the schedule.
    pub fn lead_times(&self) -> Vec<u32> {
        (self.start..=self.end).step_by(self.step as usize).collect()
    }
}

impl FromStr for StepSchedule {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            EvalError::Configuration(format!(
                "invalid step schedule `{s}`: expected <start>/<end>/<step> in hours"
            ))
        };
        let parts: Vec<u32> = s
            .split('/')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid())?;
        let &[start, end, step] = parts.as_slice() else {
            return Err(invalid());
        };
        if step == 0 || start > end {
            return Err(invalid());
        }
        Ok(Self { start, end, step })
    }
}

impl fmt::Display for StepSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.start, self.end, self.step)
    }
}
