//! Domain models for EvalML.
//!
//! Canonical definitions for the core entities:
//! - `RunDefinition`: a resolved forecaster or interpolator run
//! - `BaselineDefinition`: a reference dataset
//! - `InitTime` / `TimeGridSpec`: the initialization-time axis
//! - `digest`: canonical JSON and content fingerprints

pub mod baseline;
pub mod digest;
pub mod error;
pub mod run;
pub mod time_grid;

pub use baseline::{BaselineDefinition, StepSchedule};
pub use error::{EvalError, Result};
pub use run::{ModelSource, RunDefinition, RunId, RunKind, RunVariant, Upstream, ANALYSIS_SENTINEL};
pub use time_grid::{generate, Frequency, FrequencyUnit, InitTime, LeadTime, TimeGridSpec};
