//! EvalML Core Library
//!
//! Resolves an experiment configuration into what must run and in what
//! order: the init-time axis, a content-addressed run registry, the
//! baseline registry, the report participants and per-task routing.
//! Executing jobs is left to the workflow engine that consumes these.

pub mod baseline_registry;
pub mod config;
pub mod context;
pub mod domain;
pub mod layout;
pub mod obs;
pub mod participants;
pub mod plan;
pub mod router;
pub mod run_registry;
pub mod telemetry;

pub use baseline_registry::BaselineRegistry;
pub use config::{load_config, DefaultResources, Execution, ExperimentConfig, Locations, Profile};
pub use context::PipelineContext;
pub use domain::digest::{canonical_json, compute_digest, fingerprint};
pub use domain::{
    generate, BaselineDefinition, EvalError, Frequency, InitTime, LeadTime, ModelSource, Result,
    RunDefinition, RunId, RunKind, RunVariant, StepSchedule, TimeGridSpec, Upstream,
    ANALYSIS_SENTINEL,
};
pub use layout::ArtifactLayout;
pub use participants::{collect, Participant, ParticipantKind, ParticipantSet};
pub use plan::ExecutionPlan;
pub use router::{route, Stage, TaskDescriptor, TaskKey};
pub use run_registry::RunRegistry;
pub use telemetry::init_tracing;

/// EvalML version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
