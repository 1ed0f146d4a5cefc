//! Domain-level error taxonomy for EvalML.
//!
//! Every error is raised while the configuration is being resolved, before
//! any job is handed to the execution layer. Nothing here is retried.

/// EvalML domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Malformed or inconsistent declarative input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required body field is absent.
    #[error("configuration error at {location}: missing required field `{field}`")]
    MissingField { location: String, field: String },

    #[error("unsupported model type `{kind}` at {location}")]
    UnsupportedModelType { location: String, kind: String },

    #[error("cannot resolve forecaster dependency at {location}: {reason}")]
    DependencyResolution { location: String, reason: String },

    /// Two different functional bodies truncated to the same identifier.
    #[error("run identifier collision: {run_id} is derived from two different configurations")]
    IdentifierCollision { run_id: String },

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    pub(crate) fn missing(location: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            location: location.into(),
            field: field.into(),
        }
    }

    pub(crate) fn dependency(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DependencyResolution {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for EvalML domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;
