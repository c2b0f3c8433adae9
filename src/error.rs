//! Error types for the workflow step model.
//!
//! Every engine operation that returns an error leaves the step collection
//! and the configuration map untouched, so callers that ignore the error get
//! a no-op.

use thiserror::Error;

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur while editing a workflow.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// Step not found in the workflow.
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// A step with this id already exists.
    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    /// Unrecognised step type string.
    #[error("Unknown step type: {0}")]
    UnknownStepType(String),

    /// Unrecognised LinkedIn sub-action string.
    #[error("Unknown LinkedIn sub-action: {0}")]
    UnknownSubAction(String),

    /// Unrecognised branch tag string.
    #[error("Unknown branch tag: {0}")]
    UnknownBranch(String),

    /// Unrecognised condition kind string.
    #[error("Unknown condition type: {0}")]
    UnknownConditionType(String),

    /// Unrecognised insert position string.
    #[error("Unknown position: {0}")]
    UnknownPosition(String),

    /// The field does not exist on this step type's configuration.
    #[error("Field '{field}' is not part of the {step_type} configuration")]
    UnknownConfigField { step_type: String, field: String },

    /// The value has the wrong shape for the field.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidConfigValue { field: String, reason: String },

    /// Delays are whole days, one or more.
    #[error("Invalid delay {0}: delays must be at least 1 day")]
    InvalidDelay(i64),

    /// Condition steps evaluate immediately and carry no delay.
    #[error("Step {0} is a condition and has no delay")]
    DelayNotApplicable(String),

    /// A configuration entry has no matching step.
    #[error("Configuration for unknown step: {0}")]
    OrphanConfig(String),

    /// Structural invariant broken in imported or stored data.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WorkflowError {
    /// Creates a StepNotFound error.
    pub fn step_not_found(id: impl Into<String>) -> Self {
        Self::StepNotFound(id.into())
    }

    /// Creates a DuplicateStep error.
    pub fn duplicate_step(id: impl Into<String>) -> Self {
        Self::DuplicateStep(id.into())
    }

    /// Creates an UnknownConfigField error.
    pub fn unknown_config_field(step_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownConfigField {
            step_type: step_type.into(),
            field: field.into(),
        }
    }

    /// Creates an InvalidConfigValue error.
    pub fn invalid_config_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a SchemaViolation error.
    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// Creates a Serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
