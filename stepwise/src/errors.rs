//! Error types for the stepwise pipeline.
//!
//! Service adapters return typed errors; nothing downstream inspects error
//! messages to decide whether to retry or how to report a failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StepwiseError>;

/// The main error type for stepwise operations.
#[derive(Debug, Clone, Error)]
pub enum StepwiseError {
    /// The remote service signalled rate limiting or capacity exhaustion.
    #[error("Service overloaded: {0}")]
    TransientOverload(String),

    /// A remote call (including all of its retries) exceeded its budget.
    #[error("{label} timed out after {budget_ms}ms")]
    Timeout {
        /// The label of the timed operation.
        label: String,
        /// The budget that was exceeded, in milliseconds.
        budget_ms: u64,
    },

    /// The service refused the content on safety grounds.
    #[error("Content blocked by safety policy (finish reason: {finish_reason})")]
    ContentPolicyBlock {
        /// The finish condition reported by the service.
        finish_reason: String,
    },

    /// The service refused the content because it would recite protected material.
    #[error("Content blocked for recitation (finish reason: {finish_reason})")]
    CopyrightBlock {
        /// The finish condition reported by the service.
        finish_reason: String,
    },

    /// The service answered, but not with something usable.
    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] MalformedResponseError),

    /// A generated value broke a structural contract.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A pipeline stage failed; wraps the underlying cause.
    #[error("stage {stage} failed: {source}")]
    StageFailure {
        /// The 1-based index of the failing stage.
        stage: usize,
        /// The underlying error.
        #[source]
        source: Box<StepwiseError>,
    },

    /// The operation was cancelled cooperatively.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A non-transient HTTP or transport failure.
    #[error("HTTP error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    Http {
        /// The HTTP status, if a response was received.
        status: Option<u16>,
        /// The error message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A prompt template could not be rendered.
    #[error("Template error: {0}")]
    Template(String),

    /// A broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StepwiseError {
    /// Wraps an error with the index of the stage it occurred in.
    ///
    /// Errors that are already stage failures are returned unchanged.
    #[must_use]
    pub fn at_stage(self, stage: usize) -> Self {
        match self {
            Self::StageFailure { .. } => self,
            other => Self::StageFailure {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns true if the error is worth retrying locally.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientOverload(_))
    }

    /// Returns the innermost error, looking through stage failures.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::StageFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the failing stage, if the error is a stage failure.
    #[must_use]
    pub fn stage(&self) -> Option<usize> {
        match self {
            Self::StageFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Classifies the error for user-facing reporting.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.root_cause() {
            Self::Timeout { .. } => ErrorClass::TimedOut,
            Self::ContentPolicyBlock { .. } | Self::CopyrightBlock { .. } => {
                ErrorClass::ContentBlocked
            }
            Self::TransientOverload(_) => ErrorClass::RateLimited,
            _ => ErrorClass::Generic,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("class".to_string(), serde_json::json!(self.class()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        map
    }
}

impl From<serde_json::Error> for StepwiseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StepwiseError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Ways a service response can be unusable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedResponseError {
    /// The response carried no content at all.
    #[error("empty response from {operation}")]
    Empty {
        /// The operation that produced the response.
        operation: String,
    },

    /// An image was requested but the model answered with text.
    #[error("model returned text instead of an image (finish reason: {finish_reason})")]
    WrongModality {
        /// The finish condition reported by the service.
        finish_reason: String,
    },

    /// Structured output did not match the requested schema.
    #[error("invalid structured payload: {0}")]
    InvalidPayload(String),
}

/// Structural contract violations in generated values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The planner declared a step count that disagrees with its titles.
    #[error("declared {declared} steps but returned {titles} step titles")]
    StepCountMismatch {
        /// The declared number of steps.
        declared: usize,
        /// The number of titles returned.
        titles: usize,
    },

    /// The declared step count is outside the supported range.
    #[error("step count {steps} is outside [{min}, {max}]")]
    StepCountOutOfRange {
        /// The declared number of steps.
        steps: usize,
        /// Minimum supported steps.
        min: usize,
        /// Maximum supported steps.
        max: usize,
    },

    /// A field was missing, empty, or out of bounds.
    #[error("field '{field}': {message}")]
    Field {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// A stage was appended out of order or past the target length.
    #[error("cannot append stage {step_number}: {message}")]
    OutOfOrder {
        /// The step number that was rejected.
        step_number: usize,
        /// Why it was rejected.
        message: String,
    },
}

impl ValidationError {
    /// Creates a field validation error.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// User-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// A remote call ran out of time.
    TimedOut,
    /// The service refused the content.
    ContentBlocked,
    /// The service stayed overloaded after all retries.
    RateLimited,
    /// Anything else.
    Generic,
}

impl ErrorClass {
    /// Returns the message shown to the user for this class.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TimedOut => {
                "Generation took too long and was stopped. Please try again, \
                 possibly with fewer stages or the fast quality tier."
            }
            Self::ContentBlocked => {
                "The image service refused to render this content. \
                 Try rephrasing the topic."
            }
            Self::RateLimited => {
                "The generation service is busy right now. Please wait a moment and try again."
            }
            Self::Generic => {
                "Something went wrong while generating the sequence. Please try again."
            }
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => write!(f, "timed_out"),
            Self::ContentBlocked => write!(f, "content_blocked"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Generic => write!(f, "generic"),
        }
    }
}
