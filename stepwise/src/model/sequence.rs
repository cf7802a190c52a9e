//! Rendered artifacts and the append-only sequence they accumulate into.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::structure::ProcessStructure;
use crate::design::StageVisualPlan;
use crate::errors::{MalformedResponseError, Result, StepwiseError, ValidationError};

/// An inline image returned by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

impl ImagePayload {
    /// Creates a payload from already-encoded data.
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encodes raw bytes.
    #[must_use]
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Parses a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let invalid = || {
            StepwiseError::from(MalformedResponseError::InvalidPayload(
                "not a base64 data URL".to_string(),
            ))
        };
        let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
        let (mime_type, data) = rest.split_once(";base64,").ok_or_else(invalid)?;
        if mime_type.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(mime_type, data))
    }

    /// Returns the payload as a data URL.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decodes the payload bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD.decode(&self.data).map_err(|e| {
            MalformedResponseError::InvalidPayload(format!("image data is not base64: {e}")).into()
        })
    }
}

/// One rendered stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStep {
    /// 1-based stage index.
    pub step_number: usize,
    /// Stage title.
    pub title: String,
    /// Stage description.
    pub description: String,
    /// Key events emphasised in the image.
    pub key_events: Vec<String>,
    /// Structured rendering plan.
    pub plan: StageVisualPlan,
    /// The plan as sent to the image service.
    pub plan_text: String,
    /// The rendered image.
    pub image: ImagePayload,
}

/// The ordered, append-only list of rendered stages from one run.
///
/// Appended stages are never mutated, so they are shared rather than copied
/// with snapshots and the sealed sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sequence {
    target_len: usize,
    steps: Vec<Arc<SequenceStep>>,
}

impl Sequence {
    /// Creates an empty sequence that will hold `target_len` stages.
    #[must_use]
    pub fn with_target(target_len: usize) -> Self {
        Self {
            target_len,
            steps: Vec::with_capacity(target_len),
        }
    }

    /// Appends the next stage.
    ///
    /// Step numbers must be contiguous from 1, and the sequence never grows
    /// past its target length.
    pub fn push(&mut self, step: SequenceStep) -> Result<()> {
        let expected = self.steps.len() + 1;
        if step.step_number != expected {
            return Err(ValidationError::OutOfOrder {
                step_number: step.step_number,
                message: format!("expected stage {expected}"),
            }
            .into());
        }
        if self.steps.len() >= self.target_len {
            return Err(ValidationError::OutOfOrder {
                step_number: step.step_number,
                message: format!("sequence already holds {} stages", self.target_len),
            }
            .into());
        }
        self.steps.push(Arc::new(step));
        Ok(())
    }

    /// Stages appended so far.
    #[must_use]
    pub fn steps(&self) -> &[Arc<SequenceStep>] {
        &self.steps
    }

    /// Number of stages appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The number of stages this sequence must reach.
    #[must_use]
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Returns true once every planned stage has been appended.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.target_len > 0 && self.steps.len() == self.target_len
    }

    /// Seals a complete sequence together with its structure.
    pub fn into_complete(self, structure: ProcessStructure) -> Result<CompleteSequence> {
        if !self.is_complete() || structure.suggested_steps != self.target_len {
            return Err(StepwiseError::Internal(format!(
                "sequence holds {} of {} stages",
                self.steps.len(),
                structure.suggested_steps
            )));
        }
        Ok(CompleteSequence {
            structure,
            steps: self.steps,
        })
    }
}

/// A sequence holding every planned stage.
///
/// This is the only shape a persistence collaborator accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSequence {
    structure: ProcessStructure,
    steps: Vec<Arc<SequenceStep>>,
}

impl CompleteSequence {
    /// The structure the sequence was generated from.
    #[must_use]
    pub fn structure(&self) -> &ProcessStructure {
        &self.structure
    }

    /// Every stage, in order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<SequenceStep>] {
        &self.steps
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: a complete sequence has at least the minimum stage count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
