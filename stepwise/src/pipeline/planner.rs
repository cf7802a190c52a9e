//! Decomposes a topic into an ordered set of stages.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::errors::{Result, ValidationError};
use crate::model::{GenerationOptions, ProcessStructure};
use crate::prompts;
use crate::resilience::Resilience;
use crate::services::{generate_structured, RequestKind, TextGenerator, TextRequest};

/// Makes the single structure-planning call of a run.
#[derive(Clone)]
pub struct StructurePlanner {
    text: Arc<dyn TextGenerator>,
    resilience: Resilience,
    budget: Duration,
}

impl StructurePlanner {
    /// Creates a planner.
    #[must_use]
    pub fn new(text: Arc<dyn TextGenerator>, resilience: Resilience, budget: Duration) -> Self {
        Self {
            text,
            resilience,
            budget,
        }
    }

    /// Plans the stages of `topic`.
    ///
    /// A structure whose title count disagrees with its declared step count
    /// is rejected rather than truncated.
    pub async fn plan(&self, topic: &str, options: &GenerationOptions) -> Result<ProcessStructure> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::field("topic", "must not be empty").into());
        }

        let min = ProcessStructure::MIN_STEPS.to_string();
        let max = ProcessStructure::MAX_STEPS.to_string();
        let prompt = prompts::render(
            prompts::STRUCTURE,
            &[
                ("TOPIC", topic),
                ("TARGET_AUDIENCE", options.audience.target_audience()),
                ("TONE", options.audience.tone()),
                ("LANGUAGE", options.language.display_name()),
                ("MIN_STEPS", &min),
                ("MAX_STEPS", &max),
            ],
        )?;
        let request = TextRequest::structured::<ProcessStructure>(RequestKind::Structure, prompt);

        let structure: ProcessStructure = self
            .resilience
            .call("structure planning", self.budget, || {
                generate_structured(self.text.as_ref(), &request)
            })
            .await?;
        structure.validate()?;

        info!(
            process = %structure.process_name,
            steps = structure.suggested_steps,
            "Planned process structure"
        );
        Ok(structure)
    }
}
