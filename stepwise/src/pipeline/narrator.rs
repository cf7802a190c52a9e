//! Narrates one stage against the context accumulated so far.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::context::AccumulatedContext;
use crate::errors::{Result, StepwiseError};
use crate::model::{GenerationOptions, ProcessStructure, StageNarrative};
use crate::prompts;
use crate::resilience::Resilience;
use crate::services::{generate_structured, RequestKind, TextGenerator, TextRequest};

/// Produces the [`StageNarrative`] for each stage.
#[derive(Clone)]
pub struct StageNarrator {
    text: Arc<dyn TextGenerator>,
    resilience: Resilience,
    budget: Duration,
}

impl StageNarrator {
    /// Creates a narrator.
    #[must_use]
    pub fn new(text: Arc<dyn TextGenerator>, resilience: Resilience, budget: Duration) -> Self {
        Self {
            text,
            resilience,
            budget,
        }
    }

    /// Narrates stage `step`.
    ///
    /// The returned narrative always carries the planned step number and title.
    pub async fn narrate(
        &self,
        structure: &ProcessStructure,
        step: usize,
        context: &AccumulatedContext,
        options: &GenerationOptions,
    ) -> Result<StageNarrative> {
        let title = structure
            .title_of(step)
            .ok_or_else(|| StepwiseError::Internal(format!("no title planned for stage {step}")))?;

        let step_number = step.to_string();
        let total = structure.suggested_steps.to_string();
        let accumulated = context.render();
        let prompt = prompts::render(
            prompts::NARRATION,
            &[
                ("PROCESS_NAME", &structure.process_name),
                ("STEP_NUMBER", &step_number),
                ("TOTAL_STEPS", &total),
                ("STEP_TITLE", title),
                ("ACCUMULATED_CONTEXT", &accumulated),
                ("LANGUAGE", options.language.display_name()),
                ("TARGET_AUDIENCE", options.audience.target_audience()),
                ("TONE", options.audience.tone()),
            ],
        )?;
        let request =
            TextRequest::structured::<StageNarrative>(RequestKind::Narration(step), prompt);

        let label = format!("stage {step} narration");
        let narrative: StageNarrative = self
            .resilience
            .call(&label, self.budget, || {
                generate_structured(self.text.as_ref(), &request)
            })
            .await?;

        debug!(stage = step, events = narrative.key_events.len(), "Stage narrated");
        narrative.normalize(step, title)
    }
}
