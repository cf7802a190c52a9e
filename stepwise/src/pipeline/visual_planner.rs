//! Plans the image for a stage, or for a standalone concept.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::design::{DesignTemplate, StageVisualPlan};
use crate::errors::Result;
use crate::model::{Fact, GenerationOptions, ProcessStructure, StageNarrative};
use crate::prompts;
use crate::resilience::Resilience;
use crate::services::{generate_structured, RequestKind, TextGenerator, TextRequest};

/// Produces validated [`StageVisualPlan`]s.
#[derive(Clone)]
pub struct StageVisualPlanner {
    text: Arc<dyn TextGenerator>,
    resilience: Resilience,
    budget: Duration,
}

impl StageVisualPlanner {
    /// Creates a visual planner.
    #[must_use]
    pub fn new(text: Arc<dyn TextGenerator>, resilience: Resilience, budget: Duration) -> Self {
        Self {
            text,
            resilience,
            budget,
        }
    }

    /// Plans the image for `narrative`.
    ///
    /// When `pinned` is given, the returned plan carries that design in place
    /// of whatever the service proposed, and only the scene comes from the
    /// service.
    pub async fn plan(
        &self,
        structure: &ProcessStructure,
        narrative: &StageNarrative,
        consistency_block: &str,
        pinned: Option<&DesignTemplate>,
        options: &GenerationOptions,
    ) -> Result<StageVisualPlan> {
        let step = narrative.step_number;
        let step_number = step.to_string();
        let total = structure.suggested_steps.to_string();
        let key_events = narrative
            .key_events
            .iter()
            .map(|event| format!("- {event}"))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = prompts::render(
            prompts::VISUAL_PLAN,
            &[
                ("PROCESS_NAME", &structure.process_name),
                ("DOMAIN", &structure.domain),
                ("STEP_NUMBER", &step_number),
                ("TOTAL_STEPS", &total),
                ("STEP_TITLE", &narrative.title),
                ("DESCRIPTION", &narrative.description),
                ("KEY_EVENTS", &key_events),
                ("STYLE", options.style_text()),
                ("TARGET_AUDIENCE", options.audience.target_audience()),
                ("LANGUAGE", options.language.display_name()),
                ("CONSISTENCY_BLOCK", consistency_block),
            ],
        )?;
        let request =
            TextRequest::structured::<StageVisualPlan>(RequestKind::VisualPlan(step), prompt);

        let label = format!("stage {step} visual plan");
        let mut plan = self.fetch(&label, &request).await?;
        if let Some(design) = pinned {
            plan = plan.with_design(design.clone());
        }
        plan.validate()?;

        debug!(stage = step, pinned = pinned.is_some(), "Stage visual plan ready");
        Ok(plan)
    }

    /// Plans a standalone infographic for one concept.
    pub async fn plan_single(
        &self,
        fact: &Fact,
        options: &GenerationOptions,
    ) -> Result<StageVisualPlan> {
        let prompt = prompts::render(
            prompts::SINGLE_PLAN,
            &[
                ("TITLE", &fact.title),
                ("DOMAIN", &fact.domain),
                ("TEXT", &fact.text),
                ("STYLE", options.style_text()),
                ("TARGET_AUDIENCE", options.audience.target_audience()),
                ("LANGUAGE", options.language.display_name()),
            ],
        )?;
        let request = TextRequest::structured::<StageVisualPlan>(RequestKind::SinglePlan, prompt);

        let plan = self.fetch("single visual plan", &request).await?;
        plan.validate()?;
        Ok(plan)
    }

    async fn fetch(&self, label: &str, request: &TextRequest) -> Result<StageVisualPlan> {
        self.resilience
            .call(label, self.budget, || generate_structured(self.text.as_ref(), request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepwiseError;
    use crate::services::MockTextGenerator;
    use crate::testing::{sample_design, sample_plan, sample_structure};

    fn narrative(step: usize) -> StageNarrative {
        StageNarrative {
            step_number: step,
            title: format!("Title {step}"),
            description: "Something happens.".to_string(),
            key_events: vec!["first".to_string(), "second".to_string()],
        }
    }

    const MARKER: &str = "CONSISTENCY-MARKER";

    fn planner_returning(plan: StageVisualPlan) -> StageVisualPlanner {
        let json = serde_json::to_string(&plan).unwrap();
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|req| {
                req.prompt.contains("CONSISTENCY-MARKER") && req.prompt.contains("- second")
            })
            .times(1)
            .returning(move |_| Ok(json.clone()));
        StageVisualPlanner::new(Arc::new(mock), Resilience::default(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_plan_without_pin_keeps_proposed_design() {
        let proposed = sample_plan(1);
        let planner = planner_returning(proposed.clone());

        let plan = planner
            .plan(&sample_structure(3), &narrative(1), MARKER, None, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(plan, proposed);
    }

    #[tokio::test]
    async fn test_pinned_design_overrides_proposal() {
        let proposed = sample_plan(3);
        assert_ne!(proposed.design, sample_design());
        let planner = planner_returning(proposed.clone());

        let pinned = sample_design();
        let plan = planner
            .plan(
                &sample_structure(3),
                &narrative(3),
                MARKER,
                Some(&pinned),
                &GenerationOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(plan.design, pinned);
        assert_eq!(plan.scene, proposed.scene);
    }

    #[tokio::test]
    async fn test_invalid_plan_rejected() {
        let mut broken = sample_plan(1);
        broken.design.palette.truncate(1);
        let planner = planner_returning(broken);

        let err = planner
            .plan(&sample_structure(3), &narrative(1), MARKER, None, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StepwiseError::Validation(_)));
    }
}
