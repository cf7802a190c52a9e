//! Single-image mode: one fact, one infographic, no stage badge.
//!
//! The fact comes from explaining a concept, or from a list proposed for a
//! scientific domain.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::synthesizer::ImageSynthesizerAdapter;
use super::visual_planner::StageVisualPlanner;
use crate::cancellation::CancellationToken;
use crate::config::StepwiseConfig;
use crate::design::{RenderContext, StageVisualPlan};
use crate::errors::{Result, ValidationError};
use crate::model::{Fact, GenerationOptions, ImagePayload};
use crate::prompts;
use crate::resilience::Resilience;
use crate::services::{
    generate_structured, ImageSynthesizer, RequestKind, TextGenerator, TextRequest,
};

/// A rendered standalone infographic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleImage {
    /// The explanation the image illustrates.
    pub fact: Fact,
    /// Structured rendering plan.
    pub plan: StageVisualPlan,
    /// The plan as sent to the image service.
    pub plan_text: String,
    /// The rendered image.
    pub image: ImagePayload,
}

/// Explains a concept and renders it as one image.
#[derive(Clone)]
pub struct SingleImageGenerator {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageSynthesizer>,
    config: StepwiseConfig,
    resilience: Resilience,
}

impl SingleImageGenerator {
    /// Facts proposed for a domain.
    pub const DISCOVERY_COUNT: usize = 3;

    /// Creates a generator.
    #[must_use]
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageSynthesizer>,
        config: StepwiseConfig,
    ) -> Self {
        let resilience = Resilience::new(config.retry.clone());
        Self {
            text,
            images,
            config,
            resilience,
        }
    }

    /// Ties every remote call to a caller-owned token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.resilience = self.resilience.with_cancellation(token);
        self
    }

    /// Produces a short, audience-appropriate explanation of `concept`.
    pub async fn explain(&self, concept: &str, options: &GenerationOptions) -> Result<Fact> {
        let concept = concept.trim();
        if concept.is_empty() {
            return Err(ValidationError::field("concept", "must not be empty").into());
        }

        let prompt = prompts::render(
            prompts::CONCEPT,
            &[
                ("CONCEPT", concept),
                ("TARGET_AUDIENCE", options.audience.target_audience()),
                ("TONE", options.audience.tone()),
                ("LANGUAGE", options.language.display_name()),
            ],
        )?;
        let request = TextRequest::structured::<Fact>(RequestKind::Concept, prompt);

        let fact: Fact = self
            .resilience
            .call("concept explanation", self.config.text_timeout(), || {
                generate_structured(self.text.as_ref(), &request)
            })
            .await?;
        fact.validate()?;
        Ok(fact)
    }

    /// Proposes up to [`Self::DISCOVERY_COUNT`] facts from `domain` for the
    /// caller to choose from.
    pub async fn discover(&self, domain: &str, options: &GenerationOptions) -> Result<Vec<Fact>> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(ValidationError::field("domain", "must not be empty").into());
        }

        let count = Self::DISCOVERY_COUNT.to_string();
        let prompt = prompts::render(
            prompts::FACTS,
            &[
                ("COUNT", &count),
                ("DOMAIN", domain),
                ("TARGET_AUDIENCE", options.audience.target_audience()),
                ("TONE", options.audience.tone()),
                ("LANGUAGE", options.language.display_name()),
            ],
        )?;
        let request = TextRequest::structured::<Vec<Fact>>(RequestKind::Facts, prompt);

        let mut facts: Vec<Fact> = self
            .resilience
            .call("fact discovery", self.config.text_timeout(), || {
                generate_structured(self.text.as_ref(), &request)
            })
            .await?;
        if facts.is_empty() {
            return Err(ValidationError::field("facts", "no facts proposed").into());
        }
        facts.truncate(Self::DISCOVERY_COUNT);
        for fact in &facts {
            fact.validate()?;
        }

        debug!(domain = %domain, facts = facts.len(), "Facts discovered");
        Ok(facts)
    }

    /// Explains, plans and renders `concept`.
    pub async fn generate(
        &self,
        concept: &str,
        options: &GenerationOptions,
    ) -> Result<SingleImage> {
        self.config.validate()?;
        let fact = self.explain(concept, options).await?;
        self.generate_from_fact(fact, options).await
    }

    /// [`Self::generate`] with the configured default options.
    pub async fn generate_with_defaults(&self, concept: &str) -> Result<SingleImage> {
        let options = self.config.defaults;
        self.generate(concept, &options).await
    }

    /// Plans and renders an already explained fact, such as one returned by
    /// [`Self::discover`].
    pub async fn generate_from_fact(
        &self,
        fact: Fact,
        options: &GenerationOptions,
    ) -> Result<SingleImage> {
        self.config.validate()?;
        fact.validate()?;

        let planner = StageVisualPlanner::new(
            self.text.clone(),
            self.resilience.clone(),
            self.config.text_timeout(),
        );
        let plan = planner.plan_single(&fact, options).await?;
        let plan_text = plan.render(&RenderContext {
            title: &fact.title,
            position: None,
            style: options.style_text(),
            language: options.language,
        });

        let synthesizer =
            ImageSynthesizerAdapter::new(self.images.clone(), self.resilience.clone());
        let image = synthesizer
            .render(&plan_text, "single render", options, self.config.single_image_timeout())
            .await?;

        info!(title = %fact.title, domain = %fact.domain, "Single image generated");
        Ok(SingleImage {
            fact,
            plan,
            plan_text,
            image,
        })
    }
}
