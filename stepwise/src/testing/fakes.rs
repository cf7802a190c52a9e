//! Scripted service fakes.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::fixtures::{sample_fact, sample_plan};
use crate::errors::{Result, StepwiseError};
use crate::model::{Fact, ImagePayload, ProcessStructure, StageNarrative};
use crate::services::{ImageRequest, ImageSynthesizer, RequestKind, TextGenerator, TextRequest};

/// A text service that answers every request kind with valid JSON.
///
/// Narration `k` answers with a description built by
/// [`ScriptedTextGenerator::description_for`], so tests can tell which
/// stages leaked into a prompt.
#[derive(Debug)]
pub struct ScriptedTextGenerator {
    structure: ProcessStructure,
    concept: Fact,
    failures: Mutex<HashMap<RequestKind, (usize, StepwiseError)>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<TextRequest>>,
}

impl ScriptedTextGenerator {
    /// Answers structure requests with `structure`.
    #[must_use]
    pub fn for_process(structure: ProcessStructure) -> Self {
        Self {
            structure,
            concept: sample_fact(),
            failures: Mutex::new(HashMap::new()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers concept requests with `fact`. Fact discovery lists it first.
    #[must_use]
    pub fn with_concept(mut self, fact: Fact) -> Self {
        self.concept = fact;
        self
    }

    /// Fails the first `times` requests of `kind` with `error`.
    #[must_use]
    pub fn with_failure(self, kind: RequestKind, times: usize, error: StepwiseError) -> Self {
        self.failures.lock().insert(kind, (times, error));
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The stage description narration `step` answers with.
    #[must_use]
    pub fn description_for(step: usize) -> String {
        format!("DESC-{step}: what happens in stage {step}.")
    }

    /// Every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().clone()
    }

    /// Prompts of every request of `kind`, oldest first.
    #[must_use]
    pub fn prompts_for(&self, kind: RequestKind) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|req| req.kind == kind)
            .map(|req| req.prompt.clone())
            .collect()
    }

    fn take_failure(&self, kind: RequestKind) -> Option<StepwiseError> {
        let mut failures = self.failures.lock();
        let (remaining, error) = failures.get_mut(&kind)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(error.clone())
    }

    fn answer(&self, kind: RequestKind) -> Result<String> {
        let json = match kind {
            RequestKind::Structure => serde_json::to_string(&self.structure)?,
            RequestKind::Narration(step) => {
                let title = self.structure.title_of(step).unwrap_or("Untitled").to_string();
                serde_json::to_string(&StageNarrative {
                    step_number: step,
                    title,
                    description: Self::description_for(step),
                    key_events: vec![format!("event {step}a"), format!("event {step}b")],
                })?
            }
            RequestKind::VisualPlan(step) => serde_json::to_string(&sample_plan(step))?,
            RequestKind::Facts => serde_json::to_string(&[
                self.concept.clone(),
                Fact {
                    domain: self.concept.domain.clone(),
                    title: "Blue Skies".to_string(),
                    text: "Air scatters short blue wavelengths more than red ones.".to_string(),
                },
            ])?,
            RequestKind::Concept => serde_json::to_string(&self.concept)?,
            RequestKind::SinglePlan => serde_json::to_string(&sample_plan(1))?,
        };
        Ok(json)
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate(&self, request: &TextRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.take_failure(request.kind) {
            return Err(error);
        }
        self.answer(request.kind)
    }
}

/// An image service that renders `image-{n}` for its `n`th call.
#[derive(Debug, Default)]
pub struct ScriptedImageSynthesizer {
    failures: Mutex<HashMap<usize, StepwiseError>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedImageSynthesizer {
    /// Creates a synthesizer that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the 1-based call `call` with `error`.
    #[must_use]
    pub fn with_failure_on_call(self, call: usize, error: StepwiseError) -> Self {
        self.failures.lock().insert(call, error);
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls made, failed ones included.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ImageSynthesizer for ScriptedImageSynthesizer {
    async fn synthesize(&self, request: &ImageRequest) -> Result<ImagePayload> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failures.lock().remove(&call) {
            return Err(error);
        }
        Ok(ImagePayload::from_bytes(
            "image/png",
            format!("image-{call}").as_bytes(),
        ))
    }
}
