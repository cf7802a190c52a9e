//! Drives one process-mode run through the state machine.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::consistency::{ConsistencyTemplate, ConsistencyTemplateBuilder};
use super::narrator::StageNarrator;
use super::planner::StructurePlanner;
use super::state::{Phase, PipelineSnapshot, PipelineState};
use super::synthesizer::ImageSynthesizerAdapter;
use super::visual_planner::StageVisualPlanner;
use crate::cancellation::CancellationToken;
use crate::config::StepwiseConfig;
use crate::design::RenderContext;
use crate::errors::{ErrorClass, Result, StepwiseError};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::model::{CompleteSequence, GenerationOptions, ProcessStructure, SequenceStep};
use crate::resilience::Resilience;
use crate::services::{ImageSynthesizer, TextGenerator};

/// A run that aborted. Everything it produced has been discarded.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineFailure {
    /// The failing stage, or 0 if structure planning failed.
    pub stage: usize,
    /// User-facing classification.
    pub class: ErrorClass,
    /// The message shown to the user.
    pub message: String,
    /// The underlying error.
    #[source]
    pub error: StepwiseError,
}

impl PipelineFailure {
    fn new(error: StepwiseError) -> Self {
        let class = error.class();
        Self {
            stage: error.stage().unwrap_or(0),
            class,
            message: class.user_message().to_string(),
            error,
        }
    }
}

/// Per-run components, built from the controller's service handles.
struct Components {
    planner: StructurePlanner,
    narrator: StageNarrator,
    visual: StageVisualPlanner,
    synthesizer: ImageSynthesizerAdapter,
    templates: ConsistencyTemplateBuilder,
}

/// Runs the sequential pipeline: plan the structure, then narrate, template,
/// plan and render each stage in order.
///
/// Stage `k + 1` never starts before stage `k` is appended. Any failure
/// clears the run; a caller either gets a [`CompleteSequence`] or nothing.
pub struct PipelineController {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageSynthesizer>,
    config: StepwiseConfig,
    sink: Arc<dyn EventSink>,
    cancellation: Option<Arc<CancellationToken>>,
    state: PipelineState,
    snapshots: watch::Sender<PipelineSnapshot>,
}

impl PipelineController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageSynthesizer>,
        config: StepwiseConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(PipelineSnapshot::default());
        Self {
            text,
            images,
            config,
            sink: Arc::new(NoOpEventSink),
            cancellation: None,
            state: PipelineState::default(),
            snapshots,
        }
    }

    /// Sets the sink that receives lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Ties every remote call to a caller-owned token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Subscribes to the snapshot published after every transition.
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.snapshots.subscribe()
    }

    /// The current run state.
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// A read-only copy of the current progress.
    #[must_use]
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.snapshot()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &StepwiseConfig {
        &self.config
    }

    /// Generates the full sequence for `topic` with the configured default
    /// options.
    pub async fn run_with_defaults(
        &mut self,
        topic: &str,
    ) -> std::result::Result<CompleteSequence, PipelineFailure> {
        let options = self.config.defaults;
        self.run(topic, &options).await
    }

    /// Generates the full sequence for `topic`.
    ///
    /// Starting a run discards whatever the previous run left behind.
    pub async fn run(
        &mut self,
        topic: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<CompleteSequence, PipelineFailure> {
        if self.state.phase() != Phase::Idle {
            self.state = PipelineState::default();
            self.publish();
        }
        info!(
            topic = %topic,
            language = ?options.language,
            audience = ?options.audience,
            "Pipeline run started"
        );

        match self.execute(topic, options).await {
            Ok(sequence) => {
                info!(
                    process = %sequence.structure().process_name,
                    stages = sequence.len(),
                    "Pipeline run complete"
                );
                self.sink
                    .emit(&PipelineEvent::Completed {
                        process: sequence.structure().process_name.clone(),
                        stages: sequence.len(),
                    })
                    .await;
                Ok(sequence)
            }
            Err(err) => {
                let failure = PipelineFailure::new(err);
                error!(
                    stage = failure.stage,
                    class = %failure.class,
                    error = %failure.error,
                    "Pipeline run failed"
                );
                self.state.reset_failed(failure.stage);
                self.publish();
                self.emit_phase(self.state.phase()).await;
                self.sink
                    .emit(&PipelineEvent::Failed {
                        stage: failure.stage,
                        class: failure.class,
                        message: failure.message.clone(),
                    })
                    .await;
                Err(failure)
            }
        }
    }

    async fn execute(
        &mut self,
        topic: &str,
        options: &GenerationOptions,
    ) -> Result<CompleteSequence> {
        self.config.validate()?;
        let components = self.components();

        self.transition(Phase::Discovering).await?;
        let structure = components.planner.plan(topic, options).await?;
        self.state.begin(structure.clone());

        for step in 1..=structure.suggested_steps {
            self.run_stage(&components, &structure, step, options)
                .await
                .map_err(|e| e.at_stage(step))?;
        }

        let sequence = self
            .state
            .sequence()
            .clone()
            .into_complete(structure)
            .map_err(|e| e.at_stage(self.state.current_step()))?;
        self.transition(Phase::Complete).await?;
        Ok(sequence)
    }

    async fn run_stage(
        &mut self,
        components: &Components,
        structure: &ProcessStructure,
        step: usize,
        options: &GenerationOptions,
    ) -> Result<()> {
        self.ensure_not_cancelled()?;
        let total = structure.suggested_steps;

        self.transition(Phase::Narrating(step)).await?;
        let context = self
            .state
            .context()
            .ok_or_else(|| StepwiseError::Internal("narrating before discovery".to_string()))?;
        let narrative = components
            .narrator
            .narrate(structure, step, context, options)
            .await?;

        self.transition(Phase::Templating(step)).await?;
        let block = components.templates.build(
            step,
            total,
            self.state.template(),
            self.state.narratives(),
        )?;

        self.transition(Phase::Planning(step)).await?;
        let pinned = self.state.template().map(ConsistencyTemplate::design);
        let plan = components
            .visual
            .plan(structure, &narrative, &block, pinned, options)
            .await?;
        let plan_text = plan.render(&RenderContext {
            title: &narrative.title,
            position: Some((step, total)),
            style: options.style_text(),
            language: options.language,
        });
        if step == 1 {
            let template = ConsistencyTemplate::new(plan_text.clone(), plan.design.clone());
            debug!(fingerprint = %template.fingerprint(), "Consistency template fixed");
            self.state.fix_template(template)?;
        }

        self.transition(Phase::Rendering(step)).await?;
        let label = format!("stage {step} render");
        let image = components
            .synthesizer
            .render(&plan_text, &label, options, self.config.process_image_timeout())
            .await?;

        let appended = PipelineEvent::StageAppended {
            stage: step,
            total,
            title: narrative.title.clone(),
        };
        let sequence_step = SequenceStep {
            step_number: step,
            title: narrative.title.clone(),
            description: narrative.description.clone(),
            key_events: narrative.key_events.clone(),
            plan,
            plan_text,
            image,
        };
        self.state.append(narrative, sequence_step)?;
        self.transition(Phase::Appended(step)).await?;
        self.sink.emit(&appended).await;
        Ok(())
    }

    fn components(&self) -> Components {
        let mut resilience = Resilience::new(self.config.retry.clone());
        if let Some(token) = &self.cancellation {
            resilience = resilience.with_cancellation(Arc::clone(token));
        }
        let text_budget = self.config.text_timeout();

        Components {
            planner: StructurePlanner::new(self.text.clone(), resilience.clone(), text_budget),
            narrator: StageNarrator::new(self.text.clone(), resilience.clone(), text_budget),
            visual: StageVisualPlanner::new(self.text.clone(), resilience.clone(), text_budget),
            synthesizer: ImageSynthesizerAdapter::new(self.images.clone(), resilience),
            templates: ConsistencyTemplateBuilder::new(self.config.digest_excerpt_chars),
        }
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(StepwiseError::Cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            )),
            _ => Ok(()),
        }
    }

    async fn transition(&mut self, next: Phase) -> Result<()> {
        let previous = self.state.phase();
        self.state.set_phase(next)?;
        debug!(from = %previous, to = %next, "Pipeline transition");
        self.publish();
        self.emit_phase(next).await;
        Ok(())
    }

    async fn emit_phase(&self, phase: Phase) {
        self.sink.emit(&PipelineEvent::PhaseChanged { phase }).await;
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.snapshot());
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("config", &self.config)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}
