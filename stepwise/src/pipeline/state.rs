//! Pipeline state machine.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::consistency::ConsistencyTemplate;
use super::context::AccumulatedContext;
use crate::errors::{Result, StepwiseError};
use crate::model::{ProcessStructure, Sequence, SequenceStep, StageNarrative};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "phase", content = "stage", rename_all = "snake_case")]
pub enum Phase {
    /// No run in progress.
    #[default]
    Idle,
    /// Planning the process structure.
    Discovering,
    /// Narrating stage `i`.
    Narrating(usize),
    /// Composing stage `i`'s consistency block.
    Templating(usize),
    /// Planning stage `i`'s image.
    Planning(usize),
    /// Rendering stage `i`'s image.
    Rendering(usize),
    /// Stage `i` joined the sequence.
    Appended(usize),
    /// Every stage joined the sequence.
    Complete,
    /// The run aborted at stage `i` (0 while discovering).
    Failed(usize),
}

impl Phase {
    /// The stage this phase belongs to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<usize> {
        match self {
            Self::Narrating(i)
            | Self::Templating(i)
            | Self::Planning(i)
            | Self::Rendering(i)
            | Self::Appended(i)
            | Self::Failed(i) => Some(*i),
            Self::Idle | Self::Discovering | Self::Complete => None,
        }
    }

    /// Whether `next` may follow `self` in a run of `total` stages.
    #[must_use]
    pub fn can_transition_to(&self, next: Self, total: usize) -> bool {
        match (*self, next) {
            (Self::Idle, Self::Discovering) => true,
            (Self::Discovering, Self::Narrating(1)) => true,
            (Self::Discovering, Self::Failed(0)) => true,
            (Self::Narrating(i), Self::Templating(j))
            | (Self::Templating(i), Self::Planning(j))
            | (Self::Planning(i), Self::Rendering(j))
            | (Self::Rendering(i), Self::Appended(j)) => i == j,
            (Self::Appended(i), Self::Narrating(j)) => j == i + 1 && j <= total,
            (Self::Appended(i), Self::Complete) => i == total,
            (
                Self::Narrating(i)
                | Self::Templating(i)
                | Self::Planning(i)
                | Self::Rendering(i)
                | Self::Appended(i),
                Self::Failed(j),
            ) => i == j,
            (Self::Complete | Self::Failed(_), Self::Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Discovering => write!(f, "discovering"),
            Self::Narrating(i) => write!(f, "narrating({i})"),
            Self::Templating(i) => write!(f, "templating({i})"),
            Self::Planning(i) => write!(f, "planning({i})"),
            Self::Rendering(i) => write!(f, "rendering({i})"),
            Self::Appended(i) => write!(f, "appended({i})"),
            Self::Complete => write!(f, "complete"),
            Self::Failed(i) => write!(f, "failed({i})"),
        }
    }
}

/// Everything a run owns. Only the controller mutates it.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    phase: Phase,
    structure: Option<ProcessStructure>,
    context: Option<AccumulatedContext>,
    narratives: Vec<StageNarrative>,
    template: Option<ConsistencyTemplate>,
    sequence: Sequence,
}

impl PipelineState {
    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the stage in progress, or 0 outside the stage loop.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.phase.stage().unwrap_or(0)
    }

    /// The planned structure, once discovered.
    #[must_use]
    pub fn structure(&self) -> Option<&ProcessStructure> {
        self.structure.as_ref()
    }

    /// The accumulated context, once discovered.
    #[must_use]
    pub fn context(&self) -> Option<&AccumulatedContext> {
        self.context.as_ref()
    }

    /// Narratives of appended stages.
    #[must_use]
    pub fn narratives(&self) -> &[StageNarrative] {
        &self.narratives
    }

    /// Stage 1's template, once fixed.
    #[must_use]
    pub fn template(&self) -> Option<&ConsistencyTemplate> {
        self.template.as_ref()
    }

    /// The partial sequence.
    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Total stages planned, or 0 before discovery.
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.structure.as_ref().map_or(0, |s| s.suggested_steps)
    }

    pub(crate) fn set_phase(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next, self.total_steps()) {
            return Err(StepwiseError::Internal(format!(
                "illegal transition {} -> {next}",
                self.phase
            )));
        }
        self.phase = next;
        Ok(())
    }

    pub(crate) fn begin(&mut self, structure: ProcessStructure) {
        self.context = Some(AccumulatedContext::new(structure.overview_text.clone()));
        self.sequence = Sequence::with_target(structure.suggested_steps);
        self.narratives.clear();
        self.template = None;
        self.structure = Some(structure);
    }

    /// Fixes stage 1's template. It can only be set once per run.
    pub(crate) fn fix_template(&mut self, template: ConsistencyTemplate) -> Result<()> {
        if self.template.is_some() {
            return Err(StepwiseError::Internal(
                "consistency template is already fixed".to_string(),
            ));
        }
        self.template = Some(template);
        Ok(())
    }

    /// Appends a rendered stage and folds its description into the context.
    pub(crate) fn append(&mut self, narrative: StageNarrative, step: SequenceStep) -> Result<()> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| StepwiseError::Internal("append before discovery".to_string()))?;
        self.sequence.push(step)?;
        context.append(&narrative)?;
        self.narratives.push(narrative);
        Ok(())
    }

    /// Drops everything the run produced and records the failing stage.
    pub(crate) fn reset_failed(&mut self, stage: usize) {
        *self = Self {
            phase: Phase::Failed(stage),
            ..Self::default()
        };
    }

    /// Read-only view for observers.
    #[must_use]
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            phase: self.phase,
            current_step: self.current_step(),
            total_steps: self.total_steps(),
            process_name: self.structure.as_ref().map(|s| s.process_name.clone()),
            steps: self.sequence.steps().to_vec(),
        }
    }
}

/// A read-only copy of the run's progress, published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Stage in progress, or 0.
    pub current_step: usize,
    /// Planned stage count, or 0.
    pub total_steps: usize,
    /// Process name, once discovered.
    pub process_name: Option<String>,
    /// Stages appended so far, shared with the run state.
    pub steps: Vec<Arc<SequenceStep>>,
}
