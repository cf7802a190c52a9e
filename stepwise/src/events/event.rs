//! Typed pipeline lifecycle events.

use serde::Serialize;

use crate::errors::ErrorClass;
use crate::pipeline::Phase;

/// Emitted on every state-machine transition.
pub const PHASE_CHANGED: &str = "pipeline.phase";
/// Emitted after a stage joins the sequence.
pub const STAGE_APPENDED: &str = "stage.appended";
/// Emitted once a run produced a complete sequence.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Emitted when a run aborts.
pub const PIPELINE_FAILED: &str = "pipeline.failed";

/// Something observable that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The run entered `phase`.
    PhaseChanged {
        /// The new phase.
        phase: Phase,
    },
    /// A stage joined the sequence.
    StageAppended {
        /// 1-based stage index.
        stage: usize,
        /// Planned stage count.
        total: usize,
        /// Stage title.
        title: String,
    },
    /// Every stage joined the sequence.
    Completed {
        /// Process name.
        process: String,
        /// Stage count.
        stages: usize,
    },
    /// The run aborted and its state was cleared.
    Failed {
        /// Failing stage, or 0 while discovering.
        stage: usize,
        /// User-facing classification.
        class: ErrorClass,
        /// Message shown to the user.
        message: String,
    },
}

impl PipelineEvent {
    /// Dotted event name, e.g. `stage.appended`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => PHASE_CHANGED,
            Self::StageAppended { .. } => STAGE_APPENDED,
            Self::Completed { .. } => PIPELINE_COMPLETED,
            Self::Failed { .. } => PIPELINE_FAILED,
        }
    }

    /// The stage the event concerns, if any.
    #[must_use]
    pub fn stage(&self) -> Option<usize> {
        match self {
            Self::PhaseChanged { phase } => phase.stage(),
            Self::StageAppended { stage, .. } | Self::Failed { stage, .. } => Some(*stage),
            Self::Completed { .. } => None,
        }
    }
}
