//! The process-mode pipeline and single-image mode.
//!
//! A run walks a strict state machine:
//!
//! ```text
//! Idle -> Discovering -> [Narrating(i) -> Templating(i) -> Planning(i)
//!      -> Rendering(i) -> Appended(i)] for i in 1..=N -> Complete
//! ```
//!
//! Any failure moves the run to `Failed(i)` and discards everything it
//! produced.

mod consistency;
mod context;
mod controller;
mod narrator;
mod planner;
mod single;
mod state;
mod synthesizer;
mod visual_planner;

#[cfg(test)]
mod integration_tests;

pub use consistency::{ConsistencyTemplate, ConsistencyTemplateBuilder};
pub use context::AccumulatedContext;
pub use controller::{PipelineController, PipelineFailure};
pub use narrator::StageNarrator;
pub use planner::StructurePlanner;
pub use single::{SingleImage, SingleImageGenerator};
pub use state::{Phase, PipelineSnapshot, PipelineState};
pub use synthesizer::ImageSynthesizerAdapter;
pub use visual_planner::StageVisualPlanner;
