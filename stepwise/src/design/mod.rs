//! Structured visual design values.
//!
//! A [`StageVisualPlan`] pairs the sequence-wide [`DesignTemplate`] with one
//! stage's [`SceneSpec`]. Plans stay structured through the pipeline and are
//! rendered to text only at the synthesis boundary.

mod plan;
mod template;

pub use plan::{RenderContext, SceneSpec, StageVisualPlan};
pub use template::{
    BadgeStyle, DesignTemplate, LayoutTemplate, PaletteEntry, TextRules, TitleStyle, MAX_PALETTE,
    MIN_PALETTE,
};
