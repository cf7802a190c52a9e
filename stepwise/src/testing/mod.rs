//! Testing utilities for stepwise pipelines.
//!
//! This module provides:
//! - Valid sample structures, designs and plans
//! - Scripted text and image services that record every request

mod fakes;
mod fixtures;

pub use fakes::{ScriptedImageSynthesizer, ScriptedTextGenerator};
pub use fixtures::{sample_design, sample_fact, sample_plan, sample_structure};
