//! The narrative context carried from stage to stage.

use serde::Serialize;
use std::fmt::Write as _;

use crate::errors::{Result, ValidationError};
use crate::model::StageNarrative;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ContextEntry {
    step_number: usize,
    title: String,
    description: String,
}

/// Overview plus the descriptions of every completed stage.
///
/// Append-only. Before stage `i` starts it holds exactly stages `1..i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccumulatedContext {
    overview: String,
    entries: Vec<ContextEntry>,
}

impl AccumulatedContext {
    /// Starts a context from the process overview.
    #[must_use]
    pub fn new(overview: impl Into<String>) -> Self {
        Self {
            overview: overview.into(),
            entries: Vec::new(),
        }
    }

    /// Appends the next stage's description.
    pub fn append(&mut self, narrative: &StageNarrative) -> Result<()> {
        let expected = self.entries.len() + 1;
        if narrative.step_number != expected {
            return Err(ValidationError::OutOfOrder {
                step_number: narrative.step_number,
                message: format!("context expects stage {expected}"),
            }
            .into());
        }
        self.entries.push(ContextEntry {
            step_number: narrative.step_number,
            title: narrative.title.clone(),
            description: narrative.description.clone(),
        });
        Ok(())
    }

    /// Number of stages folded in so far.
    #[must_use]
    pub fn stages_covered(&self) -> usize {
        self.entries.len()
    }

    /// The overview text.
    #[must_use]
    pub fn overview(&self) -> &str {
        &self.overview
    }

    /// Renders the context for injection into a prompt.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("Overview: {}", self.overview);
        for entry in &self.entries {
            let _ = write!(
                out,
                "\n\nStage {} ({}): {}",
                entry.step_number, entry.title, entry.description
            );
        }
        out
    }
}
