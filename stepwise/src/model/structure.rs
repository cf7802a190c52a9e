//! Generated narrative values: the process structure, per-stage narratives
//! and single-concept facts.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// The decomposition of a topic into ordered stages.
///
/// Produced once per run by the structure planner and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStructure {
    /// Name of the process.
    pub process_name: String,
    /// Scientific domain.
    pub domain: String,
    /// Overview of the whole process.
    pub overview_text: String,
    /// Number of stages.
    pub suggested_steps: usize,
    /// One title per stage, in order.
    pub step_titles: Vec<String>,
}

impl ProcessStructure {
    /// Fewest stages a process may be split into.
    pub const MIN_STEPS: usize = 3;
    /// Most stages a process may be split into.
    pub const MAX_STEPS: usize = 8;

    /// Checks the step-count contract and required fields.
    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_STEPS..=Self::MAX_STEPS).contains(&self.suggested_steps) {
            return Err(ValidationError::StepCountOutOfRange {
                steps: self.suggested_steps,
                min: Self::MIN_STEPS,
                max: Self::MAX_STEPS,
            }
            .into());
        }
        if self.step_titles.len() != self.suggested_steps {
            return Err(ValidationError::StepCountMismatch {
                declared: self.suggested_steps,
                titles: self.step_titles.len(),
            }
            .into());
        }
        require_text("processName", &self.process_name)?;
        require_text("overviewText", &self.overview_text)?;
        for (index, title) in self.step_titles.iter().enumerate() {
            require_text(&format!("stepTitles[{index}]"), title)?;
        }
        Ok(())
    }

    /// Title of the 1-based stage `step_number`.
    #[must_use]
    pub fn title_of(&self, step_number: usize) -> Option<&str> {
        step_number
            .checked_sub(1)
            .and_then(|index| self.step_titles.get(index))
            .map(String::as_str)
    }
}

/// What happens in one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageNarrative {
    /// 1-based stage index.
    pub step_number: usize,
    /// Stage title.
    pub title: String,
    /// What happens in this stage only.
    pub description: String,
    /// Two or three short phrases to emphasise visually.
    pub key_events: Vec<String>,
}

impl StageNarrative {
    /// Fewest key events a stage may carry.
    pub const MIN_KEY_EVENTS: usize = 2;
    /// Most key events kept per stage.
    pub const MAX_KEY_EVENTS: usize = 3;

    /// Aligns the narrative with the planned stage and checks its content.
    ///
    /// The stage number and title always come from the structure plan; extra
    /// key events beyond [`Self::MAX_KEY_EVENTS`] are dropped. Fewer than
    /// [`Self::MIN_KEY_EVENTS`] non-blank events is an error.
    pub fn normalize(mut self, step_number: usize, planned_title: &str) -> Result<Self> {
        self.step_number = step_number;
        self.title = planned_title.to_string();
        require_text("description", &self.description)?;

        self.key_events.retain(|event| !event.trim().is_empty());
        if self.key_events.len() < Self::MIN_KEY_EVENTS {
            return Err(ValidationError::field(
                "keyEvents",
                format!(
                    "expected at least {} key events, got {}",
                    Self::MIN_KEY_EVENTS,
                    self.key_events.len()
                ),
            )
            .into());
        }
        self.key_events.truncate(Self::MAX_KEY_EVENTS);
        Ok(self)
    }
}

/// A single explained concept, used by single-image mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Scientific domain.
    pub domain: String,
    /// Short title.
    pub title: String,
    /// Explanation text.
    pub text: String,
}

impl Fact {
    /// Checks that every field is populated.
    pub fn validate(&self) -> Result<()> {
        require_text("domain", &self.domain)?;
        require_text("title", &self.title)?;
        require_text("text", &self.text)
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::field(field, "must not be empty").into());
    }
    Ok(())
}
