//! Visual consistency across stages.
//!
//! Image synthesis is stateless: each render knows nothing of the previous
//! ones. Stage 1 is asked to invent a complete design; every later stage's
//! planning prompt carries stage 1's rendered plan verbatim together with a
//! digest of what earlier stages already showed.
//!
//! Consistency is best-effort. Nothing checks the rendered images against
//! the template.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::design::DesignTemplate;
use crate::errors::{Result, StepwiseError};
use crate::model::StageNarrative;
use crate::utils::truncate_chars;

/// Stage 1's rendered plan and the design it encodes.
///
/// Fixed once per run and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyTemplate {
    plan_text: String,
    design: DesignTemplate,
    fingerprint: String,
}

impl ConsistencyTemplate {
    /// Captures stage 1's plan.
    #[must_use]
    pub fn new(plan_text: impl Into<String>, design: DesignTemplate) -> Self {
        let plan_text = plan_text.into();
        let fingerprint = hex::encode(Sha256::digest(plan_text.as_bytes()));
        Self {
            plan_text,
            design,
            fingerprint,
        }
    }

    /// The verbatim stage 1 plan text.
    #[must_use]
    pub fn plan_text(&self) -> &str {
        &self.plan_text
    }

    /// The structured design every later stage is pinned to.
    #[must_use]
    pub fn design(&self) -> &DesignTemplate {
        &self.design
    }

    /// SHA-256 of the plan text, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

const STAGE_ONE_BLOCK: &str = "\
DESIGN SYSTEM (this is stage 1: you define it, and every later stage will copy it exactly)
Invent and state explicitly in your answer:
1. Title styling: font style, size, one concrete hex color, background treatment, a fixed \
position, and any effects.
2. Stage badge: shape, hex background color, border, text styling, a fixed position and a \
fixed size. The badge reads \"STEP {{STEP}}/{{TOTAL}}\".
3. Color palette: three to five concept-to-color pairs with hex values, reused for the same \
concepts in every stage.
4. Illustration technique: how things are drawn, shaded and outlined.
5. Layout template: where the title, the badge and the callouts sit.
6. Text rules: how labels and explanations are styled.";

/// Composes the consistency block of each stage's visual-plan prompt.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyTemplateBuilder {
    excerpt_chars: usize,
}

impl Default for ConsistencyTemplateBuilder {
    fn default() -> Self {
        Self { excerpt_chars: 150 }
    }
}

impl ConsistencyTemplateBuilder {
    /// Creates a builder that keeps `excerpt_chars` of each prior description.
    #[must_use]
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    /// Builds the block for stage `step` of `total`.
    ///
    /// Stage 1 takes no template and no prior stages. Stage `k > 1` needs the
    /// fixed template and exactly `k - 1` prior narratives.
    pub fn build(
        &self,
        step: usize,
        total: usize,
        template: Option<&ConsistencyTemplate>,
        prior: &[StageNarrative],
    ) -> Result<String> {
        if step == 0 || step > total {
            return Err(StepwiseError::Internal(format!(
                "stage {step} is outside 1..={total}"
            )));
        }
        if prior.len() != step - 1 {
            return Err(StepwiseError::Internal(format!(
                "stage {step} needs {} prior stages, got {}",
                step - 1,
                prior.len()
            )));
        }

        match (step, template) {
            (1, None) => Ok(STAGE_ONE_BLOCK
                .replace("{{STEP}}", "1")
                .replace("{{TOTAL}}", &total.to_string())),
            (1, Some(_)) => Err(StepwiseError::Internal(
                "consistency template already fixed before stage 1".to_string(),
            )),
            (_, None) => Err(StepwiseError::Internal(format!(
                "stage {step} has no consistency template"
            ))),
            (_, Some(template)) => Ok(self.replicate_block(step, total, template, prior)),
        }
    }

    fn replicate_block(
        &self,
        step: usize,
        total: usize,
        template: &ConsistencyTemplate,
        prior: &[StageNarrative],
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "DESIGN SYSTEM (stage {step} of {total}: replicate stage 1 exactly)"
        );
        out.push_str("Stage 1 was planned as follows:\n");
        out.push_str("<<<STAGE 1 PLAN\n");
        out.push_str(template.plan_text());
        if !template.plan_text().ends_with('\n') {
            out.push('\n');
        }
        out.push_str("STAGE 1 PLAN>>>\n\n");

        out.push_str("Extract these elements from the stage 1 plan and reuse them unchanged:\n");
        out.push_str("- title font, size, color, background, position and effects\n");
        let _ = writeln!(
            out,
            "- badge shape, colors, border, text style, position and size; \
             the badge now reads \"STEP {step}/{total}\""
        );
        out.push_str("- every palette color, mapped to the same concepts\n");
        out.push_str("- illustration technique\n");
        out.push_str("- layout of title, badge and callouts\n");
        out.push_str("- label and explanation text rules\n");
        out.push_str("Only the badge number and the stage content may differ.\n\n");

        out.push_str("Already shown in earlier stages:\n");
        for narrative in prior {
            let _ = writeln!(
                out,
                "- Stage {} ({}): {}",
                narrative.step_number,
                narrative.title,
                truncate_chars(&narrative.description, self.excerpt_chars)
            );
        }
        out.push_str("Do not re-illustrate the above; show only new content for this stage.");
        out
    }
}
