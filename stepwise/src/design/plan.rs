//! Structured per-stage rendering plans.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::template::DesignTemplate;
use crate::errors::{Result, ValidationError};
use crate::model::{require_text, Language};

/// The stage-specific content of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSpec {
    /// Overall composition of the scene.
    pub composition: String,
    /// The single visual focus.
    pub focal_point: String,
    /// Short labels drawn on the illustration.
    pub labels: Vec<String>,
    /// Explanation text blocks.
    pub explanations: Vec<String>,
    /// Callouts pointing at details.
    #[serde(default)]
    pub callouts: Vec<String>,
    /// Inputs and outputs of this stage, if any.
    #[serde(default)]
    pub inputs_outputs: Vec<String>,
}

impl SceneSpec {
    /// Checks that the scene has something to draw.
    pub fn validate(&self) -> Result<()> {
        require_text("scene.composition", &self.composition)?;
        require_text("scene.focalPoint", &self.focal_point)?;
        if self.labels.iter().all(|label| label.trim().is_empty()) {
            return Err(ValidationError::field("scene.labels", "no labels").into());
        }
        if self.explanations.iter().all(|text| text.trim().is_empty()) {
            return Err(ValidationError::field("scene.explanations", "no explanations").into());
        }
        Ok(())
    }
}

/// A rendering plan: the shared design plus this stage's scene.
///
/// The plan is only turned into prose by [`StageVisualPlan::render`], right
/// before it is sent to the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageVisualPlan {
    /// Visual design decisions.
    pub design: DesignTemplate,
    /// Stage-specific content.
    pub scene: SceneSpec,
}

/// Stage metadata needed to render a plan.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Title drawn on the image.
    pub title: &'a str,
    /// `(step, total)` for process mode; `None` draws no badge.
    pub position: Option<(usize, usize)>,
    /// Resolved visual style.
    pub style: &'a str,
    /// Language of every on-image word.
    pub language: Language,
}

impl StageVisualPlan {
    /// Validates both halves of the plan.
    pub fn validate(&self) -> Result<()> {
        self.design.validate()?;
        self.scene.validate()
    }

    /// Replaces the design, keeping the scene.
    #[must_use]
    pub fn with_design(mut self, design: DesignTemplate) -> Self {
        self.design = design;
        self
    }

    /// Renders the plan into the natural-language prompt for the image service.
    #[must_use]
    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        let mut out = String::new();
        out.push_str("Create an educational infographic illustration.\n");
        let _ = writeln!(out, "VISUAL STYLE: {}", ctx.style);
        let _ = writeln!(
            out,
            "ALL TEXT IN THE IMAGE MUST BE IN {}.",
            ctx.language.display_name().to_uppercase()
        );
        out.push('\n');

        let badge = ctx
            .position
            .map(|(step, total)| format!("STEP {step}/{total}"));
        self.design.write_to(&mut out, ctx.title, badge.as_deref());

        let scene = &self.scene;
        out.push_str("\nSCENE:\n");
        let _ = writeln!(out, "Composition: {}", scene.composition);
        let _ = writeln!(out, "Focal point: {}", scene.focal_point);
        write_list(&mut out, "Labels", &scene.labels);
        write_list(&mut out, "Explanations", &scene.explanations);
        write_list(&mut out, "Callouts", &scene.callouts);
        write_list(&mut out, "Inputs and outputs", &scene.inputs_outputs);
        out
    }
}

fn write_list(out: &mut String, heading: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{heading}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_design, sample_plan};

    fn ctx(position: Option<(usize, usize)>) -> RenderContext<'static> {
        RenderContext {
            title: "Light Absorption",
            position,
            style: "soft watercolor",
            language: Language::Fr,
        }
    }

    #[test]
    fn test_render_contains_design_and_scene() {
        let plan = sample_plan(2);
        let text = plan.render(&ctx(Some((2, 5))));

        assert!(text.contains("VISUAL STYLE: soft watercolor"));
        assert!(text.contains("MUST BE IN FRENCH"));
        assert!(text.contains("TITLE: \"Light Absorption\""));
        assert!(text.contains("\"STEP 2/5\""));
        assert!(text.contains(&plan.scene.focal_point));
        for entry in &plan.design.palette {
            assert!(text.contains(&entry.color));
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let plan = sample_plan(1);
        assert_eq!(plan.render(&ctx(Some((1, 3)))), plan.render(&ctx(Some((1, 3)))));
    }

    #[test]
    fn test_single_mode_has_no_badge() {
        let text = sample_plan(1).render(&ctx(None));
        assert!(!text.contains("STEP "));
    }

    #[test]
    fn test_with_design_keeps_scene() {
        let plan = sample_plan(3);
        let mut design = sample_design();
        design.technique = "flat vector".to_string();

        let pinned = plan.clone().with_design(design.clone());
        assert_eq!(pinned.design, design);
        assert_eq!(pinned.scene, plan.scene);
    }

    #[test]
    fn test_scene_needs_labels() {
        let mut plan = sample_plan(1);
        plan.scene.labels = vec![String::new()];
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_plan_parses_from_json() {
        let json = serde_json::to_string(&sample_plan(1)).unwrap();
        let parsed: StageVisualPlan = serde_json::from_str(&json).unwrap();
        assert!(parsed.validate().is_ok());
    }
}
