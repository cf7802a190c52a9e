//! Sample values that pass validation.

use crate::design::{
    BadgeStyle, DesignTemplate, LayoutTemplate, PaletteEntry, SceneSpec, StageVisualPlan,
    TextRules, TitleStyle,
};
use crate::model::{Fact, ProcessStructure};

const PHOTOSYNTHESIS_STAGES: [&str; 8] = [
    "Light Absorption",
    "Water Splitting",
    "Electron Transport",
    "ATP Synthesis",
    "Carbon Fixation",
    "Sugar Formation",
    "Starch Storage",
    "Oxygen Release",
];

/// A valid photosynthesis structure with `steps` stages.
///
/// Stages past the eighth are titled "Stage k"; such structures fail
/// validation on their step count.
#[must_use]
pub fn sample_structure(steps: usize) -> ProcessStructure {
    let step_titles = (1..=steps)
        .map(|k| {
            PHOTOSYNTHESIS_STAGES
                .get(k - 1)
                .map_or_else(|| format!("Stage {k}"), |title| (*title).to_string())
        })
        .collect();

    ProcessStructure {
        process_name: "Photosynthesis".to_string(),
        domain: "Biology".to_string(),
        overview_text: "Plants turn light, water and carbon dioxide into sugar and oxygen."
            .to_string(),
        suggested_steps: steps,
        step_titles,
    }
}

/// A complete, valid design with a four-color palette.
#[must_use]
pub fn sample_design() -> DesignTemplate {
    DesignTemplate {
        title: TitleStyle {
            font_style: "rounded bold sans-serif".to_string(),
            size: "large, about 8% of image height".to_string(),
            color: "#1B4332".to_string(),
            background: "cream banner with soft edges".to_string(),
            position: "top center".to_string(),
            effects: Some("subtle drop shadow".to_string()),
        },
        badge: BadgeStyle {
            shape: "circle".to_string(),
            background_color: "#F4A261".to_string(),
            border: "2px white ring".to_string(),
            text_style: "white bold condensed".to_string(),
            position: "top left corner".to_string(),
            size: "about 12% of image width".to_string(),
        },
        palette: vec![
            PaletteEntry {
                concept: "light energy".to_string(),
                color: "#FFD166".to_string(),
            },
            PaletteEntry {
                concept: "water".to_string(),
                color: "#118AB2".to_string(),
            },
            PaletteEntry {
                concept: "chlorophyll".to_string(),
                color: "#2D6A4F".to_string(),
            },
            PaletteEntry {
                concept: "sugar".to_string(),
                color: "#EF476F".to_string(),
            },
        ],
        technique: "clean vector shapes with soft gradients and thin dark outlines".to_string(),
        layout: LayoutTemplate {
            title_area: "top band, full width".to_string(),
            badge_area: "top left, overlapping the title band".to_string(),
            callout_area: "right third, stacked vertically".to_string(),
        },
        text_rules: TextRules {
            label_style: "short uppercase labels with leader lines".to_string(),
            explanation_style: "one or two sentences in rounded boxes".to_string(),
        },
    }
}

/// A valid plan for stage `step`.
///
/// Stage 1 uses [`sample_design`]. Later stages propose a slightly different
/// technique, the way a service drifts when left to itself.
#[must_use]
pub fn sample_plan(step: usize) -> StageVisualPlan {
    let mut design = sample_design();
    if step > 1 {
        design.technique = format!("{} (variant {step})", design.technique);
    }

    StageVisualPlan {
        design,
        scene: SceneSpec {
            composition: format!("cross-section of a leaf, zoomed in for stage {step}"),
            focal_point: format!("chloroplast detail {step}"),
            labels: vec![format!("label {step}a"), format!("label {step}b")],
            explanations: vec![format!("what happens during stage {step}")],
            callouts: vec![format!("callout {step}")],
            inputs_outputs: Vec::new(),
        },
    }
}

/// A valid single-concept explanation.
#[must_use]
pub fn sample_fact() -> Fact {
    Fact {
        domain: "Physics".to_string(),
        title: "Rainbows".to_string(),
        text: "Sunlight bends and splits inside raindrops into its colors.".to_string(),
    }
}
