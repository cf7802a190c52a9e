//! The design template invented by stage 1 and replicated by every later stage.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::LazyLock;

use crate::errors::{Result, StepwiseError, ValidationError};
use crate::model::require_text;

/// Fewest palette entries a design may declare.
pub const MIN_PALETTE: usize = 3;
/// Most palette entries a design may declare.
pub const MAX_PALETTE: usize = 5;

/// How the stage title is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleStyle {
    /// Font family and weight, e.g. "rounded bold sans-serif".
    pub font_style: String,
    /// Relative size, e.g. "large, about 8% of image height".
    pub size: String,
    /// Concrete text color, e.g. `#1B4332`.
    pub color: String,
    /// Background treatment behind the title.
    pub background: String,
    /// Fixed position on the canvas.
    pub position: String,
    /// Optional effects such as a drop shadow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<String>,
}

/// How the "STEP k/n" indicator is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStyle {
    /// Badge outline shape.
    pub shape: String,
    /// Concrete fill color.
    pub background_color: String,
    /// Border description.
    pub border: String,
    /// Text styling inside the badge.
    pub text_style: String,
    /// Fixed position on the canvas.
    pub position: String,
    /// Fixed size.
    pub size: String,
}

/// One concept-to-color mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// The concept the color represents.
    pub concept: String,
    /// Concrete color value.
    pub color: String,
}

/// Where the fixed elements sit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTemplate {
    /// Title area.
    pub title_area: String,
    /// Badge area.
    pub badge_area: String,
    /// Callout and explanation area.
    pub callout_area: String,
}

/// Typography rules for labels and explanations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRules {
    /// Style for short labels on the illustration.
    pub label_style: String,
    /// Style for explanation text blocks.
    pub explanation_style: String,
}

/// The full set of visual decisions shared by every stage of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignTemplate {
    /// Title styling.
    pub title: TitleStyle,
    /// Stage badge styling.
    pub badge: BadgeStyle,
    /// Concept-to-color palette.
    pub palette: Vec<PaletteEntry>,
    /// Illustration technique description.
    pub technique: String,
    /// Fixed layout.
    pub layout: LayoutTemplate,
    /// Typography rules.
    pub text_rules: TextRules,
}

impl DesignTemplate {
    /// Checks that every decision is present and concrete.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PALETTE..=MAX_PALETTE).contains(&self.palette.len()) {
            return Err(ValidationError::field(
                "palette",
                format!(
                    "expected {MIN_PALETTE} to {MAX_PALETTE} entries, got {}",
                    self.palette.len()
                ),
            )
            .into());
        }

        let hex = hex_color_regex()?;
        let fields = [
            ("title.fontStyle", &self.title.font_style),
            ("title.size", &self.title.size),
            ("title.background", &self.title.background),
            ("title.position", &self.title.position),
            ("badge.shape", &self.badge.shape),
            ("badge.border", &self.badge.border),
            ("badge.textStyle", &self.badge.text_style),
            ("badge.position", &self.badge.position),
            ("badge.size", &self.badge.size),
            ("technique", &self.technique),
            ("layout.titleArea", &self.layout.title_area),
            ("layout.badgeArea", &self.layout.badge_area),
            ("layout.calloutArea", &self.layout.callout_area),
            ("textRules.labelStyle", &self.text_rules.label_style),
            ("textRules.explanationStyle", &self.text_rules.explanation_style),
        ];
        for (field, value) in fields {
            require_text(field, value)?;
        }

        require_color(hex, "title.color", &self.title.color)?;
        require_color(hex, "badge.backgroundColor", &self.badge.background_color)?;
        for (index, entry) in self.palette.iter().enumerate() {
            require_text(&format!("palette[{index}].concept"), &entry.concept)?;
            require_color(hex, &format!("palette[{index}].color"), &entry.color)?;
        }
        Ok(())
    }

    /// Writes the design section of a rendering plan.
    ///
    /// `badge_text` is `None` in single-image mode, where no badge is drawn.
    pub(crate) fn write_to(&self, out: &mut String, title_text: &str, badge_text: Option<&str>) {
        let title = &self.title;
        let _ = write!(
            out,
            "TITLE: \"{title_text}\" in {}, {}, color {}, on {}, placed at {}",
            title.font_style, title.size, title.color, title.background, title.position
        );
        if let Some(effects) = &title.effects {
            let _ = write!(out, ", with {effects}");
        }
        out.push_str(".\n");

        if let Some(badge_text) = badge_text {
            let badge = &self.badge;
            let _ = writeln!(
                out,
                "STAGE BADGE: \"{badge_text}\" in a {} badge, fill {}, border {}, text {}, \
                 placed at {}, size {}.",
                badge.shape,
                badge.background_color,
                badge.border,
                badge.text_style,
                badge.position,
                badge.size
            );
        }

        out.push_str("COLOR PALETTE:\n");
        for entry in &self.palette {
            let _ = writeln!(out, "- {}: {}", entry.concept, entry.color);
        }
        let _ = writeln!(out, "ILLUSTRATION TECHNIQUE: {}", self.technique);
        let _ = writeln!(
            out,
            "LAYOUT: title in {}; badge in {}; callouts in {}.",
            self.layout.title_area, self.layout.badge_area, self.layout.callout_area
        );
        let _ = writeln!(
            out,
            "TEXT RULES: labels use {}; explanations use {}.",
            self.text_rules.label_style, self.text_rules.explanation_style
        );
    }
}

static HEX_COLOR: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b"));

fn hex_color_regex() -> Result<&'static Regex> {
    HEX_COLOR
        .as_ref()
        .map_err(|e| StepwiseError::Internal(format!("invalid color regex: {e}")))
}

fn require_color(hex: &Regex, field: &str, value: &str) -> Result<()> {
    if hex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::field(field, format!("'{value}' has no hex color value")).into())
    }
}
