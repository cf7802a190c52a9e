//! Language, audience, style and rendering options for a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output language for narration and on-image text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// French.
    Fr,
}

impl Language {
    /// Returns the language name used inside prompts.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Fr => "French",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Fr => write!(f, "fr"),
        }
    }
}

/// Who the sequence is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Children around 8-10 years old.
    Young,
    /// Curious adults.
    #[default]
    Adult,
}

impl Audience {
    /// Describes the audience for prompt injection.
    #[must_use]
    pub fn target_audience(&self) -> &'static str {
        match self {
            Self::Young => "children aged 8 to 10",
            Self::Adult => "curious adults without specialist training",
        }
    }

    /// The tone the text should adopt.
    #[must_use]
    pub fn tone(&self) -> &'static str {
        match self {
            Self::Young => "playful, warm and enthusiastic",
            Self::Adult => "engaging, precise and thought-provoking",
        }
    }

    /// The visual style used when no explicit art style is chosen.
    #[must_use]
    pub fn default_style(&self) -> &'static str {
        match self {
            Self::Young => {
                "bright cartoon illustration, rounded friendly shapes, bold outlines, \
                 cheerful saturated colors"
            }
            Self::Adult => {
                "clean modern editorial illustration, precise labelled diagrams, \
                 restrained palette, subtle gradients"
            }
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Young => write!(f, "young"),
            Self::Adult => write!(f, "adult"),
        }
    }
}

/// Named art-style presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtStyle {
    /// Use the audience's default style.
    #[default]
    Default,
    /// 8-bit pixel art.
    Pixel,
    /// Claymation.
    Clay,
    /// Layered paper cut-outs.
    Origami,
    /// Soft watercolor.
    Watercolor,
    /// Neon-lit sci-fi.
    Cyberpunk,
    /// Old textbook lithograph.
    Vintage,
    /// Glowing line art on black.
    Neon,
    /// Japanese comic ink.
    Manga,
    /// Hand-painted animated film look.
    Ghibli,
}

impl ArtStyle {
    /// All presets, in display order.
    pub const ALL: [Self; 10] = [
        Self::Default,
        Self::Pixel,
        Self::Clay,
        Self::Origami,
        Self::Watercolor,
        Self::Cyberpunk,
        Self::Vintage,
        Self::Neon,
        Self::Manga,
        Self::Ghibli,
    ];

    /// The style description, or `None` for [`ArtStyle::Default`].
    #[must_use]
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Pixel => {
                Some("8-bit pixel art, vibrant palette, retro video game look, blocky details")
            }
            Self::Clay => {
                Some("3D claymation, plasticine texture, handmade feel, soft studio lighting")
            }
            Self::Origami => {
                Some("layered paper cut-out, visible folds, soft drop shadows, craft aesthetic")
            }
            Self::Watercolor => {
                Some("soft watercolor painting, fluid pastel washes on textured paper")
            }
            Self::Cyberpunk => {
                Some("futuristic cyberpunk, neon accents on dark backgrounds, high contrast")
            }
            Self::Vintage => {
                Some("vintage science textbook lithograph, muted earth tones, fine line work")
            }
            Self::Neon => Some("minimalist glowing neon line art on deep black, sleek and modern"),
            Self::Manga => {
                Some("manga ink illustration, bold outlines, dynamic action lines, dramatic angles")
            }
            Self::Ghibli => {
                Some("hand-painted animated film look, warm natural backgrounds, gentle whimsy")
            }
        }
    }

    /// Resolves the concrete style text for an audience.
    #[must_use]
    pub fn resolve(&self, audience: Audience) -> &'static str {
        self.description().unwrap_or_else(|| audience.default_style())
    }
}

/// Output image proportions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1
    #[serde(rename = "1:1")]
    Square,
    /// 3:4
    #[default]
    #[serde(rename = "3:4")]
    Portrait,
    /// 4:3
    #[serde(rename = "4:3")]
    Landscape,
    /// 9:16
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    /// The ratio as sent to the image service.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Tall => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Faster, cheaper model.
    #[default]
    Fast,
    /// Slower model with better text rendering and detail.
    HighQuality,
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::HighQuality => write!(f, "high_quality"),
        }
    }
}

/// Per-run generation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Output language.
    #[serde(default)]
    pub language: Language,
    /// Target audience.
    #[serde(default)]
    pub audience: Audience,
    /// Art style preset.
    #[serde(default)]
    pub style: ArtStyle,
    /// Image proportions.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Image model tier.
    #[serde(default)]
    pub quality: QualityTier,
}

impl GenerationOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the language.
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    /// Sets the art style.
    #[must_use]
    pub fn with_style(mut self, style: ArtStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the aspect ratio.
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Sets the quality tier.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = quality;
        self
    }

    /// The resolved visual style text.
    #[must_use]
    pub fn style_text(&self) -> &'static str {
        self.style.resolve(self.audience)
    }
}
