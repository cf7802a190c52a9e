//! Data model for a generation run.

mod profile;
mod sequence;
mod structure;

pub use profile::{ArtStyle, AspectRatio, Audience, GenerationOptions, Language, QualityTier};
pub use sequence::{CompleteSequence, ImagePayload, Sequence, SequenceStep};
pub use structure::{Fact, ProcessStructure, StageNarrative};

pub(crate) use structure::require_text;
