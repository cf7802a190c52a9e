//! # Stepwise
//!
//! Sequential multi-stage generation of educational infographics.
//!
//! Given a topic describing a natural process, stepwise decomposes it into
//! an ordered set of stages and produces one rendered image per stage. Each
//! stage is narrated against everything generated before it, and every stage
//! after the first replicates the visual design invented by stage 1.
//!
//! - **Resilience**: retry-with-backoff for transient overloads and timeouts
//!   that bound the whole retry sequence
//! - **Pipeline**: structure planning, narration, consistency templating,
//!   visual planning and image synthesis, driven by a strict state machine
//! - **All-or-nothing**: any failure clears the run; only a complete sequence
//!   can be handed to a [`persistence::SequenceStore`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stepwise::prelude::*;
//!
//! let config = StepwiseConfig::default();
//! let client = Arc::new(GeminiClient::from_env(&config)?);
//! let mut controller = PipelineController::new(client.clone(), client, config);
//!
//! let sequence = controller
//!     .run("Photosynthesis", &GenerationOptions::default())
//!     .await?;
//! assert_eq!(sequence.len(), sequence.structure().suggested_steps);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod design;
pub mod errors;
pub mod events;
pub mod model;
pub mod observability;
pub mod persistence;
pub mod pipeline;
pub mod prompts;
pub mod resilience;
pub mod services;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::StepwiseConfig;
    pub use crate::design::{DesignTemplate, SceneSpec, StageVisualPlan};
    pub use crate::errors::{ErrorClass, Result, StepwiseError};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::model::{
        ArtStyle, AspectRatio, Audience, CompleteSequence, Fact, GenerationOptions,
        ImagePayload, Language, ProcessStructure, QualityTier, Sequence, SequenceStep,
        StageNarrative,
    };
    pub use crate::persistence::{persist_sequence, InMemorySequenceStore, SequenceStore};
    pub use crate::pipeline::{
        Phase, PipelineController, PipelineFailure, PipelineSnapshot, SingleImageGenerator,
    };
    pub use crate::resilience::{retry_with_backoff, with_timeout, Resilience, RetryConfig};
    pub use crate::services::{ImageRequest, ImageSynthesizer, TextGenerator, TextRequest};

    #[cfg(feature = "gemini")]
    pub use crate::services::gemini::GeminiClient;
}
