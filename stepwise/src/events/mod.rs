//! Pipeline lifecycle events.
//!
//! Sinks are injected into the controller; there is no process-wide sink.

mod event;
mod sink;

pub use event::{
    PipelineEvent, PHASE_CHANGED, PIPELINE_COMPLETED, PIPELINE_FAILED, STAGE_APPENDED,
};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
