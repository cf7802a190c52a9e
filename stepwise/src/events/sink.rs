//! Where pipeline events go.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

use super::event::PipelineEvent;
use crate::pipeline::Phase;

/// Receives pipeline lifecycle events.
///
/// Sinks observe progress; they never influence it. A sink that fails
/// internally must swallow the failure.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Handles one event.
    async fn emit(&self, event: &PipelineEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &PipelineEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at `level`; anything but DEBUG logs at INFO.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &PipelineEvent) {
        let event_type = event.event_type();
        let stage = event.stage();
        if self.level == Level::DEBUG {
            debug!(event_type, stage, event = ?event, "Pipeline event");
        } else {
            info!(event_type, stage, event = ?event, "Pipeline event");
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every collected event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Just the event names, oldest first.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(PipelineEvent::event_type).collect()
    }

    /// Events named `event_type`, oldest first.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Every phase the run entered, in order.
    #[must_use]
    pub fn phases(&self) -> Vec<Phase> {
        self.events
            .read()
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::PhaseChanged { phase } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PHASE_CHANGED, STAGE_APPENDED};

    fn appended(stage: usize) -> PipelineEvent {
        PipelineEvent::StageAppended {
            stage,
            total: 3,
            title: format!("Stage {stage}"),
        }
    }

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit(&appended(1)).await;
        LoggingEventSink::debug()
            .emit(&PipelineEvent::PhaseChanged {
                phase: Phase::Discovering,
            })
            .await;
        LoggingEventSink::default().emit(&appended(2)).await;
    }

    #[tokio::test]
    async fn test_collecting_sink_filters_by_type() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(&PipelineEvent::PhaseChanged {
            phase: Phase::Narrating(1),
        })
        .await;
        sink.emit(&appended(1)).await;
        sink.emit(&PipelineEvent::PhaseChanged {
            phase: Phase::Narrating(2),
        })
        .await;

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type(STAGE_APPENDED), vec![appended(1)]);
        assert_eq!(sink.event_types(), vec![PHASE_CHANGED, STAGE_APPENDED, PHASE_CHANGED]);
        assert_eq!(sink.phases(), vec![Phase::Narrating(1), Phase::Narrating(2)]);
    }
}
