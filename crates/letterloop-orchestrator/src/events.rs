//! Loop events and observers.
//!
//! The controller reports progress as [`LoopEvent`]s to a [`LoopObserver`].
//! The CLI prints them; [`EventLog`] records them with timestamps so the run
//! summary can include a timeline.
//!
//! Events serialize as JSON objects with `event` and `payload` fields:
//!
//! ```
//! use letterloop_orchestrator::events::{IterationPayload, LoopEvent};
//!
//! let event = LoopEvent::IterationStarted(IterationPayload { iteration: 1, max_iterations: 3 });
//! let json = serde_json::to_string(&event).unwrap();
//! assert!(json.contains(r#""event":"iteration_started""#));
//! ```

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::loop_state::{Decision, WritingOutcome};

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `run_started` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartedPayload {
    /// Iteration bound for this run.
    pub max_iterations: u32,
    /// Description of the main model.
    pub model: String,
    /// Requested translation language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

/// Payload for the `iteration_started` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationPayload {
    /// The iteration number (1-indexed).
    pub iteration: u32,
    /// Iteration bound for this run.
    pub max_iterations: u32,
}

/// Payload for the `draft_generated` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DraftPayload {
    /// The iteration that produced the draft.
    pub iteration: u32,
    /// Length of the sanitized draft in characters.
    pub chars: usize,
}

/// Payload for the `review_completed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewPayload {
    /// The iteration that was reviewed.
    pub iteration: u32,
    /// The reviewer's decision.
    pub decision: Decision,
}

/// Payload for the `writing_finished` and `run_completed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomePayload {
    /// How the writing phase ended.
    pub outcome: WritingOutcome,
    /// Iterations used.
    pub iterations: u32,
}

/// Payload for the translation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationPayload {
    /// Target language code.
    pub language: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Progress events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum LoopEvent {
    /// Documents are loaded and the loop is starting.
    RunStarted(RunStartedPayload),
    /// A write phase began.
    IterationStarted(IterationPayload),
    /// A draft was produced and sanitized.
    DraftGenerated(DraftPayload),
    /// A review finished and was recorded.
    ReviewCompleted(ReviewPayload),
    /// The writing phase ended.
    WritingFinished(OutcomePayload),
    /// Translation of the final draft began.
    TranslationStarted(TranslationPayload),
    /// Translation finished.
    TranslationCompleted(TranslationPayload),
    /// The run reached `Done`.
    RunCompleted(OutcomePayload),
}

impl LoopEvent {
    /// The snake_case event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RunStarted(_) => "run_started",
            Self::IterationStarted(_) => "iteration_started",
            Self::DraftGenerated(_) => "draft_generated",
            Self::ReviewCompleted(_) => "review_completed",
            Self::WritingFinished(_) => "writing_finished",
            Self::TranslationStarted(_) => "translation_started",
            Self::TranslationCompleted(_) => "translation_completed",
            Self::RunCompleted(_) => "run_completed",
        }
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Receives loop events as they happen.
pub trait LoopObserver: Send + Sync {
    /// Called once per event, in order, on the controller's task.
    fn on_event(&self, event: &LoopEvent);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl LoopObserver for NoopObserver {
    fn on_event(&self, _event: &LoopEvent) {}
}

/// An event and when it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedEvent {
    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    #[serde(flatten)]
    pub event: LoopEvent,
}

/// Observer that records every event with a timestamp.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<TimedEvent>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TimedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl LoopObserver for EventLog {
    fn on_event(&self, event: &LoopEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(TimedEvent {
                timestamp: Utc::now(),
                event: event.clone(),
            });
        }
    }
}

/// Forwards every event to each observer in turn.
#[derive(Default)]
pub struct Observers {
    observers: Vec<std::sync::Arc<dyn LoopObserver>>,
}

impl Observers {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer.
    #[must_use]
    pub fn with(mut self, observer: std::sync::Arc<dyn LoopObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl LoopObserver for Observers {
    fn on_event(&self, event: &LoopEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
