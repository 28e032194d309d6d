//! LetterLoop Report Generation
//!
//! Types and generators for the artifacts a finished run leaves behind: the
//! feedback history as Markdown and the run summary as JSON.
//!
//! # Types
//!
//! - [`RunReport`] - Everything known about a finished run
//! - [`RunSummary`] - Outcome, iteration counts and timing
//! - [`FeedbackEntry`] - One review, in order
//! - [`TimelineEntry`] - A timestamped loop event
//!
//! # Generators
//!
//! - [`MarkdownGenerator`] - The feedback history document
//! - [`json::JsonGenerator`] - The run summary, compact or pretty
//! - [`artifacts`] - Output paths derived from the draft path, and writing them
//!
//! # Example
//!
//! ```rust
//! use letterloop_report::{FeedbackEntry, ReportStatus, ReviewDecision, RunReport, RunSummary};
//!
//! let report = RunReport::builder()
//!     .output_name("cover_letter.md")
//!     .summary(RunSummary {
//!         status: ReportStatus::Approved,
//!         iterations: 1,
//!         max_iterations: 3,
//!         ..RunSummary::default()
//!     })
//!     .feedback_entry(FeedbackEntry::new(1, ReviewDecision::Approved, "Ready to send."))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(report.review_count(), 1);
//! ```

pub mod artifacts;
pub mod json;
mod markdown;

pub use artifacts::{write_artifacts, ArtifactNaming, ArtifactPaths};
pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Report Status (local copies to keep this crate free of the orchestrator)
// ============================================================================

/// How the writing phase of the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// The reviewer approved a draft.
    #[default]
    Approved,
    /// The iteration bound was reached without approval.
    MaxIterationsReached,
}

impl ReportStatus {
    /// Returns `true` if the reviewer approved the final draft.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Returns a human-readable description of the status.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Approved => "Approved by reviewer",
            Self::MaxIterationsReached => "Maximum iterations reached without approval",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A reviewer's verdict as recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// The draft was approved.
    Approved,
    /// The draft was sent back for revision.
    NeedsImprovement,
}

impl ReviewDecision {
    /// Heading text used in the feedback history.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::NeedsImprovement => "Needs improvement",
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// RunReport
// ============================================================================

/// Complete record of a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// File name of the final draft, used as the report title.
    pub output_name: String,

    /// Outcome, counts and timing.
    pub summary: RunSummary,

    /// Every review, in iteration order.
    pub feedback: Vec<FeedbackEntry>,

    /// Chronological loop events.
    pub timeline: Vec<TimelineEntry>,
}

impl RunReport {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder() -> ReportBuilder {
        ReportBuilder::default()
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    /// Number of reviews recorded.
    #[must_use]
    pub fn review_count(&self) -> usize {
        self.feedback.len()
    }

    /// The last review, if any.
    #[must_use]
    pub fn final_feedback(&self) -> Option<&FeedbackEntry> {
        self.feedback.last()
    }
}

// ============================================================================
// ReportBuilder
// ============================================================================

/// Builder for constructing [`RunReport`] instances.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    output_name: Option<String>,
    summary: Option<RunSummary>,
    feedback: Vec<FeedbackEntry>,
    timeline: Vec<TimelineEntry>,
}

impl ReportBuilder {
    /// Sets the draft file name.
    #[must_use]
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Sets the run summary.
    #[must_use]
    pub fn summary(mut self, summary: RunSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Adds one review.
    #[must_use]
    pub fn feedback_entry(mut self, entry: FeedbackEntry) -> Self {
        self.feedback.push(entry);
        self
    }

    /// Sets all reviews at once.
    #[must_use]
    pub fn feedback(mut self, feedback: Vec<FeedbackEntry>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Adds a timeline entry.
    #[must_use]
    pub fn timeline_entry(mut self, entry: TimelineEntry) -> Self {
        self.timeline.push(entry);
        self
    }

    /// Sets the complete timeline.
    #[must_use]
    pub fn timeline(mut self, timeline: Vec<TimelineEntry>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if required fields are missing or
    /// the review count disagrees with the summary.
    pub fn build(self) -> Result<RunReport> {
        let output_name = self
            .output_name
            .ok_or_else(|| ReportError::InvalidData("output_name is required".to_string()))?;

        let summary = self
            .summary
            .ok_or_else(|| ReportError::InvalidData("summary is required".to_string()))?;

        if self.feedback.len() > summary.iterations as usize {
            return Err(ReportError::InvalidData(format!(
                "{} reviews recorded for {} iterations",
                self.feedback.len(),
                summary.iterations
            )));
        }

        Ok(RunReport {
            output_name,
            summary,
            feedback: self.feedback,
            timeline: self.timeline,
        })
    }
}

// ============================================================================
// RunSummary
// ============================================================================

/// High-level summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// How the writing phase ended.
    pub status: ReportStatus,

    /// Write phases completed.
    pub iterations: u32,

    /// Iteration bound in effect.
    pub max_iterations: u32,

    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: u64,

    /// Description of the main model.
    pub model: String,

    /// Language the final draft was translated into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    /// Length of the final draft in characters.
    pub draft_chars: usize,
}

// ============================================================================
// FeedbackEntry
// ============================================================================

/// One review of one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// The iteration whose draft was reviewed.
    pub iteration: u32,

    /// The reviewer's verdict.
    pub decision: ReviewDecision,

    /// The reviewer's comments, verbatim.
    pub comments: String,

    /// When the review was recorded.
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(iteration: u32, decision: ReviewDecision, comments: impl Into<String>) -> Self {
        Self {
            iteration,
            decision,
            comments: comments.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// TimelineEntry
// ============================================================================

/// A timestamped event in the run timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// Event name.
    pub event: String,

    /// Optional additional details about the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TimelineEntry {
    /// Creates a timeline entry.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, event: impl Into<String>) -> Self {
        Self {
            timestamp,
            event: event.into(),
            details: None,
        }
    }

    /// Attaches details to the entry.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
