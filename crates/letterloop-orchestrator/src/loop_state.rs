//! Generation state for the draft/review loop.
//!
//! [`GenerationState`] is the one mutable record threaded through a run. Its
//! fields are private and only the crate's controller can change them, which
//! keeps the iteration and feedback invariants in one place:
//!
//! - the iteration counter never exceeds the bound while the run is active
//! - the feedback history only grows, one record per review
//! - the draft is never empty once the first draft has been produced
//! - a translated draft exists only if translation was requested and ran

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::documents::Materials;
use crate::error::{LetterError, Result};

// ============================================================================
// GenerationStatus
// ============================================================================

/// Current status of a generation run.
///
/// The status transitions through these states:
/// - `Initialized` -> `Writing` -> `Reviewing`
/// - From `Reviewing`:
///   - `Approved` (reviewer approved the draft)
///   - `MaxIterationsReached` (bound hit without approval)
///   - `Revising` -> `Writing` (another cycle)
/// - From `Approved` or `MaxIterationsReached`:
///   - `Translating` -> `Done` (target language requested)
///   - `Done`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Documents are loaded, no draft yet.
    #[default]
    Initialized,
    /// A draft is being generated or revised.
    Writing,
    /// The current draft is being reviewed.
    Reviewing,
    /// Preparing the next revision.
    Revising,
    /// The reviewer approved the draft.
    Approved,
    /// The iteration bound was reached without approval.
    MaxIterationsReached,
    /// The final draft is being translated.
    Translating,
    /// The run has finished.
    Done,
}

impl GenerationStatus {
    /// Returns `true` once the run has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns `true` if the writing phase has ended in this status.
    #[must_use]
    pub const fn ends_writing(&self) -> bool {
        matches!(self, Self::Approved | Self::MaxIterationsReached)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized => write!(f, "initialized"),
            Self::Writing => write!(f, "writing"),
            Self::Reviewing => write!(f, "reviewing"),
            Self::Revising => write!(f, "revising"),
            Self::Approved => write!(f, "approved"),
            Self::MaxIterationsReached => write!(f, "max_iterations_reached"),
            Self::Translating => write!(f, "translating"),
            Self::Done => write!(f, "done"),
        }
    }
}

// ============================================================================
// Decision / WritingOutcome
// ============================================================================

/// Reviewer verdict on a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The draft is good to go.
    Approved,
    /// The draft needs another revision.
    NeedsImprovement,
}

impl Decision {
    /// Returns `true` for [`Decision::Approved`].
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::NeedsImprovement => write!(f, "needs_improvement"),
        }
    }
}

/// How the writing phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingOutcome {
    /// The reviewer approved a draft.
    Approved,
    /// The iteration bound was reached first.
    MaxIterationsReached,
}

impl From<WritingOutcome> for GenerationStatus {
    fn from(outcome: WritingOutcome) -> Self {
        match outcome {
            WritingOutcome::Approved => Self::Approved,
            WritingOutcome::MaxIterationsReached => Self::MaxIterationsReached,
        }
    }
}

impl std::fmt::Display for WritingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        GenerationStatus::from(*self).fmt(f)
    }
}

// ============================================================================
// FeedbackRecord
// ============================================================================

/// One review, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackRecord {
    iteration: u32,
    decision: Decision,
    comments: String,
    timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Creates a new `FeedbackRecord` with the current timestamp.
    #[must_use]
    pub fn new(iteration: u32, decision: Decision, comments: impl Into<String>) -> Self {
        Self::with_timestamp(iteration, decision, comments, Utc::now())
    }

    /// Creates a new `FeedbackRecord` with an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(
        iteration: u32,
        decision: Decision,
        comments: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            iteration,
            decision,
            comments: comments.into(),
            timestamp,
        }
    }

    /// The iteration this review belongs to.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The reviewer's decision.
    #[must_use]
    pub const fn decision(&self) -> Decision {
        self.decision
    }

    /// Raw review text, or the revision instruction wrapping it.
    #[must_use]
    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// When the review completed.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// ============================================================================
// GenerationState
// ============================================================================

/// Complete state of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationState {
    job_description: String,
    cv: String,
    supporting_documents: Vec<String>,
    draft: String,
    iteration: u32,
    max_iterations: u32,
    feedback: Vec<FeedbackRecord>,
    status: GenerationStatus,
    target_language: Option<String>,
    translated_draft: Option<String>,
    outcome: Option<WritingOutcome>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GenerationState {
    /// Creates a new state in the `Initialized` status.
    ///
    /// # Errors
    ///
    /// Returns `LetterError::ConfigValidationError` if `max_iterations` is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use letterloop_orchestrator::{GenerationState, GenerationStatus};
    ///
    /// let state = GenerationState::new("Rust role", "Jane's CV", Vec::new(), 3).unwrap();
    /// assert_eq!(state.status(), GenerationStatus::Initialized);
    /// assert_eq!(state.iteration(), 0);
    /// assert!(state.feedback().is_empty());
    /// assert!(state.draft().is_empty());
    /// ```
    pub fn new(
        job_description: impl Into<String>,
        cv: impl Into<String>,
        supporting_documents: Vec<String>,
        max_iterations: u32,
    ) -> Result<Self> {
        if max_iterations == 0 {
            return Err(LetterError::config_validation(
                "maxIterations must be at least 1",
                "Pass --max-iterations with a value from 1 to 10",
            ));
        }
        let now = Utc::now();
        Ok(Self {
            job_description: job_description.into(),
            cv: cv.into(),
            supporting_documents,
            draft: String::new(),
            iteration: 0,
            max_iterations,
            feedback: Vec::new(),
            status: GenerationStatus::Initialized,
            target_language: None,
            translated_draft: None,
            outcome: None,
            started_at: now,
            updated_at: now,
        })
    }

    /// Creates a state from loaded materials.
    pub fn from_materials(materials: Materials, max_iterations: u32) -> Result<Self> {
        Self::new(
            materials.job_description.content,
            materials.cv.content,
            materials
                .supporting
                .into_iter()
                .map(|doc| doc.content)
                .collect(),
            max_iterations,
        )
    }

    /// Requests translation of the final draft.
    #[must_use]
    pub fn with_target_language(mut self, language: Option<String>) -> Self {
        self.target_language = language.filter(|code| !code.trim().is_empty());
        self
    }

    /// Job description text.
    #[must_use]
    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    /// CV text.
    #[must_use]
    pub fn cv(&self) -> &str {
        &self.cv
    }

    /// Supporting document texts, in input order.
    #[must_use]
    pub fn supporting_documents(&self) -> &[String] {
        &self.supporting_documents
    }

    /// The most recent draft; empty before the first draft.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Number of write phases started so far.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Iteration bound.
    #[must_use]
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Every review so far, oldest first.
    #[must_use]
    pub fn feedback(&self) -> &[FeedbackRecord] {
        &self.feedback
    }

    /// The most recent review.
    #[must_use]
    pub fn latest_feedback(&self) -> Option<&FeedbackRecord> {
        self.feedback.last()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> GenerationStatus {
        self.status
    }

    /// Requested translation language.
    #[must_use]
    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    /// Translated final draft, once translation succeeded.
    #[must_use]
    pub fn translated_draft(&self) -> Option<&str> {
        self.translated_draft.as_deref()
    }

    /// How the writing phase ended, once it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<WritingOutcome> {
        self.outcome
    }

    /// When the run started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the state last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` once the run has finished.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the duration since the run started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }

    // ------------------------------------------------------------------------
    // Mutation, controller only
    // ------------------------------------------------------------------------

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_status(&mut self, status: GenerationStatus) {
        self.status = status;
        self.touch();
    }

    /// Starts the first write phase, or the next one after a revision.
    pub(crate) fn begin_iteration(&mut self) {
        debug_assert!(self.iteration < self.max_iterations);
        self.iteration += 1;
        self.set_status(GenerationStatus::Writing);
    }

    pub(crate) fn set_draft(&mut self, draft: String) {
        debug_assert!(!draft.trim().is_empty());
        self.draft = draft;
        self.touch();
    }

    pub(crate) fn record_feedback(&mut self, record: FeedbackRecord) {
        self.feedback.push(record);
        self.touch();
    }

    pub(crate) fn finish_writing(&mut self, outcome: WritingOutcome) {
        self.outcome = Some(outcome);
        self.set_status(outcome.into());
    }

    pub(crate) fn set_translation(&mut self, translated: String) {
        self.translated_draft = Some(translated);
        self.touch();
    }
}

// ============================================================================
// Tests
// ============================================================================
