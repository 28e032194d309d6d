//! The iteration controller: the draft/review state machine.
//!
//! [`IterationController::advance`] performs exactly one transition of a
//! [`GenerationState`]; [`IterationController::run`] drives it until the
//! state is `Done`. Iterations run strictly one after another because each
//! revision needs the previous draft and its review.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::{LetterError, Phase, Result};
use crate::events::{
    DraftPayload, IterationPayload, LoopEvent, LoopObserver, NoopObserver, OutcomePayload,
    ReviewPayload, RunStartedPayload, TranslationPayload,
};
use crate::loop_state::{FeedbackRecord, GenerationState, GenerationStatus};
use crate::models::ModelSet;
use crate::prompts::PromptTemplates;
use crate::roles::{
    extract_decision, feedback_comments, format_supporting_documents, generate_draft,
    review_draft, translate, DraftInputs, ReviewInputs, INITIAL_INSTRUCTION, NO_PREVIOUS_DRAFT,
};
use crate::router::{route, Route};

/// Owns the models and templates for a run and moves the state through the
/// loop.
pub struct IterationController {
    models: ModelSet,
    templates: PromptTemplates,
    observer: Arc<dyn LoopObserver>,
}

impl IterationController {
    /// Creates a controller that reports to no one.
    #[must_use]
    pub fn new(models: ModelSet, templates: PromptTemplates) -> Self {
        Self {
            models,
            templates,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Sets the observer that receives loop events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The models this controller uses.
    #[must_use]
    pub const fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Runs the loop to completion.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any phase. The state is dropped, so
    /// no partial draft escapes a failed run.
    #[instrument(skip_all, fields(max_iterations = state.max_iterations()))]
    pub async fn run(&self, mut state: GenerationState) -> Result<GenerationState> {
        while !state.is_done() {
            self.advance(&mut state).await?;
        }
        Ok(state)
    }

    /// Performs one transition.
    ///
    /// Calling this on a finished state does nothing.
    pub async fn advance(&self, state: &mut GenerationState) -> Result<()> {
        match state.status() {
            GenerationStatus::Initialized => {
                info!(
                    max_iterations = state.max_iterations(),
                    target_language = state.target_language().unwrap_or("none"),
                    "Starting cover letter generation"
                );
                self.emit(LoopEvent::RunStarted(RunStartedPayload {
                    max_iterations: state.max_iterations(),
                    model: self.models.main().describe(),
                    target_language: state.target_language().map(str::to_string),
                }));
                self.start_iteration(state);
            }
            GenerationStatus::Writing => {
                let draft = self.write(state).await?;
                state.set_draft(draft);
                self.emit(LoopEvent::DraftGenerated(DraftPayload {
                    iteration: state.iteration(),
                    chars: state.draft().chars().count(),
                }));
                state.set_status(GenerationStatus::Reviewing);
            }
            GenerationStatus::Reviewing => self.review(state).await?,
            GenerationStatus::Revising => self.start_iteration(state),
            GenerationStatus::Approved | GenerationStatus::MaxIterationsReached => {
                if let Some(language) = state.target_language().map(str::to_string) {
                    state.set_status(GenerationStatus::Translating);
                    self.emit(LoopEvent::TranslationStarted(TranslationPayload { language }));
                } else {
                    self.finish(state);
                }
            }
            GenerationStatus::Translating => {
                self.translate(state).await?;
                self.finish(state);
            }
            GenerationStatus::Done => {}
        }
        Ok(())
    }

    fn start_iteration(&self, state: &mut GenerationState) {
        state.begin_iteration();
        info!(
            iteration = state.iteration(),
            max_iterations = state.max_iterations(),
            "Writing draft"
        );
        self.emit(LoopEvent::IterationStarted(IterationPayload {
            iteration: state.iteration(),
            max_iterations: state.max_iterations(),
        }));
    }

    async fn write(&self, state: &GenerationState) -> Result<String> {
        let supporting = format_supporting_documents(state.supporting_documents());
        let (feedback, previous_draft) = match state.latest_feedback() {
            Some(record) => (record.comments(), state.draft()),
            None => (INITIAL_INSTRUCTION, NO_PREVIOUS_DRAFT),
        };

        let inputs = DraftInputs {
            job_description: state.job_description(),
            cv: state.cv(),
            supporting_documents: &supporting,
            feedback,
            previous_draft,
        };
        generate_draft(self.models.main(), &self.templates.writer, &inputs)
            .await
            .map_err(|e| LetterError::model(Phase::Writing, e))
    }

    async fn review(&self, state: &mut GenerationState) -> Result<()> {
        let supporting = format_supporting_documents(state.supporting_documents());
        let inputs = ReviewInputs {
            job_description: state.job_description(),
            cv: state.cv(),
            supporting_documents: &supporting,
            draft: state.draft(),
        };
        let review = review_draft(self.models.main(), &self.templates.reviewer, &inputs)
            .await
            .map_err(|e| LetterError::model(Phase::Reviewing, e))?;

        let iteration = state.iteration();
        let decision = extract_decision(&review);
        state.record_feedback(FeedbackRecord::new(
            iteration,
            decision,
            feedback_comments(decision, &review),
        ));
        info!(iteration, %decision, "Review completed");
        self.emit(LoopEvent::ReviewCompleted(ReviewPayload {
            iteration,
            decision,
        }));

        match route(decision, iteration, state.max_iterations()) {
            Route::Finish(outcome) => {
                state.finish_writing(outcome);
                if !decision.is_approved() {
                    warn!(
                        iterations = iteration,
                        "Iteration limit reached without approval, keeping the latest draft"
                    );
                }
                self.emit(LoopEvent::WritingFinished(OutcomePayload {
                    outcome,
                    iterations: iteration,
                }));
            }
            Route::Revise => state.set_status(GenerationStatus::Revising),
        }
        Ok(())
    }

    async fn translate(&self, state: &mut GenerationState) -> Result<()> {
        let Some(language) = state.target_language().map(str::to_string) else {
            return Ok(());
        };
        info!(
            %language,
            model = %self.models.translation().describe(),
            "Translating final draft"
        );
        let translated = translate(
            self.models.translation(),
            &self.templates.translator,
            state.draft(),
            &language,
        )
        .await
        .map_err(|e| LetterError::model(Phase::Translating, e))?;

        state.set_translation(translated);
        self.emit(LoopEvent::TranslationCompleted(TranslationPayload { language }));
        Ok(())
    }

    fn finish(&self, state: &mut GenerationState) {
        state.set_status(GenerationStatus::Done);
        if let Some(outcome) = state.outcome() {
            info!(
                %outcome,
                iterations = state.iteration(),
                reviews = state.feedback().len(),
                "Generation finished"
            );
            self.emit(LoopEvent::RunCompleted(OutcomePayload {
                outcome,
                iterations: state.iteration(),
            }));
        }
    }

    fn emit(&self, event: LoopEvent) {
        self.observer.on_event(&event);
    }
}
