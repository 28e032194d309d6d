//! End-to-end tests for the draft/review loop.
//!
//! The loop runs against scripted models that answer per role, so every
//! scenario is deterministic and needs no network access or API keys.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use letterloop_llm::{LanguageModel, ModelError, Prompt, Provider};
use letterloop_orchestrator::prompts::{REVIEWER_SYSTEM, TRANSLATOR_SYSTEM, WRITER_SYSTEM};
use letterloop_orchestrator::{
    Decision, EventLog, GenerationState, GenerationStatus, IterationController, LoopObserver,
    ModelSet, Phase, PromptTemplates, WritingOutcome,
};
use letterloop_report::{
    write_artifacts, ArtifactNaming, ArtifactPaths, ReportStatus, RunReport, RunSummary,
};

const APPROVE: &str = "Specific and well structured.\nDECISION: APPROVED";
const REVISE: &str = "needs improvement, please revise\nDECISION: NEEDS IMPROVEMENT";

/// Answers by role and counts calls per role.
struct StubModel {
    name: &'static str,
    reviews: Mutex<VecDeque<String>>,
    fallback_review: String,
    translation: Option<String>,
    calls: Mutex<Vec<&'static str>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl StubModel {
    fn new(name: &'static str, reviews: &[&str], fallback_review: &str) -> Self {
        Self {
            name,
            reviews: Mutex::new(reviews.iter().map(ToString::to_string).collect()),
            fallback_review: fallback_review.to_string(),
            translation: None,
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn always(review: &str) -> Self {
        Self::new("main", &[], review)
    }

    fn translating(mut self, translation: &str) -> Self {
        self.translation = Some(translation.to_string());
        self
    }

    fn count(&self, role: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|r| **r == role)
            .count()
    }

    fn prompts_for(&self, system: &str) -> Vec<Prompt> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .iter()
            .filter(|p| p.system == system)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        self.prompts.lock().expect("prompts lock").push(prompt.clone());

        if prompt.system == WRITER_SYSTEM {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push("writer");
            let n = calls.iter().filter(|r| **r == "writer").count();
            return Ok(format!("Here is the cover letter:\n\nDear Hiring Manager, draft {n}."));
        }

        if prompt.system == REVIEWER_SYSTEM {
            self.calls.lock().expect("calls lock").push("reviewer");
            let scripted = self.reviews.lock().expect("reviews lock").pop_front();
            return Ok(scripted.unwrap_or_else(|| self.fallback_review.clone()));
        }

        if prompt.system == TRANSLATOR_SYSTEM {
            self.calls.lock().expect("calls lock").push("translator");
            return self.translation.clone().ok_or(ModelError::Api {
                status: 503,
                message: "translator offline".to_string(),
            });
        }

        Err(ModelError::EmptyContent)
    }

    fn describe(&self) -> String {
        format!("stub/{}", self.name)
    }
}

fn new_state(max_iterations: u32) -> GenerationState {
    GenerationState::new(
        "Acme is hiring a backend engineer to own its storage layer.",
        "Jane Doe. Eight years building databases in Rust.",
        vec!["Reference letter from Initech.".to_string()],
        max_iterations,
    )
    .expect("valid state")
}

fn controller(models: ModelSet) -> IterationController {
    IterationController::new(models, PromptTemplates::default())
}

fn single(model: &Arc<StubModel>) -> ModelSet {
    let main: Arc<dyn LanguageModel> = model.clone();
    ModelSet::single(main)
}

fn report_for(state: &GenerationState) -> RunReport {
    let status = match state.outcome() {
        Some(WritingOutcome::Approved) => ReportStatus::Approved,
        _ => ReportStatus::MaxIterationsReached,
    };
    RunReport::builder()
        .output_name("cover_letter.md")
        .summary(RunSummary {
            status,
            iterations: state.iteration(),
            max_iterations: state.max_iterations(),
            target_language: state.target_language().map(str::to_string),
            draft_chars: state.draft().chars().count(),
            ..RunSummary::default()
        })
        .build()
        .expect("valid report")
}

fn write_run(state: &GenerationState, output: &Path) -> ArtifactPaths {
    let paths = ArtifactPaths::derive(output, state.target_language(), &ArtifactNaming::default());
    write_artifacts(
        &paths,
        state.draft(),
        state.translated_draft(),
        &report_for(state),
    )
    .expect("artifacts written");
    paths
}

/// An always-approving reviewer finishes after the first draft.
#[tokio::test]
async fn test_approved_round_trip() {
    let model = Arc::new(StubModel::always(APPROVE));

    let state = controller(single(&model))
        .run(new_state(3))
        .await
        .expect("run succeeds");

    assert_eq!(state.status(), GenerationStatus::Done);
    assert_eq!(state.outcome(), Some(WritingOutcome::Approved));
    assert_eq!(state.iteration(), 1);
    assert_eq!(state.feedback().len(), 1);
    assert_eq!(state.feedback()[0].decision(), Decision::Approved);
    assert_eq!(state.draft(), "Dear Hiring Manager, draft 1.");
    assert_eq!(model.count("writer"), 1);
    assert_eq!(model.count("reviewer"), 1);
    assert_eq!(model.count("translator"), 0);
}

/// A reviewer that never approves stops the loop at the cap.
#[tokio::test]
async fn test_cap_reached_without_approval() {
    let model = Arc::new(StubModel::always(REVISE));

    let state = controller(single(&model))
        .run(new_state(2))
        .await
        .expect("run succeeds");

    assert_eq!(state.outcome(), Some(WritingOutcome::MaxIterationsReached));
    assert_eq!(state.iteration(), 2);
    assert_eq!(model.count("writer"), 2);
    assert_eq!(model.count("reviewer"), 2);
    assert_eq!(state.feedback().len(), 2);
    assert_eq!(state.draft(), "Dear Hiring Manager, draft 2.");
}

/// Approval on the last allowed iteration still counts as approval.
#[tokio::test]
async fn test_approval_on_final_iteration() {
    let model = Arc::new(StubModel::new("main", &[REVISE, REVISE, APPROVE], REVISE));

    let state = controller(single(&model))
        .run(new_state(3))
        .await
        .expect("run succeeds");

    assert_eq!(state.iteration(), 3);
    assert_eq!(state.outcome(), Some(WritingOutcome::Approved));
    assert_eq!(state.feedback().last().map(|f| f.decision()), Some(Decision::Approved));
}

/// Revisions see the previous draft and the reviewer's comments.
#[tokio::test]
async fn test_revision_prompt_carries_feedback() {
    let model = Arc::new(StubModel::new("main", &[REVISE], APPROVE));

    controller(single(&model))
        .run(new_state(3))
        .await
        .expect("run succeeds");

    let writer_prompts = model.prompts_for(WRITER_SYSTEM);
    assert_eq!(writer_prompts.len(), 2);
    assert!(writer_prompts[0].user.contains("This is the initial draft."));
    assert!(writer_prompts[1].user.contains("please revise"));
    assert!(writer_prompts[1].user.contains("Dear Hiring Manager, draft 1."));
    assert!(writer_prompts[1].user.contains("Document 1:\nReference letter from Initech."));
}

/// After N write phases the iteration counter is N, and after N reviews
/// the history holds N entries.
#[tokio::test]
async fn test_counters_track_phases() {
    let model = Arc::new(StubModel::always(REVISE));
    let controller = controller(single(&model));
    let mut state = new_state(4);

    while !state.is_done() {
        controller.advance(&mut state).await.expect("step succeeds");
        if state.status() == GenerationStatus::Reviewing {
            assert_eq!(state.iteration() as usize, model.count("writer"));
        }
        assert_eq!(state.feedback().len(), model.count("reviewer"));
    }

    assert_eq!(state.iteration(), 4);
    assert_eq!(state.feedback().len(), 4);
}

/// Translation writes both the original and the translated draft.
#[tokio::test]
async fn test_translation_writes_both_drafts() {
    let main = Arc::new(StubModel::always(APPROVE));
    let translator = Arc::new(StubModel::always(APPROVE).translating("Sehr geehrte Damen und Herren,"));
    let main_dyn: Arc<dyn LanguageModel> = main.clone();
    let translator_dyn: Arc<dyn LanguageModel> = translator.clone();
    let models = ModelSet::with_translation(main_dyn, Ok(translator_dyn));

    let state = controller(models)
        .run(new_state(3).with_target_language(Some("de".to_string())))
        .await
        .expect("run succeeds");

    assert_eq!(state.translated_draft(), Some("Sehr geehrte Damen und Herren,"));
    assert_eq!(main.count("translator"), 0);
    assert_eq!(translator.count("translator"), 1);
    assert!(translator.prompts_for(TRANSLATOR_SYSTEM)[0].user.contains("'de'"));

    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("cover_letter.md");
    let paths = write_run(&state, &output);

    let original = std::fs::read_to_string(&output).expect("draft written");
    assert_eq!(original, "Dear Hiring Manager, draft 1.\n");
    let translated_path = dir.path().join("cover_letter_de.md");
    assert_eq!(paths.translated.as_deref(), Some(translated_path.as_path()));
    let translated = std::fs::read_to_string(&translated_path).expect("translation written");
    assert_eq!(translated, "Sehr geehrte Damen und Herren,\n");
    assert!(dir.path().join("cover_letter_feedback.md").exists());
    assert!(dir.path().join("cover_letter_run.json").exists());
}

/// Without a target language no translated artifact appears.
#[tokio::test]
async fn test_no_translation_without_target() {
    let model = Arc::new(StubModel::always(APPROVE).translating("unused"));

    let state = controller(single(&model))
        .run(new_state(3))
        .await
        .expect("run succeeds");

    assert_eq!(state.translated_draft(), None);
    assert_eq!(model.count("translator"), 0);

    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_run(&state, &dir.path().join("cover_letter.md"));
    assert_eq!(paths.translated, None);

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["cover_letter.md", "cover_letter_feedback.md", "cover_letter_run.json"]
    );
}

/// A translation model that fails to initialize is replaced by the main model.
#[tokio::test]
async fn test_translation_model_init_failure_falls_back() {
    let main = Arc::new(StubModel::always(APPROVE).translating("Madame, Monsieur,"));
    let main_dyn: Arc<dyn LanguageModel> = main.clone();
    let models = ModelSet::with_translation(
        main_dyn,
        Err(ModelError::MissingApiKey {
            provider: Provider::OpenAi,
            variable: "OPENAI_API_KEY".to_string(),
        }),
    );
    assert!(!models.has_dedicated_translation());

    let state = controller(models)
        .run(new_state(2).with_target_language(Some("fr".to_string())))
        .await
        .expect("run succeeds");

    assert_eq!(state.translated_draft(), Some("Madame, Monsieur,"));
    assert_eq!(main.count("translator"), 1);
}

/// A failing translation call aborts the run with the translation phase.
#[tokio::test]
async fn test_translation_call_failure_aborts() {
    let model = Arc::new(StubModel::always(APPROVE));

    let err = controller(single(&model))
        .run(new_state(2).with_target_language(Some("it".to_string())))
        .await
        .expect_err("translation fails");

    assert_eq!(err.phase(), Some(Phase::Translating));
    assert!(err.to_string().starts_with("Translation failed"));
}

/// Observers see the run in order.
#[tokio::test]
async fn test_event_log_records_run() {
    let model = Arc::new(StubModel::new("main", &[REVISE], APPROVE));
    let log = Arc::new(EventLog::new());
    let observer: Arc<dyn LoopObserver> = log.clone();

    controller(single(&model))
        .with_observer(observer)
        .run(new_state(3))
        .await
        .expect("run succeeds");

    let names: Vec<&str> = log.snapshot().iter().map(|e| e.event.name()).collect();
    assert_eq!(
        names,
        vec![
            "run_started",
            "iteration_started",
            "draft_generated",
            "review_completed",
            "iteration_started",
            "draft_generated",
            "review_completed",
            "writing_finished",
            "run_completed",
        ]
    );
}
