//! LetterLoop CLI
//!
//! Drafts a cover letter from a job description and a CV, revising it with a
//! reviewer until the draft is approved or the iteration bound is reached.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use letterloop_llm::{ModelSettings, Provider};
use letterloop_orchestrator::{
    validate_language_code, Config, Decision, EventLog, GenerationState, IterationController,
    LoopEvent, LoopObserver, MaterialSources, Materials, ModelSet, Observers, PromptTemplates,
    TimedEvent, WritingOutcome,
};
use letterloop_report::{
    write_artifacts, ArtifactNaming, ArtifactPaths, FeedbackEntry, ReportStatus, ReviewDecision,
    RunReport, RunSummary, TimelineEntry,
};
use tracing_subscriber::EnvFilter;

/// Default path of the final draft.
const DEFAULT_OUTPUT: &str = "cover_letter.md";

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// LetterLoop - Cover Letter Writer
///
/// Writes a cover letter tailored to a job description, has a reviewer
/// critique it, and revises until the reviewer approves. Optionally
/// translates the final draft.
#[derive(Parser, Debug)]
#[command(name = "letterloop")]
#[command(version, about, long_about = None)]
struct Args {
    /// Job description: a local file or an http(s) URL
    #[arg(short = 'j', long, value_name = "SOURCE")]
    job_description: String,

    /// Path to the CV (.txt, .md or .pdf)
    #[arg(short = 'c', long, value_name = "CV")]
    cv: PathBuf,

    /// Supporting documents such as references or certificates
    #[arg(short = 'd', long = "documents", value_name = "DOC", num_args = 1..)]
    documents: Vec<PathBuf>,

    /// Path of the final draft
    #[arg(short, long, value_name = "OUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Maximum number of write/review cycles (1-10)
    #[arg(
        short = 'm',
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=10)
    )]
    max_iterations: Option<u32>,

    /// Translate the final draft into this language (e.g. de, fr, pt-BR)
    #[arg(short = 't', long = "translate", value_name = "LANG")]
    translate: Option<String>,

    /// Path to configuration file (default: letterloop.json in current directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model for writing and reviewing, as MODEL or PROVIDER/MODEL
    #[arg(long, value_name = "ID")]
    model: Option<String>,

    /// Model for translation, as MODEL or PROVIDER/MODEL
    #[arg(long, value_name = "ID")]
    translation_model: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

/// How a run ended when it did not fail.
enum RunOutcome {
    Completed,
    Interrupted,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose {
            "letterloop=debug"
        } else {
            "letterloop=info"
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, output = %args.output.display(), "LetterLoop starting");

    let result = run(args).await;
    match &result {
        Ok(RunOutcome::Completed) => {}
        Ok(RunOutcome::Interrupted) => {
            eprintln!();
            eprintln!("Process interrupted by user.");
        }
        Err(e) => eprintln!("Error: {e:#}"),
    }
    ExitCode::from(exit_status(&result))
}

/// Maps the result of a run to the process exit status.
fn exit_status(result: &anyhow::Result<RunOutcome>) -> u8 {
    match result {
        Ok(RunOutcome::Completed) => EXIT_SUCCESS,
        Ok(RunOutcome::Interrupted) => EXIT_INTERRUPTED,
        Err(_) => EXIT_FAILURE,
    }
}

/// Runs one LetterLoop invocation.
///
/// 1. Load environment and configuration, apply CLI overrides
/// 2. Validate every input before anything is read
/// 3. Load documents, build models, run the loop (interruptible)
/// 4. Write the draft and its side artifacts
async fn run(args: Args) -> anyhow::Result<RunOutcome> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let target_language = args.translate.as_deref().map(str::trim).map(str::to_string);
    if let Some(language) = &target_language {
        validate_language_code(language)?;
    }

    let sources = MaterialSources {
        job_description: args.job_description.clone(),
        cv: args.cv.clone(),
        supporting: args.documents.clone(),
    };
    sources.validate()?;

    print_config(&config, &args);

    let log = Arc::new(EventLog::new());
    let pipeline = run_pipeline(&config, &sources, target_language, Arc::clone(&log));

    let state = tokio::select! {
        result = pipeline => result?,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
            return Ok(RunOutcome::Interrupted);
        }
    };

    let naming = ArtifactNaming {
        feedback_suffix: config.outputs.feedback_suffix.clone(),
        summary_suffix: config.outputs.summary_suffix.clone(),
        write_summary: config.outputs.write_run_summary,
    };
    let paths = ArtifactPaths::derive(&args.output, state.target_language(), &naming);
    let report = build_report(&state, &args.output, config.model.to_string(), &log.snapshot())?;

    let written = write_artifacts(&paths, state.draft(), state.translated_draft(), &report)
        .context("Failed to write output files")?;

    print_summary(&state, &report, &written);
    Ok(RunOutcome::Completed)
}

/// Loads documents, builds the models and drives the loop to completion.
async fn run_pipeline(
    config: &Config,
    sources: &MaterialSources,
    target_language: Option<String>,
    log: Arc<EventLog>,
) -> anyhow::Result<GenerationState> {
    let models = ModelSet::from_config(config)?;
    if models.has_dedicated_translation() {
        tracing::debug!(model = %models.translation().describe(), "Dedicated translation model");
    }

    let templates = match &config.prompts_dir {
        Some(dir) => PromptTemplates::load_overrides(dir)?,
        None => PromptTemplates::default(),
    };

    println!();
    println!("Loading documents...");
    let materials = sources
        .load(Duration::from_secs(config.fetch_timeout_secs))
        .await
        .context("Document loading failed")?;
    print_materials(&materials);

    let state = GenerationState::from_materials(materials, config.max_iterations)?
        .with_target_language(target_language);

    let observers = Observers::new()
        .with(Arc::new(ConsoleObserver))
        .with(log);
    let controller =
        IterationController::new(models, templates).with_observer(Arc::new(observers));

    Ok(controller.run(state).await?)
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<Config> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(Config::load_from_file(path)?)
        }
        None => Ok(Config::load()?),
    }
}

/// Applies CLI flags on top of file configuration.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(id) = &args.model {
        apply_model_id(&mut config.model, id);
    }
    if let Some(id) = &args.translation_model {
        let mut settings = config
            .translation_model
            .clone()
            .unwrap_or_else(|| config.model.clone());
        apply_model_id(&mut settings, id);
        config.translation_model = Some(settings);
    }
}

/// Sets the model from `MODEL` or `PROVIDER/MODEL`.
///
/// Switching provider drops provider-specific endpoint and key overrides.
fn apply_model_id(settings: &mut ModelSettings, id: &str) {
    let provider_and_model = id
        .split_once('/')
        .and_then(|(prefix, model)| Provider::from_str_case_insensitive(prefix).map(|p| (p, model)));

    match provider_and_model {
        Some((provider, model)) => {
            if provider != settings.provider {
                settings.provider = provider;
                settings.base_url = None;
                settings.api_key_env = None;
            }
            settings.model = Some(model.to_string());
        }
        None => settings.model = Some(id.to_string()),
    }
}

fn print_config(config: &Config, args: &Args) {
    println!("Configuration loaded:");
    println!("  Job description: {}", args.job_description);
    println!("  CV: {}", args.cv.display());
    println!("  Supporting documents: {}", args.documents.len());
    println!("  Output: {}", args.output.display());
    println!("  Model: {}", config.model);
    if let Some(translation) = &config.translation_model {
        println!("  Translation model: {translation}");
    }
    println!("  Max iterations: {}", config.max_iterations);
    if let Some(language) = &args.translate {
        println!("  Translate to: {language}");
    }
}

fn print_materials(materials: &Materials) {
    println!(
        "  Job description: {} characters",
        materials.job_description.char_count()
    );
    println!("  CV: {} characters", materials.cv.char_count());
    for doc in &materials.supporting {
        tracing::debug!(
            source = %doc.source,
            format = ?doc.format,
            chars = doc.char_count(),
            "Supporting document loaded"
        );
    }
}

/// Prints loop progress to the console.
struct ConsoleObserver;

impl LoopObserver for ConsoleObserver {
    fn on_event(&self, event: &LoopEvent) {
        match event {
            LoopEvent::RunStarted(payload) => {
                println!();
                println!("Starting LetterLoop with {}", payload.model);
            }
            LoopEvent::IterationStarted(payload) => {
                println!(
                    "Iteration {}/{}: writing draft...",
                    payload.iteration, payload.max_iterations
                );
            }
            LoopEvent::DraftGenerated(payload) => {
                println!("  Draft ready ({} characters), reviewing...", payload.chars);
            }
            LoopEvent::ReviewCompleted(payload) => {
                if payload.decision.is_approved() {
                    println!("  Reviewer approved the draft");
                } else {
                    println!("  Reviewer requested improvements");
                }
            }
            LoopEvent::TranslationStarted(payload) => {
                println!("Translating final draft to {}...", payload.language);
            }
            LoopEvent::TranslationCompleted(_) => println!("  Translation ready"),
            LoopEvent::WritingFinished(_) | LoopEvent::RunCompleted(_) => {}
        }
    }
}

/// Prints a summary of the finished run.
fn print_summary(state: &GenerationState, report: &RunReport, written: &[PathBuf]) {
    println!();
    println!("=== LetterLoop Summary ===");
    println!("Status: {}", report.summary.status);
    println!(
        "Iterations: {} of {}",
        state.iteration(),
        state.max_iterations()
    );

    let elapsed = state.elapsed();
    println!(
        "Duration: {}m {}s",
        elapsed.num_minutes(),
        elapsed.num_seconds() % 60
    );

    println!("Files written:");
    for path in written {
        println!("  {}", path.display());
    }

    if !report.summary.status.is_success() {
        println!();
        println!(
            "Note: the reviewer did not approve any draft within {} iterations. \
             The last draft was saved; see the feedback history for what to improve.",
            state.max_iterations()
        );
    }
}

/// Builds the run report from the final state and the recorded events.
fn build_report(
    state: &GenerationState,
    output: &Path,
    model: String,
    events: &[TimedEvent],
) -> anyhow::Result<RunReport> {
    let status = match state.outcome() {
        Some(WritingOutcome::Approved) => ReportStatus::Approved,
        Some(WritingOutcome::MaxIterationsReached) => ReportStatus::MaxIterationsReached,
        None => anyhow::bail!("run finished without a writing outcome"),
    };

    let feedback = state
        .feedback()
        .iter()
        .map(|record| FeedbackEntry {
            iteration: record.iteration(),
            decision: convert_decision(record.decision()),
            comments: record.comments().to_string(),
            timestamp: record.timestamp(),
        })
        .collect();

    let summary = RunSummary {
        status,
        iterations: state.iteration(),
        max_iterations: state.max_iterations(),
        duration_seconds: u64::try_from(state.elapsed().num_seconds()).unwrap_or(0),
        model,
        target_language: state.target_language().map(str::to_string),
        draft_chars: state.draft().chars().count(),
    };

    let output_name = output.file_name().map_or_else(
        || output.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );

    Ok(RunReport::builder()
        .output_name(output_name)
        .summary(summary)
        .feedback(feedback)
        .timeline(events.iter().map(convert_event).collect())
        .build()?)
}

/// Converts a `Decision` to `ReviewDecision`.
const fn convert_decision(decision: Decision) -> ReviewDecision {
    match decision {
        Decision::Approved => ReviewDecision::Approved,
        Decision::NeedsImprovement => ReviewDecision::NeedsImprovement,
    }
}

/// Converts a recorded event to a timeline row.
fn convert_event(timed: &TimedEvent) -> TimelineEntry {
    let details = match &timed.event {
        LoopEvent::RunStarted(p) => format!("{}, up to {} iterations", p.model, p.max_iterations),
        LoopEvent::IterationStarted(p) => format!("iteration {} of {}", p.iteration, p.max_iterations),
        LoopEvent::DraftGenerated(p) => format!("iteration {}, {} characters", p.iteration, p.chars),
        LoopEvent::ReviewCompleted(p) => format!("iteration {}, {}", p.iteration, p.decision),
        LoopEvent::WritingFinished(p) | LoopEvent::RunCompleted(p) => {
            format!("{} after {} iterations", p.outcome, p.iterations)
        }
        LoopEvent::TranslationStarted(p) | LoopEvent::TranslationCompleted(p) => {
            p.language.clone()
        }
    };
    TimelineEntry::new(timed.timestamp, timed.event.name()).with_details(details)
}
