//! LetterLoop Orchestrator
//!
//! Loads the candidate's materials and runs the write, review, revise loop
//! that produces a cover letter, with optional translation at the end.

pub mod config;
pub mod controller;
pub mod documents;
pub mod error;
pub mod events;
pub mod loop_state;
pub mod models;
pub mod prompts;
pub mod roles;
pub mod router;
pub mod sanitize;

pub use config::{validate_language_code, Config, OutputConfig, CONFIG_FILE_NAME};
pub use controller::IterationController;
pub use documents::{
    fetch_url, html_to_text, is_url, load_document, load_source, Document, DocumentFormat,
    MaterialSources, Materials, MAX_DOCUMENT_SIZE, SUPPORTED_EXTENSIONS,
};
pub use error::{ErrorKind, LetterError, Phase, Result};
pub use events::{EventLog, LoopEvent, LoopObserver, NoopObserver, Observers, TimedEvent};
pub use loop_state::{
    Decision, FeedbackRecord, GenerationState, GenerationStatus, WritingOutcome,
};
pub use models::ModelSet;
pub use prompts::{PromptTemplates, RoleTemplate};
pub use roles::{
    extract_decision, feedback_comments, format_supporting_documents, generate_draft,
    review_draft, translate,
};
pub use router::{route, Route};
pub use sanitize::sanitize;
