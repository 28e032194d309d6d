//! The three model-backed roles: writer, reviewer and translator.
//!
//! Each role is one async function that renders its template, makes exactly
//! one model call and returns text. None of them touch the generation state;
//! the controller decides what to do with the result.

use letterloop_llm::{LanguageModel, ModelError};
use tracing::debug;

use crate::loop_state::Decision;
use crate::prompts::RoleTemplate;
use crate::sanitize::sanitize;

/// Instruction given to the writer for the first draft.
pub const INITIAL_INSTRUCTION: &str =
    "This is the initial draft. Please create a compelling cover letter.";

/// Previous-draft placeholder for the first draft.
pub const NO_PREVIOUS_DRAFT: &str = "No previous draft.";

/// Placeholder used when no supporting documents were given.
pub const NO_SUPPORTING_DOCUMENTS: &str = "No additional documents provided.";

/// Sentence that opens a revision instruction.
pub const REVISION_LEAD_IN: &str = "Based on the review, please improve the draft:";

/// Inputs for one draft generation.
#[derive(Debug, Clone, Copy)]
pub struct DraftInputs<'a> {
    /// Job description text.
    pub job_description: &'a str,
    /// CV text.
    pub cv: &'a str,
    /// Rendered supporting documents, see [`format_supporting_documents`].
    pub supporting_documents: &'a str,
    /// Bootstrap instruction or latest feedback comments.
    pub feedback: &'a str,
    /// Current draft, or [`NO_PREVIOUS_DRAFT`].
    pub previous_draft: &'a str,
}

/// Inputs for one review.
#[derive(Debug, Clone, Copy)]
pub struct ReviewInputs<'a> {
    /// Job description text.
    pub job_description: &'a str,
    /// CV text.
    pub cv: &'a str,
    /// Rendered supporting documents.
    pub supporting_documents: &'a str,
    /// The draft under review.
    pub draft: &'a str,
}

/// Generates a draft and sanitizes it.
///
/// # Errors
///
/// Model errors are returned unchanged. A draft that is empty after
/// sanitizing is reported as `ModelError::EmptyContent`.
pub async fn generate_draft(
    model: &dyn LanguageModel,
    template: &RoleTemplate,
    inputs: &DraftInputs<'_>,
) -> Result<String, ModelError> {
    let prompt = template.prompt(&[
        ("job_description", inputs.job_description),
        ("cv", inputs.cv),
        ("supporting_documents", inputs.supporting_documents),
        ("feedback", inputs.feedback),
        ("previous_draft", inputs.previous_draft),
    ]);
    debug!(prompt_chars = prompt.user.len(), "Requesting draft");
    non_empty(sanitize(&model.generate(&prompt).await?))
}

/// Reviews a draft and returns the raw evaluation text.
pub async fn review_draft(
    model: &dyn LanguageModel,
    template: &RoleTemplate,
    inputs: &ReviewInputs<'_>,
) -> Result<String, ModelError> {
    let prompt = template.prompt(&[
        ("job_description", inputs.job_description),
        ("cv", inputs.cv),
        ("supporting_documents", inputs.supporting_documents),
        ("draft", inputs.draft),
    ]);
    debug!(prompt_chars = prompt.user.len(), "Requesting review");
    model.generate(&prompt).await
}

/// Translates the final draft and sanitizes the result.
pub async fn translate(
    model: &dyn LanguageModel,
    template: &RoleTemplate,
    draft: &str,
    language: &str,
) -> Result<String, ModelError> {
    let prompt = template.prompt(&[("draft", draft), ("language", language)]);
    debug!(language, "Requesting translation");
    non_empty(sanitize(&model.generate(&prompt).await?))
}

fn non_empty(text: String) -> Result<String, ModelError> {
    if text.is_empty() {
        Err(ModelError::EmptyContent)
    } else {
        Ok(text)
    }
}

/// Reads the decision marker out of a review.
///
/// Matches `DECISION: APPROVED` or `DECISION:APPROVED` anywhere in the text,
/// ignoring case. Anything else means the draft needs improvement.
#[must_use]
pub fn extract_decision(review: &str) -> Decision {
    let upper = review.to_uppercase();
    if upper.contains("DECISION: APPROVED") || upper.contains("DECISION:APPROVED") {
        Decision::Approved
    } else {
        Decision::NeedsImprovement
    }
}

/// Builds the comments stored for a review.
///
/// Approved reviews are kept verbatim. Other reviews become a revision
/// instruction for the writer: [`REVISION_LEAD_IN`], a blank line, then the
/// full review.
#[must_use]
pub fn feedback_comments(decision: Decision, review: &str) -> String {
    match decision {
        Decision::Approved => review.to_string(),
        Decision::NeedsImprovement => format!("{REVISION_LEAD_IN}\n\n{review}"),
    }
}

/// Renders supporting documents as numbered blocks.
#[must_use]
pub fn format_supporting_documents(documents: &[String]) -> String {
    if documents.is_empty() {
        return NO_SUPPORTING_DOCUMENTS.to_string();
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("Document {}:\n{doc}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}
