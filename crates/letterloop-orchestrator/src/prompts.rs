//! Prompt templates for the writer, reviewer and translator roles.
//!
//! Templates are plain text with `{placeholder}` markers. The built-in
//! defaults can be replaced per role by dropping `writer.md`, `reviewer.md`
//! or `translator.md` into the configured prompts directory.

use std::path::Path;

use letterloop_llm::Prompt;
use tracing::info;

use crate::error::{LetterError, Result};

/// Writer role instructions.
pub const WRITER_SYSTEM: &str = "You are an experienced career coach and professional writer. \
    You write concise, specific cover letters that connect a candidate's real experience to \
    the needs of a particular role. You never invent qualifications that are not supported by \
    the candidate's materials.";

/// Writer task. Placeholders: `job_description`, `cv`, `supporting_documents`,
/// `feedback`, `previous_draft`.
pub const WRITER_TEMPLATE: &str = "\
Write a cover letter for the job below.

## Job description
{job_description}

## Candidate CV
{cv}

## Supporting documents
{supporting_documents}

## Instructions
{feedback}

## Previous draft
{previous_draft}

Requirements:
- Address the most important requirements of the job with concrete evidence from the CV.
- Keep it to one page: an opening, two or three body paragraphs and a closing.
- Use a professional, confident tone without cliches.
- Return only the cover letter in Markdown. No preamble, no code fences, no commentary.";

/// Reviewer role instructions.
pub const REVIEWER_SYSTEM: &str = "You are a demanding hiring manager reviewing cover letters. \
    You judge whether a letter would convince you to interview the candidate, and you give \
    precise, actionable feedback when it would not.";

/// Reviewer task. Placeholders: `job_description`, `cv`, `supporting_documents`,
/// `draft`.
pub const REVIEWER_TEMPLATE: &str = "\
Review the cover letter draft below against the job description and the candidate's materials.

## Job description
{job_description}

## Candidate CV
{cv}

## Supporting documents
{supporting_documents}

## Draft
{draft}

Evaluate the draft on:
1. Relevance: does it address the key requirements of the role?
2. Evidence: are claims backed by the CV, with nothing invented?
3. Structure and length: clear opening, focused body, strong closing, at most one page.
4. Tone and language: professional, specific, free of errors and filler.

List concrete strengths and concrete changes. End your review with exactly one line:
DECISION: APPROVED
or
DECISION: NEEDS IMPROVEMENT";

/// Translator role instructions.
pub const TRANSLATOR_SYSTEM: &str = "You are a professional translator specialising in \
    business correspondence. You preserve meaning, tone and formatting, and adapt salutations \
    and closings to the conventions of the target language.";

/// Translator task. Placeholders: `draft`, `language`.
pub const TRANSLATOR_TEMPLATE: &str = "\
Translate the following cover letter into the language with code '{language}'.

{draft}

Keep the Markdown structure. Return only the translated letter, with no preamble and no code fences.";

/// System instructions plus task template for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTemplate {
    /// System instructions.
    pub system: String,
    /// Task template with `{placeholder}` markers.
    pub user: String,
}

impl RoleTemplate {
    /// Creates a role template.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Renders the task template into a prompt.
    #[must_use]
    pub fn prompt(&self, values: &[(&str, &str)]) -> Prompt {
        Prompt::new(self.system.clone(), render(&self.user, values))
    }
}

/// Templates for all three roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    /// Draft generation.
    pub writer: RoleTemplate,
    /// Draft review.
    pub reviewer: RoleTemplate,
    /// Final translation.
    pub translator: RoleTemplate,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            writer: RoleTemplate::new(WRITER_SYSTEM, WRITER_TEMPLATE),
            reviewer: RoleTemplate::new(REVIEWER_SYSTEM, REVIEWER_TEMPLATE),
            translator: RoleTemplate::new(TRANSLATOR_SYSTEM, TRANSLATOR_TEMPLATE),
        }
    }
}

impl PromptTemplates {
    /// Loads defaults, replacing each role's task template with the matching
    /// file from `dir` when present.
    ///
    /// # Errors
    ///
    /// Returns `LetterError::ConfigValidationError` if `dir` is not a
    /// directory, and `LetterError::DocumentRead` if an override exists but
    /// cannot be read.
    pub fn load_overrides(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(LetterError::config_validation(
                format!("promptsDir '{}' is not a directory", dir.display()),
                "Point promptsDir at a folder containing writer.md, reviewer.md or translator.md",
            ));
        }

        let mut templates = Self::default();
        for (name, role) in [
            ("writer.md", &mut templates.writer),
            ("reviewer.md", &mut templates.reviewer),
            ("translator.md", &mut templates.translator),
        ] {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            role.user = std::fs::read_to_string(&path)
                .map_err(|e| LetterError::document_read(&path, e.to_string()))?;
            info!(template = name, "Using prompt override");
        }
        Ok(templates)
    }
}

/// Substitutes `{name}` markers in a single pass.
///
/// Unknown markers are left as they are, and text coming from a value is
/// never scanned for further markers.
#[must_use]
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replacement = after.find('}').and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        if let Some((value, end)) = replacement {
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_known_markers() {
        let out = render(
            "Job: {job}\nCV: {cv}",
            &[("job", "Rust engineer"), ("cv", "Ten years")],
        );
        assert_eq!(out, "Job: Rust engineer\nCV: Ten years");
    }

    #[test]
    fn test_render_keeps_unknown_markers_and_braces() {
        let out = render("{unknown} {job} {", &[("job", "x")]);
        assert_eq!(out, "{unknown} x {");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let out = render("{draft} / {cv}", &[("draft", "uses {cv}"), ("cv", "CV")]);
        assert_eq!(out, "uses {cv} / CV");
    }

    #[test]
    fn test_default_templates_mention_every_placeholder() {
        let templates = PromptTemplates::default();
        for marker in [
            "{job_description}",
            "{cv}",
            "{supporting_documents}",
            "{feedback}",
            "{previous_draft}",
        ] {
            assert!(templates.writer.user.contains(marker), "writer lacks {marker}");
        }
        assert!(templates.reviewer.user.contains("{draft}"));
        assert!(templates.reviewer.user.contains("DECISION: APPROVED"));
        assert!(templates.translator.user.contains("{language}"));
    }

    #[test]
    fn test_role_template_prompt() {
        let role = RoleTemplate::new("system text", "Translate to {language}");
        let prompt = role.prompt(&[("language", "de")]);
        assert_eq!(prompt.system, "system text");
        assert_eq!(prompt.user, "Translate to de");
    }

    #[test]
    fn test_load_overrides_replaces_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("reviewer.md"), "Custom review of {draft}").unwrap();

        let templates = PromptTemplates::load_overrides(dir.path()).unwrap();
        assert_eq!(templates.reviewer.user, "Custom review of {draft}");
        assert_eq!(templates.reviewer.system, REVIEWER_SYSTEM);
        assert_eq!(templates.writer, PromptTemplates::default().writer);
    }

    #[test]
    fn test_load_overrides_missing_dir() {
        let err = PromptTemplates::load_overrides(Path::new("/nonexistent/prompts")).unwrap_err();
        assert!(matches!(err, LetterError::ConfigValidationError { .. }));
    }
}
