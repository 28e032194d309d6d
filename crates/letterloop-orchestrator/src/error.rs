//! Error types for the LetterLoop orchestrator.
//!
//! Errors fall into four kinds (see [`ErrorKind`]): validation problems that
//! stop a run before it starts, I/O failures while loading documents, model
//! invocation failures during the loop, and configuration problems. Most
//! variants carry a suggestion the CLI prints alongside the message.

use std::path::PathBuf;

use letterloop_llm::ModelError;

/// A specialized `Result` type for LetterLoop orchestrator operations.
pub type Result<T> = std::result::Result<T, LetterError>;

/// Errors that can occur while preparing or running a generation loop.
#[derive(Debug, thiserror::Error)]
pub enum LetterError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your letterloop.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The main model could not be initialized.
    #[error("Model initialization failed for {model}: {source}\n\nSuggestion: Check the model settings and that the API key is exported (a .env file is also read)")]
    ModelUnavailable {
        /// Description of the model that failed.
        model: String,
        /// Underlying error.
        #[source]
        source: ModelError,
    },

    // ========================================================================
    // Input Validation Errors
    // ========================================================================
    /// One or more inputs failed validation. Every problem is listed.
    #[error("Input validation failed:\n{}", format_problems(.problems))]
    InvalidInputs {
        /// Individual problems, in the order they were found.
        problems: Vec<String>,
    },

    /// Document file was not found at the specified path.
    #[error("Document not found: '{path}'\n\nSuggestion: Check the path or create the file")]
    DocumentNotFound {
        /// Path where the document was expected.
        path: PathBuf,
    },

    /// Document extension is not one of the supported formats.
    #[error("Unsupported file type '{extension}' for '{path}'. Supported types: {supported}")]
    UnsupportedDocumentType {
        /// Path to the rejected document.
        path: PathBuf,
        /// The extension that was found (may be empty).
        extension: String,
        /// Comma-separated list of supported extensions.
        supported: String,
    },

    /// Document exceeds the size limit.
    #[error("Document exceeds size limit ({limit_kb}KB): '{path}' is {size_kb}KB\n\nSuggestion: Trim the document or export only the relevant pages")]
    DocumentTooLarge {
        /// Path to the oversized document.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
        /// Limit in kilobytes.
        limit_kb: u64,
    },

    /// A URL was malformed or lacked a scheme or host.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Target language code is not usable.
    #[error("Invalid target language '{code}'\n\nSuggestion: Use a language code such as 'de', 'fr' or 'pt-BR'")]
    InvalidLanguage {
        /// The rejected code.
        code: String,
    },

    // ========================================================================
    // Document I/O Errors
    // ========================================================================
    /// A document exists but could not be read or extracted.
    #[error("Failed to read document '{path}': {message}")]
    DocumentRead {
        /// Path to the document.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Fetching a URL failed (network error or non-2xx status).
    #[error("Failed to fetch '{url}': {message}\n\nSuggestion: Check the URL and your network connection, or save the page to a file")]
    FetchFailed {
        /// The URL that was fetched.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Model Invocation Errors
    // ========================================================================
    /// A model call failed during one of the loop phases.
    #[error("{phase} failed: {source}")]
    ModelInvocation {
        /// The phase that issued the call.
        phase: Phase,
        /// Underlying model error, unchanged.
        #[source]
        source: ModelError,
    },
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|problem| format!("  - {problem}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Loop phase that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Loading the job description, CV and supporting documents.
    Loading,
    /// Generating or revising a draft.
    Writing,
    /// Reviewing a draft.
    Reviewing,
    /// Translating the final draft.
    Translating,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Document loading"),
            Self::Writing => write!(f, "Draft generation"),
            Self::Reviewing => write!(f, "Review"),
            Self::Translating => write!(f, "Translation"),
        }
    }
}

/// Broad error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape; the run never starts.
    Validation,
    /// File or network failure while loading inputs.
    Io,
    /// A model invocation failed mid-run.
    Model,
    /// Configuration could not be loaded or applied.
    Configuration,
}

impl LetterError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `DocumentNotFound` error.
    #[must_use]
    pub fn document_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DocumentNotFound { path: path.into() }
    }

    /// Creates a new `DocumentRead` error.
    #[must_use]
    pub fn document_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DocumentRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidUrl` error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `FetchFailed` error.
    #[must_use]
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Wraps a model error with the phase that produced it.
    #[must_use]
    pub const fn model(phase: Phase, source: ModelError) -> Self {
        Self::ModelInvocation { phase, source }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInputs { .. }
            | Self::DocumentNotFound { .. }
            | Self::UnsupportedDocumentType { .. }
            | Self::DocumentTooLarge { .. }
            | Self::InvalidUrl { .. }
            | Self::InvalidLanguage { .. } => ErrorKind::Validation,
            Self::DocumentRead { .. } | Self::FetchFailed { .. } | Self::Io(_) => ErrorKind::Io,
            Self::ModelInvocation { .. } => ErrorKind::Model,
            Self::ConfigParseError { .. }
            | Self::ConfigValidationError { .. }
            | Self::ModelUnavailable { .. } => ErrorKind::Configuration,
        }
    }

    /// Returns `true` if the run was rejected before it started.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation)
    }

    /// Returns the phase a model invocation failed in, if any.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::ModelInvocation { phase, .. } => Some(*phase),
            Self::DocumentRead { .. } | Self::FetchFailed { .. } | Self::Io(_) => {
                Some(Phase::Loading)
            }
            _ => None,
        }
    }
}
