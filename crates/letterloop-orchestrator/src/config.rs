//! Configuration types for LetterLoop.
//!
//! Configuration comes from an optional `letterloop.json` file (camelCase
//! keys, every field defaulted). CLI flags are applied on top by the binary
//! and the result is checked with [`Config::validate`].

use std::path::{Path, PathBuf};

use letterloop_llm::ModelSettings;
use serde::{Deserialize, Serialize};

use crate::error::{LetterError, Result};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "letterloop.json";

/// Smallest accepted iteration bound.
pub const MIN_ITERATIONS: u32 = 1;

/// Largest accepted iteration bound.
pub const MAX_ITERATIONS: u32 = 10;

/// Default maximum write/review cycles.
const fn default_max_iterations() -> u32 {
    3
}

/// Default timeout for job-posting fetches.
const fn default_fetch_timeout() -> u64 {
    30
}

fn default_feedback_suffix() -> String {
    "_feedback".to_string()
}

fn default_summary_suffix() -> String {
    "_run".to_string()
}

const fn default_true() -> bool {
    true
}

/// Main configuration for a LetterLoop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Maximum number of write/review cycles.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Model used for writing and reviewing.
    #[serde(default)]
    pub model: ModelSettings,

    /// Dedicated translation model. The main model is used when absent or
    /// when this one fails to initialize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_model: Option<ModelSettings>,

    /// Timeout in seconds for fetching a job description URL.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Naming of the files written next to the draft.
    #[serde(default)]
    pub outputs: OutputConfig,

    /// Directory holding prompt template overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            model: ModelSettings::default(),
            translation_model: None,
            fetch_timeout_secs: default_fetch_timeout(),
            outputs: OutputConfig::default(),
            prompts_dir: None,
        }
    }
}

/// Output file naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Suffix appended to the draft's stem for the feedback history file.
    #[serde(default = "default_feedback_suffix")]
    pub feedback_suffix: String,

    /// Suffix appended to the draft's stem for the JSON run summary.
    #[serde(default = "default_summary_suffix")]
    pub summary_suffix: String,

    /// Whether to write the JSON run summary at all.
    #[serde(default = "default_true")]
    pub write_run_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            feedback_suffix: default_feedback_suffix(),
            summary_suffix: default_summary_suffix(),
            write_run_summary: default_true(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `letterloop.json` in the current directory. If not found,
    /// returns default configuration.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            LetterError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `letterloop.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `LetterError::ConfigParseError` if the file exists but contains
    /// invalid JSON or invalid enum values, and
    /// `LetterError::ConfigValidationError` if the values are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(LetterError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| LetterError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `LetterError::ConfigValidationError` for the first failing check.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.max_iterations) {
            return Err(LetterError::config_validation(
                format!(
                    "maxIterations must be between {MIN_ITERATIONS} and {MAX_ITERATIONS}, got {}",
                    self.max_iterations
                ),
                "Max iterations cannot exceed 10 (to prevent excessive API usage); set maxIterations to a value from 1 to 10",
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(LetterError::config_validation(
                "fetchTimeoutSecs must be greater than 0",
                "Set fetchTimeoutSecs to at least 1 second in your letterloop.json",
            ));
        }

        validate_model("model", &self.model)?;
        if let Some(translation) = &self.translation_model {
            validate_model("translationModel", translation)?;
        }

        if self.outputs.feedback_suffix.trim().is_empty() {
            return Err(LetterError::config_validation(
                "outputs.feedbackSuffix must not be empty",
                "Use a suffix such as \"_feedback\" so the history does not overwrite the draft",
            ));
        }

        if self.outputs.summary_suffix.trim().is_empty() {
            return Err(LetterError::config_validation(
                "outputs.summarySuffix must not be empty",
                "Use a suffix such as \"_run\" or disable outputs.writeRunSummary",
            ));
        }

        Ok(())
    }
}

fn validate_model(field: &str, settings: &ModelSettings) -> Result<()> {
    if !(0.0..=2.0).contains(&settings.temperature) {
        return Err(LetterError::config_validation(
            format!("{field}.temperature must be between 0.0 and 2.0"),
            format!("Set {field}.temperature to a value such as 0.7 in your letterloop.json"),
        ));
    }
    if settings.max_tokens == 0 {
        return Err(LetterError::config_validation(
            format!("{field}.maxTokens must be greater than 0"),
            format!("Set {field}.maxTokens to at least 1024 in your letterloop.json"),
        ));
    }
    if settings.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
        return Err(LetterError::config_validation(
            format!("{field}.model must not be empty"),
            format!("Remove {field}.model to use the provider default, or name a model"),
        ));
    }
    Ok(())
}

/// Validates a target language code such as `de`, `fr` or `pt-BR`.
///
/// # Errors
///
/// Returns `LetterError::InvalidLanguage` if the code is empty, too long or
/// contains anything but ASCII letters and hyphens.
pub fn validate_language_code(code: &str) -> Result<()> {
    let trimmed = code.trim();
    let well_formed = (2..=16).contains(&trimmed.len())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '-' || c == '_')
        && !trimmed.starts_with(['-', '_'])
        && !trimmed.ends_with(['-', '_']);
    if well_formed {
        Ok(())
    } else {
        Err(LetterError::InvalidLanguage {
            code: code.to_string(),
        })
    }
}
