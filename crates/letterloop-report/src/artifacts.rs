//! Output artifact paths and writing.
//!
//! Every artifact path is derived from the final draft's path: the
//! translated draft gets a language suffix, the feedback history and run
//! summary get configurable suffixes and fixed extensions.
//!
//! ```
//! use std::path::Path;
//! use letterloop_report::{ArtifactNaming, ArtifactPaths};
//!
//! let paths = ArtifactPaths::derive(
//!     Path::new("out/cover_letter.md"),
//!     Some("de"),
//!     &ArtifactNaming::default(),
//! );
//! assert_eq!(paths.translated.unwrap(), Path::new("out/cover_letter_de.md"));
//! assert_eq!(paths.feedback, Path::new("out/cover_letter_feedback.md"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::json::JsonGenerator;
use crate::{MarkdownGenerator, ReportError, Result, RunReport};

const DEFAULT_STEM: &str = "cover_letter";
const DEFAULT_EXTENSION: &str = "md";

/// Suffixes used to name the side artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    /// Appended to the draft stem for the feedback history.
    pub feedback_suffix: String,
    /// Appended to the draft stem for the run summary.
    pub summary_suffix: String,
    /// Whether to write the run summary at all.
    pub write_summary: bool,
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self {
            feedback_suffix: "_feedback".to_string(),
            summary_suffix: "_run".to_string(),
            write_summary: true,
        }
    }
}

/// Where each artifact of a run goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// The final draft.
    pub draft: PathBuf,
    /// The translated draft, when a target language was requested.
    pub translated: Option<PathBuf>,
    /// The feedback history document.
    pub feedback: PathBuf,
    /// The JSON run summary, unless disabled.
    pub summary: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Derives all artifact paths from the draft path.
    #[must_use]
    pub fn derive(output: &Path, translate_to: Option<&str>, naming: &ArtifactNaming) -> Self {
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STEM);
        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        let sibling = |name: String| output.with_file_name(name);

        Self {
            draft: output.to_path_buf(),
            translated: translate_to.map(|lang| sibling(format!("{stem}_{lang}.{extension}"))),
            feedback: sibling(format!("{stem}{}.md", naming.feedback_suffix)),
            summary: naming
                .write_summary
                .then(|| sibling(format!("{stem}{}.json", naming.summary_suffix))),
        }
    }
}

/// Writes every artifact of a finished run and returns the paths written.
///
/// Parent directories are created as needed. The inputs are checked before
/// anything touches the filesystem, so a mismatch writes nothing.
///
/// # Errors
///
/// Returns `ReportError::InvalidData` when a translated path is set without
/// a translation or the other way round, and `ReportError::Io` or
/// `ReportError::Serialization` if writing fails.
pub fn write_artifacts(
    paths: &ArtifactPaths,
    draft: &str,
    translated: Option<&str>,
    report: &RunReport,
) -> Result<Vec<PathBuf>> {
    let translation = match (&paths.translated, translated) {
        (Some(path), Some(text)) => Some((path, text)),
        (None, None) => None,
        (Some(path), None) => {
            return Err(ReportError::InvalidData(format!(
                "no translation available for {}",
                path.display()
            )));
        }
        (None, Some(_)) => {
            return Err(ReportError::InvalidData(
                "translation produced without a target path".to_string(),
            ));
        }
    };

    if let Some(parent) = paths.draft.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut written = Vec::new();

    write_text(&paths.draft, draft)?;
    written.push(paths.draft.clone());

    if let Some((path, text)) = translation {
        write_text(path, text)?;
        written.push(path.clone());
    }

    write_text(&paths.feedback, &MarkdownGenerator::new(report).generate())?;
    written.push(paths.feedback.clone());

    if let Some(path) = &paths.summary {
        JsonGenerator::new(report).write_to_file(path, true)?;
        debug!(path = %path.display(), "Wrote run summary");
        written.push(path.clone());
    }

    info!(count = written.len(), "Artifacts written");
    Ok(written)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    let mut contents = text.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    fs::write(path, contents)?;
    debug!(path = %path.display(), bytes = text.len(), "Wrote artifact");
    Ok(())
}
