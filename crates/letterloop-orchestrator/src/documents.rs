//! Document loading for the draft/review loop.
//!
//! Turns the job description source (file path or URL), the CV and any
//! supporting documents into plain text. Plain text and Markdown are read
//! verbatim, PDFs are extracted page by page and web pages are stripped down
//! to their visible text.

use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{LetterError, Result};

/// Maximum allowed document size in bytes (20MB).
pub const MAX_DOCUMENT_SIZE: u64 = 20 * 1024 * 1024;

/// Extensions accepted for file documents.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".txt", ".text", ".md", ".markdown", ".pdf"];

/// User agent sent when fetching job postings.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Elements whose text never reaches the extracted output.
const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header"];

/// Format a document's text was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Plain text file.
    Text,
    /// Markdown file.
    Markdown,
    /// PDF file.
    Pdf,
    /// Web page fetched over HTTP.
    Html,
}

impl DocumentFormat {
    /// Detects a file format from an extension, with or without the dot.
    ///
    /// Returns `None` for anything that is not a supported file type. HTML is
    /// only produced by URL fetches and is never matched here.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detects a file format from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
            Self::Pdf => write!(f, "pdf"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Extracted text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Path or URL the text was loaded from.
    pub source: String,
    /// Format the text was extracted from.
    pub format: DocumentFormat,
    /// Extracted plain text.
    pub content: String,
}

impl Document {
    /// Number of characters of extracted text.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Returns true if the reference parses as a URL with both scheme and host.
#[must_use]
pub fn is_url(reference: &str) -> bool {
    parse_url(reference).is_ok()
}

fn parse_url(reference: &str) -> Result<Url> {
    let url = Url::parse(reference.trim())
        .map_err(|e| LetterError::invalid_url(reference, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LetterError::invalid_url(
            reference,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(LetterError::invalid_url(reference, "missing host"));
    }
    Ok(url)
}

fn unsupported(path: &Path) -> LetterError {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    LetterError::UnsupportedDocumentType {
        path: path.to_path_buf(),
        extension,
        supported: SUPPORTED_EXTENSIONS.join(", "),
    }
}

/// Loads a document from a file.
///
/// # Errors
///
/// Returns `LetterError::UnsupportedDocumentType` for unknown extensions,
/// `LetterError::DocumentNotFound` if the file doesn't exist,
/// `LetterError::DocumentTooLarge` above [`MAX_DOCUMENT_SIZE`], and
/// `LetterError::DocumentRead` if the path is not a file or its content
/// cannot be decoded.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_document(path: &Path) -> Result<Document> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| unsupported(path))?;

    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LetterError::document_not_found(path)
        } else {
            LetterError::document_read(path, e.to_string())
        }
    })?;

    if !metadata.is_file() {
        return Err(LetterError::document_read(path, "path is not a file"));
    }

    let size = metadata.len();
    if size > MAX_DOCUMENT_SIZE {
        return Err(LetterError::DocumentTooLarge {
            path: path.to_path_buf(),
            size_kb: size / 1024,
            limit_kb: MAX_DOCUMENT_SIZE / 1024,
        });
    }

    let content = match format {
        DocumentFormat::Pdf => {
            let bytes = std::fs::read(path)?;
            let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| LetterError::document_read(path, format!("PDF extraction failed: {e}")))?;
            join_pages(pages)
        }
        DocumentFormat::Text | DocumentFormat::Markdown | DocumentFormat::Html => {
            std::fs::read_to_string(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::InvalidData {
                    LetterError::document_read(path, "file is not valid UTF-8")
                } else {
                    LetterError::document_read(path, e.to_string())
                }
            })?
        }
    };

    debug!(%format, chars = content.chars().count(), "Loaded document");
    Ok(Document {
        source: path.display().to_string(),
        format,
        content,
    })
}

/// Joins extracted PDF pages with a blank line, dropping pages without text.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .filter_map(|page| {
            let page = page.as_ref().trim();
            (!page.is_empty()).then(|| page.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fetches a web page and returns its visible text.
///
/// # Errors
///
/// Returns `LetterError::InvalidUrl` for malformed URLs and
/// `LetterError::FetchFailed` for network failures or non-2xx responses.
#[instrument(skip(timeout))]
pub async fn fetch_url(url: &str, timeout: Duration) -> Result<Document> {
    let parsed = parse_url(url)?;

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LetterError::fetch_failed(url, e.to_string()))?;

    let response = client
        .get(parsed)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| LetterError::fetch_failed(url, e.to_string()))?;

    let body = response
        .text()
        .await
        .map_err(|e| LetterError::fetch_failed(url, e.to_string()))?;

    let content = html_to_text(&body);
    info!(chars = content.chars().count(), "Fetched job posting");
    Ok(Document {
        source: url.to_string(),
        format: DocumentFormat::Html,
        content,
    })
}

/// Extracts visible text from an HTML page.
///
/// Text inside `script`, `style`, `nav`, `footer` and `header` elements is
/// dropped. Every remaining text node starts a new line; lines are trimmed
/// and empty ones removed.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| STRIPPED_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push('\n');
        }
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Loads a job description from either a URL or a file path.
pub async fn load_source(reference: &str, timeout: Duration) -> Result<Document> {
    if is_url(reference) {
        fetch_url(reference, timeout).await
    } else {
        load_document(Path::new(reference))
    }
}

/// Where the run's inputs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSources {
    /// Job description file path or URL.
    pub job_description: String,
    /// Path to the CV.
    pub cv: PathBuf,
    /// Paths to supporting documents, in order.
    pub supporting: Vec<PathBuf>,
}

/// Loaded inputs, ready for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materials {
    /// The job description.
    pub job_description: Document,
    /// The CV.
    pub cv: Document,
    /// Supporting documents, in input order.
    pub supporting: Vec<Document>,
}

impl MaterialSources {
    /// Checks every input up front and reports all problems together.
    ///
    /// No file content is read here; only existence, kind and extension
    /// are checked. URLs are accepted as job description sources without
    /// being contacted.
    ///
    /// # Errors
    ///
    /// Returns `LetterError::InvalidInputs` listing each problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !is_url(&self.job_description) {
            let path = Path::new(&self.job_description);
            if looks_like_url(&self.job_description) {
                if let Err(e) = parse_url(&self.job_description) {
                    problems.push(e.to_string());
                }
            } else {
                check_file("Job description file", path, &mut problems);
            }
        }

        check_file("CV file", &self.cv, &mut problems);
        for doc in &self.supporting {
            check_file("Document", doc, &mut problems);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LetterError::InvalidInputs { problems })
        }
    }

    /// Loads every input. Stops at the first failure.
    pub async fn load(&self, fetch_timeout: Duration) -> Result<Materials> {
        let job_description = load_source(&self.job_description, fetch_timeout).await?;
        let cv = load_document(&self.cv)?;
        let supporting = self
            .supporting
            .iter()
            .map(|path| load_document(path))
            .collect::<Result<Vec<_>>>()?;

        info!(
            job_description_chars = job_description.char_count(),
            cv_chars = cv.char_count(),
            supporting = supporting.len(),
            "Loaded candidate materials"
        );
        Ok(Materials {
            job_description,
            cv,
            supporting,
        })
    }
}

/// Something with an explicit scheme separator that did not pass [`is_url`].
fn looks_like_url(reference: &str) -> bool {
    reference.contains("://")
}

fn check_file(label: &str, path: &Path, problems: &mut Vec<String>) {
    if !path.exists() {
        problems.push(format!("{label} not found: {}", path.display()));
    } else if !path.is_file() {
        problems.push(format!("{label} is not a file: {}", path.display()));
    } else if DocumentFormat::from_path(path).is_none() {
        problems.push(unsupported(path).to_string());
    }
}
