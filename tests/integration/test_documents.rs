//! Integration tests for document loading and input validation.
//!
//! URL fetching runs against a minimal HTTP server on a local port.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use letterloop_llm::{LanguageModel, ModelError, Prompt};
use letterloop_orchestrator::{
    fetch_url, load_document, DocumentFormat, ErrorKind, GenerationState, IterationController,
    LetterError, MaterialSources, ModelSet, PromptTemplates,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(5);

const JOB_PAGE: &str = "<!DOCTYPE html>
<html>
<head><title>Backend Engineer</title><style>body { color: red; }</style></head>
<body>
  <header>Acme Careers</header>
  <nav><a href=\"/\">Home</a> <a href=\"/jobs\">Jobs</a></nav>
  <main>
    <h1>Backend Engineer</h1>
    <p>  Own our storage layer.  </p>
    <ul><li>Rust</li><li>PostgreSQL</li></ul>
  </main>
  <script>trackVisitor();</script>
  <footer>Copyright Acme</footer>
</body>
</html>";

const MINIFIED_JOB_PAGE: &str = "<html><head><title>Platform Engineer</title></head><body><nav><a href=\"/\">Home</a></nav><h1>Platform Engineer</h1><ul><li>Rust</li><li>Kubernetes</li></ul><p>Berlin or remote</p></body></html>";

/// Serves one canned response per connection and counts requests.
async fn serve(status_line: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}/jobs/42"), hits)
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// Model that only counts how often it was called.
#[derive(Default)]
struct CountingModel {
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for CountingModel {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("DECISION: APPROVED".to_string())
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

#[tokio::test]
async fn test_fetch_url_strips_page_chrome() {
    let (url, hits) = serve("200 OK", JOB_PAGE).await;

    let doc = fetch_url(&url, TIMEOUT).await.expect("fetch succeeds");

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(doc.format, DocumentFormat::Html);
    assert_eq!(doc.source, url);
    assert!(doc.content.contains("Backend Engineer"));
    assert!(doc.content.contains("Own our storage layer."));
    assert!(doc.content.contains("PostgreSQL"));
    assert!(!doc.content.contains("trackVisitor"));
    assert!(!doc.content.contains("color: red"));
    assert!(!doc.content.contains("Acme Careers"));
    assert!(!doc.content.contains("Copyright Acme"));
    assert!(!doc.content.contains("Home"));
    assert!(doc.content.lines().all(|line| line == line.trim() && !line.is_empty()));
}

#[tokio::test]
async fn test_fetch_url_splits_minified_markup_into_lines() {
    let (url, _hits) = serve("200 OK", MINIFIED_JOB_PAGE).await;

    let doc = fetch_url(&url, TIMEOUT).await.expect("fetch succeeds");

    assert_eq!(
        doc.content,
        "Platform Engineer\nPlatform Engineer\nRust\nKubernetes\nBerlin or remote"
    );
}

#[tokio::test]
async fn test_fetch_url_not_found_is_fetch_failure() {
    let (url, _hits) = serve("404 Not Found", "<html><body>gone</body></html>").await;

    let err = fetch_url(&url, TIMEOUT).await.expect_err("404 fails");

    assert!(matches!(err, LetterError::FetchFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains(&url));
}

#[tokio::test]
async fn test_materials_load_from_url_and_files() {
    let (url, _hits) = serve("200 OK", JOB_PAGE).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cv = write_file(dir.path(), "cv.md", "# Jane Doe\n\nRust, PostgreSQL.\n");
    let reference = write_file(dir.path(), "reference.txt", "Jane is excellent.\n");

    let sources = MaterialSources {
        job_description: url,
        cv,
        supporting: vec![reference],
    };
    sources.validate().expect("inputs are valid");
    let materials = sources.load(TIMEOUT).await.expect("load succeeds");

    assert_eq!(materials.job_description.format, DocumentFormat::Html);
    assert_eq!(materials.cv.format, DocumentFormat::Markdown);
    assert_eq!(materials.supporting.len(), 1);
    assert_eq!(materials.supporting[0].content.trim(), "Jane is excellent.");
}

/// An unsupported extension is rejected before any model is called.
#[tokio::test]
async fn test_unsupported_extension_stops_before_models() {
    let dir = tempfile::tempdir().expect("tempdir");
    let job = write_file(dir.path(), "job.txt", "Backend Engineer at Acme");
    let cv = write_file(dir.path(), "cv.xyz", "Jane Doe");
    let model = Arc::new(CountingModel::default());

    let sources = MaterialSources {
        job_description: job.display().to_string(),
        cv: cv.clone(),
        supporting: Vec::new(),
    };

    let result: letterloop_orchestrator::Result<GenerationState> = async {
        sources.validate()?;
        let materials = sources.load(TIMEOUT).await?;
        let main: Arc<dyn LanguageModel> = model.clone();
        let controller = IterationController::new(ModelSet::single(main), PromptTemplates::default());
        controller
            .run(GenerationState::from_materials(materials, 3)?)
            .await
    }
    .await;

    let err = result.expect_err("validation fails");
    assert!(err.is_validation());
    assert!(err.to_string().contains("Unsupported file type '.xyz'"));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);

    let direct = load_document(&cv).expect_err("load rejects .xyz");
    assert!(matches!(direct, LetterError::UnsupportedDocumentType { .. }));
}

#[test]
fn test_validation_collects_every_problem() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sources = MaterialSources {
        job_description: dir.path().join("job.txt").display().to_string(),
        cv: dir.path().to_path_buf(),
        supporting: vec![dir.path().join("missing.pdf")],
    };

    let err = sources.validate().expect_err("three problems");
    let LetterError::InvalidInputs { problems } = &err else {
        panic!("expected InvalidInputs, got {err:?}");
    };

    assert_eq!(problems.len(), 3);
    assert!(problems[0].starts_with("Job description file not found"));
    assert!(problems[1].starts_with("CV file is not a file"));
    assert!(problems[2].starts_with("Document not found"));
}

#[test]
fn test_malformed_url_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cv = write_file(dir.path(), "cv.txt", "Jane Doe");
    let sources = MaterialSources {
        job_description: "ftp://example.com/job".to_string(),
        cv,
        supporting: Vec::new(),
    };

    let err = sources.validate().expect_err("ftp is not accepted");
    assert!(err.is_validation());
    assert!(err.to_string().contains("ftp://example.com/job"));
}
