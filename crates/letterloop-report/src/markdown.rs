//! Markdown feedback history for a finished run.
//!
//! The document has a summary table, one section per review with the
//! reviewer's comments verbatim, and the event timeline.
//!
//! # Example
//!
//! ```rust
//! use letterloop_report::{MarkdownGenerator, RunReport};
//!
//! let report = RunReport {
//!     output_name: "cover_letter.md".to_string(),
//!     ..RunReport::default()
//! };
//!
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.starts_with("# Cover Letter Feedback: cover_letter.md"));
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{FeedbackEntry, RunReport, TimelineEntry};

/// Renders a [`RunReport`] as the feedback history document.
pub struct MarkdownGenerator<'a> {
    report: &'a RunReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a RunReport) -> Self {
        Self { report }
    }

    /// Generates the complete document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_feedback(&mut output);
        self.write_timeline(&mut output);
        Self::write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Cover Letter Feedback: {}\n",
            self.report.output_name
        );
    }

    /// Writes the summary section with metrics table.
    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Outcome | {} |", summary.status.description());
        let _ = writeln!(
            output,
            "| Iterations | {} of {} |",
            summary.iterations, summary.max_iterations
        );
        let _ = writeln!(output, "| Reviews | {} |", self.report.review_count());
        let _ = writeln!(
            output,
            "| Duration | {} |",
            format_duration(summary.duration_seconds)
        );
        if !summary.model.is_empty() {
            let _ = writeln!(output, "| Model | {} |", escape_table_cell(&summary.model));
        }
        let translation = summary
            .target_language
            .as_deref()
            .map_or_else(|| "None".to_string(), escape_table_cell);
        let _ = writeln!(output, "| Translation | {translation} |");
        let _ = writeln!(
            output,
            "| Final Draft | {} characters |",
            summary.draft_chars
        );
        let _ = writeln!(output);
    }

    /// Writes one section per review.
    fn write_feedback(&self, output: &mut String) {
        let _ = writeln!(output, "## Feedback History\n");

        if self.report.feedback.is_empty() {
            let _ = writeln!(output, "*No reviews recorded.*\n");
            return;
        }

        for entry in &self.report.feedback {
            Self::write_feedback_entry(output, entry);
        }
    }

    fn write_feedback_entry(output: &mut String, entry: &FeedbackEntry) {
        let _ = writeln!(
            output,
            "### Iteration {}: {}\n",
            entry.iteration,
            entry.decision.label()
        );
        let _ = writeln!(
            output,
            "*Reviewed at {}*\n",
            format_timestamp(&entry.timestamp)
        );

        let comments = entry.comments.trim();
        if comments.is_empty() {
            let _ = writeln!(output, "*No comments.*\n");
        } else {
            let _ = writeln!(output, "{comments}\n");
        }
    }

    /// Writes the timeline section.
    fn write_timeline(&self, output: &mut String) {
        let _ = writeln!(output, "## Timeline\n");

        if self.report.timeline.is_empty() {
            let _ = writeln!(output, "*No timeline events recorded.*\n");
            return;
        }

        let _ = writeln!(output, "| Time | Event | Details |");
        let _ = writeln!(output, "|------|-------|---------|");

        for entry in &self.report.timeline {
            Self::write_timeline_entry(output, entry);
        }

        let _ = writeln!(output);
    }

    fn write_timeline_entry(output: &mut String, entry: &TimelineEntry) {
        let details = entry
            .details
            .as_deref()
            .map(escape_table_cell)
            .unwrap_or_default();

        let time = format_timestamp(&entry.timestamp);
        let event = escape_table_cell(&entry.event);
        let _ = writeln!(output, "| {time} | {event} | {details} |");
    }

    fn write_footer(output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&Utc::now());
        let _ = writeln!(output, "*Generated by LetterLoop at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a duration in seconds to a human-readable string.
///
/// Examples:
/// - 65 seconds -> "1m 5s"
/// - 3661 seconds -> "1h 1m 1s"
/// - 45 seconds -> "45s"
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Keeps pipes and line breaks from splitting a table row.
fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace("\r\n", "<br>").replace('\n', "<br>")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{ReportStatus, ReviewDecision, RunSummary};
    use chrono::TimeZone;

    fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, second).unwrap()
    }

    fn sample_report() -> RunReport {
        RunReport {
            output_name: "cover_letter.md".to_string(),
            summary: RunSummary {
                status: ReportStatus::Approved,
                iterations: 2,
                max_iterations: 3,
                duration_seconds: 65,
                model: "anthropic/claude-sonnet-4-5 (temperature 0.7)".to_string(),
                target_language: Some("de".to_string()),
                draft_chars: 1834,
            },
            feedback: vec![
                FeedbackEntry {
                    iteration: 1,
                    decision: ReviewDecision::NeedsImprovement,
                    comments: "Open with the team's mission.\nCut the second paragraph.".to_string(),
                    timestamp: at(30, 0),
                },
                FeedbackEntry {
                    iteration: 2,
                    decision: ReviewDecision::Approved,
                    comments: "Ready to send.".to_string(),
                    timestamp: at(31, 5),
                },
            ],
            timeline: vec![
                TimelineEntry::new(at(29, 40), "run_started"),
                TimelineEntry::new(at(30, 0), "review_completed")
                    .with_details("iteration 1 | needs_improvement"),
            ],
        }
    }

    #[test]
    fn test_feedback_history_rendering() {
        let report = sample_report();
        let mut output = String::new();
        MarkdownGenerator::new(&report).write_feedback(&mut output);

        insta::assert_snapshot!(output, @r"
        ## Feedback History

        ### Iteration 1: Needs improvement

        *Reviewed at 2026-03-01 09:30:00 UTC*

        Open with the team's mission.
        Cut the second paragraph.

        ### Iteration 2: Approved

        *Reviewed at 2026-03-01 09:31:05 UTC*

        Ready to send.
        ");
    }

    #[test]
    fn test_generate_contains_title_and_summary() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        assert!(markdown.starts_with("# Cover Letter Feedback: cover_letter.md\n"));
        assert!(markdown.contains("| Outcome | Approved by reviewer |"));
        assert!(markdown.contains("| Iterations | 2 of 3 |"));
        assert!(markdown.contains("| Reviews | 2 |"));
        assert!(markdown.contains("| Duration | 1m 5s |"));
        assert!(markdown.contains("| Translation | de |"));
        assert!(markdown.contains("| Final Draft | 1834 characters |"));
    }

    #[test]
    fn test_generate_contains_timeline() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        assert!(markdown.contains("| Time | Event | Details |"));
        assert!(markdown.contains("| 2026-03-01 09:29:40 UTC | run_started |  |"));
        assert!(markdown.contains("iteration 1 \\| needs_improvement"));
    }

    #[test]
    fn test_generate_contains_footer() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();
        assert!(markdown.contains("*Generated by LetterLoop at "));
    }

    #[test]
    fn test_empty_report_sections() {
        let report = RunReport {
            output_name: "letter.md".to_string(),
            ..RunReport::default()
        };
        let markdown = MarkdownGenerator::new(&report).generate();

        assert!(markdown.contains("*No reviews recorded.*"));
        assert!(markdown.contains("*No timeline events recorded.*"));
        assert!(markdown.contains("| Translation | None |"));
        assert!(!markdown.contains("| Model |"));
    }

    #[test]
    fn test_blank_comments_are_marked() {
        let mut report = sample_report();
        report.feedback[1].comments = "  \n".to_string();
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("*No comments.*"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
        assert_eq!(format_duration(3600), "1h");
    }

    #[test]
    fn test_escape_table_cell() {
        assert_eq!(escape_table_cell("a|b"), "a\\|b");
        assert_eq!(escape_table_cell("a\nb"), "a<br>b");
        assert_eq!(escape_table_cell("a\r\nb"), "a<br>b");
    }
}
