//! Cleanup of generated text.
//!
//! Models like to wrap letters in code fences or open with "Here is your
//! cover letter:". [`sanitize`] removes both so the draft on disk is just the
//! letter.

use once_cell::sync::Lazy;
use regex::Regex;

const FENCE: &str = "```";

/// Lead-in sentence at the very start of the text: up through the first colon
/// on that line, or the whole line when it ends in "cover letter".
static LEAD_IN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?im)\A(?:here is|here's|here’s|below is|the following is)(?:[^\n:]*:|[^\n]*cover letter[.!]?[ \t]*$)\s*",
    )
    .ok()
});

/// Lead-in line anywhere in the text that announces the cover letter itself.
static LEAD_IN_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?im)^(?:here is|here's|here’s|below is|the following is)[^\n]*cover letter[.!:]?[ \t\r]*(?:\n|$)",
    )
    .ok()
});

/// Removes code-fence wrappers and lead-in phrases, then trims.
///
/// The result is a fixed point: `sanitize(&sanitize(x)) == sanitize(x)`.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = sanitize_once(&current);
        // Every pass that changes the text makes it shorter.
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_once(text: &str) -> String {
    let unfenced = strip_code_fence(text.trim());
    let stripped = match LEAD_IN.as_ref() {
        Some(re) => re.replace(unfenced, ""),
        None => unfenced.into(),
    };
    let stripped = match LEAD_IN_LINE.as_ref() {
        Some(re) => re.replace_all(&stripped, "").into_owned(),
        None => stripped.into_owned(),
    };
    stripped.trim().to_string()
}

/// Strips a surrounding fence, its language tag and the newlines hugging it.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_suffix(FENCE))
    else {
        return text;
    };

    let inner = match inner.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag.trim_end()) => body,
        _ => inner,
    };
    inner.trim_end_matches(['\n', '\r'])
}

fn is_language_tag(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_trimmed_only() {
        assert_eq!(sanitize("  Dear Hiring Manager,\n\nThanks.  \n"), "Dear Hiring Manager,\n\nThanks.");
    }

    #[test]
    fn test_strips_markdown_fence() {
        let raw = "```markdown\nDear Hiring Manager,\n\nI am applying.\n```";
        assert_eq!(sanitize(raw), "Dear Hiring Manager,\n\nI am applying.");
    }

    #[test]
    fn test_strips_bare_fence() {
        assert_eq!(sanitize("```\nDear team,\n\n```"), "Dear team,");
    }

    #[test]
    fn test_fence_without_newline_keeps_first_line() {
        assert_eq!(sanitize("```Dear team, hello.```"), "Dear team, hello.");
    }

    #[test]
    fn test_strips_lead_in_up_to_colon() {
        let raw = "Here is the revised cover letter:\n\nDear Hiring Manager,\nBody.";
        assert_eq!(sanitize(raw), "Dear Hiring Manager,\nBody.");

        let raw = "Below is my draft: Dear Ms. Smith,";
        assert_eq!(sanitize(raw), "Dear Ms. Smith,");

        let raw = "THE FOLLOWING IS the letter you asked for:\nDear team,";
        assert_eq!(sanitize(raw), "Dear team,");
    }

    #[test]
    fn test_strips_lead_in_line_ending_in_cover_letter() {
        let raw = "Here's your tailored cover letter\n\nDear Hiring Manager,";
        assert_eq!(sanitize(raw), "Dear Hiring Manager,");
    }

    #[test]
    fn test_lead_in_inside_body_is_kept() {
        let raw = "Dear team,\nHere is what I bring: ten years of Rust.";
        assert_eq!(sanitize(raw), raw);

        let raw = "Dear team,\nHere is why this cover letter matters: I ship.";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn test_strips_cover_letter_line_after_first_line() {
        let raw = "Dear team,\nHere is my cover letter:\nI build storage engines.";
        assert_eq!(sanitize(raw), "Dear team,\nI build storage engines.");

        let raw = "Sure.\r\nBelow is the revised cover letter.\r\nDear Ms. Smith,";
        assert_eq!(sanitize(raw), "Sure.\r\nDear Ms. Smith,");
    }

    #[test]
    fn test_lead_in_then_fence() {
        let raw = "Here is the cover letter:\n```markdown\nDear team,\nRegards\n```";
        assert_eq!(sanitize(raw), "Dear team,\nRegards");
    }

    #[test]
    fn test_fence_then_lead_in() {
        let raw = "```\nHere is your cover letter:\nDear team,\n```";
        assert_eq!(sanitize(raw), "Dear team,");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "",
            "```",
            "``````",
            "   ```rust\n```\n```   ",
            "Here is: Here is: Dear team,",
            "Here is the cover letter:\n```\n```md\nDear team,\n```\n```",
            "Dear team,\n\n```\ncode\n```",
            "Below is\nnothing special",
            "Here's the cover letter.\n\n\nDear team,\r\n",
            "Dear team,\nHere is my cover letter:\nHere is the cover letter\nBody",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }
    }
}
