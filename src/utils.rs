use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Outcome of processing one conversation or one Markdown file.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Written,
    Skipped,
    /// Skipped because it predates the configured cutoff year.
    SkippedOld,
}

static CREATION_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<sub>Creation time: (\d{4}-\d{2}-\d{2})").expect("valid regex")
});
static LEGACY_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<sub>(\d{2}-\d{2}-\d{4})</sub>").expect("valid regex"));
static FILENAME_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"));
static CONVERSATION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<sub>Conversation ID: ([^<]+)</sub>").expect("valid regex"));
static HEX_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-f0-9]{8,}").expect("valid regex"));
static MESSAGE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*\n]+\*\*:[ \t]*(.*)").expect("valid regex"));

/// Make a conversation title safe for use as a file stem: keep alphanumerics,
/// spaces, `_` and `-`, then turn spaces into underscores.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}

/// Truncate to `max_chars`, appending `...` when anything was cut.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    format!("{truncated}...")
}

/// Truncate to at most `max_chars` characters without a marker.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Reserve a unique file stem for this run. Collisions get a `-2`, `-3`, …
/// suffix in allocation order.
pub fn allocate_stem(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    for n in 2usize.. {
        let candidate = format!("{base}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    }
    unreachable!("stem registry exhausted")
}

/// Find a document date inside rendered Markdown: the
/// `<sub>Creation time: ...</sub>` tag, or a legacy `<sub>MM-DD-YYYY</sub>`.
pub fn extract_content_date(content: &str) -> Option<NaiveDate> {
    if let Some(caps) = CREATION_TIME_RE.captures(content)
        && let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
    {
        return Some(date);
    }
    LEGACY_DATE_RE
        .captures(content)
        .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%m-%d-%Y").ok())
}

/// Find a `YYYY-MM-DD` date in a filename.
pub fn extract_filename_date(filename: &str) -> Option<NaiveDate> {
    FILENAME_DATE_RE
        .find_iter(filename)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}

/// Recover the source conversation id: the `<sub>Conversation ID: ...</sub>`
/// tag in the content, else the first run of 8+ hex characters in the
/// filename.
pub fn extract_conversation_id(content: &str, filename: &str) -> Option<String> {
    if let Some(caps) = CONVERSATION_ID_RE.captures(content) {
        let id = caps[1].trim();
        if !id.is_empty() && id != "unknown" {
            return Some(id.to_string());
        }
    }
    HEX_ID_RE.find(filename).map(|m| m.as_str().to_string())
}

/// Normalize Markdown before reorganizing: strip trailing whitespace per
/// line, collapse runs of blank lines to a single blank line, end with a
/// newline.
pub fn clean_markdown(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut blank_run = 0usize;
    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// One-line summary of a document: the text of the first `**Name**: ...`
/// message line, else the first non-empty line, truncated.
pub fn summarize(content: &str, max_chars: usize) -> String {
    if let Some(caps) = MESSAGE_LINE_RE.captures(content) {
        let text = caps[1].trim();
        if !text.is_empty() {
            return ellipsize(text, max_chars);
        }
    }
    if let Some(line) = content.lines().find(|l| !l.trim().is_empty()) {
        let line = line.trim().trim_start_matches('#').trim();
        return ellipsize(line, max_chars);
    }
    "ChatGPT Conversation".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_punctuation_and_joins_words() {
        assert_eq!(sanitize_title("Rust: async & await?"), "Rust_async__await");
        assert_eq!(sanitize_title("plain-title_ok"), "plain-title_ok");
        assert_eq!(sanitize_title("trailing spaces   "), "trailing_spaces");
    }

    #[test]
    fn ellipsize_only_marks_truncation() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("exactly-ten", 11), "exactly-ten");
        assert_eq!(ellipsize("much longer text", 4), "much...");
    }

    #[test]
    fn stems_are_unique_per_run() {
        let mut taken = HashSet::new();
        assert_eq!(allocate_stem("a", &mut taken), "a");
        assert_eq!(allocate_stem("a", &mut taken), "a-2");
        assert_eq!(allocate_stem("a", &mut taken), "a-3");
        assert_eq!(allocate_stem("b", &mut taken), "b");
    }

    #[test]
    fn date_from_creation_time_tag() {
        let content = "# Title\n\n<sub>Creation time: 2025-03-04 10:00:00</sub>\n";
        assert_eq!(
            extract_content_date(content),
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
    }

    #[test]
    fn date_from_legacy_tag() {
        let content = "intro\n<sub>03-04-2024</sub>\n";
        assert_eq!(
            extract_content_date(content),
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
    }

    #[test]
    fn date_from_filename() {
        assert_eq!(
            extract_filename_date("2025-01-31_Some_Chat.md"),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(extract_filename_date("no-date-here.md"), None);
        // Non-dates that match the shape are skipped in favor of a real one
        assert_eq!(
            extract_filename_date("9999-99-99 then 2024-12-01.md"),
            NaiveDate::from_ymd_opt(2024, 12, 1)
        );
    }

    #[test]
    fn conversation_id_prefers_content_tag() {
        let content = "<sub>Conversation ID: abc-123</sub>";
        assert_eq!(
            extract_conversation_id(content, "deadbeef01_x.md"),
            Some("abc-123".to_string())
        );
        assert_eq!(
            extract_conversation_id("no tag", "deadbeef01_x.md"),
            Some("deadbeef01".to_string())
        );
        assert_eq!(extract_conversation_id("no tag", "plain.md"), None);
        // Placeholder ids fall through to the filename
        assert_eq!(
            extract_conversation_id("<sub>Conversation ID: unknown</sub>", "plain.md"),
            None
        );
    }

    #[test]
    fn clean_collapses_blank_runs() {
        let dirty = "line one   \n\n\n\nline two\t\n\n\n";
        assert_eq!(clean_markdown(dirty), "line one\n\nline two\n");
    }

    #[test]
    fn summary_prefers_first_message_line() {
        let content = "# 2025-01-01 Title\n\n**User**: How do I sort a Vec?\n\n**ChatGPT**: Use sort().";
        assert_eq!(summarize(content, 100), "How do I sort a Vec?");
    }

    #[test]
    fn summary_falls_back_to_first_line() {
        assert_eq!(summarize("Just some text\nmore", 100), "Just some text");
        assert_eq!(summarize("   \n\n", 100), "ChatGPT Conversation");
    }

    #[test]
    fn summary_truncates() {
        let content = format!("**User**: {}", "x".repeat(200));
        let summary = summarize(&content, 100);
        assert_eq!(summary.chars().count(), 103);
        assert!(summary.ends_with("..."));
    }
}
