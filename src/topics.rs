/// Keyword-based topic classification and topic-transition splitting.
///
/// Both are deliberately heuristic: a fixed keyword table scored by
/// occurrence count, and a fixed phrase list scanned at message boundaries.
/// Declaration order of the table doubles as the tie-break order, so a given
/// text always yields the same tags in the same order.

/// Topic label → keywords that trigger it. Single-word keywords match at
/// word boundaries; multi-word keywords match as substrings.
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "python",
        &[
            "python",
            "django",
            "flask",
            "pandas",
            "numpy",
            "matplotlib",
            "tensorflow",
            "pytorch",
        ],
    ),
    (
        "javascript",
        &[
            "javascript",
            "js",
            "node",
            "react",
            "vue",
            "angular",
            "typescript",
            "npm",
        ],
    ),
    (
        "startup",
        &[
            "startup",
            "founder",
            "venture",
            "pitch",
            "entrepreneurship",
            "business model",
            "mvp",
        ],
    ),
    (
        "marketing",
        &[
            "marketing",
            "seo",
            "advertising",
            "customer",
            "brand",
            "social media",
            "content",
        ],
    ),
    (
        "vc",
        &[
            "vc",
            "venture capital",
            "investor",
            "funding",
            "series a",
            "angel",
            "term sheet",
        ],
    ),
    (
        "ai",
        &[
            "ai",
            "artificial intelligence",
            "machine learning",
            "ml",
            "deep learning",
            "llm",
            "neural",
        ],
    ),
    (
        "data",
        &[
            "data",
            "database",
            "sql",
            "nosql",
            "analytics",
            "visualization",
            "dashboard",
        ],
    ),
    (
        "web",
        &[
            "web",
            "html",
            "css",
            "frontend",
            "backend",
            "fullstack",
            "responsive",
        ],
    ),
    (
        "mobile",
        &[
            "mobile",
            "ios",
            "android",
            "app",
            "swift",
            "kotlin",
            "react native",
        ],
    ),
    (
        "cloud",
        &[
            "cloud",
            "aws",
            "azure",
            "gcp",
            "serverless",
            "docker",
            "kubernetes",
        ],
    ),
    (
        "security",
        &[
            "security",
            "encryption",
            "authentication",
            "vulnerability",
            "firewall",
            "cybersecurity",
        ],
    ),
    (
        "blockchain",
        &[
            "blockchain",
            "crypto",
            "bitcoin",
            "ethereum",
            "nft",
            "token",
            "web3",
        ],
    ),
    (
        "design",
        &[
            "design",
            "ui",
            "ux",
            "figma",
            "sketch",
            "wireframe",
            "prototype",
        ],
    ),
    (
        "career",
        &[
            "career",
            "resume",
            "interview",
            "job",
            "salary",
            "promotion",
            "skills",
        ],
    ),
    (
        "productivity",
        &[
            "productivity",
            "workflow",
            "efficiency",
            "automation",
            "tool",
            "process",
        ],
    ),
    (
        "health",
        &[
            "health",
            "fitness",
            "nutrition",
            "medical",
            "exercise",
            "wellness",
            "diet",
        ],
    ),
    (
        "education",
        &[
            "education",
            "learning",
            "course",
            "tutorial",
            "teach",
            "student",
            "training",
        ],
    ),
];

/// Phrases that signal the conversation is changing subject.
pub const TRANSITION_PHRASES: &[&str] = &[
    "now let's switch to",
    "moving on to",
    "let's change the subject",
    "on a different topic",
    "switching gears",
    "let's talk about something else",
    "changing the subject",
    "new topic:",
    "regarding your other question",
    "to address your next point",
    "on another note",
];

/// A topic needs this many keyword hits before it is tagged.
const MIN_TOPIC_SCORE: usize = 2;

/// Marker that starts a message block in rendered Markdown.
const BLOCK_MARKER: &str = "\n\n**";

/// Classify a text against the keyword table. Returns matched topic labels
/// in table declaration order.
pub fn classify(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| {
            let score: usize = keywords.iter().map(|k| keyword_count(&lower, k)).sum();
            score >= MIN_TOPIC_SCORE
        })
        .map(|(topic, _)| *topic)
        .collect()
}

fn keyword_count(lower: &str, keyword: &str) -> usize {
    // Short single-word keywords like "ai" or "js" must not match inside
    // other words; multi-word keywords are unambiguous as substrings.
    let bounded = !keyword.contains(' ');
    let mut count = 0;
    let mut from = 0;
    while let Some(pos) = lower[from..].find(keyword) {
        let start = from + pos;
        let end = start + keyword.len();
        let left_ok = lower[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let right_ok = lower[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if !bounded || (left_ok && right_ok) {
            count += 1;
        }
        from = end;
    }
    count
}

/// Split rendered Markdown at topic transitions.
///
/// Message blocks start at `\n\n**`. A block containing a transition phrase
/// opens a new part, provided at least one message precedes it. The returned
/// slices partition the input exactly, so concatenating them reproduces it
/// byte for byte.
pub fn split_by_transitions(content: &str) -> Vec<&str> {
    let mut boundaries = Vec::new();
    let mut from = 0;
    while let Some(pos) = content[from..].find(BLOCK_MARKER) {
        let start = from + pos;
        boundaries.push(start);
        from = start + BLOCK_MARKER.len();
    }

    let mut cuts = vec![0usize];
    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(content.len());
        let block = content[start..end].to_lowercase();
        if TRANSITION_PHRASES.iter().any(|p| block.contains(p)) && content[..start].contains("**") {
            cuts.push(start);
        }
    }

    cuts.windows(2)
        .map(|w| &content[w[0]..w[1]])
        .chain(std::iter::once(
            &content[cuts.last().copied().unwrap_or(0)..],
        ))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_deterministic_and_ordered() {
        let text = "We used docker and kubernetes on aws, with some python and pandas.";
        let tags = classify(text);
        // python declared before cloud in the table
        assert_eq!(tags, vec!["python", "cloud"]);
        assert_eq!(classify(text), tags);
    }

    #[test]
    fn single_hit_is_below_threshold() {
        assert!(classify("I once mentioned docker.").is_empty());
        assert_eq!(classify("docker here, aws there"), vec!["cloud"]);
    }

    #[test]
    fn short_keywords_respect_word_boundaries() {
        // "ai" appears inside words only
        assert!(classify("maintain maintainable maintained").is_empty());
        assert_eq!(classify("AI this, ai that"), vec!["ai"]);
    }

    #[test]
    fn multi_word_keywords_match_as_substrings() {
        let tags = classify("a business model is still a business model");
        assert_eq!(tags, vec!["startup"]);
    }

    #[test]
    fn no_transition_yields_single_part() {
        let content = "# T\n\n**User**: hi\n\n**ChatGPT**: hello";
        assert_eq!(split_by_transitions(content), vec![content]);
    }

    #[test]
    fn transition_splits_at_message_boundary() {
        let content = "# T\n\n**User**: tell me about python\n\n**ChatGPT**: sure\n\n**User**: now let's switch to marketing\n\n**ChatGPT**: ok";
        let parts = split_by_transitions(content);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("python"));
        assert!(parts[1].starts_with("\n\n**User**: now let's switch to marketing"));
    }

    #[test]
    fn parts_reconstruct_the_original() {
        let content = "# T\n\n**User**: a\n\n**ChatGPT**: moving on to health\n\n**User**: on another note, design\n\n**ChatGPT**: done";
        let parts = split_by_transitions(content);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.concat(), content);
    }

    #[test]
    fn opening_message_never_splits_off_the_header() {
        // A transition phrase in the very first message has nothing before it
        // to split from
        let content = "# T\n\n**User**: moving on to other things\n\n**ChatGPT**: ok";
        assert_eq!(split_by_transitions(content).len(), 1);
    }

    #[test]
    fn transition_detection_is_case_insensitive() {
        let content = "**User**: a\n\n**ChatGPT**: Switching Gears to vc funding";
        let parts = split_by_transitions(content);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts.concat(), content);
    }
}
