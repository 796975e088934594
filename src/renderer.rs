use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Settings;
use crate::importer::{ExportMessage, Role};
use crate::utils;

/// How many characters of the first user message go into a summary line.
const SUMMARY_MAX_CHARS: usize = 100;

/// YAML frontmatter for an organized document.
#[derive(Serialize)]
pub struct Frontmatter<'a> {
    pub tags: &'a [String],
    pub date: String,
    pub summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_conversation_id: Option<&'a str>,
}

/// Render one conversation as a Markdown document: title heading, metadata
/// tags, optional summary, then every message in order. Blocks are joined by
/// the configured separator.
pub fn render_conversation<W: Write>(
    writer: &mut W,
    id: &str,
    title: &str,
    created: Option<DateTime<Utc>>,
    messages: &[ExportMessage],
    settings: &Settings,
) -> std::io::Result<()> {
    let sep = settings.message_separator.as_str();

    match created {
        Some(ts) => write!(
            writer,
            "# {} {}{sep}",
            ts.format(&settings.date_format),
            title
        )?,
        None => write!(writer, "# {title}{sep}")?,
    }

    write!(writer, "<sub>Conversation ID: {id}</sub>{sep}")?;

    if let Some(ts) = created {
        write!(
            writer,
            "<sub>Creation time: {}</sub>{sep}",
            ts.format("%Y-%m-%d %H:%M:%S")
        )?;
    }

    if settings.enable_summarization
        && let Some(summary) = first_user_summary(messages)
    {
        write!(writer, "**Summary:** {summary}{sep}")?;
    }

    for message in messages {
        let text = message.text();
        if settings.skip_empty_messages && text.trim().is_empty() {
            continue;
        }
        let name = match message.role() {
            Role::User => settings.user_name.as_str(),
            _ => settings.assistant_name.as_str(),
        };
        write!(writer, "**{name}**: {text}{sep}")?;
    }

    Ok(())
}

/// Render one organized part: YAML frontmatter block, then the content
/// verbatim.
pub fn render_organized<W: Write>(
    writer: &mut W,
    frontmatter: &Frontmatter<'_>,
    content: &str,
) -> std::io::Result<()> {
    writeln!(writer, "---")?;
    let yaml =
        serde_yaml::to_string(frontmatter).map_err(std::io::Error::other)?;
    write!(writer, "{yaml}")?;
    writeln!(writer, "---")?;
    writeln!(writer)?;
    write!(writer, "{content}")?;
    Ok(())
}

fn first_user_summary(messages: &[ExportMessage]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.role() == Role::User)
        .map(ExportMessage::text)
        .find(|text| !text.trim().is_empty())
        .map(|text| {
            let first_line = text.lines().next().unwrap_or_default().trim().to_string();
            utils::ellipsize(&first_line, SUMMARY_MAX_CHARS)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::Conversation;

    fn render_to_string(
        conversation: &Conversation,
        settings: &Settings,
    ) -> String {
        let messages = conversation.collect_messages();
        let created = conversation.created_at(&messages);
        let id = conversation.id.clone().unwrap_or_else(|| "unknown".into());
        let title = conversation.title.clone().unwrap_or_default();
        let mut buf = Vec::new();
        render_conversation(&mut buf, &id, &title, created, &messages, settings).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sample() -> Conversation {
        serde_json::from_str(
            r#"{
                "id": "cafe0123",
                "title": "Sorting",
                "create_time": 1746000000.0,
                "mapping": {
                    "a": {"message": {"author": {"role": "user"}, "create_time": 1746000001.0, "content": "How do I sort?"}},
                    "b": {"message": {"author": {"role": "assistant"}, "create_time": 1746000002.0, "content": "Call sort()."}},
                    "c": {"message": {"author": {"role": "system"}, "create_time": 1746000000.5, "content": ""}}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn renders_header_metadata_and_messages_in_order() {
        let settings = Settings::default();
        let output = render_to_string(&sample(), &settings);

        assert!(output.starts_with("# 2025-04-30 Sorting\n\n"));
        assert!(output.contains("<sub>Conversation ID: cafe0123</sub>\n\n"));
        assert!(output.contains("<sub>Creation time: 2025-04-30"));
        let user_pos = output.find("**User**: How do I sort?").unwrap();
        let assistant_pos = output.find("**ChatGPT**: Call sort().").unwrap();
        assert!(user_pos < assistant_pos);
    }

    #[test]
    fn empty_messages_are_dropped_when_configured() {
        let settings = Settings::default();
        let output = render_to_string(&sample(), &settings);
        // the blank system message disappears entirely
        assert_eq!(output.matches("**: ").count(), 2);

        let keep_empty = Settings {
            skip_empty_messages: false,
            ..Settings::default()
        };
        let output = render_to_string(&sample(), &keep_empty);
        assert_eq!(output.matches("**: ").count(), 3);
    }

    #[test]
    fn summary_line_uses_first_user_message() {
        let settings = Settings {
            enable_summarization: true,
            ..Settings::default()
        };
        let output = render_to_string(&sample(), &settings);
        assert!(output.contains("**Summary:** How do I sort?\n\n"));
    }

    #[test]
    fn custom_separator_and_names() {
        let settings = Settings {
            user_name: "Q".into(),
            assistant_name: "A".into(),
            message_separator: "\n---\n".into(),
            ..Settings::default()
        };
        let output = render_to_string(&sample(), &settings);
        assert!(output.contains("**Q**: How do I sort?\n---\n"));
        assert!(output.contains("**A**: Call sort().\n---\n"));
    }

    #[test]
    fn frontmatter_omits_absent_source_id() {
        let tags = vec!["chatgpt".to_string(), "python".to_string()];
        let fm = Frontmatter {
            tags: &tags,
            date: "2025-04-30".into(),
            summary: "How do I sort?",
            source_conversation_id: None,
        };
        let mut buf = Vec::new();
        render_organized(&mut buf, &fm, "body\n").unwrap();
        let output = String::from_utf8(buf).unwrap();

        assert!(output.starts_with("---\n"));
        assert!(output.contains("tags:\n- chatgpt\n- python\n"));
        assert!(output.contains("date: 2025-04-30\n"));
        assert!(output.contains("summary: How do I sort?\n"));
        assert!(!output.contains("source_conversation_id"));
        assert!(output.ends_with("---\n\nbody\n"));
    }

    #[test]
    fn frontmatter_includes_source_id_when_known() {
        let tags = vec!["chatgpt".to_string()];
        let fm = Frontmatter {
            tags: &tags,
            date: "2025-04-30".into(),
            summary: "s",
            source_conversation_id: Some("cafe0123"),
        };
        let mut buf = Vec::new();
        render_organized(&mut buf, &fm, "x").unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("source_conversation_id: cafe0123\n"));
    }
}
