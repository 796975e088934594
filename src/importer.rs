#![allow(dead_code)]

/// Type definitions for the ChatGPT `conversations.json` export format.
///
/// The export is a top-level JSON array of conversation objects. Each
/// conversation carries its messages either as a `mapping` of node id →
/// `{message}` (the format produced by chatgpt.com's data export) or as a
/// flat `messages` array (older takeout bundles and third-party dumps).
///
/// The format is undocumented and has drifted over time, so every field is
/// optional and the content/timestamp shapes each accept the variants that
/// have been observed in the wild:
/// - `create_time`: epoch seconds as a float, or an RFC 3339 / `YYYY-MM-DD
///   HH:MM:SS` string
/// - `content`: a plain string, `{"parts": [...]}`, `{"text": "..."}`,
///   `{"result": "..."}`, or a typed `{"content_type": ..., ...}` object
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Conversation turn role. Unrecognized roles map to `Unknown` rather than
/// failing the whole entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    #[default]
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// A creation/update timestamp as it appears in the export.
///
/// chatgpt.com exports write epoch seconds with a fractional part; some
/// third-party dumps write date strings instead. Both are kept verbatim and
/// resolved to UTC on demand.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(f64),
    Text(String),
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Epoch(secs) if *secs > 0.0 => {
                DateTime::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
            }
            Timestamp::Epoch(_) => None,
            Timestamp::Text(s) => parse_datetime_text(s.trim()),
        }
    }
}

fn parse_datetime_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Message content
// ---------------------------------------------------------------------------

/// The content of a single message.
///
/// Custom deserializer handles the wire formats the export has used over
/// time:
/// - plain string
/// - `{"parts": [...]}` where a part is a string or a `{"text": "..."}` /
///   asset-pointer object
/// - `{"text": "..."}` / `{"result": "..."}` (single-field wrapped)
/// - `{"content_type": "user_editable_context", "user_profile": "..."}` and
///   other typed objects
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<String>),
    Typed {
        content_type: String,
        detail: Option<String>,
    },
}

impl MessageContent {
    /// Flatten to the text that should appear in the Markdown output.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts.join("\n"),
            MessageContent::Typed {
                content_type,
                detail,
            } => detail
                .clone()
                .unwrap_or_else(|| format!("Content of type: {content_type}")),
        }
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;

        match &value {
            serde_json::Value::String(s) => return Ok(Self::Text(s.clone())),

            serde_json::Value::Array(items) => {
                return Ok(Self::Parts(items.iter().filter_map(render_part).collect()));
            }

            serde_json::Value::Object(obj) => {
                // {"parts": [...]}
                if let Some(serde_json::Value::Array(parts)) = obj.get("parts") {
                    return Ok(Self::Parts(parts.iter().filter_map(render_part).collect()));
                }

                // {"text": "..."} / {"result": "..."}
                for field in ["text", "result"] {
                    if let Some(serde_json::Value::String(s)) = obj.get(field) {
                        return Ok(Self::Text(s.clone()));
                    }
                }

                // Typed content; user_editable_context carries the profile
                // text under "user_profile"
                if let Some(serde_json::Value::String(ct)) = obj.get("content_type") {
                    let detail = match ct.as_str() {
                        "user_editable_context" => obj
                            .get("user_profile")
                            .and_then(serde_json::Value::as_str)
                            .map(str::to_owned),
                        _ => None,
                    };
                    return Ok(Self::Typed {
                        content_type: ct.clone(),
                        detail,
                    });
                }

                // Last resort: any non-empty string fields the object holds
                let texts: Vec<String> = obj
                    .values()
                    .filter_map(serde_json::Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect();
                if !texts.is_empty() {
                    return Ok(Self::Text(texts.join("\n")));
                }
                return Ok(Self::Text("[Message content in unknown format]".into()));
            }

            _ => {}
        }

        Err(D::Error::custom(format!(
            "data did not match any known message content shape. Got: {}",
            serde_json::to_string(&value).unwrap_or_else(|_| value.to_string())
        )))
    }
}

/// Render one element of a `parts` array to text. Non-text parts (image
/// asset pointers and the like) become a `[content_type]` placeholder;
/// parts with no usable text are dropped.
fn render_part(part: &serde_json::Value) -> Option<String> {
    match part {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => {
            if let Some(serde_json::Value::String(s)) = obj.get("text") {
                return Some(s.clone());
            }
            obj.get("content_type")
                .and_then(serde_json::Value::as_str)
                .map(|ct| format!("[{ct}]"))
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author block of a message. Only the role is of interest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub role: Role,
}

/// A single message. The role lives under `author.role` in chatgpt.com
/// exports and directly under `role` in flat dumps.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportMessage {
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub create_time: Option<Timestamp>,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl ExportMessage {
    pub fn role(&self) -> Role {
        self.author
            .as_ref()
            .map(|a| a.role)
            .or(self.role)
            .unwrap_or_default()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.create_time.as_ref().and_then(Timestamp::to_datetime)
    }

    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::text)
            .unwrap_or_default()
    }
}

/// A node of the conversation `mapping`. Nodes without a message (the root,
/// tombstones) carry `null`. The message itself is kept as raw JSON so one
/// malformed message drops just that message, not the whole conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingNode {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// One conversation entry of the export array.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    #[serde(default, alias = "conversation_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub create_time: Option<Timestamp>,
    #[serde(default)]
    pub update_time: Option<Timestamp>,
    #[serde(default)]
    pub mapping: Option<HashMap<String, MappingNode>>,
    #[serde(default)]
    pub messages: Option<Vec<serde_json::Value>>,
}

impl Conversation {
    /// Collect the parseable messages, in chronological order.
    ///
    /// Mapping nodes are visited in node-id order before the time sort so the
    /// result is deterministic; the sort is stable, so messages without a
    /// timestamp keep their relative order at the front.
    pub fn collect_messages(&self) -> Vec<ExportMessage> {
        let mut messages: Vec<ExportMessage> = if let Some(mapping) = &self.mapping {
            let mut nodes: Vec<(&String, &MappingNode)> = mapping.iter().collect();
            nodes.sort_by(|a, b| a.0.cmp(b.0));
            nodes
                .into_iter()
                .filter_map(|(_, node)| node.message.clone())
                .filter_map(|raw| serde_json::from_value(raw).ok())
                .collect()
        } else if let Some(flat) = &self.messages {
            flat.iter()
                .filter_map(|raw| serde_json::from_value(raw.clone()).ok())
                .collect()
        } else {
            Vec::new()
        };

        messages.sort_by_key(|m| {
            m.timestamp()
                .map(|t| t.timestamp_micros())
                .unwrap_or(i64::MIN)
        });
        messages
    }

    /// Conversation creation time: the entry's own `create_time`, falling
    /// back to the earliest message timestamp.
    pub fn created_at(&self, messages: &[ExportMessage]) -> Option<DateTime<Utc>> {
        self.create_time
            .as_ref()
            .and_then(Timestamp::to_datetime)
            .or_else(|| messages.iter().filter_map(ExportMessage::timestamp).min())
    }
}
