use std::fs;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use eyre::{Context, Result, eyre};
use serde::Deserialize;

/// Everything both pipelines need to run. Loaded from a JSON config file,
/// then overridden by CLI flags; the flags at the bottom come only from the
/// CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Role label for user messages.
    pub user_name: String,
    /// Role label for assistant (and tool/system) messages.
    pub assistant_name: String,
    /// JSON conversation archive, or a directory of `.json` archives.
    pub input_path: PathBuf,
    /// Converter output directory; also the organizer's input.
    pub markdown_dir: PathBuf,
    /// Organizer output directory.
    pub organized_dir: PathBuf,
    /// strftime format for filename date prefixes.
    pub date_format: String,
    /// Separator between rendered blocks.
    pub message_separator: String,
    /// Drop messages whose content is blank.
    pub skip_empty_messages: bool,
    /// Input archives larger than this are skipped.
    pub max_file_size_mb: u64,
    /// Conversations/files dated before this year are skipped.
    pub filter_before_year: i32,
    /// Emit a `**Summary:**` line in converted files.
    pub enable_summarization: bool,
    /// Tags always prepended to organizer frontmatter.
    pub extra_tags: Vec<String>,

    #[serde(skip)]
    pub force: bool,
    #[serde(skip)]
    pub verbose: bool,
    #[serde(skip)]
    pub quiet: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_name: "User".into(),
            assistant_name: "ChatGPT".into(),
            input_path: PathBuf::from("conversations.json"),
            markdown_dir: PathBuf::from("markdown_output"),
            organized_dir: PathBuf::from("organized_output"),
            date_format: "%Y-%m-%d".into(),
            message_separator: "\n\n".into(),
            skip_empty_messages: true,
            max_file_size_mb: 100,
            filter_before_year: 2025,
            enable_summarization: false,
            extra_tags: vec!["chatgpt".into()],
            force: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl Settings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Load settings from a config file.
///
/// An explicitly given path must exist; otherwise the search order is the
/// OS config dir (`chatgpt-vault-export/config.json`), then `./config.json`,
/// then built-in defaults.
pub fn load(explicit_path: Option<&Path>) -> Result<Settings> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("chatgpt-vault-export/config.json"))
            .filter(|p| p.exists())
            .or_else(|| Some(PathBuf::from("config.json")).filter(|p| p.exists()))
    };

    let settings = match path {
        None => Settings::default(),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            serde_json::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))?
        }
    };

    validate_date_format(&settings.date_format)?;
    Ok(settings)
}

/// Reject broken strftime strings up front; chrono only surfaces them when a
/// date is actually formatted.
fn validate_date_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(eyre!("Invalid date_format in config: {format:?}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_config_present() {
        let settings = Settings::default();
        assert_eq!(settings.user_name, "User");
        assert_eq!(settings.filter_before_year, 2025);
        assert_eq!(settings.extra_tags, vec!["chatgpt".to_string()]);
        assert_eq!(settings.max_file_size_bytes(), 100 * 1024 * 1024);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        let mut f = fs::File::create(&p).unwrap();
        write!(
            f,
            r#"{{"user_name": "Me", "filter_before_year": 2023, "extra_tags": ["chatgpt", "ai-log"]}}"#
        )
        .unwrap();

        let settings = load(Some(&p)).unwrap();
        assert_eq!(settings.user_name, "Me");
        assert_eq!(settings.assistant_name, "ChatGPT");
        assert_eq!(settings.filter_before_year, 2023);
        assert_eq!(settings.extra_tags.len(), 2);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/config.json"))).is_err());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        fs::write(&p, "{not json").unwrap();
        assert!(load(Some(&p)).is_err());
    }

    #[test]
    fn bad_date_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        fs::write(&p, r#"{"date_format": "%Q nope"}"#).unwrap();
        assert!(load(Some(&p)).is_err());
    }
}
