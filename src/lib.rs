//! # chatgpt-vault-export
//!
//! A CLI tool that converts exported [ChatGPT](https://chatgpt.com) conversations to local
//! Markdown files and reorganizes them for a personal knowledge base.
//!
//! ## What it does
//!
//! ChatGPT's data export ships conversations as a large `conversations.json` array. This tool
//! runs in two stages:
//!
//! 1. **Convert**: parse the export, drop conversations older than a configured year, and
//!    write each surviving conversation as a Markdown file (role-labelled messages in
//!    chronological order, conversation id and creation time as metadata tags).
//! 2. **Organize**: scan a directory of such Markdown files, tag each one by matching a
//!    fixed topic keyword table, split files where the conversation visibly changes subject,
//!    and rewrite them with YAML frontmatter (tags, date, summary, source id) under
//!    descriptive `date - topic-summary` filenames, ready for an Obsidian-style vault.
//!
//! Both stages skip malformed input with a console message and keep going; only a missing
//! input path aborts a batch.
//!
//! ## Usage
//!
//! ```sh
//! # Convert an export, then organize the result
//! chatgpt-vault-export both --input ~/Downloads/conversations.json --output ~/notes/vault
//!
//! # Or run the interactive menu
//! chatgpt-vault-export
//! ```
//!
//! Preferences can be persisted in `~/.config/chatgpt-vault-export/config.json`.
//!
//! ## Compatibility
//!
//! Tracks the undocumented chatgpt.com export format, including the older flat `messages`
//! shape and the message-content variants the export has used over time. If an export fails
//! to parse, please open an issue.
