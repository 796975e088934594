use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Datelike;
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::importer::{Conversation, ExportMessage};
use crate::renderer;
use crate::utils::{self, Outcome};

/// Rendered documents shorter than this are considered empty conversations.
const MIN_BODY_CHARS: usize = 10;

/// Title fallback takes this many characters of the first message.
const TITLE_MAX_CHARS: usize = 50;

#[derive(Default)]
struct Totals {
    converted: usize,
    skipped: usize,
    skipped_old: usize,
    errors: usize,
}

/// The main entry point for the conversion pipeline: resolve the input
/// archives, then process them one file at a time.
pub fn execute(settings: &Settings) -> Result<()> {
    let archives = resolve_archives(&settings.input_path)?;

    fs::create_dir_all(&settings.markdown_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory: {}",
            settings.markdown_dir.display()
        )
    })?;

    let mut taken: HashSet<String> = HashSet::new();
    let mut totals = Totals::default();

    for archive in &archives {
        if let Err(e) = convert_archive(archive, settings, &mut taken, &mut totals) {
            totals.errors += 1;
            eprintln!("Error [{}]: {:#}", archive.display(), e);
        }
    }

    if !settings.quiet {
        let mut summary = format!(
            "Done. {} converted, {} skipped.",
            totals.converted, totals.skipped
        );
        if totals.skipped_old > 0 {
            summary.push_str(&format!(
                " {} predate {}.",
                totals.skipped_old, settings.filter_before_year
            ));
        }
        if totals.errors > 0 {
            summary.push_str(&format!(" Completed with {} error(s).", totals.errors));
        }
        eprintln!("{summary}");
    }

    Ok(())
}

/// A missing input path aborts the batch; everything downstream only skips.
fn resolve_archives(input: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(input)
        .wrap_err_with(|| format!("Input path not found: {}", input.display()))?;

    if !meta.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut archives: Vec<PathBuf> = fs::read_dir(input)
        .wrap_err_with(|| format!("Failed to read input directory: {}", input.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    archives.sort();

    if archives.is_empty() {
        return Err(eyre!("No .json archives found in: {}", input.display()));
    }
    Ok(archives)
}

fn convert_archive(
    path: &Path,
    settings: &Settings,
    taken: &mut HashSet<String>,
    totals: &mut Totals,
) -> Result<()> {
    let size = fs::metadata(path)
        .wrap_err_with(|| format!("Failed to stat: {}", path.display()))?
        .len();
    if size > settings.max_file_size_bytes() {
        eprintln!(
            "Skipping {}: {:.2}MB exceeds the {}MB limit",
            path.display(),
            size as f64 / (1024.0 * 1024.0),
            settings.max_file_size_mb
        );
        totals.skipped += 1;
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read: {}", path.display()))?;
    let entries = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Array(entries)) => entries,
        Ok(_) => {
            eprintln!(
                "Skipping {}: expected a top-level JSON array of conversations",
                path.display()
            );
            totals.skipped += 1;
            return Ok(());
        }
        Err(e) => {
            eprintln!("Skipping {}: invalid JSON: {}", path.display(), e);
            totals.skipped += 1;
            return Ok(());
        }
    };

    let pb = if settings.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(entries.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .unwrap()
            .progress_chars("=>-"),
        );
        bar.println(format!(
            "Found {} conversations in {}.",
            entries.len(),
            path.display()
        ));
        bar
    };

    for (idx, entry) in entries.iter().enumerate() {
        match convert_entry(entry, settings, taken, &pb) {
            Ok(Outcome::Written) => totals.converted += 1,
            Ok(Outcome::Skipped) => totals.skipped += 1,
            Ok(Outcome::SkippedOld) => totals.skipped_old += 1,
            Err(e) => {
                totals.errors += 1;
                pb.println(format!("Error [entry {idx}]: {e:#}"));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(())
}

fn convert_entry(
    entry: &serde_json::Value,
    settings: &Settings,
    taken: &mut HashSet<String>,
    pb: &ProgressBar,
) -> Result<Outcome> {
    let conversation: Conversation =
        serde_json::from_value(entry.clone()).wrap_err("Malformed conversation entry")?;

    let messages = conversation.collect_messages();
    let title = resolve_title(&conversation, &messages);
    if messages.is_empty() {
        pb.println(format!("Skipping conversation with no messages: {title}"));
        return Ok(Outcome::Skipped);
    }

    let created = conversation.created_at(&messages);
    match created {
        Some(ts) if ts.year() < settings.filter_before_year => {
            if settings.verbose {
                pb.println(format!(
                    "Skipping conversation from {} (before {}): {}",
                    ts.year(),
                    settings.filter_before_year,
                    title
                ));
            }
            return Ok(Outcome::SkippedOld);
        }
        Some(_) => {}
        None => {
            if settings.verbose {
                pb.println(format!("No valid timestamp for conversation: {title}"));
            }
        }
    }

    let id = conversation.id.clone().unwrap_or_else(|| "unknown".into());

    let mut buf = Vec::new();
    renderer::render_conversation(&mut buf, &id, &title, created, &messages, settings)
        .wrap_err("Failed to render markdown")?;
    let body = String::from_utf8_lossy(&buf);
    if body.trim().chars().count() < MIN_BODY_CHARS {
        pb.println(format!(
            "Skipping conversation with insufficient content: {title}"
        ));
        return Ok(Outcome::Skipped);
    }

    let sanitized = utils::sanitize_title(&title);
    let base = match created {
        Some(ts) => format!("{}_{}", ts.format(&settings.date_format), sanitized),
        None => sanitized,
    };
    let stem = utils::allocate_stem(&base, taken);
    let out_path = settings.markdown_dir.join(format!("{stem}.md"));

    if out_path.exists() && !settings.force {
        if settings.verbose {
            pb.println(format!("Skipped:  {stem}.md (exists)"));
        }
        return Ok(Outcome::Skipped);
    }

    let file = File::create(&out_path)
        .wrap_err_with(|| format!("Failed to create: {}", out_path.display()))?;
    let mut writer = BufWriter::new(file);
    if let Err(e) = writer.write_all(buf.as_slice()) {
        drop(writer);
        let _ = fs::remove_file(&out_path);
        return Err(e).wrap_err_with(|| format!("Failed to write: {}", out_path.display()));
    }
    writer.flush().wrap_err("Failed to flush markdown file")?;

    if settings.verbose {
        pb.println(format!("Created:  {stem}.md"));
    }
    Ok(Outcome::Written)
}

/// Entry title, else the first line of the first message, else a fixed
/// placeholder.
fn resolve_title(conversation: &Conversation, messages: &[ExportMessage]) -> String {
    if let Some(title) = &conversation.title
        && !title.trim().is_empty()
    {
        return title.trim().to_string();
    }

    if let Some(first) = messages.first() {
        let text = first.text();
        let first_line = utils::truncate_chars(text.lines().next().unwrap_or_default().trim(), TITLE_MAX_CHARS);
        if first_line.chars().count() > 3 {
            return first_line;
        }
    }

    "Untitled Conversation".to_string()
}
