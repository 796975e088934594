use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::renderer::{self, Frontmatter};
use crate::topics;
use crate::utils::{self, Outcome};

/// Summaries (and the slugs derived from them) are capped at this length.
const SUMMARY_MAX_CHARS: usize = 100;

/// How many words of the summary make it into the filename slug.
const SLUG_MAX_WORDS: usize = 5;

/// Hard cap on generated filenames.
const FILENAME_MAX_CHARS: usize = 240;

#[derive(Default)]
struct Totals {
    organized: usize,
    skipped: usize,
    skipped_old: usize,
    errors: usize,
}

/// The main entry point for the organize pipeline: walk the Markdown
/// directory, classify, split and rewrite each file into the vault.
pub fn execute(settings: &Settings) -> Result<()> {
    let files = resolve_files(&settings.markdown_dir)?;

    fs::create_dir_all(&settings.organized_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory: {}",
            settings.organized_dir.display()
        )
    })?;

    let pb = if settings.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .unwrap()
            .progress_chars("=>-"),
        );
        bar.println(format!(
            "Found {} markdown files in {}.",
            files.len(),
            settings.markdown_dir.display()
        ));
        bar
    };

    let mut taken: HashSet<String> = HashSet::new();
    let mut totals = Totals::default();

    for path in &files {
        match organize_file(path, settings, &mut taken, &pb) {
            Ok(Outcome::Written) => totals.organized += 1,
            Ok(Outcome::Skipped) => totals.skipped += 1,
            Ok(Outcome::SkippedOld) => totals.skipped_old += 1,
            Err(e) => {
                totals.errors += 1;
                pb.println(format!("Error [{}]: {:#}", path.display(), e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    if !settings.quiet {
        let mut summary = format!(
            "Done. {} organized, {} skipped.",
            totals.organized, totals.skipped
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

/// A missing input directory aborts the batch; everything downstream only
/// skips.
fn resolve_files(input: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(input)
        .wrap_err_with(|| format!("Input path not found: {}", input.display()))?;
    if !meta.is_dir() {
        return Err(eyre!("Expected a directory of .md files: {}", input.display()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input)
        .wrap_err_with(|| format!("Failed to read input directory: {}", input.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    Ok(files)
}

fn organize_file(
    path: &Path,
    settings: &Settings,
    taken: &mut HashSet<String>,
    pb: &ProgressBar,
) -> Result<Outcome> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read: {}", path.display()))?;
    if raw.trim().is_empty() {
        pb.println(format!("Skipping empty file: {}", path.display()));
        return Ok(Outcome::Skipped);
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let date = document_date(path, &raw, &filename);
    if date.year() < settings.filter_before_year {
        if settings.verbose {
            pb.println(format!(
                "Skipping file from {} (before {}): {}",
                date.year(),
                settings.filter_before_year,
                path.display()
            ));
        }
        return Ok(Outcome::SkippedOld);
    }

    let cleaned = utils::clean_markdown(&raw);
    let source_id = utils::extract_conversation_id(&cleaned, &filename);
    let parts = topics::split_by_transitions(&cleaned);
    let multi = parts.len() > 1;

    let mut wrote_any = false;
    for (i, part) in parts.iter().enumerate() {
        let mut tags = settings.extra_tags.clone();
        tags.extend(topics::classify(part).iter().map(|t| (*t).to_string()));

        let summary = utils::summarize(part, SUMMARY_MAX_CHARS);

        let frontmatter = Frontmatter {
            tags: &tags,
            date: date.format("%Y-%m-%d").to_string(),
            summary: &summary,
            source_conversation_id: source_id.as_deref(),
        };

        let stem = part_stem(date, &tags, settings.extra_tags.len(), &summary, multi, i);
        let stem = utils::allocate_stem(&stem, taken);
        let out_path = settings.organized_dir.join(format!("{stem}.md"));

        if out_path.exists() && !settings.force {
            if settings.verbose {
                pb.println(format!("Skipped:  {stem}.md (exists)"));
            }
            continue;
        }

        let file = File::create(&out_path)
            .wrap_err_with(|| format!("Failed to create: {}", out_path.display()))?;
        let mut writer = BufWriter::new(file);
        if let Err(e) = renderer::render_organized(&mut writer, &frontmatter, part) {
            drop(writer);
            let _ = fs::remove_file(&out_path);
            return Err(e).wrap_err_with(|| format!("Failed to write: {}", out_path.display()));
        }
        writer.flush().wrap_err("Failed to flush markdown file")?;

        if settings.verbose {
            pb.println(format!("Created:  {stem}.md"));
        }
        wrote_any = true;
    }

    Ok(if wrote_any {
        Outcome::Written
    } else {
        Outcome::Skipped
    })
}

/// Date resolution order: content tags, filename, file modification time.
fn document_date(path: &Path, content: &str, filename: &str) -> NaiveDate {
    utils::extract_content_date(content)
        .or_else(|| utils::extract_filename_date(filename))
        .or_else(|| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(|mtime| DateTime::<Utc>::from(mtime).date_naive())
        })
        .unwrap_or_else(|| Utc::now().date_naive())
}

/// `<date> - <primary topic>-<summary slug>[ part N]`, capped to a sane
/// filename length.
fn part_stem(
    date: NaiveDate,
    tags: &[String],
    extra_tag_count: usize,
    summary: &str,
    multi: bool,
    index: usize,
) -> String {
    let primary = tags.get(extra_tag_count).map_or("chat", String::as_str);

    let slug = slug::slugify(summary)
        .split('-')
        .take(SLUG_MAX_WORDS)
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() {
        "chatgpt-conversation".to_string()
    } else {
        slug
    };

    let mut stem = format!("{} - {}-{}", date.format("%Y-%m-%d"), primary, slug);
    if multi {
        stem.push_str(&format!(" part {}", index + 1));
    }
    utils::truncate_chars(&stem, FILENAME_MAX_CHARS)
}
