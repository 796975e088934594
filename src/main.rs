mod config;
mod converter;
mod importer;
mod organizer;
mod renderer;
mod topics;
mod utils;

use clap::{Parser, Subcommand};
use eyre::{Result, eyre};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Convert exported ChatGPT conversations to Markdown and organize them
/// into a knowledge-base vault.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/chatgpt-vault-export/config.json,
    /// then ./config.json.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Input override: the JSON archive (convert) or the Markdown
    /// directory (organize).
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output override: the Markdown directory (convert) or the vault
    /// directory (organize/both).
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Comma-separated tags added to frontmatter (e.g. "chatgpt,ai-log").
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Overwrite output files that already exist.
    #[arg(short, long)]
    force: bool,

    /// Print each file written or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress bars).
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Convert exported JSON conversation archives to Markdown files.
    Convert,
    /// Classify, split and rewrite Markdown files into the vault.
    Organize,
    /// Convert, then organize the converter output.
    Both,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load config file (CLI path > XDG dir > cwd > defaults)
    let mut settings = config::load(cli.config.as_deref())?;

    // 2. Pick the command (subcommand > interactive menu)
    let command = match cli.command {
        Some(c) => c,
        None => match menu()? {
            Some(c) => c,
            None => return Ok(()),
        },
    };

    // 3. Apply CLI overrides (CLI > config)
    if let Some(input) = cli.input {
        match command {
            Command::Convert | Command::Both => settings.input_path = input,
            Command::Organize => settings.markdown_dir = input,
        }
    }
    if let Some(output) = cli.output {
        match command {
            Command::Convert => settings.markdown_dir = output,
            Command::Organize | Command::Both => settings.organized_dir = output,
        }
    }
    if let Some(tags) = cli.tags {
        for tag in tags {
            if !settings.extra_tags.contains(&tag) {
                settings.extra_tags.push(tag);
            }
        }
    }
    settings.force = cli.force;
    settings.verbose = cli.verbose;
    settings.quiet = cli.quiet;

    // 4. Run the chosen pipeline(s)
    match command {
        Command::Convert => converter::execute(&settings),
        Command::Organize => organizer::execute(&settings),
        Command::Both => {
            converter::execute(&settings)?;
            organizer::execute(&settings)
        }
    }
}

/// Interactive menu for running without a subcommand. Returns `None` on a
/// clean exit; an unrecognized choice is an error (non-zero exit).
fn menu() -> Result<Option<Command>> {
    println!("chatgpt-vault-export");
    println!("  1) convert   - JSON archives -> Markdown");
    println!("  2) organize  - Markdown -> tagged vault files");
    println!("  3) both");
    println!("  4) exit");
    print!("> ");
    io::stdout().flush().map_err(|e| eyre!("stdout: {e}"))?;

    let mut choice = String::new();
    io::stdin()
        .lock()
        .read_line(&mut choice)
        .map_err(|e| eyre!("Failed to read menu choice: {e}"))?;

    match choice.trim().to_lowercase().as_str() {
        "1" | "convert" => Ok(Some(Command::Convert)),
        "2" | "organize" => Ok(Some(Command::Organize)),
        "3" | "both" => Ok(Some(Command::Both)),
        "4" | "exit" | "quit" | "" => Ok(None),
        other => Err(eyre!("Invalid menu choice: {other:?}")),
    }
}
