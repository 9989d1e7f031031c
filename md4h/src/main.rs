//! md4h - headless driver for the md4h document core

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use md4h_core::Document;
use std::path::PathBuf;

/// Inspect and round-trip Markdown documents through the md4h core
#[derive(Parser, Debug)]
#[command(name = "md4h")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the heading outline with section boundaries and anchors
    Outline {
        /// Path to markdown file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse, normalize, and re-serialize a file to stdout
    Roundtrip {
        /// Path to markdown file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Verify that a file re-serializes stably
    Check {
        /// Path to markdown file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Follow a file on disk, reporting how each change classifies
    #[cfg(feature = "watch")]
    Watch {
        /// Path to markdown file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Outline { file } => outline(&file),
        Command::Roundtrip { file } => roundtrip(&file),
        Command::Check { file } => check(&file),
        #[cfg(feature = "watch")]
        Command::Watch { file } => watch(&file),
    }
}

fn outline(file: &PathBuf) -> Result<()> {
    let doc = Document::load(file)
        .with_context(|| format!("Failed to load document: {}", file.display()))?;

    for entry in doc.outline() {
        println!(
            "{}{} [{}..{}] #{}",
            "  ".repeat(entry.level.saturating_sub(1) as usize),
            entry.text,
            entry.pos,
            entry.section_end,
            entry.slug,
        );
    }
    Ok(())
}

fn roundtrip(file: &PathBuf) -> Result<()> {
    let mut doc = Document::load(file)
        .with_context(|| format!("Failed to load document: {}", file.display()))?;
    print!("{}", doc.serialize());
    Ok(())
}

#[cfg(feature = "watch")]
fn watch(file: &PathBuf) -> Result<()> {
    use md4h_core::sync::InboundDisposition;
    use md4h_core::Config;
    use md4h_editor::watcher::DocumentWatcher;
    use md4h_editor::EditorSession;
    use std::thread;
    use std::time::Duration;

    let config = Config::load().context("Failed to load configuration")?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let mut session = EditorSession::open(&content, &config);
    let mut watcher = DocumentWatcher::new(file)
        .with_context(|| format!("Failed to watch file: {}", file.display()))?;

    println!("watching {} (ctrl-c to stop)", file.display());
    loop {
        thread::sleep(Duration::from_millis(200));
        if let Some(update) = watcher.poll_update(config.sync.watch_debounce_ms) {
            match session.apply_inbound(&update) {
                InboundDisposition::Apply => {
                    println!("reloaded (rev {})", session.rev());
                }
                InboundDisposition::Echo => println!("echo, discarded"),
                InboundDisposition::Unchanged => println!("unchanged, skipped"),
            }
        }
    }
}

fn check(file: &PathBuf) -> Result<()> {
    let mut doc = Document::load(file)
        .with_context(|| format!("Failed to load document: {}", file.display()))?;
    let first = doc.serialize();

    let mut again = Document::from_markdown(&first);
    let second = again.serialize();

    if first == second {
        println!("{}: stable", file.display());
        Ok(())
    } else {
        anyhow::bail!("{}: re-serialization is not stable", file.display());
    }
}
