//! mdsync - keep raw Markdown and a structured block tree in sync.
//!
//! # Usage
//!
//! ```bash
//! mdsync README.md
//! mdsync --format html README.md
//! mdsync --edits edits.json README.md
//! mdsync --check README.md
//! mdsync --watch README.md
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use mdsync::config::{
    ConfigFlags, OutputFormat, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use mdsync::render;
use mdsync::surface::{RawView, TreeView};
use mdsync::sync::{Effect, Message, Session, StructuredEdit, rejections};
use mdsync::watcher::FileWatcher;

const DEFAULT_DEBOUNCE_MS: u64 = 200;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Keep raw Markdown and a structured block tree in sync
#[derive(Parser, Debug)]
#[command(name = "mdsync", version, about, long_about = None)]
struct Cli {
    /// Markdown file to open
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format for the synchronized document
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// JSON array of structured edits to apply before output
    #[arg(long, value_name = "PATH")]
    edits: Option<PathBuf>,

    /// Exit with an error if the file is not in canonical form
    #[arg(long)]
    check: bool,

    /// Watch the file and re-sync on every change
    #[arg(short, long)]
    watch: bool,

    /// Debounce for file change events, in milliseconds
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Save current command-line flags as defaults in the global config
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in the global config
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);
    let format = effective.format.unwrap_or(OutputFormat::Markdown);

    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }
    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let (mut session, effects) = Session::from_markdown(&text);
    let mut raw = RawView::from_text(&text, 0);
    let mut tree = TreeView::default();
    route(&effects, &mut raw, &mut tree);

    if let Some(path) = &cli.edits {
        let effects = apply_edits(&mut session, path)?;
        route(&effects, &mut raw, &mut tree);
    }

    if effective.check {
        let canonical = session.markdown();
        if canonical != text {
            anyhow::bail!("{} is not in canonical form", cli.file.display());
        }
        tracing::info!(file = %cli.file.display(), "canonical");
        return Ok(());
    }

    print_document(&session, &tree, format)?;

    if effective.watch {
        let debounce = Duration::from_millis(effective.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS));
        watch(&cli.file, debounce, &mut session, &mut raw, &mut tree, format)?;
    }
    Ok(())
}

fn apply_edits(session: &mut Session, path: &Path) -> Result<Vec<Effect>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read edits {}", path.display()))?;
    let edits: Vec<StructuredEdit> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse edits {}", path.display()))?;
    let count = edits.len();
    for edit in edits {
        session.submit(Message::Structured(edit));
    }
    let effects = session.process();
    for err in rejections(&effects) {
        tracing::warn!(%err, "edit rejected");
    }
    tracing::debug!(count, revision = session.revision(), "applied edits");
    Ok(effects)
}

fn watch(
    file: &Path,
    debounce: Duration,
    session: &mut Session,
    raw: &mut RawView,
    tree: &mut TreeView,
    format: OutputFormat,
) -> Result<()> {
    let mut watcher = FileWatcher::new(file, debounce)
        .with_context(|| format!("Failed to watch {}", file.display()))?;
    tracing::info!(file = %watcher.target_path().display(), "watching");
    loop {
        match watcher.poll_text() {
            Ok(Some(text)) => {
                raw.set_text(&text);
                if let Some(msg) = raw.take_change() {
                    let effects = session.dispatch(msg);
                    if !effects.is_empty() {
                        route(&effects, raw, tree);
                        print_document(session, tree, format)?;
                    }
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "failed to read changed file"),
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Hand each effect to the surface it is meant for.
fn route(effects: &[Effect], raw: &mut RawView, tree: &mut TreeView) {
    for effect in effects {
        raw.apply(effect);
        tree.apply(effect);
        if let Effect::Conflict { revision } = effect {
            tracing::warn!(revision, "raw text conflicted with structured edits");
        }
    }
}

/// Print the tree pane's blocks in the requested format.
fn print_document(session: &Session, tree: &TreeView, format: OutputFormat) -> Result<()> {
    debug_assert_eq!(tree.revision(), session.revision());
    let blocks = tree.blocks();
    match format {
        OutputFormat::Markdown => print!("{}", session.markdown()),
        OutputFormat::Html => print!("{}", render::to_html(blocks)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(blocks).context("Failed to encode blocks")?;
            println!("{json}");
        }
    }
    Ok(())
}
