//! CLI binary for pdf-unwatermark.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RemovalConfig`, picks the source document, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_unwatermark::{
    check_capabilities, discover_sources, remove_watermark, resume_from, select_source,
    PipelineProgressCallback, PipelineReport, ProgressCallback, RemovalConfig, SelectionPolicy,
    Stage, UnwatermarkError, DEFAULT_WORK_DIR, WATERMARK_BAND,
};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar that is reset at every stage, plus a
/// log line per finished stage printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    item_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            item_errors: AtomicUsize::new(0),
        })
    }

    fn spinner(&self, stage: Stage) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix(stage_label(stage));
        self.bar.set_message("working…");
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len}  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_position(0);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.reset_eta();
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        let errors = self.item_errors.load(Ordering::SeqCst);
        if errors > 0 {
            eprintln!("{} {} items could not be handled", cyan("⚠"), errors);
        }
    }
}

fn stage_label(stage: Stage) -> String {
    format!("[{}/{}] {}", stage.number(), Stage::ALL.len(), stage)
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total_items: Option<usize>) {
        self.spinner(stage);
        if let Some(total) = total_items {
            self.activate_bar(total);
        }
    }

    fn on_stage_total(&self, _stage: Stage, total_items: usize) {
        self.activate_bar(total_items);
    }

    fn on_item_complete(&self, _stage: Stage, label: &str) {
        self.bar.set_message(label.to_string());
        self.bar.inc(1);
    }

    fn on_item_error(&self, _stage: Stage, label: &str, error: &str) {
        self.item_errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            label,
            dim(error)
        ));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage, processed: usize) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{processed} items")),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            red("✗"),
            stage_label(stage),
            red(error)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pick a PDF from the current directory (prompts when there are several)
  pdf-unwatermark

  # Clean a specific file
  pdf-unwatermark report.pdf

  # Non-interactive choice among the PDFs in a directory
  pdf-unwatermark --dir scans --select 2 --strict-selection

  # Keep pages in memory instead of the working directory
  pdf-unwatermark --in-memory report.pdf -o clean.pdf

  # Re-run only the reassembly stage from an existing working directory
  pdf-unwatermark --from-stage reassemble -o clean.pdf

  # Verify PDFium and the PNG codec are usable
  pdf-unwatermark --check

HOW IT WORKS:
  Every page is rendered at 600 DPI. Pixels whose red, green and blue
  channels all lie in the watermark band (186–246) become white. The
  cleaned pages are written to <name>_no_watermark.pdf. The output is an
  image-only PDF: text is no longer selectable.

WORKING DIRECTORY (default: output_images):
  page_<N>.png          raw render of page N (deleted by the prune stage)
  page_<N>_modify.png   cleaned image of page N

PDFIUM:
  The PDFium shared library is searched in the --pdfium-lib location, the
  per-user cache directory, next to the executable, the current directory,
  and the system library path.
"#;

/// Remove light-gray watermarks from PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-unwatermark",
    version,
    about = "Remove light-gray watermarks from PDF documents",
    long_about = "Rasterise every page of a PDF at 600 DPI, whiten the light-gray watermark \
band, and reassemble the cleaned pages into a new PDF with the original page size.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF. Without it, PDFs are discovered in --dir.
    input: Option<PathBuf>,

    /// Output PDF. Default: <stem>_no_watermark.pdf next to the source.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory searched for PDFs when no input is given.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// 1-based number of the PDF to use when several are found.
    #[arg(long)]
    select: Option<String>,

    /// Reject an invalid --select instead of falling back to the first PDF.
    #[arg(long)]
    strict_selection: bool,

    /// Working directory for intermediate page images.
    #[arg(long, default_value = DEFAULT_WORK_DIR, conflicts_with = "in_memory")]
    work_dir: PathBuf,

    /// Pass pages between stages in memory; nothing is written but the output.
    #[arg(long)]
    in_memory: bool,

    /// Re-run the pipeline from this stage against the working directory.
    #[arg(long, value_enum, conflicts_with = "in_memory")]
    from_stage: Option<StageArg>,

    /// PDF user password for encrypted documents.
    #[arg(long)]
    password: Option<String>,

    /// PDFium library file, or a directory containing it.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Check that PDFium and the PNG codec are usable, then exit.
    #[arg(long)]
    check: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    Rasterize,
    Filter,
    Prune,
    Reassemble,
}

impl From<StageArg> for Stage {
    fn from(v: StageArg) -> Self {
        match v {
            StageArg::Rasterize => Stage::Rasterize,
            StageArg::Filter => Stage::Filter,
            StageArg::Prune => Stage::Prune,
            StageArg::Reassemble => Stage::Reassemble,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Check-only mode ──────────────────────────────────────────────────
    if cli.check {
        let config = build_config(&cli, None)?;
        let report = check_capabilities(&config).context("Capability check failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else if !cli.quiet {
            let pdfium = report.pdfium.as_deref().unwrap_or("not required");
            println!("PDFium:     {pdfium}");
            println!("PNG codec:  ok");
            println!(
                "Band:       [{}, {}] → white",
                WATERMARK_BAND.low(),
                WATERMARK_BAND.high()
            );
        }
        return Ok(());
    }

    // ── Pick the source ──────────────────────────────────────────────────
    let from_stage = cli.from_stage.map(Stage::from);
    let needs_source = from_stage.is_none_or(|s| s == Stage::Rasterize);
    let source = match cli.input {
        Some(ref p) => Some(p.clone()),
        None if needs_source || cli.output.is_none() => Some(pick_source(&cli)?),
        None => None,
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn PipelineProgressCallback>),
    )?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = match (from_stage, source.as_deref()) {
        (None, Some(src)) => remove_watermark(src, cli.output.as_deref(), &config)
            .with_context(|| format!("Watermark removal failed for {}", src.display())),
        (stage, src) => {
            let stage = stage.unwrap_or(Stage::Rasterize);
            resume_from(stage, src, cli.output.as_deref(), &config)
                .with_context(|| format!("Pipeline failed (resumed from stage {stage})"))
        }
    };
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let report = result?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `RemovalConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RemovalConfig> {
    let mut builder = RemovalConfig::builder().selection_policy(selection_policy(cli));
    builder = if cli.in_memory {
        builder.in_memory()
    } else {
        builder.work_dir(&cli.work_dir)
    };
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn selection_policy(cli: &Cli) -> SelectionPolicy {
    if cli.strict_selection {
        SelectionPolicy::Strict
    } else {
        SelectionPolicy::FallbackToFirst
    }
}

/// Discover PDFs in `--dir` and choose one, prompting on a terminal when
/// there are several and no `--select` was given.
fn pick_source(cli: &Cli) -> Result<PathBuf> {
    let candidates = discover_sources(&cli.dir)
        .with_context(|| format!("Failed to list PDFs in {}", cli.dir.display()))?;
    if candidates.is_empty() {
        return Err(UnwatermarkError::NoSourceDocuments {
            dir: cli.dir.clone(),
        }
        .into());
    }

    let prompted;
    let choice = match cli.select {
        Some(ref s) => Some(s.as_str()),
        None if candidates.len() > 1 && io::stdin().is_terminal() && !cli.json => {
            prompted = prompt_for_choice(&candidates)?;
            Some(prompted.as_str())
        }
        None => None,
    };

    let selection = select_source(&candidates, choice, selection_policy(cli))?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} Using {}{}",
            cyan("◆"),
            bold(&selection.path.display().to_string()),
            if selection.fell_back {
                dim("  (invalid selection, defaulted to the first PDF)")
            } else {
                String::new()
            }
        );
    }
    Ok(selection.path)
}

fn prompt_for_choice(candidates: &[PathBuf]) -> Result<String> {
    eprintln!("Found {} PDF files:", candidates.len());
    for (i, path) in candidates.iter().enumerate() {
        eprintln!("  {:>2}. {}", i + 1, display_name(path));
    }
    eprint!("Select a file by number [1-{}]: ", candidates.len());
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read selection")?;
    Ok(line)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(report: &PipelineReport) {
    eprintln!(
        "{}  {} pages  {}ms  →  {}",
        green("✔"),
        report.page_count(),
        report.total_duration_ms,
        bold(&report.output.display().to_string()),
    );
    if let Some(ref filter) = report.filter {
        eprintln!(
            "   {} pixels whitened across {} images",
            dim(&filter.whitened_pixels().to_string()),
            filter.processed()
        );
    }
    if let Some(ref prune) = report.prune {
        if !prune.failed.is_empty() {
            eprintln!(
                "   {} {} raw images could not be deleted",
                cyan("⚠"),
                prune.failed.len()
            );
        }
    }
    if !report.assemble.skipped.is_empty() {
        eprintln!(
            "   {} {} cleaned images skipped",
            cyan("⚠"),
            report.assemble.skipped.len()
        );
    }
    if let Some(ref dir) = report.work_dir {
        eprintln!("   working directory: {}", dim(&dir.display().to_string()));
    }
}
