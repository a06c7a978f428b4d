//! CLI binary for paper2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paper2md::{
    convert, convert_batch, discover_pdfs, postprocess_file, run_agent, AgentConfig, AgentOutcome,
    BackendKind, BatchOptions, ConversionConfig, ConversionOutput, ConversionProgressCallback,
    PostprocessOptions, ProgressCallback, Stage,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback: a spinner showing the current stage, plus one
/// log line per finished document in batch mode.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Batch mode keeps the spinner alive across documents.
    batch: bool,
}

impl CliProgressCallback {
    fn new(batch: bool) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, batch })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &str) {
        if !self.batch {
            self.bar.set_prefix(short_name(input));
        }
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_figures_selected(&self, kept: usize, dropped: usize) {
        if !self.batch {
            self.bar.println(format!(
                "  {} {} figures kept  {}",
                cyan("◆"),
                kept,
                dim(&format!("({dropped} small images dropped)"))
            ));
        }
    }

    fn on_conversion_complete(&self, _output: &Path) {
        if !self.batch {
            self.bar.finish_and_clear();
        }
    }

    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        self.bar.set_prefix(format!("[{index}/{total}] {name}"));
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str, success: bool) {
        let mark = if success { green("✓") } else { red("✗") };
        self.bar
            .println(format!("  {} [{:>3}/{:<3}] {}", mark, index, total, name));
    }
}

fn short_name(input: &str) -> String {
    input
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(input)
        .to_string()
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a paper (Docling backend)
  paper2md convert paper.pdf out/

  # Native backend, no Python needed; keep the raw extraction
  paper2md convert --backend pdfium --keep-raw paper.pdf out/

  # Convert from URL and run the cleanup agent
  paper2md convert --agent https://arxiv.org/pdf/1706.03762 out/

  # Re-run post-processing on an existing file, in place
  paper2md postprocess out/paper/paper.md

  # Whole directory, two documents at a time, resuming after 10
  paper2md batch --jobs 2 --skip 10 pdfs/ out/

OUTPUT LAYOUT:
  <output_dir>/<stem>/<stem>.md        final Markdown
  <output_dir>/<stem>/<stem>_raw.md    raw extraction (--keep-raw / --raw)
  <output_dir>/<stem>/img/figureN.png  figures

ENVIRONMENT VARIABLES:
  PAPER2MD_BACKEND        docling | pdfium
  PAPER2MD_PYTHON         Python interpreter for the Docling helper
  PAPER2MD_AGENT_COMMAND  Cleanup agent executable (default: claude)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  RUST_LOG                Overrides -v / -q log filtering

SETUP:
  Docling backend:  pip install docling
  pdfium backend:   nothing; the library (~30 MB) is downloaded on first use
  Cleanup agent:    install the `claude` CLI, or point --agent-command elsewhere
"#;

/// Convert academic PDF papers to clean Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "paper2md",
    version,
    about = "Convert academic PDF papers to clean Markdown",
    long_about = "Extract a PDF paper with Docling or pdfium, then rebuild its structure \
deterministically: numbered section headings, clickable citations, anchored references, \
figures embedded above their captions and normalised typography. An external LLM agent can \
optionally polish the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPER2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPER2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one PDF file or URL.
    Convert(ConvertArgs),
    /// Re-run deterministic post-processing on a Markdown file.
    Postprocess(PostprocessArgs),
    /// Run the cleanup agent on a Markdown file.
    Agent(AgentArgs),
    /// Convert every PDF in a directory.
    Batch(BatchArgs),
}

/// Extraction and post-processing flags shared by `convert` and `batch`.
#[derive(Args, Debug)]
struct ExtractArgs {
    /// Extraction backend.
    #[arg(long, env = "PAPER2MD_BACKEND", value_enum, default_value = "docling")]
    backend: BackendArg,

    /// Figure resolution multiplier (0.25–8.0).
    #[arg(long, env = "PAPER2MD_IMAGES_SCALE", default_value_t = 2.0)]
    images_scale: f32,

    /// Python interpreter for the Docling helper.
    #[arg(long, env = "PAPER2MD_PYTHON", default_value = "python3")]
    python: String,

    /// Join words hyphenated across line breaks.
    #[arg(long, env = "PAPER2MD_DEHYPHENATE")]
    dehyphenate: bool,

    /// Run the cleanup agent after writing.
    #[arg(long, env = "PAPER2MD_AGENT")]
    agent: bool,

    /// Cleanup agent executable.
    #[arg(long, env = "PAPER2MD_AGENT_COMMAND", default_value = "claude")]
    agent_command: String,

    /// Cleanup agent timeout in seconds.
    #[arg(long, env = "PAPER2MD_AGENT_TIMEOUT", default_value_t = 1800)]
    agent_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAPER2MD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "PAPER2MD_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Parent directory for the `<stem>/` output directory.
    output_dir: PathBuf,

    /// Skip post-processing and the agent; output the raw extraction.
    #[arg(long, env = "PAPER2MD_RAW")]
    raw: bool,

    /// Also save the raw extraction as `<stem>_raw.md`.
    #[arg(long, env = "PAPER2MD_KEEP_RAW")]
    keep_raw: bool,

    /// Print the ConversionOutput as JSON on stdout.
    #[arg(long, env = "PAPER2MD_JSON")]
    json: bool,

    #[command(flatten)]
    extract: ExtractArgs,
}

#[derive(Args, Debug)]
struct PostprocessArgs {
    /// Markdown file to process.
    markdown: PathBuf,

    /// Figure directory. Default: `img/` next to the Markdown file.
    #[arg(short, long)]
    images: Option<PathBuf>,

    /// Write here instead of overwriting the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Join words hyphenated across line breaks.
    #[arg(long, env = "PAPER2MD_DEHYPHENATE")]
    dehyphenate: bool,

    /// Print the report as JSON on stdout.
    #[arg(long, env = "PAPER2MD_JSON")]
    json: bool,
}

#[derive(Args, Debug)]
struct AgentArgs {
    /// Markdown file to clean up.
    markdown: PathBuf,

    /// Figure directory. Default: `img/` next to the Markdown file.
    #[arg(short, long)]
    images: Option<PathBuf>,

    /// Cleanup agent executable.
    #[arg(long, env = "PAPER2MD_AGENT_COMMAND", default_value = "claude")]
    agent_command: String,

    /// Cleanup agent timeout in seconds.
    #[arg(long, env = "PAPER2MD_AGENT_TIMEOUT", default_value_t = 1800)]
    agent_timeout: u64,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Directory containing PDF files.
    input_dir: PathBuf,

    /// Directory receiving one sub-directory per paper, plus logs.
    output_dir: PathBuf,

    /// Skip the first N PDFs (resume after an interrupted run).
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Only process N PDFs (after --skip).
    #[arg(long)]
    limit: Option<usize>,

    /// Documents converted concurrently.
    #[arg(short, long, env = "PAPER2MD_JOBS", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..=64))]
    jobs: u16,

    /// List the PDFs that would be processed and exit.
    #[arg(long)]
    dry_run: bool,

    /// Don't keep `<stem>_raw.md` next to each result.
    #[arg(long)]
    no_raw: bool,

    /// Print the BatchSummary as JSON on stdout.
    #[arg(long, env = "PAPER2MD_JSON")]
    json: bool,

    #[command(flatten)]
    extract: ExtractArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Docling,
    Pdfium,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Docling => BackendKind::Docling,
            BackendArg::Pdfium => BackendKind::Pdfium,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs are noise while the spinner runs; it shows the stage.
    let show_progress = !cli.quiet && cli.command.wants_progress();
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

    match &cli.command {
        Command::Convert(args) => run_convert(&cli, args, show_progress).await,
        Command::Postprocess(args) => run_postprocess(&cli, args).await,
        Command::Agent(args) => run_agent_command(&cli, args).await,
        Command::Batch(args) => run_batch(&cli, args, show_progress).await,
    }
}

impl Command {
    fn wants_progress(&self) -> bool {
        match self {
            Command::Convert(a) => !a.json && !a.extract.no_progress,
            Command::Batch(a) => !a.json && !a.dry_run && !a.extract.no_progress,
            Command::Postprocess(_) | Command::Agent(_) => false,
        }
    }
}

// ── convert ──────────────────────────────────────────────────────────────────

async fn run_convert(cli: &Cli, args: &ConvertArgs, show_progress: bool) -> Result<ExitCode> {
    if BackendKind::from(args.extract.backend) == BackendKind::Pdfium {
        ensure_pdfium(cli.quiet)?;
    }

    let progress = show_progress.then(|| CliProgressCallback::new(false));
    let config = build_config(
        &args.extract,
        args.keep_raw,
        args.raw,
        progress.clone().map(|cb| cb as ProgressCallback),
    )?;

    let result = convert(&args.input, &args.output_dir, &config).await;
    if let Some(cb) = &progress {
        cb.finish();
    }
    let output = result.with_context(|| format!("Conversion of '{}' failed", args.input))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        print_conversion(&output);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_conversion(output: &ConversionOutput) {
    eprintln!(
        "{}  {}  {}",
        green("✔"),
        bold(&output.markdown_path.display().to_string()),
        dim(&format!("{}ms", output.stats.total_duration_ms))
    );
    if let Some(raw) = &output.raw_path {
        eprintln!("   raw:     {}", raw.display());
    }
    eprintln!(
        "   figures: {} kept, {} dropped",
        output.figures.len(),
        output.stats.images_dropped
    );
    if !output.unembedded_figures.is_empty() {
        eprintln!(
            "   {} not embedded (no caption found): {}",
            yellow("⚠"),
            output.unembedded_figures.join(", ")
        );
    }
    for err in &output.figure_errors {
        eprintln!("   {} {}", yellow("⚠"), err);
    }
    print_agent_outcome(&output.agent);
}

fn print_agent_outcome(outcome: &AgentOutcome) {
    match outcome {
        AgentOutcome::Disabled => {}
        AgentOutcome::Applied { summary } => {
            eprintln!("   {} agent cleanup applied", green("✓"));
            for line in summary.lines() {
                eprintln!("     {}", dim(line));
            }
        }
        AgentOutcome::NoChanges => {
            eprintln!("   {} agent made no changes; deterministic output kept", yellow("⚠"))
        }
        AgentOutcome::NotInstalled { command } => eprintln!(
            "   {} agent '{}' not installed; skipped",
            yellow("⚠"),
            command
        ),
        AgentOutcome::Failed { detail } => {
            eprintln!("   {} agent failed: {}", yellow("⚠"), detail)
        }
    }
}

// ── postprocess ──────────────────────────────────────────────────────────────

async fn run_postprocess(cli: &Cli, args: &PostprocessArgs) -> Result<ExitCode> {
    let options = PostprocessOptions {
        dehyphenate: args.dehyphenate,
        ..PostprocessOptions::default()
    };
    let report = postprocess_file(
        &args.markdown,
        args.images.as_deref(),
        args.output.as_deref(),
        &options,
    )
    .await
    .with_context(|| format!("Post-processing '{}' failed", args.markdown.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {}",
            green("✔"),
            bold(&report.output_path.display().to_string()),
            dim(&format!("{} → {} bytes", report.input_bytes, report.output_bytes))
        );
        eprintln!("   images available: {}", report.images_available);
        if !report.unembedded_figures.is_empty() {
            eprintln!(
                "   {} not embedded: {}",
                yellow("⚠"),
                report.unembedded_figures.join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ── agent ────────────────────────────────────────────────────────────────────

async fn run_agent_command(cli: &Cli, args: &AgentArgs) -> Result<ExitCode> {
    let config = AgentConfig {
        command: args.agent_command.clone(),
        timeout_secs: args.agent_timeout,
        verbose: cli.verbose,
        ..AgentConfig::default()
    };
    let outcome = run_agent(&args.markdown, args.images.as_deref(), &config)
        .await
        .with_context(|| format!("Cleanup agent on '{}' failed", args.markdown.display()))?;

    if !cli.quiet {
        print_agent_outcome(&outcome);
    }
    Ok(ExitCode::SUCCESS)
}

// ── batch ────────────────────────────────────────────────────────────────────

async fn run_batch(cli: &Cli, args: &BatchArgs, show_progress: bool) -> Result<ExitCode> {
    let all = discover_pdfs(&args.input_dir)
        .with_context(|| format!("Cannot read input directory '{}'", args.input_dir.display()))?;
    if all.is_empty() {
        anyhow::bail!("No PDF files found in {}", args.input_dir.display());
    }

    let options = BatchOptions {
        skip: args.skip,
        limit: args.limit,
        concurrency: usize::from(args.jobs),
    };
    let pdfs = options.select(&all);

    if !cli.quiet {
        eprintln!("{}", bold("PDF Batch Conversion"));
        eprintln!("  Input:   {}", args.input_dir.display());
        eprintln!("  Output:  {}", args.output_dir.display());
        eprintln!("  PDFs:    {} of {}", pdfs.len(), all.len());
        eprintln!("  Backend: {}", BackendKind::from(args.extract.backend));
        eprintln!("  Keep raw: {}   Agent: {}   Jobs: {}", !args.no_raw, args.extract.agent, args.jobs);
    }

    if args.dry_run {
        for (i, pdf) in pdfs.iter().enumerate() {
            let name = pdf.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            println!("{:>4}. {}", i + 1 + args.skip, name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if BackendKind::from(args.extract.backend) == BackendKind::Pdfium {
        ensure_pdfium(cli.quiet)?;
    }

    let progress = show_progress.then(|| CliProgressCallback::new(true));
    let config = build_config(
        &args.extract,
        !args.no_raw,
        false,
        progress.clone().map(|cb| cb as ProgressCallback),
    )?;

    let result = convert_batch(&pdfs, &args.output_dir, &config, &options).await;
    if let Some(cb) = &progress {
        cb.finish();
    }
    let summary = result.context("Batch conversion failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        let secs = summary.total_duration_ms as f64 / 1000.0;
        eprintln!(
            "{} {}/{} succeeded in {:.1}s  →  {}",
            if summary.failed() == 0 { green("✔") } else { red("✘") },
            bold(&summary.succeeded().to_string()),
            summary.items.len(),
            secs,
            summary.summary_path.display()
        );
        for item in summary.failed_items() {
            eprintln!(
                "   {} {}  {}",
                red("✗"),
                item.name,
                dim(&item.log_path.display().to_string())
            );
        }
    }

    Ok(if summary.failed() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Map CLI args to `ConversionConfig`.
fn build_config(
    args: &ExtractArgs,
    keep_raw: bool,
    raw: bool,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .backend(args.backend.into())
        .python(args.python.clone())
        .images_scale(args.images_scale)
        .keep_raw(keep_raw)
        .raw(raw)
        .dehyphenate(args.dehyphenate)
        .download_timeout_secs(args.download_timeout);

    if args.agent {
        builder = builder.agent(AgentConfig {
            command: args.agent_command.clone(),
            timeout_secs: args.agent_timeout,
            ..AgentConfig::default()
        });
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Download pdfium up front with a progress bar, so the first conversion
/// doesn't appear to hang.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        pdfium_auto::ensure_pdfium_library(None).context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert() {
        let cli = Cli::try_parse_from([
            "paper2md",
            "convert",
            "--backend",
            "pdfium",
            "--keep-raw",
            "paper.pdf",
            "out",
        ])
        .unwrap();
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.input, "paper.pdf");
                assert!(args.keep_raw);
                assert!(matches!(args.extract.backend, BackendArg::Pdfium));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_batch_and_global_flags() {
        let cli = Cli::try_parse_from([
            "paper2md", "batch", "pdfs", "out", "--skip", "2", "--limit", "3", "-j", "4", "-q",
        ])
        .unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Batch(args) => {
                assert_eq!(args.skip, 2);
                assert_eq!(args.limit, Some(3));
                assert_eq!(args.jobs, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn short_names() {
        assert_eq!(short_name("/tmp/papers/hermes.pdf"), "hermes.pdf");
        assert_eq!(short_name("https://arxiv.org/pdf/1706.03762"), "1706.03762");
        assert_eq!(short_name("paper.pdf"), "paper.pdf");
    }
}
