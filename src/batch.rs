//! Batch conversion of a directory of papers.
//!
//! Every document gets its own `<stem>/` directory (see [`crate::convert`]) and
//! a log under `logs/<stem>.log`. `batch_summary.log` is rewritten after each
//! document so a long run can be watched with `tail -f`.
//!
//! ```text
//! <output_dir>/
//!   batch_summary.log
//!   logs/<stem>.log
//!   <stem>/<stem>.md
//! ```
//!
//! A failing document is recorded and the batch moves on.

use crate::config::ConversionConfig;
use crate::convert::convert;
use crate::error::Paper2MdError;
use crate::output::{AgentOutcome, ConversionOutput};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use walkdir::WalkDir;

pub const SUMMARY_FILE: &str = "batch_summary.log";
pub const LOGS_DIR: &str = "logs";

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// PDF files (`.pdf`, any case) directly inside `dir`, sorted by name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, Paper2MdError> {
    if !dir.is_dir() {
        return Err(Paper2MdError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut pdfs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Paper2MdError::ReadFailed {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if entry.file_type().is_file() && is_pdf {
            pdfs.push(entry.into_path());
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Which documents of a batch to run, and how many at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Skip the first N documents (resume after an interrupted run). Default: 0.
    pub skip: usize,
    /// Process at most N documents after skipping. Default: all.
    pub limit: Option<usize>,
    /// Documents converted concurrently. Default: 1.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: None,
            concurrency: 1,
        }
    }
}

impl BatchOptions {
    /// Apply `skip`, then `limit`.
    pub fn select(&self, pdfs: &[PathBuf]) -> Vec<PathBuf> {
        pdfs.iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Result of one document in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub pdf: PathBuf,
    /// File name of the PDF, as shown in logs.
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub log_path: PathBuf,
    /// Written Markdown, on success.
    pub markdown_path: Option<PathBuf>,
    /// Error message, on failure.
    pub error: Option<String>,
}

/// Result of [`convert_batch`]. Items are in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub output_dir: PathBuf,
    pub summary_path: PathBuf,
    pub items: Vec<BatchItem>,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.success).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| !i.success)
    }
}

/// Convert `pdfs` into `output_dir`, at most `options.concurrency` at a time.
///
/// Only failing to create `output_dir` or its `logs/` directory is an error;
/// per-document failures are recorded in the summary. `options.skip` and
/// `options.limit` are not applied here, see [`BatchOptions::select`].
pub async fn convert_batch(
    pdfs: &[PathBuf],
    output_dir: &Path,
    config: &ConversionConfig,
    options: &BatchOptions,
) -> Result<BatchSummary, Paper2MdError> {
    let total_start = Instant::now();
    let logs_dir = output_dir.join(LOGS_DIR);
    tokio::fs::create_dir_all(&logs_dir)
        .await
        .map_err(|e| Paper2MdError::OutputWriteFailed {
            path: logs_dir.clone(),
            source: e,
        })?;

    let total = pdfs.len();
    info!(
        "Batch: {} PDFs → {} (concurrency {})",
        total,
        output_dir.display(),
        options.concurrency.max(1)
    );

    let mut summary = BatchSummary {
        output_dir: output_dir.to_path_buf(),
        summary_path: output_dir.join(SUMMARY_FILE),
        items: Vec::with_capacity(total),
        total_duration_ms: 0,
    };
    let mut finished: Vec<(usize, BatchItem)> = Vec::with_capacity(total);

    let mut results = stream::iter(pdfs.iter().enumerate().map(|(idx, pdf)| {
        let logs_dir = logs_dir.clone();
        async move {
            let item = convert_one(pdf, idx + 1, total, output_dir, &logs_dir, config).await;
            (idx, item)
        }
    }))
    .buffer_unordered(options.concurrency.max(1));

    while let Some((idx, item)) = results.next().await {
        finished.push((idx, item));
        // Rewritten after every document for monitoring long runs.
        summary.items = in_input_order(&finished);
        summary.total_duration_ms = total_start.elapsed().as_millis() as u64;
        write_summary_log(&summary, config).await;
    }

    summary.items = in_input_order(&finished);
    summary.total_duration_ms = total_start.elapsed().as_millis() as u64;
    write_summary_log(&summary, config).await;

    info!(
        "Batch complete: {} succeeded, {} failed in {:.1}s",
        summary.succeeded(),
        summary.failed(),
        summary.total_duration_ms as f64 / 1000.0
    );
    Ok(summary)
}

fn in_input_order(finished: &[(usize, BatchItem)]) -> Vec<BatchItem> {
    let mut sorted: Vec<&(usize, BatchItem)> = finished.iter().collect();
    sorted.sort_by_key(|(idx, _)| *idx);
    sorted.into_iter().map(|(_, item)| item.clone()).collect()
}

async fn convert_one(
    pdf: &Path,
    index: usize,
    total: usize,
    output_dir: &Path,
    logs_dir: &Path,
    config: &ConversionConfig,
) -> BatchItem {
    let name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf.display().to_string());
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());
    let log_path = logs_dir.join(format!("{stem}.log"));

    info!("[{}/{}] Processing: {}", index, total, name);
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(index, total, &name);
    }
    write_log(&log_path, &log_header(&name, config, "IN PROGRESS...")).await;

    let start = Instant::now();
    let result = convert(pdf.to_string_lossy(), output_dir, config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let mut log = log_header(&name, config, if result.is_ok() { "SUCCESS" } else { "FAILED" });
    log.push_str(&log_body(&result, duration_ms));
    write_log(&log_path, &log).await;

    let success = result.is_ok();
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(index, total, &name, success);
    }

    match result {
        Ok(output) => {
            info!(
                "[{}/{}] SUCCESS in {:.1}s: {}",
                index,
                total,
                duration_ms as f64 / 1000.0,
                name
            );
            BatchItem {
                pdf: pdf.to_path_buf(),
                name,
                success,
                duration_ms,
                log_path,
                markdown_path: Some(output.markdown_path),
                error: None,
            }
        }
        Err(e) => {
            warn!("[{}/{}] FAILED: {}: {}", index, total, name, e);
            BatchItem {
                pdf: pdf.to_path_buf(),
                name,
                success,
                duration_ms,
                log_path,
                markdown_path: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Log write failures must not fail the document; they are only warned about.
async fn write_log(path: &Path, content: &str) {
    if let Err(e) = tokio::fs::write(path, content).await {
        warn!("Cannot write log {}: {}", path.display(), e);
    }
}

fn log_header(name: &str, config: &ConversionConfig, status: &str) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# PDF Conversion Log: {name}");
    let _ = writeln!(s, "# Backend: {}", config.backend);
    let _ = writeln!(s, "# Keep raw: {}", config.keep_raw || config.raw);
    let _ = writeln!(s, "# Agent cleanup: {}", config.agent.is_some() && !config.raw);
    let _ = writeln!(s, "# Status: {status}");
    let _ = writeln!(s, "{RULE}");
    s
}

fn log_body(result: &Result<ConversionOutput, Paper2MdError>, duration_ms: u64) -> String {
    let mut s = String::new();
    match result {
        Ok(output) => {
            let _ = writeln!(s, "Markdown:   {}", output.markdown_path.display());
            if let Some(raw) = &output.raw_path {
                let _ = writeln!(s, "Raw:        {}", raw.display());
            }
            let _ = writeln!(
                s,
                "Figures:    {} kept, {} dropped",
                output.figures.len(),
                output.stats.images_dropped
            );
            if !output.unembedded_figures.is_empty() {
                let _ = writeln!(s, "Unembedded: {}", output.unembedded_figures.join(", "));
            }
            for err in &output.figure_errors {
                let _ = writeln!(s, "Figure error: {err}");
            }
            let agent = match &output.agent {
                AgentOutcome::Disabled => "disabled".to_string(),
                AgentOutcome::Applied { summary } => format!("applied\n{summary}"),
                AgentOutcome::NoChanges => "no changes".to_string(),
                AgentOutcome::NotInstalled { command } => format!("'{command}' not installed"),
                AgentOutcome::Failed { detail } => format!("failed: {detail}"),
            };
            let _ = writeln!(s, "Agent:      {agent}");
        }
        Err(e) => {
            let _ = writeln!(s, "Error: {e}");
        }
    }
    let _ = writeln!(s, "{RULE}");
    let _ = writeln!(s, "# Duration: {:.1}s", duration_ms as f64 / 1000.0);
    s
}

/// Render the summary log text.
pub fn render_summary(summary: &BatchSummary, config: &ConversionConfig) -> String {
    let total = summary.items.len();
    let secs = summary.total_duration_ms as f64 / 1000.0;
    let mut s = String::new();

    let _ = writeln!(s, "{RULE}");
    let _ = writeln!(s, "BATCH CONVERSION SUMMARY");
    let _ = writeln!(s, "{RULE}\n");
    let _ = writeln!(s, "Output:     {}", summary.output_dir.display());
    let _ = writeln!(s, "Total PDFs: {total}");
    let _ = writeln!(s, "Successful: {}", summary.succeeded());
    let _ = writeln!(s, "Failed:     {}", summary.failed());
    let _ = writeln!(s, "Duration:   {:.1} minutes ({:.1}s)", secs / 60.0, secs);
    if total > 0 {
        let _ = writeln!(s, "Average:    {:.1}s per PDF", secs / total as f64);
    }
    let _ = writeln!(s);

    let _ = writeln!(s, "Options:");
    let _ = writeln!(s, "  - Backend:       {}", config.backend);
    let _ = writeln!(s, "  - Keep raw:      {}", config.keep_raw || config.raw);
    let _ = writeln!(s, "  - Raw only:      {}", config.raw);
    let _ = writeln!(s, "  - Agent cleanup: {}\n", config.agent.is_some() && !config.raw);

    let _ = writeln!(s, "{THIN_RULE}");
    let _ = writeln!(s, "RESULTS BY PDF");
    let _ = writeln!(s, "{THIN_RULE}\n");
    for item in &summary.items {
        let status = if item.success { "OK" } else { "FAILED" };
        let _ = writeln!(
            s,
            "[{:6}] {:7.1}s  {}",
            status,
            item.duration_ms as f64 / 1000.0,
            item.name
        );
    }

    if summary.failed() > 0 {
        let _ = writeln!(s, "\n{THIN_RULE}");
        let _ = writeln!(s, "FAILED PDFs (review individual logs)");
        let _ = writeln!(s, "{THIN_RULE}\n");
        for item in summary.failed_items() {
            let _ = writeln!(s, "  - {}", item.name);
            if let Some(err) = &item.error {
                let _ = writeln!(s, "    Error: {err}");
            }
            let log_name = item
                .log_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let _ = writeln!(s, "    Log: {LOGS_DIR}/{log_name}");
        }
    }
    s
}

async fn write_summary_log(summary: &BatchSummary, config: &ConversionConfig) {
    write_log(&summary.summary_path, &render_summary(summary, config)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn discovers_pdfs_case_insensitive_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.pdf", b"%PDF");
        touch(dir.path(), "A.PDF", b"%PDF");
        touch(dir.path(), "notes.txt", b"x");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "c.pdf", b"%PDF");

        let names: Vec<String> = discover_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn discover_missing_dir() {
        let err = discover_pdfs(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, Paper2MdError::FileNotFound { .. }));
    }

    #[test]
    fn select_applies_skip_then_limit() {
        let pdfs: Vec<PathBuf> = (1..=5).map(|i| PathBuf::from(format!("{i}.pdf"))).collect();
        let opts = BatchOptions {
            skip: 1,
            limit: Some(2),
            ..BatchOptions::default()
        };
        assert_eq!(
            opts.select(&pdfs),
            vec![PathBuf::from("2.pdf"), PathBuf::from("3.pdf")]
        );
        assert_eq!(BatchOptions::default().select(&pdfs).len(), 5);
        let past_end = BatchOptions {
            skip: 10,
            ..BatchOptions::default()
        };
        assert!(past_end.select(&pdfs).is_empty());
    }

    #[tokio::test]
    async fn failures_are_recorded_not_fatal() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let pdfs = vec![
            touch(src.path(), "bad.pdf", b"not a pdf at all"),
            src.path().join("missing.pdf"),
        ];
        let summary = convert_batch(
            &pdfs,
            out.path(),
            &ConversionConfig::default(),
            &BatchOptions {
                concurrency: 2,
                ..BatchOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.items[0].name, "bad.pdf");
        assert_eq!(summary.items[1].name, "missing.pdf");
        assert!(summary.items.iter().all(|i| i.error.is_some() && i.markdown_path.is_none()));

        let log = std::fs::read_to_string(out.path().join("logs/bad.log")).unwrap();
        assert!(log.contains("# PDF Conversion Log: bad.pdf"));
        assert!(log.contains("# Status: FAILED"));

        let text = std::fs::read_to_string(&summary.summary_path).unwrap();
        assert!(text.contains("Total PDFs: 2"));
        assert!(text.contains("Failed:     2"));
        assert!(text.contains("Log: logs/missing.log"));
    }

    #[test]
    fn log_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.log");
        tokio_test::block_on(write_log(&path, "# Status: SUCCESS\n"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Status: SUCCESS\n");

        // Parent directory does not exist: warned about, not propagated.
        tokio_test::block_on(write_log(&dir.path().join("no/such/dir.log"), "x"));
    }

    #[test]
    fn summary_rendering() {
        let summary = BatchSummary {
            output_dir: PathBuf::from("/out"),
            summary_path: PathBuf::from("/out/batch_summary.log"),
            items: vec![
                BatchItem {
                    pdf: PathBuf::from("a.pdf"),
                    name: "a.pdf".into(),
                    success: true,
                    duration_ms: 12_300,
                    log_path: PathBuf::from("/out/logs/a.log"),
                    markdown_path: Some(PathBuf::from("/out/a/a.md")),
                    error: None,
                },
                BatchItem {
                    pdf: PathBuf::from("b.pdf"),
                    name: "b.pdf".into(),
                    success: false,
                    duration_ms: 500,
                    log_path: PathBuf::from("/out/logs/b.log"),
                    markdown_path: None,
                    error: Some("extraction failed".into()),
                },
            ],
            total_duration_ms: 12_800,
        };
        let text = render_summary(&summary, &ConversionConfig::default());
        assert!(text.contains("[OK    ]    12.3s  a.pdf"));
        assert!(text.contains("[FAILED]     0.5s  b.pdf"));
        assert!(text.contains("Average:    6.4s per PDF"));
        assert!(text.contains("    Error: extraction failed"));
        assert!(text.contains("    Log: logs/b.log"));
        assert!(text.contains("  - Backend:       docling"));
    }
}
