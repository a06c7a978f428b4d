//! Single-document conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one paper and leaves this layout
//! behind:
//!
//! ```text
//! <output_dir>/<stem>/
//!   <stem>.md          final Markdown
//!   <stem>_raw.md      raw extraction (keep_raw / raw)
//!   img/figureN.png    selected figures
//! ```
//!
//! [`postprocess_file`] and [`run_agent`] expose the later stages on their own
//! for Markdown that was extracted earlier.

use crate::config::ConversionConfig;
use crate::error::Paper2MdError;
use crate::output::{AgentOutcome, ConversionOutput, ConversionStats, PostprocessReport};
use crate::pipeline::agent::{run_cleanup_agent, AgentConfig};
use crate::pipeline::extract::{self, ExtractionBackend};
use crate::pipeline::images::{list_image_files, select_figures};
use crate::pipeline::input;
use crate::pipeline::postprocess::{find_unembedded_figures, process_markdown_with, PostprocessOptions};
use crate::progress::Stage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF file or URL to Markdown under `output_dir/<stem>/`.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: Local file path or HTTP/HTTPS URL to a PDF
/// * `output_dir`: Parent directory; a `<stem>/` directory is created in it
/// * `config`: Conversion configuration
///
/// # Errors
/// Returns `Err(Paper2MdError)` only for fatal errors: bad input, missing
/// backend, failed extraction, or an unwritable output. Figure problems and
/// cleanup-agent failures are reported inside [`ConversionOutput`].
pub async fn convert(
    input: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Paper2MdError> {
    let backend = extract::backend_for(config);
    convert_with_backend(input, output_dir, config, backend).await
}

/// Like [`convert`], with a caller-supplied extraction backend.
///
/// `config.backend` is only recorded in the statistics; extraction goes
/// through `backend`.
pub async fn convert_with_backend(
    input: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
    backend: Arc<dyn ExtractionBackend>,
) -> Result<ConversionOutput, Paper2MdError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();
    let cb = config.progress_callback.as_ref();
    info!("Starting conversion: {}", input);
    if let Some(cb) = cb {
        cb.on_conversion_start(input);
    }

    // ── Step 1: Resolve input ────────────────────────────────────────────
    notify_start(config, Stage::Resolve);
    let resolved = input::resolve_input(input, config.download_timeout_secs).await?;
    let stem = resolved.stem();
    let doc_dir = output_dir.join(&stem);
    let img_dir = doc_dir.join("img");
    notify_complete(config, Stage::Resolve);

    // ── Step 2: Extract into a scratch directory ─────────────────────────
    notify_start(config, Stage::Extract);
    let work_dir = tempfile::TempDir::new()
        .map_err(|e| Paper2MdError::Internal(format!("tempdir: {e}")))?;
    let extract_start = Instant::now();
    let extraction = extract::extract(
        Arc::clone(&backend),
        resolved.path(),
        work_dir.path(),
        config.images_scale,
    )
    .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} bytes and {} images with {} in {}ms",
        extraction.markdown.len(),
        extraction.images.len(),
        backend.name(),
        extract_duration_ms
    );
    notify_complete(config, Stage::Extract);

    create_dir(&doc_dir).await?;

    // ── Step 3: Select figures ───────────────────────────────────────────
    notify_start(config, Stage::Figures);
    // Figures from an earlier run would be renumbered over; start clean.
    if img_dir.exists() {
        tokio::fs::remove_dir_all(&img_dir)
            .await
            .map_err(|e| Paper2MdError::OutputWriteFailed {
                path: img_dir.clone(),
                source: e,
            })?;
    }
    let selection = select_figures(&extraction.images, &config.image_filter, &img_dir)?;
    let figures = selection.file_names();
    if let Some(cb) = cb {
        cb.on_figures_selected(figures.len(), selection.dropped);
    }
    info!(
        "Kept {} figures, dropped {} small images",
        figures.len(),
        selection.dropped
    );
    notify_complete(config, Stage::Figures);

    // ── Step 4: Keep the raw extraction ──────────────────────────────────
    let raw_path = if config.keep_raw || config.raw {
        let path = doc_dir.join(format!("{stem}_raw.md"));
        write_atomic(&path, &extraction.markdown).await?;
        debug!("Saved raw extraction: {}", path.display());
        Some(path)
    } else {
        None
    };

    // ── Step 5: Post-process ─────────────────────────────────────────────
    let postprocess_start = Instant::now();
    let markdown = if config.raw {
        extraction.markdown.clone()
    } else {
        notify_start(config, Stage::Postprocess);
        let processed = process_markdown_with(&extraction.markdown, &figures, &config.postprocess);
        notify_complete(config, Stage::Postprocess);
        processed
    };
    let postprocess_duration_ms = postprocess_start.elapsed().as_millis() as u64;
    let unembedded_figures = if config.raw {
        Vec::new()
    } else {
        find_unembedded_figures(&markdown, &figures)
    };
    if !unembedded_figures.is_empty() {
        warn!(
            "{} figure(s) not embedded: {}",
            unembedded_figures.len(),
            unembedded_figures.join(", ")
        );
    }

    // ── Step 6: Write the Markdown ───────────────────────────────────────
    notify_start(config, Stage::Write);
    let markdown_path = doc_dir.join(format!("{stem}.md"));
    write_atomic(&markdown_path, &markdown).await?;
    notify_complete(config, Stage::Write);
    info!("Wrote {}", markdown_path.display());

    // ── Step 7: Cleanup agent ────────────────────────────────────────────
    let agent_start = Instant::now();
    let agent = match (&config.agent, config.raw) {
        (Some(agent_config), false) => {
            notify_start(config, Stage::Agent);
            let outcome = AgentOutcome::from_result(
                run_cleanup_agent(&markdown_path, Some(&img_dir), agent_config).await,
            );
            match &outcome {
                AgentOutcome::NotInstalled { command } => warn!(
                    "Cleanup agent '{}' is not installed; keeping deterministic output",
                    command
                ),
                AgentOutcome::Failed { detail } => warn!("Cleanup agent failed: {}", detail),
                _ => {}
            }
            notify_complete(config, Stage::Agent);
            outcome
        }
        _ => AgentOutcome::Disabled,
    };
    let agent_duration_ms = agent_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        backend: config.backend,
        images_extracted: extraction.images.len(),
        images_dropped: selection.dropped,
        raw_bytes: extraction.markdown.len(),
        markdown_bytes: markdown.len(),
        extract_duration_ms,
        postprocess_duration_ms,
        agent_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} ({} figures, {}ms total)",
        markdown_path.display(),
        figures.len(),
        stats.total_duration_ms
    );
    if let Some(cb) = cb {
        cb.on_conversion_complete(&markdown_path);
    }

    Ok(ConversionOutput {
        markdown_path,
        raw_path,
        img_dir,
        figures,
        unembedded_figures,
        figure_errors: selection.errors,
        agent,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Paper2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Paper2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, output_dir, config))
}

/// Post-process an existing Markdown file.
///
/// * `images_dir`: defaults to `img/` next to the Markdown file; a missing
///   directory means no figures are embedded.
/// * `output`: defaults to overwriting `md_path`.
pub async fn postprocess_file(
    md_path: impl AsRef<Path>,
    images_dir: Option<&Path>,
    output: Option<&Path>,
    options: &PostprocessOptions,
) -> Result<PostprocessReport, Paper2MdError> {
    let md_path = md_path.as_ref();
    if !md_path.is_file() {
        return Err(Paper2MdError::FileNotFound {
            path: md_path.to_path_buf(),
        });
    }
    let content = tokio::fs::read_to_string(md_path)
        .await
        .map_err(|e| Paper2MdError::ReadFailed {
            path: md_path.to_path_buf(),
            source: e,
        })?;

    let images_dir = images_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_dir(md_path, "img"));
    let images = list_image_files(&images_dir)?;
    debug!(
        "Post-processing {} with {} images from {}",
        md_path.display(),
        images.len(),
        images_dir.display()
    );

    let processed = process_markdown_with(&content, &images, options);
    let unembedded_figures = find_unembedded_figures(&processed, &images);

    let output_path = output.unwrap_or(md_path).to_path_buf();
    write_atomic(&output_path, &processed).await?;
    info!("Post-processed {} → {}", md_path.display(), output_path.display());

    Ok(PostprocessReport {
        input_path: md_path.to_path_buf(),
        output_path,
        images_available: images.len(),
        unembedded_figures,
        input_bytes: content.len(),
        output_bytes: processed.len(),
    })
}

/// Run the cleanup agent on an existing Markdown file.
///
/// Unlike [`convert`], a missing agent command is an error here: running the
/// agent is the whole point of the call.
pub async fn run_agent(
    md_path: impl AsRef<Path>,
    images_dir: Option<&Path>,
    config: &AgentConfig,
) -> Result<AgentOutcome, Paper2MdError> {
    match run_cleanup_agent(md_path.as_ref(), images_dir, config).await {
        Err(e @ Paper2MdError::AgentNotInstalled { .. }) => Err(e),
        Err(e @ Paper2MdError::FileNotFound { .. }) => Err(e),
        result => Ok(AgentOutcome::from_result(result)),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn notify_start(config: &ConversionConfig, stage: Stage) {
    debug!("{}", stage.label());
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn notify_complete(config: &ConversionConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage);
    }
}

fn sibling_dir(file: &Path, name: &str) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

async fn create_dir(dir: &Path) -> Result<(), Paper2MdError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Paper2MdError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Write `content` to `path` via a temp file and rename, so readers never see
/// a partial file.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<(), Paper2MdError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent).await?;
    }

    let write_failed = |e| Paper2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, content).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)
}
