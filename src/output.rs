//! Output types returned by the conversion entry points.
//!
//! Everything here is `Serialize` so the CLI can print it with `--json` and
//! batch runs can log it.

use crate::config::BackendKind;
use crate::error::{FigureError, Paper2MdError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of converting one PDF.
///
/// Files written under `<output_dir>/<stem>/`:
///
/// ```text
/// <stem>.md        final Markdown
/// <stem>_raw.md    raw extraction (keep_raw / raw only)
/// img/figureN.png  selected figures
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Final Markdown file.
    pub markdown_path: PathBuf,
    /// Raw extraction, when it was kept.
    pub raw_path: Option<PathBuf>,
    /// Directory holding the figure images.
    pub img_dir: PathBuf,
    /// Figure file names in `img_dir`, in document order.
    pub figures: Vec<String>,
    /// Figures that no caption claimed; they exist on disk but are not embedded.
    pub unembedded_figures: Vec<String>,
    /// Non-fatal figure problems.
    pub figure_errors: Vec<FigureError>,
    /// What the cleanup agent did.
    pub agent: AgentOutcome,
    pub stats: ConversionStats,
}

/// Timing and size statistics for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub backend: BackendKind,
    /// Images the backend returned before filtering.
    pub images_extracted: usize,
    /// Images rejected as logos or badges.
    pub images_dropped: usize,
    /// Byte length of the raw extraction.
    pub raw_bytes: usize,
    /// Byte length of the written Markdown (before the agent).
    pub markdown_bytes: usize,
    pub extract_duration_ms: u64,
    pub postprocess_duration_ms: u64,
    pub agent_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Outcome of the optional cleanup agent.
///
/// Never an error: the deterministic output is always kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// No agent configured, or `raw` mode.
    #[default]
    Disabled,
    /// The agent ran and reported its changes.
    Applied { summary: String },
    /// The agent ran but failed, timed out or said nothing.
    NoChanges,
    /// The agent command is not installed.
    NotInstalled { command: String },
    /// The agent could not be run for another reason.
    Failed { detail: String },
}

impl AgentOutcome {
    /// Map the agent runner's result onto an outcome.
    pub fn from_result(result: Result<Option<String>, Paper2MdError>) -> Self {
        match result {
            Ok(Some(summary)) => AgentOutcome::Applied { summary },
            Ok(None) => AgentOutcome::NoChanges,
            Err(Paper2MdError::AgentNotInstalled { command }) => {
                AgentOutcome::NotInstalled { command }
            }
            Err(e) => AgentOutcome::Failed {
                detail: e.to_string(),
            },
        }
    }
}

/// Result of [`crate::convert::postprocess_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostprocessReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Image files found in the images directory.
    pub images_available: usize,
    /// Image files the document does not embed.
    pub unembedded_figures: Vec<String>,
    pub input_bytes: usize,
    pub output_bytes: usize,
}
