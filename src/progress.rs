//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a document moves through the pipeline, and as a batch moves
//! through its documents.
//!
//! The callback approach keeps the library ignorant of how the host reports
//! progress: the CLI drives an `indicatif` spinner, a service could forward
//! events to a channel. The trait is `Send + Sync` because batch conversion
//! runs documents concurrently.
//!
//! # Example
//!
//! ```rust
//! use paper2md::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter(AtomicUsize);
//!
//! impl ConversionProgressCallback for StageCounter {
//!     fn on_stage_start(&self, stage: Stage) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}…", stage.label());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One step of a single-document conversion, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Resolve a local path or download a URL.
    Resolve,
    /// Run the extraction backend.
    Extract,
    /// Filter and renumber figure images.
    Figures,
    /// Deterministic post-processing.
    Postprocess,
    /// Write the Markdown file(s).
    Write,
    /// Optional cleanup agent.
    Agent,
}

impl Stage {
    /// Short human-readable label, used by the CLI spinner.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Resolve => "Resolving input",
            Stage::Extract => "Extracting",
            Stage::Figures => "Selecting figures",
            Stage::Postprocess => "Post-processing",
            Stage::Write => "Writing",
            Stage::Agent => "Running cleanup agent",
        }
    }
}

/// Called by the conversion pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. During a batch with `concurrency > 1`, events for
/// different documents may arrive from different threads.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first stage of a document.
    fn on_conversion_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after figure selection with the number of kept and dropped images.
    fn on_figures_selected(&self, kept: usize, dropped: usize) {
        let _ = (kept, dropped);
    }

    /// Called once the final Markdown file has been written.
    fn on_conversion_complete(&self, output: &Path) {
        let _ = output;
    }

    /// Batch only: a document is about to start. `index` is 1-based.
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Batch only: a document finished, successfully or not.
    fn on_document_complete(&self, index: usize, total: usize, name: &str, success: bool) {
        let _ = (index, total, name, success);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
