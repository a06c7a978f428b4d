//! Extraction backends: PDF → raw Markdown plus candidate figure images.
//!
//! Extraction is the only stage that understands PDF. Everything downstream
//! works on the [`Extraction`] it returns, so backends can be swapped without
//! touching the post-processor.
//!
//! | Backend | How | Installed via |
//! |---------|-----|---------------|
//! | [`DoclingBackend`] | Python helper process driving Docling | `pip install docling` |
//! | [`PdfiumBackend`]  | pdfium text and image objects, in-process | auto-downloaded |
//!
//! Backends are blocking (ML inference, pdfium's C API). Callers run them on
//! `tokio::task::spawn_blocking`; see [`extract`].

pub mod docling;
pub mod pdfium;

use crate::config::{BackendKind, ConversionConfig};
use crate::error::Paper2MdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use docling::DoclingBackend;
pub use pdfium::PdfiumBackend;

/// Output of an extraction backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Raw Markdown exactly as the backend produced it.
    pub markdown: String,
    /// Candidate figure images inside the work directory, in document order.
    pub images: Vec<PathBuf>,
}

/// A PDF extraction backend.
///
/// `Send + Sync` so one instance can serve concurrent batch workers.
pub trait ExtractionBackend: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Extract `pdf` into `work_dir` (which exists and is empty).
    ///
    /// Missing tooling must be reported as
    /// [`Paper2MdError::BackendNotInstalled`]; a failure on this document as
    /// [`Paper2MdError::ExtractionFailed`].
    fn extract(
        &self,
        pdf: &Path,
        work_dir: &Path,
        images_scale: f32,
    ) -> Result<Extraction, Paper2MdError>;
}

/// Build the backend selected in `config`.
pub fn backend_for(config: &ConversionConfig) -> Arc<dyn ExtractionBackend> {
    match config.backend {
        BackendKind::Docling => Arc::new(DoclingBackend::new(config.python.clone())),
        BackendKind::Pdfium => Arc::new(PdfiumBackend),
    }
}

/// Run `backend` on a blocking thread.
pub async fn extract(
    backend: Arc<dyn ExtractionBackend>,
    pdf: &Path,
    work_dir: &Path,
    images_scale: f32,
) -> Result<Extraction, Paper2MdError> {
    let pdf = pdf.to_path_buf();
    let work_dir = work_dir.to_path_buf();
    tokio::task::spawn_blocking(move || backend.extract(&pdf, &work_dir, images_scale))
        .await
        .map_err(|e| Paper2MdError::Internal(format!("Extraction task panicked: {}", e)))?
}
