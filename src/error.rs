//! Error types for the paper2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Paper2MdError`]: **Fatal**: the conversion cannot proceed at all
//!   (missing input, extraction backend not installed, output not writable).
//!   Returned as `Err(Paper2MdError)` from the top-level functions.
//!
//! * [`FigureError`]: **Non-fatal**: one figure image could not be inspected
//!   or copied, but the document itself converted fine. Stored inside
//!   [`crate::output::ConversionOutput`] so callers can report it.
//!
//! The post-processing passes themselves never fail: text they do not
//! recognise passes through unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2md library.
#[derive(Debug, Error)]
pub enum Paper2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// An input Markdown file or image directory could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The extraction backend is not available on this machine.
    #[error("Extraction backend '{backend}' is not installed.\n{hint}")]
    BackendNotInstalled { backend: String, hint: String },

    /// The backend is installed but failed on this document.
    #[error("Extraction with '{backend}' failed: {detail}")]
    ExtractionFailed { backend: String, detail: String },

    // ── Agent errors ──────────────────────────────────────────────────────
    /// The cleanup agent command could not be found on `PATH`.
    #[error("Cleanup agent '{command}' not found.\nInstall it or run without --agent.")]
    AgentNotInstalled { command: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Paper2MdError {
    /// True for errors that mean "a tool is missing", as opposed to a
    /// tool that ran and failed.
    pub fn is_not_installed(&self) -> bool {
        matches!(
            self,
            Paper2MdError::BackendNotInstalled { .. } | Paper2MdError::AgentNotInstalled { .. }
        )
    }
}

/// A non-fatal error for a single figure image.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FigureError {
    /// The image could not be decoded to check its dimensions. It is kept.
    #[error("Image '{path}' could not be inspected: {detail}")]
    Unreadable { path: PathBuf, detail: String },

    /// The image passed the filter but copying it into `img/` failed.
    #[error("Image '{path}' could not be copied: {detail}")]
    CopyFailed { path: PathBuf, detail: String },
}
