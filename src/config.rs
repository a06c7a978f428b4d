//! Configuration types for paper conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared across batch workers and logged in full.

use crate::error::Paper2MdError;
use crate::pipeline::agent::AgentConfig;
use crate::pipeline::images::ImageFilter;
use crate::pipeline::postprocess::PostprocessOptions;
use crate::progress::ConversionProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a PDF-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2md::{BackendKind, ConversionConfig};
///
/// let config = ConversionConfig::builder()
///     .backend(BackendKind::Pdfium)
///     .images_scale(1.5)
///     .keep_raw(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Extraction backend. Default: [`BackendKind::Docling`].
    pub backend: BackendKind,

    /// Python interpreter used to run the Docling helper. Default: `python3`.
    pub python: String,

    /// Resolution multiplier for extracted figure images. Range: 0.25–8.0. Default: 2.0.
    ///
    /// Docling renders pictures at `72 dpi × scale`; the pdfium backend resizes
    /// embedded rasters by the same factor.
    pub images_scale: f32,

    /// Size thresholds below which an image is treated as a logo or badge.
    pub image_filter: ImageFilter,

    /// Write the unprocessed extraction next to the result as `<stem>_raw.md`. Default: false.
    pub keep_raw: bool,

    /// Skip post-processing and the agent; the output is the raw extraction. Default: false.
    pub raw: bool,

    /// Options for the deterministic post-processing pipeline.
    pub postprocess: PostprocessOptions,

    /// Cleanup agent to run on the written file. Default: None (disabled).
    pub agent: Option<AgentConfig>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives stage events while a document converts.
    pub progress_callback: Option<Arc<dyn ConversionProgressCallback>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            python: "python3".to_string(),
            images_scale: 2.0,
            image_filter: ImageFilter::default(),
            keep_raw: false,
            raw: false,
            postprocess: PostprocessOptions::default(),
            agent: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("backend", &self.backend)
            .field("python", &self.python)
            .field("images_scale", &self.images_scale)
            .field("image_filter", &self.image_filter)
            .field("keep_raw", &self.keep_raw)
            .field("raw", &self.raw)
            .field("postprocess", &self.postprocess)
            .field("agent", &self.agent)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn python(mut self, python: impl Into<String>) -> Self {
        self.config.python = python.into();
        self
    }

    pub fn images_scale(mut self, scale: f32) -> Self {
        self.config.images_scale = scale;
        self
    }

    pub fn image_filter(mut self, filter: ImageFilter) -> Self {
        self.config.image_filter = filter;
        self
    }

    pub fn keep_raw(mut self, v: bool) -> Self {
        self.config.keep_raw = v;
        self
    }

    pub fn raw(mut self, v: bool) -> Self {
        self.config.raw = v;
        self
    }

    pub fn postprocess(mut self, options: PostprocessOptions) -> Self {
        self.config.postprocess = options;
        self
    }

    pub fn dehyphenate(mut self, v: bool) -> Self {
        self.config.postprocess.dehyphenate = v;
        self
    }

    pub fn agent(mut self, agent: AgentConfig) -> Self {
        self.config.agent = Some(agent);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ConversionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Paper2MdError> {
        let c = &self.config;
        if !(0.25..=8.0).contains(&c.images_scale) {
            return Err(Paper2MdError::InvalidConfig(format!(
                "images scale must be 0.25–8.0, got {}",
                c.images_scale
            )));
        }
        if c.python.trim().is_empty() {
            return Err(Paper2MdError::InvalidConfig(
                "python interpreter must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(Paper2MdError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(agent) = &c.agent {
            if agent.command.trim().is_empty() {
                return Err(Paper2MdError::InvalidConfig(
                    "agent command must not be empty".into(),
                ));
            }
            if agent.timeout_secs == 0 {
                return Err(Paper2MdError::InvalidConfig(
                    "agent timeout must be ≥ 1 second".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which extraction backend turns the PDF into raw Markdown and images.
///
/// | Backend | Strength |
/// |---------|----------|
/// | Docling | Layout model: real headings, tables, picture crops (default) |
/// | Pdfium  | No Python needed; plain text lines and embedded rasters only |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Docling via a Python helper process. (default)
    #[default]
    Docling,
    /// Native pdfium text and image extraction.
    Pdfium,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Docling => "docling",
            BackendKind::Pdfium => "pdfium",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Paper2MdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docling" => Ok(BackendKind::Docling),
            "pdfium" => Ok(BackendKind::Pdfium),
            other => Err(Paper2MdError::InvalidConfig(format!(
                "unknown backend '{other}' (expected docling or pdfium)"
            ))),
        }
    }
}
