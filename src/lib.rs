//! # paper2md
//!
//! Convert academic PDF papers to clean, navigable Markdown.
//!
//! ## Why this crate?
//!
//! Layout extractors get the words of a paper right but lose its structure:
//! numbered subsections come out as plain lines, `[3]-[5]` is dead text, the
//! bibliography has no anchors, figures float away from their captions and
//! ligatures such as `ﬁ` break search. This crate runs an extractor, then a
//! deterministic post-processor that puts that structure back. An external
//! LLM agent can optionally polish the written file afterwards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input        resolve local file or download from URL
//!  ├─ 2. Extract      Docling (Python helper) or pdfium (native), spawn_blocking
//!  ├─ 3. Figures      drop logos/badges, renumber as figureN.png
//!  ├─ 4. Postprocess  sections → citations → figures → bibliography → typography
//!  ├─ 5. Write        <stem>.md (atomic), optional <stem>_raw.md
//!  └─ 6. Agent        optional cleanup CLI on the written file
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2md::{convert, BackendKind, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .backend(BackendKind::Pdfium)
//!         .build()?;
//!     let output = convert("paper.pdf", "out", &config).await?;
//!     println!("{} ({} figures)", output.markdown_path.display(), output.figures.len());
//!     Ok(())
//! }
//! ```
//!
//! The post-processor alone needs no PDF at all:
//!
//! ```rust
//! let md = paper2md::process_markdown("Abstract -We study caches.", &["figure1.png"]);
//! assert!(md.starts_with("## Abstract\n\nWe study caches."));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2md = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{convert_batch, discover_pdfs, BatchItem, BatchOptions, BatchSummary};
pub use config::{BackendKind, ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, convert_with_backend, postprocess_file, run_agent};
pub use error::{FigureError, Paper2MdError};
pub use output::{AgentOutcome, ConversionOutput, ConversionStats, PostprocessReport};
pub use pipeline::agent::AgentConfig;
pub use pipeline::extract::{Extraction, ExtractionBackend};
pub use pipeline::images::ImageFilter;
pub use pipeline::postprocess::{
    cleanup_text, process_bibliography, process_citations, process_figures, process_markdown,
    process_markdown_with, process_sections, PostprocessOptions,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
