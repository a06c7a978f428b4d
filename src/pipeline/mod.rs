//! Pipeline stages for paper-to-Markdown conversion.
//!
//! Each submodule implements one step, so stages can be tested on their own
//! and the extraction backend can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ images ──▶ postprocess ──▶ (write) ──▶ agent
//! (URL/path) (docling/   (filter,   (sections, cites,          (optional
//!             pdfium)     renumber)  figures, bib, typo)        LLM CLI)
//! ```
//!
//! 1. [`input`]  : canonicalise the user-supplied path or URL to a local PDF
//! 2. [`extract`]: raw Markdown plus candidate pictures; blocking, so it runs
//!    in `spawn_blocking`
//! 3. [`images`] : drop logos and badges, copy figures as `figureN.png`
//! 4. [`postprocess`]: deterministic structure reconstruction
//! 5. [`agent`]  : optional external cleanup on the written file

pub mod agent;
pub mod extract;
pub mod images;
pub mod input;
pub mod postprocess;
