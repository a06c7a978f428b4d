//! Post-processing: deterministic structure reconstruction of extracted Markdown.
//!
//! ## Why is post-processing necessary?
//!
//! PDF extraction flattens a paper. Headings lose their level, figures drift
//! away from their captions, citations are plain `[7]` text and the
//! bibliography has nothing to link to. Font glyphs such as `ﬁ` and
//! zero-width characters leak into the text.
//!
//! Each pass here is a pure `&str → String` rewrite built from regular
//! expressions and local context only. When a pass is unsure it leaves the
//! text alone; anything that needs judgement is left to the optional cleanup
//! agent in [`crate::pipeline::agent`].
//!
//! ## Pass Order
//!
//! The order is part of the contract:
//!
//! 0. line endings are normalised so every later pass sees `\n` only
//! 1. [`sections`] runs first so numbered headings exist before anything
//!    looks for the reference section
//! 2. [`citations`] links `[N]` markers in body text
//! 3. [`figures`] embeds images above captions
//! 4. [`bibliography`] anchors the entries the citation links point to
//! 5. [`typography`] runs last; it rewrites en-dashes, which the citation
//!    pass still needs to see as range separators

pub mod bibliography;
pub mod citations;
pub mod figures;
pub mod sections;
pub mod typography;

use tracing::debug;

pub use bibliography::{find_reference_section, process_bibliography};
pub use citations::process_citations;
pub use figures::{build_figure_map, find_unembedded_figures, process_figures};
pub use sections::{determine_heading_level, is_section_title, process_sections};
pub use typography::{cleanup_text, dehyphenate_line_breaks, DEFAULT_LIGATURES};

/// Tunables for [`process_markdown_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostprocessOptions {
    /// Glyph → replacement table applied by the typography pass.
    pub ligatures: &'static [(&'static str, &'static str)],
    /// Directory prefix for embedded figure links.
    pub image_base: String,
    /// Join `word-\nword` line-break hyphenation before cleanup.
    pub dehyphenate: bool,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self {
            ligatures: DEFAULT_LIGATURES,
            image_base: figures::DEFAULT_IMAGE_BASE.to_string(),
            dehyphenate: false,
        }
    }
}

/// Run the full pipeline with default options.
///
/// `images` are the figure image file names (not paths) available to the
/// document, e.g. `["figure1.png", "figure2.png"]`.
pub fn process_markdown<S: AsRef<str>>(content: &str, images: &[S]) -> String {
    process_markdown_with(content, images, &PostprocessOptions::default())
}

/// Run the full pipeline.
pub fn process_markdown_with<S: AsRef<str>>(
    content: &str,
    images: &[S],
    options: &PostprocessOptions,
) -> String {
    let s = normalise_line_endings(content);
    let s = process_sections(&s);
    let s = process_citations(&s);
    let s = figures::process_figures_with_base(&s, images, &options.image_base);
    let s = process_bibliography(&s);
    let s = if options.dehyphenate {
        dehyphenate_line_breaks(&s)
    } else {
        s
    };
    let out = typography::cleanup_text_with(&s, options.ligatures);
    debug!(
        input_bytes = content.len(),
        output_bytes = out.len(),
        "post-processing complete"
    );
    out
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
