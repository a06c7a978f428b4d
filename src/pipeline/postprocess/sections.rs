//! Section reconstruction: promote flattened structural markers to headings.
//!
//! Extraction loses font sizes, so a paper's heading hierarchy arrives as
//! ordinary lines (`3.1.1 Design overview.`) or as artifacts glued to the
//! following paragraph (`Abstract—Modern HPC systems…`). The passes here
//! recognise the unambiguous shapes and rewrite them as Markdown headings.
//!
//! ## Passes (in order)
//!
//! 1. `Abstract —` / `Index Terms —` artifacts → `## Abstract` + paragraph
//! 2. Hierarchical numbering (`3.1`, `3.1.1`, …) → `###`, `####`, …
//! 3. `- N) Title:` bullets that open a subsection → `### N) Title`;
//!    remaining `- N) item` bullets → ordered list items `N. item`
//!
//! Lettered markers (`A. Background`) are never touched. Whether
//! `A. We conducted…` is a title or a sentence cannot be decided from one
//! line; that call belongs to the cleanup agent.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Longest title accepted for a numbered heading; longer text is a paragraph.
pub const MAX_TITLE_LENGTH: usize = 120;

/// Longest title accepted when a heading and its body share one line.
const MAX_INLINE_TITLE_LENGTH: usize = 60;

/// Apply every section pass in order.
///
/// Lines that match no pattern pass through unchanged.
pub fn process_sections(content: &str) -> String {
    let s = fix_abstract_header(content);
    let s = fix_index_terms_header(&s);
    let s = fix_hierarchical_sections(&s);
    fix_numbered_bullet_subsections(&s)
}

// ── Pass 1: Abstract / Index Terms artifacts ─────────────────────────────────

static RE_ABSTRACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^(?:#+[ \t]*)?Abstract[ \t]*[-–—][ \t]*").unwrap());

static RE_INDEX_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^(?:#+[ \t]*)?Index Terms[ \t]*[-–—][ \t]*").unwrap());

/// `Abstract -Modern HPC…` → `## Abstract\n\nModern HPC…` (first occurrence).
fn fix_abstract_header(content: &str) -> String {
    RE_ABSTRACT.replacen(content, 1, "## Abstract\n\n").into_owned()
}

/// `Index Terms -HPC, storage` → `## Index Terms\n\nHPC, storage` (first occurrence).
fn fix_index_terms_header(content: &str) -> String {
    RE_INDEX_TERMS
        .replacen(content, 1, "## Index Terms\n\n")
        .into_owned()
}

// ── Pass 2: Hierarchical numbered headings ───────────────────────────────────

/// `3.1.1 Design overview.` on a line of its own.
static RE_NUMBERED_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)+)\s+([A-Z][^.]+?)\.?\s*$").unwrap());

/// `3.1.1 Design overview. Hermes is designed…`: heading and body on one line.
static RE_NUMBERED_INLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)+)\s+([A-Z][^.]{2,50})\.\s+(.+)$").unwrap());

/// Classification of a single line considered for promotion to a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingCandidate<'a> {
    /// Leave the line as it is.
    NotHeading,
    /// The whole line is a numbered title.
    Section {
        level: usize,
        numbering: &'a str,
        title: &'a str,
    },
    /// A numbered title followed by running text on the same line.
    InlineWithBody {
        level: usize,
        numbering: &'a str,
        title: &'a str,
        body: &'a str,
    },
}

/// Map numbering depth to a heading level: `3` → 2, `3.1` → 3, `3.1.1` → 4.
///
/// Capped at 6, the deepest Markdown heading.
pub fn determine_heading_level(numbering: &str) -> usize {
    let depth = numbering.split('.').count();
    (depth + 1).min(6)
}

/// Whether `title` is short enough, and sentence-free enough, to be a title.
pub fn is_section_title(title: &str) -> bool {
    title.chars().count() <= MAX_TITLE_LENGTH && title.matches(". ").count() <= 1
}

/// Classify one line against the hierarchical-numbering patterns.
pub fn classify_numbered_line(line: &str) -> HeadingCandidate<'_> {
    let stripped = line.trim();
    if stripped.starts_with('#') {
        return HeadingCandidate::NotHeading;
    }

    if let Some(caps) = RE_NUMBERED_TITLE.captures(stripped) {
        if let (Some(numbering), Some(title)) = (caps.get(1), caps.get(2)) {
            let title = title.as_str().trim();
            if is_section_title(title) {
                return HeadingCandidate::Section {
                    level: determine_heading_level(numbering.as_str()),
                    numbering: numbering.as_str(),
                    title,
                };
            }
        }
    }

    if let Some(caps) = RE_NUMBERED_INLINE.captures(stripped) {
        if let (Some(numbering), Some(title), Some(body)) = (caps.get(1), caps.get(2), caps.get(3))
        {
            let title = title.as_str().trim();
            if title.chars().count() <= MAX_INLINE_TITLE_LENGTH {
                return HeadingCandidate::InlineWithBody {
                    level: determine_heading_level(numbering.as_str()),
                    numbering: numbering.as_str(),
                    title,
                    body: body.as_str().trim(),
                };
            }
        }
    }

    HeadingCandidate::NotHeading
}

fn fix_hierarchical_sections(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut result: Vec<String> = Vec::with_capacity(lines.len() + 16);
    let mut promoted = 0usize;

    for (i, line) in lines.iter().enumerate() {
        match classify_numbered_line(line) {
            HeadingCandidate::Section {
                level,
                numbering,
                title,
            } => {
                result.push(format!("{} {} {}", "#".repeat(level), numbering, title));
                // Keep the heading visually separate from the paragraph below it.
                if lines.get(i + 1).is_some_and(|next| !next.trim().is_empty()) {
                    result.push(String::new());
                }
                promoted += 1;
            }
            HeadingCandidate::InlineWithBody {
                level,
                numbering,
                title,
                body,
            } => {
                result.push(format!("{} {} {}", "#".repeat(level), numbering, title));
                result.push(String::new());
                result.push(body.to_string());
                promoted += 1;
            }
            HeadingCandidate::NotHeading => result.push((*line).to_string()),
        }
    }

    debug!(promoted, "hierarchical section headings");
    result.join("\n")
}

// ── Pass 3: Bulleted numbered subsections ────────────────────────────────────

/// `- 1) Title with colon:`
static RE_BULLET_SUBSECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-\s*(\d+[).])\s*(.+):\s*$").unwrap());

/// `- 1) plain item`
static RE_BULLET_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-\s*(\d+)\)\s*(.+)$").unwrap());

/// Start of another list item: a bullet, or `N)` / `N.` numbering.
static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]\s|\d+[).]\s)").unwrap());

/// True when the next non-blank line is ordinary prose rather than another item.
fn followed_by_prose(rest: &[&str]) -> bool {
    rest.iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .is_some_and(|next| !RE_LIST_MARKER.is_match(next))
}

fn fix_numbered_bullet_subsections(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut result: Vec<String> = Vec::with_capacity(lines.len() + 8);

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = RE_BULLET_SUBSECTION.captures(line) {
            if followed_by_prose(&lines[i + 1..]) {
                result.push(format!("### {} {}", &caps[1], &caps[2]));
                result.push(String::new());
                continue;
            }
        }

        match RE_BULLET_ITEM.captures(line) {
            Some(caps) => result.push(format!("{}. {}", &caps[1], &caps[2])),
            None => result.push((*line).to_string()),
        }
    }

    result.join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
