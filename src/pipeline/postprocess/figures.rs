//! Figure embedding: place each figure image directly above its caption.
//!
//! Extractors emit images and captions independently, so the image for
//! `Fig. 3` may land pages away from its caption or not be referenced at all.
//! Image files are matched to captions by figure number; the image reference
//! is inserted above the **first** caption line for that number.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Relative directory the written Markdown uses for figure images.
pub const DEFAULT_IMAGE_BASE: &str = "./img";

/// `figure3.png`, `Fig_12.jpg`, `fig-4a.png`
static RE_FIGURE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:figure|fig)[_-]?(\d+)").unwrap());

/// `Fig. 3:`, `Figure 12.`, `FIG 4 ` anywhere in a line.
static RE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)Fig(?:ure)?\.?\s*(\d+)[.:\s]").unwrap());

static RE_EMBEDDED: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[Figure (\d+)\]").unwrap());

/// Split image names into the id → file map and the names that lost a
/// duplicate-id tie (first name wins).
fn index_figures<S: AsRef<str>>(image_files: &[S]) -> (BTreeMap<u32, String>, Vec<(u32, String)>) {
    let mut map = BTreeMap::new();
    let mut duplicates = Vec::new();
    for name in image_files.iter().map(AsRef::as_ref) {
        let Some(id) = RE_FIGURE_FILE
            .captures(name)
            .and_then(|caps| caps[1].parse::<u32>().ok())
        else {
            continue;
        };
        if map.contains_key(&id) {
            duplicates.push((id, name.to_string()));
        } else {
            map.insert(id, name.to_string());
        }
    }
    (map, duplicates)
}

/// Map figure id → image filename. Names without a figure number are ignored.
pub fn build_figure_map<S: AsRef<str>>(image_files: &[S]) -> BTreeMap<u32, String> {
    index_figures(image_files).0
}

/// Figure ids already embedded as `![Figure N](…)`.
fn embedded_ids(content: &str) -> HashSet<u32> {
    RE_EMBEDDED
        .captures_iter(content)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Embed figures above their captions using [`DEFAULT_IMAGE_BASE`].
pub fn process_figures<S: AsRef<str>>(content: &str, image_files: &[S]) -> String {
    process_figures_with_base(content, image_files, DEFAULT_IMAGE_BASE)
}

/// Embed figures above their captions, linking to `image_base/<file>`.
pub fn process_figures_with_base<S: AsRef<str>>(
    content: &str,
    image_files: &[S],
    image_base: &str,
) -> String {
    if image_files.is_empty() {
        return content.to_string();
    }
    let figures = build_figure_map(image_files);
    if figures.is_empty() {
        debug!("no figure-numbered images, nothing to embed");
        return content.to_string();
    }

    let base = image_base.trim_end_matches('/');
    let mut embedded = embedded_ids(content);
    let mut inserted = 0usize;
    let mut result: Vec<String> = Vec::with_capacity(content.len() / 40 + figures.len() * 2);

    for line in content.split('\n') {
        let caption_id = RE_CAPTION
            .captures(line)
            .and_then(|caps| caps[1].parse::<u32>().ok());
        if let Some(id) = caption_id {
            if let Some(file) = figures.get(&id) {
                if embedded.insert(id) {
                    result.push(format!("![Figure {id}]({base}/{file})"));
                    result.push(String::new());
                    inserted += 1;
                }
            }
        }
        result.push(line.to_string());
    }

    debug!(inserted, available = figures.len(), "figure embedding");
    result.join("\n")
}

/// Image files that the document does not embed, in figure-id order.
///
/// Includes files whose id never got a caption match and files that lost a
/// duplicate-id tie. Callers use this for diagnostics only.
pub fn find_unembedded_figures<S: AsRef<str>>(content: &str, image_files: &[S]) -> Vec<String> {
    let (figures, duplicates) = index_figures(image_files);
    let embedded = embedded_ids(content);

    let mut missing: Vec<(u32, String)> = figures
        .into_iter()
        .filter(|(id, _)| !embedded.contains(id))
        .chain(duplicates)
        .collect();
    missing.sort_by_key(|(id, _)| *id);
    missing.into_iter().map(|(_, file)| file).collect()
}
