//! Reference-section detection and bibliography anchors.
//!
//! Citation links written by [`super::citations`] point at `#ref-N`; this pass
//! creates the matching `<a id="ref-N"></a>` targets in front of each entry of
//! the reference list. Both passes share [`find_reference_section`] so they
//! always agree on which lines are the bibliography.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// A reference-section title line: heading or standalone, optional `7.` / `VII.`
/// prefix, optional bold markers and trailing colon.
static RE_REFERENCE_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(#{1,6})?\s*(?:(?:\d+|[IVXLC]+)\.?\s+)?\**(?:references|bibliography|works cited|literature cited)\**\s*:?\s*$",
    )
    .unwrap()
});

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})(?:\s|$)").unwrap());

/// `[12] Author…`, optionally behind a `-` / `*` list marker.
static RE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*(?:[-*]\s+)?)\[(\d{1,3})\](.*)$").unwrap());

static RE_EXISTING_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a id="ref-(\d+)"></a>"#).unwrap());

/// Level of a Markdown ATX heading line, if it is one.
fn heading_level(line: &str) -> Option<usize> {
    RE_HEADING
        .captures(line.trim_start())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().len())
}

/// Locate the reference section as a range of line indices.
///
/// The section starts at the **last** reference title in the document (papers
/// often mention "references" earlier, e.g. in a table of contents) and runs
/// until the next heading of the same or a higher level. A title that is not a
/// heading ends at any heading. Returns `None` when there is no such title.
pub fn find_reference_section(lines: &[&str]) -> Option<Range<usize>> {
    let (start, title_level) = lines.iter().enumerate().rev().find_map(|(i, line)| {
        let caps = RE_REFERENCE_TITLE.captures(line.trim())?;
        Some((i, caps.get(1).map(|m| m.as_str().len())))
    })?;

    let end = lines[start + 1..]
        .iter()
        .position(|line| {
            heading_level(line).is_some_and(|level| title_level.is_none_or(|t| level <= t))
        })
        .map_or(lines.len(), |offset| start + 1 + offset);

    Some(start..end)
}

/// Insert `<a id="ref-N"></a>` before the first `[N]` entry of each number
/// inside the reference section. Text outside the section is untouched.
pub fn process_bibliography(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let Some(section) = find_reference_section(&lines) else {
        debug!("no reference section, bibliography left unanchored");
        return content.to_string();
    };

    let mut anchored: HashSet<u32> = lines[section.clone()]
        .iter()
        .flat_map(|line| RE_EXISTING_ANCHOR.captures_iter(line))
        .filter_map(|caps| caps[1].parse().ok())
        .collect();

    let mut added = 0usize;
    let mut result: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if !section.contains(&i) {
            result.push((*line).to_string());
            continue;
        }
        let Some(caps) = RE_ENTRY.captures(line) else {
            result.push((*line).to_string());
            continue;
        };
        match caps[2].parse::<u32>() {
            Ok(n) if n >= 1 && anchored.insert(n) => {
                result.push(format!(
                    r#"{}<a id="ref-{n}"></a>[{n}]{}"#,
                    &caps[1], &caps[3]
                ));
                added += 1;
            }
            _ => result.push((*line).to_string()),
        }
    }

    debug!(added, "bibliography anchors");
    result.join("\n")
}
