//! Citation linking: numeric `[N]` markers become links to bibliography anchors.
//!
//! | Input            | Output                                             |
//! |------------------|----------------------------------------------------|
//! | `[7]`            | `[[7]](#ref-7)`                                    |
//! | `[7], [8]`       | `[[7]](#ref-7), [[8]](#ref-8)`                     |
//! | `[11]-[14]`      | `[[11]](#ref-11), [[12]](#ref-12), …, [[14]](#ref-14)` |
//! | `[3, 5-7]`       | `[[3]](#ref-3), [[5]](#ref-5), [[6]](#ref-6), [[7]](#ref-7)` |
//!
//! Markers inside the reference section are the entries themselves and are
//! never linked. Without a reference section the whole document is linked.
//! Fenced code blocks and inline code spans are left alone.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::bibliography::find_reference_section;

/// Widest range that is expanded; anything wider is almost certainly not a
/// citation range.
pub const MAX_RANGE_SPAN: u32 = 100;

/// One bracket group: integers, ranges and commas only.
const GROUP: &str = r"\[\s*\d{1,3}(?:\s*[-–,]\s*\d{1,3})*\s*\]";

/// A run of bracket groups joined by `,` or a hyphen / en-dash.
static RE_CITATION_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{GROUP}(?:\s*[-–,]\s*{GROUP})*")).unwrap()
});

static RE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());

/// Link every citation marker outside the reference section.
pub fn process_citations(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let section = find_reference_section(&lines).unwrap_or_else(|| {
        debug!("no reference section, linking the whole document");
        0..0
    });

    let mut in_fence = false;
    let mut changed = 0usize;
    let mut result: Vec<Cow<'_, str>> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            result.push(Cow::Borrowed(*line));
            continue;
        }
        if in_fence || section.contains(&i) {
            result.push(Cow::Borrowed(*line));
            continue;
        }
        let linked = link_citations(line);
        if matches!(linked, Cow::Owned(_)) {
            changed += 1;
        }
        result.push(linked);
    }

    debug!(lines = changed, "citation links");
    result.join("\n")
}

/// Rewrite the citation runs of a single line.
pub fn link_citations(line: &str) -> Cow<'_, str> {
    RE_CITATION_RUN.replace_all(line, |caps: &Captures<'_>| {
        let Some(run) = caps.get(0) else {
            return String::new();
        };
        let before = line[..run.start()].chars().next_back();
        let after = line[run.end()..].chars().next();
        if is_link_context(before, after) || in_code_span(line, run.start()) {
            run.as_str().to_string()
        } else {
            expand_run(run.as_str())
        }
    })
}

/// Brackets that are already link text, image alt text, reference-style links
/// or indexing like `x[1]` are left alone.
fn is_link_context(before: Option<char>, after: Option<char>) -> bool {
    let glued_before =
        before.is_some_and(|c| c == '[' || c == '!' || c == '_' || c.is_alphanumeric());
    let glued_after = after.is_some_and(|c| matches!(c, '(' | '[' | ']'));
    glued_before || glued_after
}

/// An odd number of backticks before `offset` means it sits in an inline code span.
fn in_code_span(line: &str, offset: usize) -> bool {
    line[..offset].matches('`').count() % 2 == 1
}

fn format_link(n: u32) -> String {
    format!("[[{n}]](#ref-{n})")
}

/// Parse the inside of one bracket: `7`, `3, 5-7`, `11–14`.
///
/// `None` when any part is zero, descending, or wider than [`MAX_RANGE_SPAN`];
/// the bracket is then left literal.
fn parse_group(inner: &str) -> Option<Vec<u32>> {
    let mut numbers = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        match part.split_once(['-', '–']) {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().ok()?;
                let hi: u32 = hi.trim().parse().ok()?;
                if lo == 0 || hi < lo || hi - lo > MAX_RANGE_SPAN {
                    return None;
                }
                numbers.extend(lo..=hi);
            }
            None => {
                let n: u32 = part.parse().ok()?;
                if n == 0 {
                    return None;
                }
                numbers.push(n);
            }
        }
    }
    Some(numbers)
}

/// Expand one matched run into links, keeping unexpandable pieces verbatim.
fn expand_run(run: &str) -> String {
    let mut out = String::with_capacity(run.len() * 4);
    let mut pending: Vec<u32> = Vec::new();
    let mut previous_single: Option<u32> = None;
    let mut cursor = 0usize;

    let flush = |out: &mut String, pending: &mut Vec<u32>| {
        if !pending.is_empty() {
            let links: Vec<String> = pending.drain(..).map(format_link).collect();
            out.push_str(&links.join(", "));
        }
    };

    for (index, group) in RE_GROUP.find_iter(run).enumerate() {
        let separator = &run[cursor..group.start()];
        cursor = group.end();
        let raw = group.as_str();
        let numbers = parse_group(&raw[1..raw.len() - 1]);

        if index > 0 {
            let is_range = separator.contains(['-', '–']);
            let cross_range = match (is_range, previous_single, numbers.as_deref()) {
                (true, Some(lo), Some(&[hi])) if hi > lo && hi - lo <= MAX_RANGE_SPAN => {
                    Some((lo, hi))
                }
                _ => None,
            };

            if let Some((lo, hi)) = cross_range {
                pending.extend(lo + 1..=hi);
                previous_single = Some(hi);
                continue;
            }
            if is_range || numbers.is_none() || pending.is_empty() {
                flush(&mut out, &mut pending);
                out.push_str(separator);
            }
        }

        match numbers {
            Some(numbers) => {
                previous_single = match numbers.as_slice() {
                    &[n] => Some(n),
                    _ => None,
                };
                pending.extend(numbers);
            }
            None => {
                flush(&mut out, &mut pending);
                out.push_str(raw);
                previous_single = None;
            }
        }
    }
    flush(&mut out, &mut pending);
    out
}
