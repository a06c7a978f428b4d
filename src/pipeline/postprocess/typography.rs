//! Typographic cleanup: ligatures, invisible characters, whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ligatures and look-alike glyphs left behind by PDF text extraction.
pub const DEFAULT_LIGATURES: &[(&str, &str)] = &[
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB00}", "ff"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    ("\u{FB05}", "ft"),
    ("\u{FB06}", "st"),
    ("\u{2013}", "-"),
];

/// Zero-width and soft-hyphen characters that never render but break search.
const INVISIBLE_CHARS: [char; 6] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // BOM
    '\u{00AD}', // soft hyphen
];

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// `perfor-\nmance` → `performance` (lowercase continuation only).
static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L}+)-\n[ \t]*(\p{Ll}\p{L}*)").unwrap());

/// Clean up typography with [`DEFAULT_LIGATURES`].
pub fn cleanup_text(content: &str) -> String {
    cleanup_text_with(content, DEFAULT_LIGATURES)
}

/// Clean up typography with a caller-supplied ligature table.
///
/// Trailing whitespace is stripped before blank runs are collapsed, so a
/// second application is a no-op.
pub fn cleanup_text_with(content: &str, ligatures: &[(&str, &str)]) -> String {
    let s = replace_ligatures(content, ligatures);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    RE_BLANK_RUN.replace_all(&s, "\n\n").into_owned()
}

fn replace_ligatures(content: &str, ligatures: &[(&str, &str)]) -> String {
    ligatures
        .iter()
        .fold(content.to_string(), |acc, (from, to)| {
            if acc.contains(from) {
                acc.replace(from, to)
            } else {
                acc
            }
        })
}

fn remove_invisible_chars(content: &str) -> String {
    content
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect()
}

fn trim_trailing_whitespace(content: &str) -> String {
    content
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join words split across a line break by a hyphen.
///
/// Only applies when the continuation starts lowercase, which keeps
/// `Pre-\nTrained` and list items intact. Off by default because genuine
/// hyphenated compounds that happen to wrap are joined too.
pub fn dehyphenate_line_breaks(content: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(content, "${1}${2}").into_owned()
}
