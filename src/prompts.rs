//! Prompts for the optional cleanup agent.
//!
//! The deterministic post-processor deliberately stops where judgement is
//! needed (lettered headings, figure relocation, author blocks). The prompt
//! here hands exactly those jobs to the agent and nothing else, so it stays
//! in one place and tests can inspect it without running an agent.

use std::path::Path;

/// Instructions given to the cleanup agent.
///
/// `{md_path}` and `{img_dir}` are substituted by [`cleanup_prompt`].
pub const CLEANUP_PROMPT_TEMPLATE: &str = r#"You are cleaning up an academic paper that was converted from PDF to Markdown.

Files:
- Markdown: {md_path}
- Images: {img_dir}

A deterministic pass has already promoted numbered headings (3.1, 3.1.1),
linked numeric citations to the bibliography and placed figure images above
their first caption. Do not undo that work. Fix what it could not decide.

1. LETTERED AND ROMAN SECTIONS
   - A line such as "A. Background" or "B. Metadata management:" that is a
     short capitalised title followed by paragraph text is a heading. Use one
     level below the enclosing numbered section (##### when unsure).
   - A line such as "A. We conducted experiments on..." is a sentence. Leave it.
   - Also promote roman-numbered (II., III.) or mixed (1.A) sections that were
     missed.

2. FIGURES
   - A figure is the image line `![Figure N](./img/figureN.png)` plus its
     caption line ("Fig. N. ..."). Keep them together.
   - Move each figure to the start of the first section whose text refers to
     it ("Fig. N", "Figure N"), directly after the heading.
   - Delete leftover `<!-- image -->` placeholders.

3. OCR DEBRIS
   - Short fragments directly above a caption (axis labels, legend words,
     garbled characters) come from text inside the figure. Remove them. Keep
     the caption.

4. AUTHORS
   - Directly after the title, write a section:
       ## Authors
       - **Name**, Institution, email
     Use only information present in the document. Omit missing fields.

5. SPLIT PARAGRAPHS
   - A line ending without terminal punctuation, a blank line, then a line
     that continues the sentence is one paragraph broken at a page boundary.
     Join them. Do not join list items or separate paragraphs.

6. ANYTHING ELSE OBVIOUS
   - Broken tables, garbled lines, list formatting.

Rules: read the whole file first, edit it in place, change structure and
formatting only, never the academic content.

When done, reply with a short summary: headings fixed, figures moved, debris
removed, authors section, paragraphs merged, other changes."#;

/// Render the cleanup prompt for a Markdown file and its image directory.
pub fn cleanup_prompt(md_path: &Path, img_dir: &Path) -> String {
    CLEANUP_PROMPT_TEMPLATE
        .replace("{md_path}", &md_path.display().to_string())
        .replace("{img_dir}", &img_dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_substituted() {
        let prompt = cleanup_prompt(Path::new("/out/paper/paper.md"), Path::new("/out/paper/img"));
        assert!(prompt.contains("Markdown: /out/paper/paper.md"));
        assert!(prompt.contains("Images: /out/paper/img"));
        assert!(!prompt.contains("{md_path}"));
        assert!(!prompt.contains("{img_dir}"));
    }

    #[test]
    fn prompt_covers_lettered_sections() {
        assert!(CLEANUP_PROMPT_TEMPLATE.contains("A. Background"));
        assert!(CLEANUP_PROMPT_TEMPLATE.contains("A. We conducted"));
    }
}
