//! Light text normalization applied before segmentation.
//!
//! Scraped and OCR'd sources arrive with uneven whitespace and typographic
//! quotes. Normalization collapses the noise while keeping blank-line
//! paragraph boundaries intact, so the segmenter still sees document
//! structure.

/// Normalize whitespace and typographic punctuation.
///
/// - runs of spaces and tabs collapse to a single space
/// - runs of blank lines collapse to a single blank line
/// - curly quotes and apostrophes become their ASCII forms
/// - leading and trailing blank lines are dropped
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut last_blank = true;
    for line in text.lines() {
        let line = collapse_inline(line);
        if line.is_empty() {
            if !last_blank {
                lines.push(String::new());
                last_blank = true;
            }
        } else {
            lines.push(line);
            last_blank = false;
        }
    }
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}

fn collapse_inline(line: &str) -> String {
    let standardized: String = line
        .chars()
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .collect();
    standardized.split_whitespace().collect::<Vec<_>>().join(" ")
}
