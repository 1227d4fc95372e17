//! The segmentation algorithm.
//!
//! Splits raw text into chunks bounded by a maximum character count,
//! preferring paragraph boundaries, then sentence boundaries, and only
//! cutting at fixed offsets when a single sentence exceeds the limit.
//! An optional overlap budget seeds each chunk with the trailing sentences
//! of its predecessor so nearest-neighbor search does not lose meaning that
//! straddles a chunk boundary.

/// A produced fragment, with a marker for the pathological fixed-offset cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Piece {
    pub(crate) text: String,
    pub(crate) hard_split: bool,
}

/// Split `text` into chunks of at most `max_chunk_size` characters.
///
/// The algorithm greedily packs paragraphs (blank-line separated) into each
/// chunk; a paragraph that alone exceeds the limit is packed sentence by
/// sentence, and a sentence that alone exceeds the limit is cut at fixed
/// character offsets. With `overlap > 0` every chunk after the first is
/// seeded with trailing sentences of the previous chunk, up to the overlap
/// budget; the seed counts toward the size bound.
///
/// Output order is stable and matches input order. Empty or whitespace-only
/// input yields an empty vector; the function never fails.
#[must_use]
pub fn segment(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
    segment_marked(text, max_chunk_size, overlap)
        .into_iter()
        .map(|piece| piece.text)
        .collect()
}

/// Like [`segment`], but keeps the hard-split marker for chunk metadata.
pub(crate) fn segment_marked(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<Piece> {
    if max_chunk_size == 0 || text.trim().is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chunk_size {
        return vec![Piece {
            text: text.to_string(),
            hard_split: false,
        }];
    }

    // A seed that crowds out new content would stall the accumulator.
    let overlap = overlap.min(max_chunk_size / 2);

    let mut pieces: Vec<Piece> = Vec::new();
    let mut buffer = String::new();
    let mut seeded = 0usize;

    for paragraph in split_paragraphs(text) {
        if char_len(&paragraph) > max_chunk_size {
            // Oversized paragraph: close out the pending chunk, then pack
            // its sentences.
            flush(&mut pieces, &mut buffer, &mut seeded, overlap);
            for sentence in split_sentences(&paragraph) {
                if char_len(&sentence) > max_chunk_size {
                    flush(&mut pieces, &mut buffer, &mut seeded, overlap);
                    buffer.clear();
                    seeded = 0;
                    for slice in hard_split(&sentence, max_chunk_size) {
                        pieces.push(Piece {
                            text: slice,
                            hard_split: true,
                        });
                    }
                } else {
                    push_unit(
                        &mut pieces,
                        &mut buffer,
                        &mut seeded,
                        &sentence,
                        " ",
                        max_chunk_size,
                        overlap,
                    );
                }
            }
        } else {
            push_unit(
                &mut pieces,
                &mut buffer,
                &mut seeded,
                &paragraph,
                "\n\n",
                max_chunk_size,
                overlap,
            );
        }
    }

    if char_len(&buffer) > seeded {
        pieces.push(Piece {
            text: buffer,
            hard_split: false,
        });
    }
    pieces
}

/// Add one unit (paragraph or sentence, already within the size limit) to
/// the accumulation buffer, flushing completed chunks as needed.
fn push_unit(
    pieces: &mut Vec<Piece>,
    buffer: &mut String,
    seeded: &mut usize,
    unit: &str,
    separator: &str,
    max_chunk_size: usize,
    overlap: usize,
) {
    loop {
        let projected = if buffer.is_empty() {
            char_len(unit)
        } else {
            char_len(buffer) + char_len(separator) + char_len(unit)
        };
        if projected <= max_chunk_size {
            if !buffer.is_empty() {
                buffer.push_str(separator);
            }
            buffer.push_str(unit);
            return;
        }
        if char_len(buffer) == *seeded {
            // Only the overlap seed blocks this unit; drop the seed so
            // progress is always made. The unit itself fits the limit.
            buffer.clear();
            *seeded = 0;
            buffer.push_str(unit);
            return;
        }
        flush(pieces, buffer, seeded, overlap);
    }
}

/// Emit the buffer as a finished chunk and reseed it with the overlap tail.
fn flush(pieces: &mut Vec<Piece>, buffer: &mut String, seeded: &mut usize, overlap: usize) {
    if char_len(buffer) <= *seeded {
        // Nothing beyond the seed; emitting it would duplicate the previous
        // chunk's tail.
        buffer.clear();
        *seeded = 0;
        return;
    }
    let finished = std::mem::take(buffer);
    *seeded = 0;
    if overlap > 0 {
        let seed = overlap_tail(&finished, overlap);
        if !seed.is_empty() {
            *seeded = char_len(&seed);
            *buffer = seed;
        }
    }
    pieces.push(Piece {
        text: finished,
        hard_split: false,
    });
}

/// Trailing sentences of `text` whose joined length stays within `overlap`.
fn overlap_tail(text: &str, overlap: usize) -> String {
    let sentences = split_sentences(text);
    let mut total = 0usize;
    let mut picked: Vec<&str> = Vec::new();
    for sentence in sentences.iter().rev() {
        let cost = char_len(sentence) + usize::from(!picked.is_empty());
        if total + cost > overlap {
            break;
        }
        total += cost;
        picked.push(sentence);
    }
    picked.reverse();
    picked.join(" ")
}

/// Split text into paragraphs at blank lines, dropping empty ones.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                paragraphs.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_string());
    }
    paragraphs
}

/// Split a paragraph into sentences at `.`, `!` or `?` followed by
/// whitespace (or end of text).
///
/// Abbreviations produce false boundaries; that is an accepted
/// approximation, not a correctness problem.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let sentence = current.trim().to_string();
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
    sentences
}

/// Cut an unbreakable sentence at fixed character offsets.
fn hard_split(text: &str, max_chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chunk_size)
        .map(|window| window.iter().collect())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One single-word sentence of exactly `len` characters.
    fn sentence(len: usize) -> String {
        sentence_of(b'a', len)
    }

    fn sentence_of(letter: u8, len: usize) -> String {
        let mut s = (letter as char).to_string().repeat(len - 1);
        s.push('.');
        s
    }

    /// A paragraph of `count` distinct sentences, each `len` characters.
    fn paragraph(len: usize, count: usize) -> String {
        (0..count)
            .map(|i| sentence_of(b'a' + (i % 26) as u8, len))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn non_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    // ==================== Basic Behavior ====================

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(segment("", 1000, 0).is_empty());
        assert!(segment("   \n\n  \t ", 1000, 0).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = segment("A short note.", 1000, 0);
        assert_eq!(chunks, vec!["A short note.".to_string()]);
    }

    #[test]
    fn test_zero_max_size_yields_nothing() {
        assert!(segment("some text", 0, 0).is_empty());
    }

    #[test]
    fn test_deterministic_across_calls() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph(40, 5),
            paragraph(60, 8),
            paragraph(30, 3)
        );
        let first = segment(&text, 200, 50);
        let second = segment(&text, 200, 50);
        assert_eq!(first, second);
    }

    // ==================== Paragraph Accumulation ====================

    #[test]
    fn test_paragraphs_pack_greedily() {
        // Three 80-char paragraphs; two fit a 200-char chunk, the third
        // starts the next one.
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph(80, 1),
            paragraph(80, 1),
            paragraph(80, 1)
        );
        let chunks = segment(&text, 200, 0);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("\n\n"));
        assert!(!chunks[1].contains("\n\n"));
    }

    #[test]
    fn test_whitespace_only_paragraphs_dropped() {
        let text = format!("{}\n\n   \n\t\n\n{}", paragraph(90, 1), paragraph(90, 1));
        let chunks = segment(&text, 120, 0);

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_size_bound_holds() {
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph(45, 10),
            paragraph(70, 9),
            paragraph(25, 4)
        );
        for max in [100, 250, 500] {
            for chunk in segment(&text, max, 0) {
                assert!(
                    chunk.chars().count() <= max,
                    "chunk of {} chars exceeds limit {max}",
                    chunk.chars().count()
                );
            }
        }
    }

    // ==================== Sentence Descent ====================

    #[test]
    fn test_oversized_paragraph_splits_on_sentences() {
        let text = paragraph(90, 6); // 545 chars, single paragraph
        let chunks = segment(&text, 200, 0);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
            // Every chunk ends at a sentence boundary.
            assert!(chunk.ends_with('.'));
        }
    }

    #[test]
    fn test_sentence_descent_preserves_order() {
        let text = format!("First one. Second one. Third one. {}", "x".repeat(180));
        let chunks = segment(&text, 60, 0);
        let rejoined = chunks.join(" ");
        let first = rejoined.find("First").unwrap();
        let second = rejoined.find("Second").unwrap();
        let third = rejoined.find("Third").unwrap();
        assert!(first < second && second < third);
    }

    // ==================== Hard Splits ====================

    #[test]
    fn test_unbroken_text_hard_splits() {
        let text = "x".repeat(950);
        let pieces = segment_marked(&text, 300, 0);

        assert_eq!(pieces.len(), 4);
        for piece in &pieces[..3] {
            assert_eq!(piece.text.chars().count(), 300);
            assert!(piece.hard_split);
        }
        assert_eq!(pieces[3].text.chars().count(), 50);
        assert!(pieces[3].hard_split);
    }

    #[test]
    fn test_hard_split_is_char_safe() {
        let text = "日本語".repeat(400); // 1200 chars, no sentence breaks
        let chunks = segment(&text, 500, 0);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_bounded_chunks_are_not_marked_hard_split() {
        let text = format!("{}\n\n{}", paragraph(80, 1), paragraph(80, 1));
        let pieces = segment_marked(&text, 100, 0);
        assert!(pieces.iter().all(|p| !p.hard_split));
    }

    // ==================== Coverage ====================

    #[test]
    fn test_coverage_without_overlap() {
        let text = format!(
            "{}\n\n{}\n\n{}\n\n{}",
            paragraph(45, 3),
            paragraph(95, 7),
            paragraph(30, 2),
            "tail".repeat(60) // forces a hard split too
        );
        let chunks = segment(&text, 150, 0);

        assert_eq!(non_whitespace(&chunks.concat()), non_whitespace(&text));
    }

    // ==================== Overlap ====================

    #[test]
    fn test_overlap_seeds_next_chunk() {
        // Six 30-char sentences in one oversized paragraph, 100-char chunks,
        // 35-char overlap budget: each chunk after the first must open with
        // the last sentence of its predecessor.
        let text = paragraph(30, 6);
        let chunks = segment(&text, 100, 35);

        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let tail = overlap_tail(&pair[0], 35);
            assert!(!tail.is_empty());
            assert!(
                pair[1].starts_with(&tail),
                "chunk {:?} does not start with tail {:?}",
                pair[1],
                tail
            );
        }
    }

    #[test]
    fn test_overlap_respects_budget() {
        let text = paragraph(30, 8);
        let chunks = segment(&text, 100, 35);
        for pair in chunks.windows(2) {
            let tail = overlap_tail(&pair[0], 35);
            assert!(tail.chars().count() <= 35);
        }
    }

    #[test]
    fn test_overlap_keeps_size_bound() {
        let text = format!("{}\n\n{}", paragraph(40, 10), paragraph(55, 6));
        for chunk in segment(&text, 180, 60) {
            assert!(chunk.chars().count() <= 180);
        }
    }

    #[test]
    fn test_zero_overlap_shares_nothing() {
        let text = paragraph(40, 8);
        let chunks = segment(&text, 150, 0);
        let total: usize = chunks.iter().map(|c| non_whitespace(c).len()).sum();
        assert_eq!(total, non_whitespace(&text).len());
    }

    // ==================== Mixed-Size Scenario ====================

    #[test]
    fn test_four_paragraph_scenario() {
        // Paragraphs of roughly 300, 900, 1100 and 100 characters against a
        // 1000-char limit: the first two stay whole, the 1100-char paragraph
        // splits on a sentence boundary, and its tail merges with the final
        // short paragraph.
        let p1 = paragraph(149, 2); // 299
        let p2 = paragraph(149, 6); // 899
        let p3 = paragraph(99, 11); // 1099
        let p4 = sentence(100); // 100
        let text = format!("{p1}\n\n{p2}\n\n{p3}\n\n{p4}");

        let chunks = segment(&text, 1000, 0);

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
        assert_eq!(chunks[0], p1);
        assert_eq!(chunks[1], p2);
        // The split lands on a sentence boundary and the remainder of the
        // long paragraph travels with the closing paragraph.
        assert!(chunks[2].ends_with('.'));
        assert!(chunks[3].contains(&p4));
    }

    // ==================== Sentence Splitting ====================

    #[test]
    fn test_split_sentences_on_terminators() {
        let sentences = split_sentences("One two. Three four! Five six? Seven");
        assert_eq!(
            sentences,
            vec!["One two.", "Three four!", "Five six?", "Seven"]
        );
    }

    #[test]
    fn test_split_sentences_no_terminator() {
        let sentences = split_sentences("no punctuation at all");
        assert_eq!(sentences, vec!["no punctuation at all"]);
    }

    #[test]
    fn test_split_sentences_trailing_terminator() {
        let sentences = split_sentences("Only one sentence.");
        assert_eq!(sentences, vec!["Only one sentence."]);
    }
}
