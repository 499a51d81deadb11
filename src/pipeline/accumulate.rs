//! Paragraph accumulation: join classified lines back into paragraphs.
//!
//! The accumulator holds the finished blocks of the open chapter plus the
//! text of the paragraph currently being built. It never looks at a line's
//! content to make decisions; the [`LineClass`] decides everything.

use crate::document::Block;
use crate::pipeline::classify::LineClass;
use std::mem;

/// Body state of the open chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphAccumulator {
    blocks: Vec<Block>,
    open: String,
}

impl ParagraphAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one classified line.
    ///
    /// | class                | effect                                         |
    /// |----------------------|------------------------------------------------|
    /// | `Blank`              | close the open paragraph, add an empty one     |
    /// | `Noise`, `ChapterHeading` | nothing                                   |
    /// | `HyphenContinuation` | append trimmed line minus `-`, no separator    |
    /// | `SoftContinuation`   | append trimmed line and one space              |
    /// | `ParagraphEnd`       | append trimmed line, close the paragraph       |
    pub fn apply(&mut self, class: LineClass, line: &str) {
        let trimmed = line.trim();
        match class {
            LineClass::Blank => {
                self.close_paragraph();
                self.blocks.push(Block::Blank);
            }
            LineClass::Noise(_) | LineClass::ChapterHeading { .. } => {}
            LineClass::HyphenContinuation => {
                self.open
                    .push_str(trimmed.strip_suffix('-').unwrap_or(trimmed));
            }
            LineClass::SoftContinuation => {
                self.open.push_str(trimmed);
                self.open.push(' ');
            }
            LineClass::ParagraphEnd => {
                self.open.push_str(trimmed);
                self.close_paragraph();
            }
        }
    }

    /// Insert an image reference.
    ///
    /// A paragraph in progress stays open, so a sentence wrapping across
    /// a page break is not cut in two; the image lands before it.
    pub fn push_image(&mut self, href: impl Into<String>) {
        self.blocks.push(Block::Image { href: href.into() });
    }

    /// Text of the paragraph being built (joined so far).
    pub fn open_text(&self) -> &str {
        &self.open
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Close the open paragraph and hand back the chapter body, leaving the
    /// accumulator empty for the next chapter.
    pub fn flush(&mut self) -> Vec<Block> {
        self.close_paragraph();
        mem::take(&mut self.blocks)
    }

    fn close_paragraph(&mut self) {
        let text = mem::take(&mut self.open);
        let text = text.trim_end();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(text.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::NoiseReason;

    fn para(s: &str) -> Block {
        Block::Paragraph(s.to_string())
    }

    #[test]
    fn hyphen_join_inserts_nothing() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::HyphenContinuation, "hyph-");
        acc.apply(LineClass::SoftContinuation, "enated");
        assert_eq!(acc.open_text(), "hyphenated ");
        assert_eq!(acc.flush(), vec![para("hyphenated")]);
    }

    #[test]
    fn hyphen_join_uses_trimmed_line() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::HyphenContinuation, "   re-  ");
        acc.apply(LineClass::ParagraphEnd, "  joined.");
        assert_eq!(acc.flush(), vec![para("rejoined.")]);
    }

    #[test]
    fn soft_wrap_joins_with_one_space() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::SoftContinuation, "It was the best of times, ");
        acc.apply(LineClass::SoftContinuation, "it was the worst");
        acc.apply(LineClass::ParagraphEnd, "of times.");
        assert_eq!(
            acc.flush(),
            vec![para("It was the best of times, it was the worst of times.")]
        );
    }

    #[test]
    fn paragraph_end_starts_a_fresh_paragraph() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::ParagraphEnd, "This is a sentence.");
        assert_eq!(acc.open_text(), "");
        acc.apply(LineClass::ParagraphEnd, "Another one.");
        assert_eq!(
            acc.flush(),
            vec![para("This is a sentence."), para("Another one.")]
        );
    }

    #[test]
    fn noise_leaves_state_unchanged() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::SoftContinuation, "half a");
        acc.apply(LineClass::ParagraphEnd, "sentence.");
        acc.apply(LineClass::SoftContinuation, "open");
        let before = acc.clone();
        for reason in [
            NoiseReason::Blacklisted,
            NoiseReason::LeadingNumeral,
            NoiseReason::TooShort,
        ] {
            acc.apply(LineClass::Noise(reason), "12");
            assert_eq!(acc, before);
        }
        acc.apply(LineClass::ChapterHeading { pattern: 0 }, "Chapter 2");
        assert_eq!(acc, before);
    }

    #[test]
    fn blank_closes_paragraph_and_adds_empty_one() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::SoftContinuation, "dangling");
        acc.apply(LineClass::Blank, "   ");
        acc.apply(LineClass::Blank, "");
        assert_eq!(acc.flush(), vec![para("dangling"), Block::Blank, Block::Blank]);
    }

    #[test]
    fn image_does_not_split_open_paragraph() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::SoftContinuation, "across the");
        acc.push_image("images/pg2_1.jpg");
        acc.apply(LineClass::ParagraphEnd, "page break.");
        assert_eq!(
            acc.flush(),
            vec![
                Block::Image {
                    href: "images/pg2_1.jpg".into()
                },
                para("across the page break."),
            ]
        );
    }

    #[test]
    fn flush_resets_for_next_chapter() {
        let mut acc = ParagraphAccumulator::new();
        acc.apply(LineClass::ParagraphEnd, "Done.");
        assert_eq!(acc.flush().len(), 1);
        assert!(acc.blocks().is_empty());
        assert!(acc.flush().is_empty());
    }
}
