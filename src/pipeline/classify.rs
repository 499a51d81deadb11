//! Line classification: decide what one raw line of page text is.
//!
//! Every line maps to exactly one [`LineClass`]. There is no error path;
//! degenerate input (a single stray character, an orphaned footnote marker)
//! is absorbed as [`LineClass::Noise`].
//!
//! ## Rule Order
//!
//! 1. Blank (trimmed line empty). Blank lines never open a chapter.
//! 2. Chapter heading, only inside the configured detection window.
//! 3. Blacklisted (any blacklist pattern matches the raw line).
//! 4. Leading numeral (first character of the raw line is numeric). This
//!    also drops prose that starts with a number; accepted limitation.
//! 5. Too short (fewer than two characters once trimmed).
//! 6. Hyphen continuation (trimmed line ends in `-`).
//! 7. Soft continuation (no sentence-terminal punctuation at the end).
//! 8. Paragraph end.

use crate::config::RuleSet;
use crate::pipeline::split::ChapterDetector;
use serde::Serialize;

/// Why a line was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseReason {
    Blacklisted,
    LeadingNumeral,
    TooShort,
}

/// The category of one line of page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    Noise(NoiseReason),
    /// `pattern` is the index of the first chapter pattern that matched.
    ChapterHeading { pattern: usize },
    HyphenContinuation,
    SoftContinuation,
    ParagraphEnd,
}

/// Characters that can close a sentence inside a closing quotation.
const QUOTED_TERMINALS: [char; 6] = [':', '.', '!', '?', '—', '…'];

/// Characters that close a sentence. The em-dash is deliberately absent.
const TERMINALS: [char; 5] = [':', '.', '!', '?', '…'];

const QUOTES: [char; 4] = ['"', '\'', '“', '”'];

/// Classify `line`, the `index`-th (0-based) line of its page.
pub fn classify(
    line: &str,
    index: usize,
    rules: &RuleSet,
    detector: &dyn ChapterDetector,
) -> LineClass {
    if line.trim().is_empty() {
        return LineClass::Blank;
    }
    if let Some(pattern) = detector.detect(line, index, rules.chapter_patterns()) {
        return LineClass::ChapterHeading { pattern };
    }
    classify_content(line, rules)
}

/// Classify `line` as body content, ignoring chapter detection.
///
/// A heading line is run through this too, unless the caller skips it.
pub fn classify_content(line: &str, rules: &RuleSet) -> LineClass {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineClass::Blank;
    }

    if rules.is_blacklisted(line) {
        return LineClass::Noise(NoiseReason::Blacklisted);
    }

    if line.chars().next().is_some_and(char::is_numeric) {
        return LineClass::Noise(NoiseReason::LeadingNumeral);
    }

    let mut tail = trimmed.chars().rev();
    let (Some(last), Some(second_to_last)) = (tail.next(), tail.next()) else {
        return LineClass::Noise(NoiseReason::TooShort);
    };

    if last == '-' {
        return LineClass::HyphenContinuation;
    }

    if QUOTES.contains(&last) {
        if !QUOTED_TERMINALS.contains(&second_to_last) {
            return LineClass::SoftContinuation;
        }
    } else if !TERMINALS.contains(&last) {
        return LineClass::SoftContinuation;
    }

    LineClass::ParagraphEnd
}

/// Running per-class line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCounts {
    /// Lines read, whatever their class. Not touched by [`LineCounts::record`].
    pub lines: usize,
    pub blank: usize,
    pub headings: usize,
    pub noise_blacklisted: usize,
    pub noise_leading_numeral: usize,
    pub noise_too_short: usize,
    pub hyphen_joins: usize,
    pub soft_joins: usize,
    pub paragraph_ends: usize,
}

impl LineCounts {
    pub fn record(&mut self, class: LineClass) {
        match class {
            LineClass::Blank => self.blank += 1,
            LineClass::Noise(NoiseReason::Blacklisted) => self.noise_blacklisted += 1,
            LineClass::Noise(NoiseReason::LeadingNumeral) => self.noise_leading_numeral += 1,
            LineClass::Noise(NoiseReason::TooShort) => self.noise_too_short += 1,
            LineClass::ChapterHeading { .. } => self.headings += 1,
            LineClass::HyphenContinuation => self.hyphen_joins += 1,
            LineClass::SoftContinuation => self.soft_joins += 1,
            LineClass::ParagraphEnd => self.paragraph_ends += 1,
        }
    }

    pub fn noise(&self) -> usize {
        self.noise_blacklisted + self.noise_leading_numeral + self.noise_too_short
    }
}
