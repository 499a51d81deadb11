//! Chapter splitting: the per-run reflow state.
//!
//! [`ChapterSplitter`] owns the sealed chapters, the open chapter's title and
//! its [`ParagraphAccumulator`]. Pages are pushed in reading order; each line
//! is classified, a heading seals the open chapter and opens a new one, and
//! everything else goes to the accumulator. The state starts with an
//! implicit "Intro" chapter, so there is always a chapter to write into.
//!
//! Which lines may be headings is decided by a [`ChapterDetector`]:
//!
//! - [`FixedLineStrategy`] tests one line index per page and requires the
//!   match to start within the first three characters (a stray page number
//!   in front of the heading is tolerated).
//! - [`WindowedLineStrategy`] tests every line from the top of the page down
//!   to a bound, with no column constraint.

use crate::config::{ChapterDetection, RuleSet};
use crate::document::Chapter;
use crate::pipeline::accumulate::ParagraphAccumulator;
use crate::pipeline::classify::{classify, classify_content, LineClass, LineCounts};
use regex::Regex;
use std::fmt;
use std::mem;
use tracing::{debug, info};

/// Title of the chapter that is open before the first heading.
pub const INTRO_TITLE: &str = "Intro";

/// Decides whether a line opens a chapter.
pub trait ChapterDetector: Send + Sync + fmt::Debug {
    /// Index of the first pattern in `patterns` that makes `line` (the
    /// `index`-th line of its page) a heading, if any.
    fn detect(&self, line: &str, index: usize, patterns: &[Regex]) -> Option<usize>;
}

/// Test only line `line_index` of each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLineStrategy {
    line_index: usize,
}

impl FixedLineStrategy {
    /// Furthest character column a heading match may start at.
    pub const MAX_MATCH_COLUMN: usize = 2;

    pub fn new(line_index: usize) -> Self {
        Self { line_index }
    }
}

impl ChapterDetector for FixedLineStrategy {
    fn detect(&self, line: &str, index: usize, patterns: &[Regex]) -> Option<usize> {
        if index != self.line_index {
            return None;
        }
        patterns.iter().position(|re| {
            re.find(line)
                .is_some_and(|m| line[..m.start()].chars().count() <= Self::MAX_MATCH_COLUMN)
        })
    }
}

/// Test lines `0..=bound` of each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedLineStrategy {
    bound: usize,
}

impl WindowedLineStrategy {
    pub fn new(bound: usize) -> Self {
        Self { bound }
    }
}

impl ChapterDetector for WindowedLineStrategy {
    fn detect(&self, line: &str, index: usize, patterns: &[Regex]) -> Option<usize> {
        if index > self.bound {
            return None;
        }
        patterns.iter().position(|re| re.is_match(line))
    }
}

impl ChapterDetection {
    /// The detector implementing this mode.
    pub fn strategy(self) -> Box<dyn ChapterDetector> {
        match self {
            ChapterDetection::FixedLine(n) => Box::new(FixedLineStrategy::new(n)),
            ChapterDetection::Window(n) => Box::new(WindowedLineStrategy::new(n)),
        }
    }
}

/// Split page text into lines: `'\n'` separated, trailing `'\r'` removed.
pub fn page_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// What one page contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub lines: usize,
    /// Titles of the chapters this page opened, in order.
    pub headings: Vec<String>,
}

/// Combined chapter splitter and paragraph accumulator state for one run.
#[derive(Debug)]
pub struct ChapterSplitter<'a> {
    rules: &'a RuleSet,
    detector: Box<dyn ChapterDetector>,
    skip_heading_line: bool,
    sealed: Vec<Chapter>,
    title: String,
    body: ParagraphAccumulator,
    counts: LineCounts,
}

impl<'a> ChapterSplitter<'a> {
    pub fn new(rules: &'a RuleSet, detection: ChapterDetection) -> Self {
        Self {
            rules,
            detector: detection.strategy(),
            skip_heading_line: false,
            sealed: Vec::new(),
            title: INTRO_TITLE.to_string(),
            body: ParagraphAccumulator::new(),
            counts: LineCounts::default(),
        }
    }

    /// Drop heading lines from the body instead of feeding them to the
    /// accumulator after the split.
    pub fn skip_heading_line(mut self, skip: bool) -> Self {
        self.skip_heading_line = skip;
        self
    }

    /// Process one page.
    ///
    /// `images` are package paths of the page's inline images. They are
    /// placed right after the page's first line has been checked for a
    /// heading, so a chapter opening on line 0 gets its page's images.
    pub fn push_page(&mut self, text: &str, images: &[String]) -> PageOutcome {
        let mut outcome = PageOutcome::default();
        let mut images_placed = false;

        for (index, line) in page_lines(text).enumerate() {
            outcome.lines += 1;

            let class = classify(line, index, self.rules, self.detector.as_ref());
            let body_class = match class {
                LineClass::ChapterHeading { pattern } => {
                    self.counts.record(class);
                    let title = line.trim().to_string();
                    info!(title = %title, pattern, "Chapter heading");
                    self.open_chapter(title.clone());
                    outcome.headings.push(title);
                    if self.skip_heading_line {
                        None
                    } else {
                        Some(classify_content(line, self.rules))
                    }
                }
                other => Some(other),
            };

            if !images_placed {
                self.place_images(images);
                images_placed = true;
            }

            if let Some(class) = body_class {
                self.counts.record(class);
                if let LineClass::Noise(reason) = class {
                    debug!(?reason, line, "Dropped line");
                }
                self.body.apply(class, line);
            }
        }

        if !images_placed {
            self.place_images(images);
        }
        self.counts.lines += outcome.lines;
        outcome
    }

    /// Seal the open chapter and open a new one titled `title`.
    pub fn open_chapter(&mut self, title: impl Into<String>) {
        let blocks = self.body.flush();
        let previous = mem::replace(&mut self.title, title.into());
        self.sealed.push(Chapter {
            title: previous,
            blocks,
        });
    }

    /// Chapters so far, the open one included.
    pub fn chapter_count(&self) -> usize {
        self.sealed.len() + 1
    }

    pub fn counts(&self) -> &LineCounts {
        &self.counts
    }

    /// Seal the last chapter and return every chapter in discovery order.
    ///
    /// The last chapter is kept even when its body is empty.
    pub fn finish(mut self) -> (Vec<Chapter>, LineCounts) {
        let blocks = self.body.flush();
        self.sealed.push(Chapter {
            title: self.title,
            blocks,
        });
        (self.sealed, self.counts)
    }

    fn place_images(&mut self, images: &[String]) {
        for href in images {
            self.body.push_image(href.clone());
        }
    }
}
