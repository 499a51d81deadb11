//! # pdf2epub
//!
//! Reflow paginated PDF books into EPUB or plain text.
//!
//! A PDF stores a book as fixed pages: every line break is a layout
//! decision, running headers and page numbers repeat on every page, and
//! words are hyphenated across lines. This crate reads each page's text
//! line by line, drops the boilerplate, joins wrapped lines and hyphenated
//! words back together, and splits the result into chapters at lines that
//! match the book's heading patterns.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path and %PDF magic
//!  ├─ 2. Extract   page text + embedded images via pdfium
//!  ├─ 3. Classify  blank / noise / heading / hyphen / soft wrap / paragraph end
//!  ├─ 4. Reflow    paragraphs accumulated, chapters opened at headings
//!  └─ 5. Assemble  EPUB 3 package or flat text
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2epub::{convert_to_file, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .title("Influence")
//!         .author("Robert B. Cialdini")
//!         .chapter_patterns(["^Introduction", "^Chapter [0-9]+"])
//!         .blacklist_pattern("Robert B. Cialdini Ph.D")
//!         .build()?;
//!     let output = convert_to_file("influence.pdf", "influence.epub", &config)?;
//!     eprintln!("{} chapters, {} paragraphs",
//!         output.stats.chapters, output.stats.paragraphs);
//!     Ok(())
//! }
//! ```
//!
//! Text already extracted elsewhere can be reflowed without pdfium through
//! [`MemorySource`] and [`convert_source`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2epub` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2epub = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    BookProfile, ChapterDetection, ConversionConfig, ConversionConfigBuilder, ImageEncoding,
    OutputFormat, PageSelection, RuleSet,
};
pub use convert::{
    convert, convert_from_bytes, convert_source, convert_to_file, inspect, render_output,
    write_output,
};
pub use document::{Block, BookMetadata, Chapter, Document, Image};
pub use error::{PageError, Pdf2EpubError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata};
pub use pipeline::classify::{classify, LineClass, NoiseReason};
pub use pipeline::source::{MemoryPage, MemorySource, PageSource, SourceImage};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
