//! Configuration types for PDF reflow.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The per-book constants (chapter
//! patterns, blacklist, chapter line, cover page, title and author) can also
//! be kept in a [`BookProfile`] JSON file and loaded into the builder.
//!
//! Patterns are plain strings until [`ConversionConfigBuilder::build`], which
//! compiles every one of them into a [`RuleSet`]. A bad pattern is reported
//! there, before a single page is read.

use crate::error::Pdf2EpubError;
use crate::progress::ProgressCallback;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Configuration for a PDF reflow run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2epub::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .title("Progress and Poverty")
///     .author("Henry George")
///     .chapter_pattern("^Book [IVX]+")
///     .blacklist_pattern("Progress and Poverty / [0-9]+")
///     .build()
///     .unwrap();
/// assert_eq!(config.rules.chapter_patterns().len(), 1);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Compiled chapter and blacklist patterns.
    pub rules: RuleSet,

    /// Which lines of a page are tested against the chapter patterns.
    /// Default: [`ChapterDetection::FixedLine(0)`].
    pub chapter_detection: ChapterDetection,

    /// 0-indexed page whose first embedded image becomes the EPUB cover.
    /// `None` disables the cover. Default: `Some(0)`.
    pub cover_page: Option<usize>,

    /// Book title written to the package metadata. Default: "Untitled".
    pub title: String,

    /// Book author, if known.
    pub author: Option<String>,

    /// BCP 47 language tag. Default: "en".
    pub language: String,

    /// Package identifier. Defaults to `"{title}_cleaned"` when `None`.
    pub identifier: Option<String>,

    /// EPUB package or flat text. Default: [`OutputFormat::Epub`].
    pub output_format: OutputFormat,

    /// Text mode only: write each chapter title on its own line before the
    /// chapter body. Default: false.
    pub include_titles: bool,

    /// Do not feed a heading line back into the new chapter's body.
    ///
    /// Off by default: the heading text then also appears as the first line
    /// of the chapter body, right under the `<h1>`.
    pub skip_heading_line: bool,

    /// Inline page images into the chapters (EPUB only). Default: true.
    pub embed_images: bool,

    /// Encoding used for extracted images. Default: [`ImageEncoding::Jpeg`].
    pub image_encoding: ImageEncoding,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            chapter_detection: ChapterDetection::default(),
            cover_page: Some(0),
            title: "Untitled".to_string(),
            author: None,
            language: "en".to_string(),
            identifier: None,
            output_format: OutputFormat::default(),
            include_titles: false,
            skip_heading_line: false,
            embed_images: true,
            image_encoding: ImageEncoding::default(),
            pages: PageSelection::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("rules", &self.rules)
            .field("chapter_detection", &self.chapter_detection)
            .field("cover_page", &self.cover_page)
            .field("title", &self.title)
            .field("author", &self.author)
            .field("language", &self.language)
            .field("identifier", &self.identifier)
            .field("output_format", &self.output_format)
            .field("include_titles", &self.include_titles)
            .field("skip_heading_line", &self.skip_heading_line)
            .field("embed_images", &self.embed_images)
            .field("image_encoding", &self.image_encoding)
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }

    /// Package identifier, falling back to `"{title}_cleaned"`.
    pub fn resolved_identifier(&self) -> String {
        self.identifier
            .clone()
            .unwrap_or_else(|| format!("{}_cleaned", self.title))
    }
}

/// Builder for [`ConversionConfig`].
///
/// Patterns and the chapter-line options are kept raw until [`build`]
/// so that a profile and CLI flags can be layered in any order.
///
/// [`build`]: ConversionConfigBuilder::build
#[derive(Default)]
pub struct ConversionConfigBuilder {
    chapter_patterns: Vec<String>,
    blacklist: Vec<String>,
    chapter_line_index: Option<usize>,
    chapter_line_window: Option<usize>,
    cover_page: Option<Option<usize>>,
    title: Option<String>,
    author: Option<String>,
    language: Option<String>,
    identifier: Option<String>,
    output_format: Option<OutputFormat>,
    include_titles: bool,
    skip_heading_line: bool,
    embed_images: Option<bool>,
    image_encoding: ImageEncoding,
    pages: PageSelection,
    password: Option<String>,
    progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("chapter_patterns", &self.chapter_patterns)
            .field("blacklist", &self.blacklist)
            .field("chapter_line_index", &self.chapter_line_index)
            .field("chapter_line_window", &self.chapter_line_window)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl ConversionConfigBuilder {
    /// Layer a [`BookProfile`] into the builder. Fields the profile leaves
    /// unset keep their current value; pattern lists are appended.
    pub fn profile(mut self, profile: BookProfile) -> Self {
        self.chapter_patterns.extend(profile.chapter_patterns);
        self.blacklist.extend(profile.blacklist);
        if profile.chapter_line_index.is_some() {
            self.chapter_line_index = profile.chapter_line_index;
        }
        if profile.chapter_line_window.is_some() {
            self.chapter_line_window = profile.chapter_line_window;
        }
        if let Some(page) = profile.cover_page_index {
            self.cover_page = Some(Some(page));
        }
        if profile.title.is_some() {
            self.title = profile.title;
        }
        if profile.author.is_some() {
            self.author = profile.author;
        }
        if profile.language.is_some() {
            self.language = profile.language;
        }
        if profile.identifier.is_some() {
            self.identifier = profile.identifier;
        }
        if profile.output_format.is_some() {
            self.output_format = profile.output_format;
        }
        self
    }

    pub fn chapter_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.chapter_patterns.push(pattern.into());
        self
    }

    pub fn chapter_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chapter_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn blacklist_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.blacklist.push(pattern.into());
        self
    }

    pub fn blacklist_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Fixed-line mode: test only line `index` of each page.
    pub fn chapter_line_index(mut self, index: usize) -> Self {
        self.chapter_line_index = Some(index);
        self
    }

    /// Ranged mode: test lines `0..=bound` of each page.
    pub fn chapter_line_window(mut self, bound: usize) -> Self {
        self.chapter_line_window = Some(bound);
        self
    }

    pub fn cover_page(mut self, page: Option<usize>) -> Self {
        self.cover_page = Some(page);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn include_titles(mut self, v: bool) -> Self {
        self.include_titles = v;
        self
    }

    pub fn skip_heading_line(mut self, v: bool) -> Self {
        self.skip_heading_line = v;
        self
    }

    pub fn embed_images(mut self, v: bool) -> Self {
        self.embed_images = Some(v);
        self
    }

    pub fn image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.image_encoding = encoding;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, compiling every pattern.
    pub fn build(self) -> Result<ConversionConfig, Pdf2EpubError> {
        let chapter_detection = match (self.chapter_line_index, self.chapter_line_window) {
            (Some(_), Some(_)) => {
                return Err(Pdf2EpubError::InvalidConfig(
                    "chapter line index and chapter line window are mutually exclusive".into(),
                ))
            }
            (Some(index), None) => ChapterDetection::FixedLine(index),
            (None, Some(bound)) => ChapterDetection::Window(bound),
            (None, None) => ChapterDetection::default(),
        };

        let defaults = ConversionConfig::default();
        let title = self.title.unwrap_or(defaults.title);
        if title.trim().is_empty() {
            return Err(Pdf2EpubError::InvalidConfig("title must not be empty".into()));
        }
        let language = self.language.unwrap_or(defaults.language);
        if language.trim().is_empty() {
            return Err(Pdf2EpubError::InvalidConfig(
                "language must not be empty".into(),
            ));
        }

        Ok(ConversionConfig {
            rules: RuleSet::new(&self.chapter_patterns, &self.blacklist)?,
            chapter_detection,
            cover_page: self.cover_page.unwrap_or(defaults.cover_page),
            title,
            author: self.author,
            language,
            identifier: self.identifier,
            output_format: self.output_format.unwrap_or_default(),
            include_titles: self.include_titles,
            skip_heading_line: self.skip_heading_line,
            embed_images: self.embed_images.unwrap_or(defaults.embed_images),
            image_encoding: self.image_encoding,
            pages: self.pages,
            password: self.password,
            progress_callback: self.progress_callback,
        })
    }
}

// ── Rule set ─────────────────────────────────────────────────────────────

/// Compiled chapter-heading and blacklist patterns.
///
/// Chapter patterns are ordered (first match wins); blacklist patterns are
/// an unordered set (any match excludes the line).
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    chapter_patterns: Vec<Regex>,
    blacklist: Vec<Regex>,
}

impl RuleSet {
    /// Compile both pattern lists, failing on the first invalid pattern.
    pub fn new<S: AsRef<str>>(chapter_patterns: &[S], blacklist: &[S]) -> Result<Self, Pdf2EpubError> {
        Ok(Self {
            chapter_patterns: compile_all(chapter_patterns)?,
            blacklist: compile_all(blacklist)?,
        })
    }

    pub fn chapter_patterns(&self) -> &[Regex] {
        &self.chapter_patterns
    }

    pub fn blacklist(&self) -> &[Regex] {
        &self.blacklist
    }

    /// True when any blacklist pattern matches anywhere in `line`.
    pub fn is_blacklisted(&self, line: &str) -> bool {
        self.blacklist.iter().any(|re| re.is_match(line))
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, Pdf2EpubError> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Regex::new(p).map_err(|source| Pdf2EpubError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .collect()
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which lines of each page are candidates for a chapter heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterDetection {
    /// Test only this 0-indexed line; the match must start within the first
    /// three characters (tolerates a leading page number artefact).
    FixedLine(usize),
    /// Test every line from 0 up to and including this index, anywhere in
    /// the line.
    Window(usize),
}

impl Default for ChapterDetection {
    fn default() -> Self {
        ChapterDetection::FixedLine(0)
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// EPUB 3 package: one XHTML document per chapter. (default)
    #[default]
    Epub,
    /// One flat UTF-8 text file.
    Text,
}

impl OutputFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Epub => "epub",
            OutputFormat::Text => "txt",
        }
    }
}

/// Encoding for images extracted from the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    /// Lossy, small; right for scanned photos and covers. (default)
    #[default]
    Jpeg,
    /// Lossless; right for line art and diagrams.
    Png,
}

impl ImageEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

// ── Book profile ─────────────────────────────────────────────────────────

/// Per-book constants, stored as JSON next to the PDF.
///
/// ```json
/// {
///   "title": "The Problem of Political Authority",
///   "author": "Michael Huemer",
///   "chapter_patterns": ["^Preface", "^Part", "^[0-9]+$"],
///   "blacklist": ["The Problem of Political Authority"],
///   "chapter_line_index": 0,
///   "cover_page_index": 0
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookProfile {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub chapter_patterns: Vec<String>,
    pub blacklist: Vec<String>,
    pub chapter_line_index: Option<usize>,
    pub chapter_line_window: Option<usize>,
    pub cover_page_index: Option<usize>,
    pub output_format: Option<OutputFormat>,
}

impl BookProfile {
    /// Read and parse a profile file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Pdf2EpubError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Pdf2EpubError::ProfileLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| Pdf2EpubError::ProfileLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}
