//! Conversion entry points.
//!
//! [`convert`] opens a PDF with pdfium and hands it to [`convert_source`],
//! which drives any [`PageSource`] through the reflow pipeline one page at a
//! time. [`render_output`] and [`write_output`] turn the result into the
//! requested format on disk; [`convert_to_file`] does all three.

use crate::assemble::{epub, text};
use crate::config::{ConversionConfig, OutputFormat, PageSelection};
use crate::document::{BookMetadata, Document, Image};
use crate::error::{PageError, Pdf2EpubError};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::extract::{bind_pdfium, PdfiumSource};
use crate::pipeline::input;
use crate::pipeline::source::{clean_page_text, PageSource, SourceImage};
use crate::pipeline::split::ChapterSplitter;
use crate::progress::{ConversionProgressCallback, NoopProgressCallback};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF file.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages had problems
/// (see `output.diagnostics`).
///
/// # Errors
/// Returns `Err(Pdf2EpubError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - pdfium could not be bound or could not open the document
/// - The page selection hits no page
pub fn convert(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2EpubError> {
    let path = input::resolve_input(input_path)?;
    info!("Starting conversion: {}", path.display());

    let pdfium = bind_pdfium()?;
    let source = PdfiumSource::open(&pdfium, &path, config.password.as_deref())?
        .with_image_encoding(config.image_encoding);
    convert_source(&source, config)
}

/// Convert PDF bytes held in memory.
///
/// pdfium is handed a managed [`tempfile`], removed again on return.
pub fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2EpubError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2EpubError::Internal(format!("Failed to create temp file: {}", e)))?;
    tmp.write_all(bytes)
        .map_err(|e| Pdf2EpubError::Internal(format!("Failed to write temp file: {}", e)))?;
    convert(tmp.path(), config)
}

/// Run the reflow pipeline over any page source.
pub fn convert_source<S: PageSource + ?Sized>(
    source: &S,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2EpubError> {
    let start = Instant::now();
    let total_pages = source.page_count();

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() && config.pages != PageSelection::All {
        return Err(Pdf2EpubError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", page_indices.len(), total_pages);

    let progress: &dyn ConversionProgressCallback = config
        .progress_callback
        .as_deref()
        .unwrap_or(&NoopProgressCallback);
    progress.on_conversion_start(page_indices.len());

    let epub = config.output_format == OutputFormat::Epub;
    let mut diagnostics: Vec<PageError> = Vec::new();
    let mut pages_with_errors = 0;

    let cover = match config.cover_page {
        Some(index) if epub => load_cover(source, index, &mut diagnostics),
        _ => None,
    };
    if !diagnostics.is_empty() {
        pages_with_errors += 1;
    }

    let mut splitter = ChapterSplitter::new(&config.rules, config.chapter_detection)
        .skip_heading_line(config.skip_heading_line);
    let mut images: Vec<Image> = Vec::new();

    for &index in &page_indices {
        let page_num = index + 1;
        progress.on_page_start(page_num, total_pages);
        let mut page_errors: Vec<PageError> = Vec::new();

        let text = match source.page_text(index) {
            Ok(raw) => clean_page_text(&raw),
            Err(e) => {
                warn!("{}", e);
                page_errors.push(e);
                String::new()
            }
        };

        let mut hrefs = Vec::new();
        if epub && config.embed_images && config.cover_page != Some(index) {
            match source.page_images(index) {
                Ok(page_images) => {
                    for (ordinal, img) in page_images.into_iter().enumerate() {
                        let image = package_image(
                            format!("images/pg{}_{}.{}", page_num, ordinal + 1, img.extension),
                            img,
                        );
                        hrefs.push(image.file_name.clone());
                        images.push(image);
                    }
                }
                Err(e) => {
                    warn!("{}; continuing with text only", e);
                    page_errors.push(e);
                }
            }
        }

        let outcome = splitter.push_page(&text, &hrefs);
        for title in &outcome.headings {
            progress.on_chapter(page_num, title);
        }
        for e in &page_errors {
            progress.on_page_error(page_num, total_pages, &e.to_string());
        }
        if !page_errors.is_empty() {
            pages_with_errors += 1;
        }
        diagnostics.extend(page_errors);
        progress.on_page_complete(page_num, total_pages, outcome.lines);
    }

    let (chapters, lines) = splitter.finish();
    let document = Document {
        metadata: BookMetadata {
            title: config.title.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            identifier: config.resolved_identifier(),
        },
        chapters,
        cover,
        images,
    };

    let stats = ConversionStats {
        total_pages,
        processed_pages: page_indices.len(),
        lines,
        chapters: document.chapters.len(),
        paragraphs: document.paragraph_count(),
        images: document.images.len(),
        has_cover: document.cover.is_some(),
        pages_with_errors,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {} chapters, {} paragraphs, {}ms",
        stats.processed_pages, stats.chapters, stats.paragraphs, stats.duration_ms
    );
    progress.on_conversion_complete(page_indices.len(), stats.chapters);

    Ok(ConversionOutput {
        document,
        stats,
        diagnostics,
    })
}

/// The first image of page `index`, as the package cover.
fn load_cover<S: PageSource + ?Sized>(
    source: &S,
    index: usize,
    diagnostics: &mut Vec<PageError>,
) -> Option<Image> {
    if index >= source.page_count() {
        warn!(
            "Cover page {} is out of range ({} pages); no cover",
            index + 1,
            source.page_count()
        );
        return None;
    }
    match source.page_images(index) {
        Ok(page_images) => match page_images.into_iter().next() {
            Some(img) => Some(package_image(format!("cover.{}", img.extension), img)),
            None => {
                warn!("Cover page {} has no embedded image; no cover", index + 1);
                None
            }
        },
        Err(e) => {
            warn!("{}; no cover", e);
            diagnostics.push(e);
            None
        }
    }
}

fn package_image(file_name: String, img: SourceImage) -> Image {
    Image {
        file_name,
        media_type: img.media_type,
        data: img.data,
    }
}

fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

/// Serialise a document in the configured output format.
pub fn render_output(
    document: &Document,
    config: &ConversionConfig,
) -> Result<Vec<u8>, Pdf2EpubError> {
    match config.output_format {
        OutputFormat::Epub => epub::to_epub_bytes(document)
            .map_err(|e| Pdf2EpubError::Internal(format!("EPUB assembly failed: {}", e))),
        OutputFormat::Text => Ok(text::render_text(document, config.include_titles).into_bytes()),
    }
}

/// Write `bytes` to `path` atomically.
///
/// The bytes go to a temp file in the destination directory which is then
/// renamed over `path`, so a failed write never leaves a partial file.
pub fn write_output(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), Pdf2EpubError> {
    let path = path.as_ref();
    let write_failed = |source: std::io::Error| Pdf2EpubError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Convert a PDF and write the result to `output_path`.
pub fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2EpubError> {
    let output = convert(input_path, config)?;
    let bytes = render_output(&output.document, config)?;
    write_output(output_path, &bytes)?;
    Ok(output)
}

/// Extract PDF metadata without converting content.
pub fn inspect(
    input_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2EpubError> {
    let path = input::resolve_input(input_path)?;
    let pdfium = bind_pdfium()?;
    let source = PdfiumSource::open(&pdfium, &path, password)?;
    Ok(source.metadata())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::pipeline::source::{MemoryPage, MemorySource};

    fn jpeg(tag: u8) -> SourceImage {
        SourceImage::new(vec![0xFF, 0xD8, tag], "image/jpeg", "jpg")
    }

    #[test]
    fn cover_page_images_are_not_inlined() {
        let source = MemorySource::new(vec![
            MemoryPage::text("Title page.").with_image(jpeg(1)).with_image(jpeg(2)),
            MemoryPage::text("Body text.").with_image(jpeg(3)),
        ]);
        let config = ConversionConfig::default();
        let output = convert_source(&source, &config).unwrap();
        let doc = output.document;

        let cover = doc.cover.expect("cover");
        assert_eq!(cover.file_name, "cover.jpg");
        assert_eq!(cover.data, vec![0xFF, 0xD8, 1]);
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.images[0].file_name, "images/pg2_1.jpg");
        assert!(doc.chapters[0].blocks.contains(&Block::Image {
            href: "images/pg2_1.jpg".into()
        }));
    }

    #[test]
    fn line_end_hyphen_marker_joins_words() {
        let source = MemorySource::from_texts(["The long experi\u{2}\nment ended."]);
        let output = convert_source(&source, &ConversionConfig::default()).unwrap();
        assert_eq!(
            output.document.chapters[0].blocks,
            vec![Block::Paragraph("The long experiment ended.".into())]
        );
        assert_eq!(output.stats.lines.hyphen_joins, 1);
        assert_eq!(output.stats.lines.soft_joins, 0);
    }

    #[test]
    fn missing_cover_image_is_not_an_error() {
        let source = MemorySource::from_texts(["No images here."]);
        let output = convert_source(&source, &ConversionConfig::default()).unwrap();
        assert!(output.document.cover.is_none());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn text_mode_reads_no_images() {
        let source = MemorySource::new(vec![
            MemoryPage::text("Text.").with_image_error("would fail if read"),
        ]);
        let config = ConversionConfig::builder()
            .output_format(OutputFormat::Text)
            .build()
            .unwrap();
        let output = convert_source(&source, &config).unwrap();
        assert!(output.diagnostics.is_empty());
        assert!(output.document.cover.is_none());
    }

    #[test]
    fn page_selection_outside_document_is_fatal() {
        let source = MemorySource::from_texts(["a.", "b."]);
        let config = ConversionConfig::builder()
            .pages(PageSelection::Single(9))
            .build()
            .unwrap();
        let err = convert_source(&source, &config).unwrap_err();
        assert!(matches!(err, Pdf2EpubError::PageOutOfRange { page: 9, total: 2 }));
    }

    #[test]
    fn page_selection_limits_processed_pages() {
        let source = MemorySource::from_texts(["One.", "Two.", "Three."]);
        let config = ConversionConfig::builder()
            .pages(PageSelection::Range(2, 3))
            .build()
            .unwrap();
        let output = convert_source(&source, &config).unwrap();
        assert_eq!(output.stats.total_pages, 3);
        assert_eq!(output.stats.processed_pages, 2);
        assert_eq!(
            output.document.chapters[0].blocks,
            vec![
                Block::Paragraph("Two.".into()),
                Block::Paragraph("Three.".into())
            ]
        );
    }

    #[test]
    fn write_output_creates_parent_and_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("book.txt");
        write_output(&target, b"first").unwrap();
        write_output(&target, b"second").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let leftovers = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn write_output_under_a_file_fails_with_exit_code_two() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = write_output(blocker.join("book.epub"), b"data").unwrap_err();
        assert!(matches!(err, Pdf2EpubError::OutputWriteFailed { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_input_is_reported_before_pdfium() {
        let err = convert("/no/such/book.pdf", &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, Pdf2EpubError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
