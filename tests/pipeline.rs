//! Integration tests for the reflow pipeline.
//!
//! These drive the public API through [`MemorySource`], so they need neither
//! pdfium nor PDF files and always run.

use pdf2epub::{
    classify, convert_source, render_output, write_output, Block, ConversionConfig,
    ConversionProgressCallback, LineClass, MemoryPage, MemorySource, NoiseReason, OutputFormat,
    PageError, RuleSet, SourceImage,
};
use pdf2epub::pipeline::split::FixedLineStrategy;
use std::io::Read;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn epub_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

/// `idref` values of the OPF spine, in order.
fn spine_idrefs(opf: &str) -> Vec<String> {
    let spine = opf
        .split("<spine")
        .nth(1)
        .and_then(|s| s.split("</spine>").next())
        .expect("spine element");
    spine
        .split("idref=\"")
        .skip(1)
        .filter_map(|s| s.split('"').next())
        .map(str::to_string)
        .collect()
}

fn three_page_book() -> MemorySource {
    MemorySource::from_texts([
        "It was a dark and stormy night.\nThe rain fell in tor-\nrents.",
        "Chapter 1\nThe morning came slowly\nover the hills.",
        "A SHORT HEADER\nShe left before noon.",
    ])
}

// ── Round trip ───────────────────────────────────────────────────────────────

#[test]
fn three_page_book_splits_at_chapter_line() {
    let config = ConversionConfig::builder()
        .title("Stormy")
        .chapter_pattern("^Chapter [0-9]+")
        .blacklist_pattern("^A SHORT HEADER$")
        .build()
        .unwrap();

    let output = convert_source(&three_page_book(), &config).unwrap();
    let doc = &output.document;

    assert_eq!(doc.chapters.len(), 2);
    assert_eq!(doc.chapters[0].title, "Intro");
    assert_eq!(doc.chapters[1].title, "Chapter 1");
    assert_eq!(
        doc.chapters[0].blocks,
        vec![
            Block::Paragraph("It was a dark and stormy night.".into()),
            Block::Paragraph("The rain fell in torrents.".into()),
        ]
    );
    // The heading line is also body text of its own chapter.
    assert_eq!(
        doc.chapters[1].blocks,
        vec![
            Block::Paragraph("Chapter 1 The morning came slowly over the hills.".into()),
            Block::Paragraph("She left before noon.".into()),
        ]
    );

    let bytes = render_output(doc, &config).unwrap();
    let opf = epub_entry(&bytes, "OEBPS/content.opf");
    assert_eq!(spine_idrefs(&opf), vec!["nav", "ch-Intro", "ch-Chapter_1"]);
    assert!(opf.contains("<dc:identifier id=\"BookId\">Stormy_cleaned</dc:identifier>"));

    let chapter = epub_entry(&bytes, "OEBPS/Chapter_1.xhtml");
    assert!(chapter.contains("<h1>Chapter 1</h1>"));
    assert!(chapter.contains("<p>She left before noon.</p>"));
}

#[test]
fn skip_heading_line_keeps_title_out_of_body() {
    let config = ConversionConfig::builder()
        .chapter_pattern("^Chapter [0-9]+")
        .skip_heading_line(true)
        .build()
        .unwrap();

    let output = convert_source(&three_page_book(), &config).unwrap();
    assert_eq!(
        output.document.chapters[1].blocks[0],
        Block::Paragraph("The morning came slowly over the hills.".into())
    );
}

#[test]
fn chapter_count_is_one_plus_matched_headings() {
    let source = MemorySource::from_texts([
        "Preface\nWords.",
        "Part One\nMore words.",
        "Not a heading\nPart Two appears mid-line.",
        "  Part Two\nIndented within the column limit.",
        "xxx Part Three\nToo far right.",
    ]);
    let config = ConversionConfig::builder()
        .chapter_patterns(["^Preface", "Part"])
        .build()
        .unwrap();

    let output = convert_source(&source, &config).unwrap();
    let titles: Vec<&str> = output
        .document
        .chapters
        .iter()
        .map(|c| c.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Intro", "Preface", "Part One", "Part Two"]);
    assert_eq!(output.stats.chapters, 1 + output.stats.lines.headings);
}

#[test]
fn window_mode_finds_headings_below_the_first_line() {
    let source = MemorySource::from_texts(["12\nBook II\nThe war began."]);
    let config = ConversionConfig::builder()
        .chapter_pattern("^Book [IVX]+$")
        .chapter_line_window(100)
        .build()
        .unwrap();

    let output = convert_source(&source, &config).unwrap();
    assert_eq!(output.document.chapters.len(), 2);
    assert_eq!(output.document.chapters[1].title, "Book II");
}

// ── Classification ───────────────────────────────────────────────────────────

#[test]
fn prose_starting_with_a_digit_is_dropped() {
    // Leading numerals mark page numbers and footnotes; real prose that
    // starts with one is lost as well.
    let rules = RuleSet::new::<&str>(&[], &[]).unwrap();
    let detector = FixedLineStrategy::new(0);
    assert_eq!(
        classify("7 dwarves went to the mine", 3, &rules, &detector),
        LineClass::Noise(NoiseReason::LeadingNumeral)
    );

    let output = convert_source(
        &MemorySource::from_texts(["Once upon a time.\n7 dwarves went to the mine"]),
        &ConversionConfig::default(),
    )
    .unwrap();
    assert_eq!(
        output.document.chapters[0].blocks,
        vec![Block::Paragraph("Once upon a time.".into())]
    );
    assert_eq!(output.stats.lines.noise_leading_numeral, 1);
}

#[test]
fn hyphenated_word_joins_across_pages() {
    let source = MemorySource::from_texts(["The long experi-", "ment ended."]);
    let output = convert_source(&source, &ConversionConfig::default()).unwrap();
    assert_eq!(
        output.document.chapters[0].blocks,
        vec![Block::Paragraph("The long experiment ended.".into())]
    );
    assert_eq!(output.stats.lines.hyphen_joins, 1);
}

#[test]
fn line_end_hyphen_marker_yields_clean_xhtml() {
    let source = MemorySource::from_texts(["The long experi\u{2}\nment ended.\u{1}"]);
    let config = ConversionConfig::default();
    let output = convert_source(&source, &config).unwrap();
    assert_eq!(output.stats.lines.hyphen_joins, 1);

    let bytes = render_output(&output.document, &config).unwrap();
    let chapter = epub_entry(&bytes, "OEBPS/Intro.xhtml");
    assert!(chapter.contains("<p>The long experiment ended.</p>"));
    assert!(!chapter
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')));
}

// ── Text output ──────────────────────────────────────────────────────────────

#[test]
fn text_output_has_one_tabbed_line_per_paragraph() {
    let config = ConversionConfig::builder()
        .output_format(OutputFormat::Text)
        .build()
        .unwrap();
    let source = MemorySource::from_texts(["First page ends here.", "Second page too."]);

    let output = convert_source(&source, &config).unwrap();
    let bytes = render_output(&output.document, &config).unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "\tFirst page ends here.\n\tSecond page too.\n"
    );
}

// ── Images and diagnostics ───────────────────────────────────────────────────

#[test]
fn image_failure_keeps_page_text() {
    let source = MemorySource::new(vec![
        MemoryPage::text("Cover."),
        MemoryPage::text("Body survives.").with_image_error("unsupported filter"),
        MemoryPage::text("Next page.")
            .with_image(SourceImage::new(vec![0x89, b'P', b'N', b'G'], "image/png", "png")),
    ]);

    let output = convert_source(&source, &ConversionConfig::default()).unwrap();

    assert_eq!(output.diagnostics.len(), 1);
    assert!(matches!(
        output.diagnostics[0],
        PageError::ImageExtractionFailed { page: 2, .. }
    ));
    assert_eq!(output.stats.pages_with_errors, 1);
    let blocks = &output.document.chapters[0].blocks;
    assert!(blocks.contains(&Block::Paragraph("Body survives.".into())));
    assert!(blocks.contains(&Block::Image {
        href: "images/pg3_1.png".into()
    }));
}

#[test]
fn written_epub_reads_back() {
    let config = ConversionConfig::builder()
        .title("Readback")
        .author("A. Writer")
        .build()
        .unwrap();
    let output = convert_source(&MemorySource::from_texts(["Only paragraph."]), &config).unwrap();
    let bytes = render_output(&output.document, &config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("readback.epub");
    write_output(&path, &bytes).unwrap();

    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(epub_entry(&on_disk, "mimetype"), "application/epub+zip");
    let opf = epub_entry(&on_disk, "OEBPS/content.opf");
    assert!(opf.contains("<dc:creator id=\"creator\">A. Writer</dc:creator>"));
    assert!(epub_entry(&on_disk, "OEBPS/Intro.xhtml").contains("<p>Only paragraph.</p>"));
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, line_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("page {page_num} {line_count}"));
    }
    fn on_chapter(&self, page_num: usize, title: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("chapter {page_num} {title}"));
    }
    fn on_conversion_complete(&self, total_pages: usize, chapter_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {total_pages} {chapter_count}"));
    }
}

#[test]
fn progress_events_follow_page_order() {
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .chapter_pattern("^Chapter [0-9]+")
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert_source(&three_page_book(), &config).unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 3",
            "page 1 3",
            "chapter 2 Chapter 1",
            "page 2 3",
            "page 3 2",
            "done 3 2",
        ]
    );
}
