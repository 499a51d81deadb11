//! EPUB 3 package writer.
//!
//! Layout of the container:
//!
//! ```text
//! mimetype                      (stored, first entry)
//! META-INF/container.xml
//! OEBPS/content.opf             package document: metadata, manifest, spine
//! OEBPS/toc.ncx                 EPUB 2 table of contents
//! OEBPS/nav.xhtml               EPUB 3 navigation document
//! OEBPS/style/styles.css        shared stylesheet
//! OEBPS/cover.xhtml + cover.*   when the document has a cover
//! OEBPS/{chapter}.xhtml         one per chapter, discovery order
//! OEBPS/images/*                inline images
//! ```
//!
//! Spine order is `[cover?, nav, chapter₁ … chapterₙ]`.

use crate::document::{Block, Chapter, Document};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::{self, Cursor, Seek, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Package path of the shared stylesheet, relative to the content directory.
pub const STYLESHEET_HREF: &str = "style/styles.css";

/// Paragraph indent, no vertical margins.
pub const STYLESHEET: &str = "p {\n    text-indent: 50px;\n    margin: 0;\n}\n";

const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// File names used by the package itself; chapters must not take them.
const RESERVED_STEMS: [&str; 3] = ["nav", "cover", "toc"];

/// Write `doc` as an EPUB into `writer`, returning the writer once the
/// archive is finished.
pub fn write_epub<W: Write + Seek>(doc: &Document, writer: W) -> io::Result<W> {
    write_epub_at(doc, writer, Utc::now())
}

/// Render `doc` as EPUB bytes in memory.
pub fn to_epub_bytes(doc: &Document) -> io::Result<Vec<u8>> {
    Ok(write_epub(doc, Cursor::new(Vec::new()))?.into_inner())
}

/// A chapter's place in the package.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChapterEntry {
    /// Manifest id.
    id: String,
    /// File name relative to the content directory.
    href: String,
    title: String,
}

/// Assign each chapter a unique file name derived from its title.
///
/// A title whose file name is already taken gets `_2`, `_3` … appended.
fn chapter_entries(chapters: &[Chapter]) -> Vec<ChapterEntry> {
    let mut taken: HashSet<String> = RESERVED_STEMS.iter().map(|s| s.to_string()).collect();
    chapters
        .iter()
        .map(|chapter| {
            let base = chapter.id();
            let mut stem = base.clone();
            let mut n = 1;
            while !taken.insert(stem.clone()) {
                n += 1;
                stem = format!("{base}_{n}");
            }
            if n > 1 {
                warn!(
                    title = %chapter.title,
                    file = %stem,
                    "Chapter file name collision; renamed"
                );
            }
            ChapterEntry {
                id: format!("ch-{stem}"),
                href: format!("{stem}.xhtml"),
                title: chapter.title.clone(),
            }
        })
        .collect()
}

fn write_epub_at<W: Write + Seek>(
    doc: &Document,
    writer: W,
    modified: DateTime<Utc>,
) -> io::Result<W> {
    let mut zip = ZipWriter::new(writer);

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // 1. mimetype (must be first, uncompressed)
    zip.start_file("mimetype", stored).map_err(io_error)?;
    zip.write_all(b"application/epub+zip")?;

    // 2. container.xml
    zip.start_file("META-INF/container.xml", deflated)
        .map_err(io_error)?;
    zip.write_all(CONTAINER_XML)?;

    let entries = chapter_entries(&doc.chapters);

    // 3. content.opf
    let opf = generate_opf(doc, &entries, modified);
    zip.start_file("OEBPS/content.opf", deflated)
        .map_err(io_error)?;
    zip.write_all(opf.as_bytes())?;

    // 4. toc.ncx and nav.xhtml
    zip.start_file("OEBPS/toc.ncx", deflated).map_err(io_error)?;
    zip.write_all(generate_ncx(doc, &entries).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)
        .map_err(io_error)?;
    zip.write_all(generate_nav(doc, &entries).as_bytes())?;

    // 5. stylesheet
    zip.start_file(format!("OEBPS/{STYLESHEET_HREF}"), deflated)
        .map_err(io_error)?;
    zip.write_all(STYLESHEET.as_bytes())?;

    // 6. cover
    if let Some(cover) = &doc.cover {
        zip.start_file("OEBPS/cover.xhtml", deflated)
            .map_err(io_error)?;
        zip.write_all(generate_cover(doc, &cover.file_name).as_bytes())?;

        zip.start_file(format!("OEBPS/{}", cover.file_name), stored)
            .map_err(io_error)?;
        zip.write_all(&cover.data)?;
    }

    // 7. chapters
    for (chapter, entry) in doc.chapters.iter().zip(&entries) {
        zip.start_file(format!("OEBPS/{}", entry.href), deflated)
            .map_err(io_error)?;
        zip.write_all(render_chapter(chapter, &doc.metadata.language).as_bytes())?;
    }

    // 8. images (already compressed)
    for image in &doc.images {
        zip.start_file(format!("OEBPS/{}", image.file_name), stored)
            .map_err(io_error)?;
        zip.write_all(&image.data)?;
    }

    let writer = zip.finish().map_err(io_error)?;
    debug!(
        "EPUB written: {} chapters, {} images",
        entries.len(),
        doc.images.len()
    );
    Ok(writer)
}

fn io_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::other(e)
}

/// Generate content.opf.
fn generate_opf(doc: &Document, entries: &[ChapterEntry], modified: DateTime<Utc>) -> String {
    let meta = &doc.metadata;
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&meta.identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&meta.title)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&meta.language)
    ));
    if let Some(author) = &meta.author {
        opf.push_str(&format!(
            "    <dc:creator id=\"creator\">{}</dc:creator>\n",
            escape_xml(author)
        ));
    }
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        modified.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    if doc.cover.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }
    opf.push_str("  </metadata>\n");

    // Manifest
    opf.push_str("  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    opf.push_str(&format!(
        "    <item id=\"style\" href=\"{STYLESHEET_HREF}\" media-type=\"text/css\"/>\n"
    ));
    if let Some(cover) = &doc.cover {
        opf.push_str(
            "    <item id=\"cover\" href=\"cover.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
        );
        opf.push_str(&format!(
            "    <item id=\"cover-image\" href=\"{}\" media-type=\"{}\" properties=\"cover-image\"/>\n",
            escape_xml(&cover.file_name),
            escape_xml(&cover.media_type)
        ));
    }
    for entry in entries {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            escape_xml(&entry.id),
            escape_xml(&entry.href)
        ));
    }
    for (i, image) in doc.images.iter().enumerate() {
        opf.push_str(&format!(
            "    <item id=\"img-{}\" href=\"{}\" media-type=\"{}\"/>\n",
            i + 1,
            escape_xml(&image.file_name),
            escape_xml(&image.media_type)
        ));
    }
    opf.push_str("  </manifest>\n");

    // Spine
    opf.push_str("  <spine toc=\"ncx\">\n");
    if doc.cover.is_some() {
        opf.push_str("    <itemref idref=\"cover\" linear=\"no\"/>\n");
    }
    opf.push_str("    <itemref idref=\"nav\"/>\n");
    for entry in entries {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            escape_xml(&entry.id)
        ));
    }
    opf.push_str("  </spine>\n");

    opf.push_str("</package>\n");
    opf
}

/// Generate toc.ncx, one flat navPoint per chapter.
fn generate_ncx(doc: &Document, entries: &[ChapterEntry]) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(&doc.metadata.identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&doc.metadata.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, entry) in entries.iter().enumerate() {
        let play_order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navPoint-{play_order}\" playOrder=\"{play_order}\">\n"
        ));
        ncx.push_str(&format!(
            "      <navLabel><text>{}</text></navLabel>\n",
            escape_xml(&entry.title)
        ));
        ncx.push_str(&format!(
            "      <content src=\"{}\"/>\n",
            escape_xml(&entry.href)
        ));
        ncx.push_str("    </navPoint>\n");
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn xhtml_head(title: &str, language: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="{STYLESHEET_HREF}"/>
</head>
"#,
        lang = escape_xml(language),
        title = escape_xml(title),
    )
}

/// Generate the EPUB 3 navigation document.
fn generate_nav(doc: &Document, entries: &[ChapterEntry]) -> String {
    let mut nav = xhtml_head(&doc.metadata.title, &doc.metadata.language);
    nav.push_str("<body>\n  <nav epub:type=\"toc\" id=\"toc\">\n    <h1>Table of Contents</h1>\n    <ol>\n");
    for entry in entries {
        nav.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&entry.href),
            escape_xml(&entry.title)
        ));
    }
    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

fn generate_cover(doc: &Document, image_href: &str) -> String {
    let mut cover = xhtml_head(&doc.metadata.title, &doc.metadata.language);
    cover.push_str(&format!(
        "<body>\n  <div style=\"text-align: center;\"><img src=\"{}\" alt=\"{}\" style=\"max-width: 100%; height: auto;\"/></div>\n</body>\n</html>\n",
        escape_xml(image_href),
        escape_xml(&doc.metadata.title)
    ));
    cover
}

/// Render one chapter as an XHTML content document.
pub fn render_chapter(chapter: &Chapter, language: &str) -> String {
    let mut html = xhtml_head(&chapter.title, language);
    html.push_str("<body>\n");
    html.push_str(&format!("  <h1>{}</h1>\n", escape_xml(&chapter.title)));
    for block in &chapter.blocks {
        match block {
            Block::Paragraph(text) => {
                html.push_str(&format!("  <p>{}</p>\n", escape_xml(text)));
            }
            Block::Blank => html.push_str("  <p></p>\n"),
            Block::Image { href } => {
                html.push_str(&format!(
                    "  <p><img src=\"{}\" alt=\"\"/></p>\n",
                    escape_xml(href)
                ));
            }
        }
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Escape XML special characters and drop control characters XML 1.0
/// forbids.
pub fn escape_xml(s: &str) -> String {
    let s: String = s
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
