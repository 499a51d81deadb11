//! The page source seam: where page text and images come from.
//!
//! The reflow core only needs, per page, the raw text and the embedded
//! images. [`PageSource`] is that contract; [`crate::pipeline::extract::PdfiumSource`]
//! implements it over a PDF, [`MemorySource`] over pre-extracted data.

use crate::error::PageError;

/// pdfium's marker for a hyphen that ends a line.
pub const SOFT_HYPHEN_MARKER: char = '\u{2}';

/// Normalise extracted page text: the line-end hyphen marker becomes `-` and
/// any other control character except tab, newline and carriage return is
/// dropped.
pub fn clean_page_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            SOFT_HYPHEN_MARKER => Some('-'),
            '\t' | '\n' | '\r' => Some(c),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// An embedded image, already encoded for the output package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: Vec<u8>,
    pub media_type: String,
    /// File extension without the dot, e.g. `jpg`.
    pub extension: String,
}

impl SourceImage {
    pub fn new(data: Vec<u8>, media_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
            extension: extension.into(),
        }
    }
}

/// Ordered pages with text and images. Page indices are 0-based.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Raw extracted text of page `index`, possibly empty.
    fn page_text(&self, index: usize) -> Result<String, PageError>;

    /// Embedded images of page `index`, in page order.
    fn page_images(&self, index: usize) -> Result<Vec<SourceImage>, PageError>;
}

/// One page held in memory.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    pub text: String,
    /// `Err` simulates a page whose images cannot be extracted.
    pub images: Result<Vec<SourceImage>, String>,
}

impl MemoryPage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Ok(Vec::new()),
        }
    }

    pub fn with_image(mut self, image: SourceImage) -> Self {
        if let Ok(images) = &mut self.images {
            images.push(image);
        }
        self
    }

    pub fn with_image_error(mut self, detail: impl Into<String>) -> Self {
        self.images = Err(detail.into());
        self
    }
}

/// A [`PageSource`] over in-memory pages.
///
/// ```rust
/// use pdf2epub::{MemorySource, PageSource};
///
/// let source = MemorySource::from_texts(["Intro text.", "Chapter 1\nIt begins."]);
/// assert_eq!(source.page_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<MemoryPage>,
}

impl MemorySource {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self { pages }
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: texts.into_iter().map(MemoryPage::text).collect(),
        }
    }

    fn page(&self, index: usize) -> Result<&MemoryPage, PageError> {
        self.pages
            .get(index)
            .ok_or_else(|| PageError::TextExtractionFailed {
                page: index + 1,
                detail: format!("no page {} in a {}-page source", index + 1, self.pages.len()),
            })
    }
}

impl PageSource for MemorySource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, PageError> {
        Ok(self.page(index)?.text.clone())
    }

    fn page_images(&self, index: usize) -> Result<Vec<SourceImage>, PageError> {
        let page = self.page(index)?;
        page.images
            .clone()
            .map_err(|detail| PageError::ImageExtractionFailed {
                page: index + 1,
                detail,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_page_text_restores_line_end_hyphens() {
        assert_eq!(
            clean_page_text("The long experi\u{2}\r\nment\u{7} ended.\tX\u{0}"),
            "The long experi-\r\nment ended.\tX"
        );
    }

    #[test]
    fn memory_source_serves_pages() {
        let source = MemorySource::new(vec![
            MemoryPage::text("one"),
            MemoryPage::text("two").with_image(SourceImage::new(vec![1, 2], "image/png", "png")),
        ]);
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page_text(1).unwrap(), "two");
        assert_eq!(source.page_images(0).unwrap(), vec![]);
        assert_eq!(source.page_images(1).unwrap().len(), 1);
    }

    #[test]
    fn memory_source_reports_image_failure_with_page_number() {
        let source = MemorySource::new(vec![MemoryPage::text("x").with_image_error("bad filter")]);
        let err = source.page_images(0).unwrap_err();
        assert_eq!(
            err,
            PageError::ImageExtractionFailed {
                page: 1,
                detail: "bad filter".into()
            }
        );
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let source = MemorySource::from_texts(["only"]);
        assert_eq!(source.page_text(3).unwrap_err().page(), 4);
    }
}
