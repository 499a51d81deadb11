//! Error types for the pdf2epub library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2EpubError`] — **Fatal**: the run cannot proceed at all (input
//!   missing, bad pattern in the configuration, output not writable).
//!   Returned as `Err(Pdf2EpubError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: something on a single page could not be
//!   extracted (an undecodable image, a text layer pdfium refused to read).
//!   The page is processed with whatever is left and the error is kept in
//!   [`crate::output::ConversionOutput::diagnostics`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2epub library.
#[derive(Debug, Error)]
pub enum Pdf2EpubError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection does not hit a single page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A chapter or blacklist pattern is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A book profile file could not be read or parsed.
    #[error("Failed to load book profile '{path}': {detail}")]
    ProfileLoadFailed { path: PathBuf, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory), place the library\n\
next to the working directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2EpubError {
    /// Process exit status for this error: 2 when the destination could not
    /// be written, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Pdf2EpubError::OutputWriteFailed { .. } => 2,
            _ => 1,
        }
    }
}

/// A non-fatal error for a single page.
///
/// Pages are 1-indexed in every variant.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page's text layer could not be read; the page is treated as empty.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The page's images could not be enumerated or decoded; the page keeps
    /// its text but no images.
    #[error("Page {page}: image extraction failed: {detail}")]
    ImageExtractionFailed { page: usize, detail: String },

    /// A decoded image could not be re-encoded for the output package.
    #[error("Page {page}: image {image} could not be encoded: {detail}")]
    ImageEncodingFailed {
        page: usize,
        image: usize,
        detail: String,
    },
}

impl PageError {
    /// 1-indexed page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::TextExtractionFailed { page, .. }
            | PageError::ImageExtractionFailed { page, .. }
            | PageError::ImageEncodingFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_write_failure_exits_with_two() {
        let e = Pdf2EpubError::OutputWriteFailed {
            path: PathBuf::from("/readonly/book.epub"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(e.exit_code(), 2);
        assert!(e.to_string().contains("/readonly/book.epub"));
    }

    #[test]
    fn input_errors_exit_with_one() {
        let e = Pdf2EpubError::FileNotFound {
            path: PathBuf::from("missing.pdf"),
        };
        assert_eq!(e.exit_code(), 1);
        assert!(e.to_string().contains("missing.pdf"));
    }

    #[test]
    fn invalid_pattern_display_names_pattern() {
        let source = regex::Regex::new("[0-9](?!.)").unwrap_err();
        let e = Pdf2EpubError::InvalidPattern {
            pattern: "[0-9](?!.)".into(),
            source,
        };
        assert!(e.to_string().contains("[0-9](?!.)"), "got: {e}");
        assert_eq!(e.exit_code(), 1);
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::ImageExtractionFailed {
            page: 4,
            detail: "unsupported filter".into(),
        };
        assert_eq!(e.page(), 4);
        assert!(e.to_string().contains("Page 4"));
    }
}
