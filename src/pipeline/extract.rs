//! PDF access through pdfium: page text, embedded images and metadata.
//!
//! ## Library binding
//!
//! pdfium is a shared library loaded at runtime. [`bind_pdfium`] looks in
//! order at `PDFIUM_LIB_PATH` (a library file or the directory holding it),
//! the working directory, then the system library search path.
//!
//! ## Text order
//!
//! `PdfPageText::all()` returns the page's text in content-stream order with
//! one `'\n'` per visual line. That line structure is what the classifier
//! works on, so no geometry-based reordering is attempted.

use crate::config::ImageEncoding;
use crate::error::{PageError, Pdf2EpubError};
use crate::output::DocumentMetadata;
use crate::pipeline::encode::encode_image;
use crate::pipeline::source::{clean_page_text, PageSource, SourceImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2EpubError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let path = PathBuf::from(path);
        let lib_path = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        match Pdfium::bind_to_library(&lib_path) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", lib_path.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => {
                return Err(Pdf2EpubError::PdfiumBindingFailed(format!(
                    "{PDFIUM_LIB_PATH_ENV}={}: {e:?}",
                    lib_path.display()
                )))
            }
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    if let Ok(bindings) = Pdfium::bind_to_library(&local) {
        debug!("Bound pdfium from {}", local.display());
        return Ok(Pdfium::new(bindings));
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Pdf2EpubError::PdfiumBindingFailed(format!("{e:?}")))
}

/// A [`PageSource`] over a PDF opened with pdfium.
pub struct PdfiumSource<'a> {
    document: PdfDocument<'a>,
    image_encoding: ImageEncoding,
}

impl<'a> PdfiumSource<'a> {
    /// Open `path`, mapping pdfium's load errors onto the fatal error kinds.
    pub fn open(
        pdfium: &'a Pdfium,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Self, Pdf2EpubError> {
        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    Pdf2EpubError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    Pdf2EpubError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                Pdf2EpubError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Self {
            document,
            image_encoding: ImageEncoding::default(),
        })
    }

    pub fn with_image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.image_encoding = encoding;
        self
    }

    /// Document information dictionary plus page count and version.
    pub fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }

    fn page(&self, index: usize) -> Result<PdfPage<'_>, PdfiumError> {
        self.document.pages().get(index as u16)
    }
}

impl PageSource for PdfiumSource<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, PageError> {
        let failed = |e: PdfiumError| PageError::TextExtractionFailed {
            page: index + 1,
            detail: format!("{:?}", e),
        };
        let page = self.page(index).map_err(failed)?;
        let text = page.text().map_err(failed)?;
        Ok(clean_page_text(&text.all()))
    }

    fn page_images(&self, index: usize) -> Result<Vec<SourceImage>, PageError> {
        let page = self
            .page(index)
            .map_err(|e| PageError::ImageExtractionFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let mut images = Vec::new();
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            let raw = image_object
                .get_raw_image()
                .map_err(|e| PageError::ImageExtractionFailed {
                    page: index + 1,
                    detail: format!("{:?}", e),
                })?;
            let encoded = encode_image(&raw, self.image_encoding).map_err(|e| {
                PageError::ImageEncodingFailed {
                    page: index + 1,
                    image: images.len() + 1,
                    detail: e.to_string(),
                }
            })?;
            images.push(encoded);
        }

        debug!("Page {}: {} embedded images", index + 1, images.len());
        Ok(images)
    }
}
