//! Input resolution: validate a user-supplied path before handing it to pdfium.
//!
//! pdfium reports a missing or non-PDF file as a generic load failure, so the
//! path, read permission and `%PDF` magic bytes are checked here first to give
//! the user a specific error.

use crate::error::Pdf2EpubError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, Pdf2EpubError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Pdf2EpubError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2EpubError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2EpubError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2EpubError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_input("/no/such/book.pdf").unwrap_err();
        assert!(matches!(err, Pdf2EpubError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = resolve_input(f.path()).unwrap_err();
        match err {
            Pdf2EpubError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let resolved = resolve_input(f.path()).unwrap();
        assert_eq!(resolved, f.path());
    }
}
