//! Result types returned by the conversion entry points.

use crate::document::Document;
use crate::error::PageError;
use crate::pipeline::classify::LineCounts;
use serde::{Deserialize, Serialize};

/// A reflowed document plus what happened while building it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub document: Document,
    pub stats: ConversionStats,
    /// Non-fatal per-page problems, in page order.
    pub diagnostics: Vec<PageError>,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages fed through the pipeline (after page selection).
    pub processed_pages: usize,
    #[serde(flatten)]
    pub lines: LineCounts,
    pub chapters: usize,
    pub paragraphs: usize,
    pub images: usize,
    pub has_cover: bool,
    /// Pages with at least one diagnostic.
    pub pages_with_errors: usize,
    pub duration_ms: u64,
}

/// PDF information, as returned by [`crate::inspect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
