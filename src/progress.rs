//! Progress-callback trait for per-page reflow events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the document.
//!
//! # Example
//!
//! ```rust
//! use pdf2epub::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ChapterCounter {
//!     chapters: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for ChapterCounter {
//!     fn on_chapter(&self, page_num: usize, title: &str) {
//!         self.chapters.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}: new chapter '{title}'");
//!     }
//! }
//!
//! let counter = Arc::new(ChapterCounter { chapters: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Pages are processed strictly in order on one thread, but the trait is
/// `Send + Sync` so a callback can be shared with a UI thread. All methods
/// have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is read.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be processed
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's text is read.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after every line of a page has been classified.
    ///
    /// # Arguments
    /// * `line_count` — number of lines the page contributed
    fn on_page_complete(&self, page_num: usize, total_pages: usize, line_count: usize) {
        let _ = (page_num, total_pages, line_count);
    }

    /// Called for each non-fatal page problem (unreadable text layer,
    /// undecodable image). The page is still processed.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called when a heading line opens a new chapter.
    fn on_chapter(&self, page_num: usize, title: &str) {
        let _ = (page_num, title);
    }

    /// Called once after all pages have been processed.
    ///
    /// # Arguments
    /// * `total_pages`   — total pages processed
    /// * `chapter_count` — chapters in the reassembled document, Intro included
    fn on_conversion_complete(&self, total_pages: usize, chapter_count: usize) {
        let _ = (total_pages, chapter_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        titles: Mutex<Vec<String>>,
        chapter_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _line_count: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chapter(&self, _page_num: usize, title: &str) {
            self.titles.lock().unwrap().push(title.to_string());
        }

        fn on_conversion_complete(&self, _total_pages: usize, chapter_count: usize) {
            self.chapter_total.store(chapter_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_chapter(3, "Chapter 1");
        cb.on_conversion_complete(5, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 30);
        tracker.on_page_start(2, 2);
        tracker.on_chapter(2, "Part One");
        tracker.on_page_error(2, 2, "image 1 undecodable");
        tracker.on_page_complete(2, 2, 28);
        tracker.on_conversion_complete(2, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.titles.lock().unwrap(), vec!["Part One".to_string()]);
        assert_eq!(tracker.chapter_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_page_start(1, 10);
        cb.on_page_complete(1, 10, 12);
    }
}
