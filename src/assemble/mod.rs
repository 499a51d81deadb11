//! Output assemblers: turn a [`crate::document::Document`] into bytes.
//!
//! 1. [`epub`] — EPUB 3 container (with an NCX for EPUB 2 readers)
//! 2. [`text`] — one flat UTF-8 text stream

pub mod epub;
pub mod text;
