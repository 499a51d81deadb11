//! Pipeline stages for PDF reflow.
//!
//! Each submodule implements one step. Data flows strictly forward:
//!
//! ```text
//! input ──▶ extract ──▶ classify ──▶ accumulate / split ──▶ assemble
//! (path)    (pdfium)    (per line)   (paragraphs, chapters)
//! ```
//!
//! 1. [`input`]    — validate the user-supplied path
//! 2. [`source`]   — the [`source::PageSource`] seam and an in-memory source
//! 3. [`extract`]  — pdfium-backed page source; page text and images
//! 4. [`encode`]   — re-encode embedded images as JPEG or PNG
//! 5. [`classify`] — decide what each line is
//! 6. [`accumulate`] — join lines into paragraphs
//! 7. [`split`]    — open and seal chapters; owns the per-run state

pub mod accumulate;
pub mod classify;
pub mod encode;
pub mod extract;
pub mod input;
pub mod source;
pub mod split;
