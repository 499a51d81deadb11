//! The reassembled book: chapters of paragraph blocks plus package images.
//!
//! This is the hand-off point between the reflow pipeline and the output
//! assemblers. Paragraph text is stored as plain text; escaping is the
//! assembler's concern.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static RE_UNSAFE_ID_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// Book-level metadata written into the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: Option<String>,
    pub language: String,
    pub identifier: String,
}

/// A reflowed book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub metadata: BookMetadata,
    /// Always at least one chapter: the implicit "Intro".
    pub chapters: Vec<Chapter>,
    pub cover: Option<Image>,
    /// Inline images referenced by [`Block::Image`] entries.
    pub images: Vec<Image>,
}

impl Document {
    /// Number of paragraph blocks across all chapters.
    pub fn paragraph_count(&self) -> usize {
        self.chapters
            .iter()
            .flat_map(|c| c.blocks.iter())
            .filter(|b| matches!(b, Block::Paragraph(_)))
            .count()
    }
}

/// One chapter: a title and its body in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Chapter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    /// File-system and XML-id safe form of the title.
    ///
    /// Characters outside `[A-Za-z0-9_-]` become `_`; an empty result
    /// becomes `chapter`. Different titles can map to the same id, so the
    /// EPUB writer deduplicates.
    pub fn id(&self) -> String {
        if self.title.is_empty() {
            return "chapter".to_string();
        }
        RE_UNSAFE_ID_CHARS.replace_all(&self.title, "_").into_owned()
    }
}

/// A body element of a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A finished paragraph (joined lines, never empty).
    Paragraph(String),
    /// An empty paragraph produced by a blank source line.
    Blank,
    /// A reference to an entry of [`Document::images`] by package path.
    Image { href: String },
}

/// An image stored in the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Path inside the package content directory, e.g. `images/pg3_1.jpg`.
    pub file_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_id_replaces_unsafe_characters() {
        assert_eq!(Chapter::new("Chapter 1").id(), "Chapter_1");
        assert_eq!(Chapter::new("Part I: Origins").id(), "Part_I__Origins");
        assert_eq!(Chapter::new("Intro").id(), "Intro");
        assert_eq!(Chapter::new("").id(), "chapter");
        assert_eq!(Chapter::new("Été").id(), "_t_");
    }

    #[test]
    fn paragraph_count_ignores_blanks_and_images() {
        let doc = Document {
            metadata: BookMetadata {
                title: "T".into(),
                author: None,
                language: "en".into(),
                identifier: "T_cleaned".into(),
            },
            chapters: vec![Chapter {
                title: "Intro".into(),
                blocks: vec![
                    Block::Paragraph("a".into()),
                    Block::Blank,
                    Block::Image {
                        href: "images/pg1_1.jpg".into(),
                    },
                    Block::Paragraph("b".into()),
                ],
            }],
            cover: None,
            images: vec![],
        };
        assert_eq!(doc.paragraph_count(), 2);
    }
}
