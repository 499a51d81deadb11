//! Flat text rendering.
//!
//! Each paragraph becomes `\t{text}\n`, each blank marker an empty line.
//! Images are dropped. Chapter titles are written on their own line only
//! when asked for.

use crate::document::{Block, Document};

pub fn render_text(doc: &Document, include_titles: bool) -> String {
    let mut out = String::new();
    for chapter in &doc.chapters {
        if include_titles {
            out.push_str(&chapter.title);
            out.push('\n');
        }
        for block in &chapter.blocks {
            match block {
                Block::Paragraph(text) => {
                    out.push('\t');
                    out.push_str(text);
                    out.push('\n');
                }
                Block::Blank => out.push('\n'),
                Block::Image { .. } => {}
            }
        }
    }
    out
}
