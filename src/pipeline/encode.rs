//! Image encoding: `DynamicImage` → JPEG or PNG bytes for the EPUB package.
//!
//! pdfium hands back embedded images as decoded bitmaps regardless of how
//! they were stored in the PDF, so every image is re-encoded here.

use crate::config::ImageEncoding;
use crate::pipeline::source::SourceImage;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an embedded image for the package.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_image(
    img: &DynamicImage,
    encoding: ImageEncoding,
) -> Result<SourceImage, image::ImageError> {
    let mut buf = Vec::new();
    match encoding {
        ImageEncoding::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;
        }
        ImageEncoding::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }

    debug!(
        "Encoded {}x{} image → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        encoding.media_type()
    );

    Ok(SourceImage::new(
        buf,
        encoding.media_type(),
        encoding.extension(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 128])))
    }

    #[test]
    fn encode_png() {
        let encoded = encode_image(&red_square(), ImageEncoding::Png).expect("encode should succeed");
        assert_eq!(encoded.media_type, "image/png");
        assert_eq!(encoded.extension, "png");
        assert_eq!(&encoded.data[..4], b"\x89PNG");
    }

    #[test]
    fn encode_jpeg_drops_alpha() {
        let encoded = encode_image(&red_square(), ImageEncoding::Jpeg).expect("encode should succeed");
        assert_eq!(encoded.media_type, "image/jpeg");
        assert_eq!(encoded.extension, "jpg");
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
    }
}
