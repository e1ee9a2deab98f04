//! Image re-encoding: fetched bytes → RGB8 → JPEG.
//!
//! Product images arrive as JPEG, PNG (often with alpha), WebP or GIF.
//! Everything is normalised to three-channel RGB and written as JPEG at a
//! fixed quality so the output directory is uniform regardless of source.

use crate::error::ItemError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Decode `bytes` (format sniffed from content) into an image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ItemError> {
    image::load_from_memory(bytes).map_err(|e| ItemError::Decode {
        detail: e.to_string(),
    })
}

/// Drop alpha / palette / 16-bit depth and encode as JPEG.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ItemError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| ItemError::Encode {
            detail: e.to_string(),
        })?;
    debug!(
        "Encoded {}x{} → {} bytes JPEG (q={})",
        rgb.width(),
        rgb.height(),
        buf.len(),
        quality
    );
    Ok(buf)
}

/// [`decode`] followed by [`encode_jpeg`].
pub fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, ItemError> {
    encode_jpeg(&decode(bytes)?, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([255, 0, 0, 128])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn png_with_alpha_becomes_rgb_jpeg() {
        let jpeg = reencode_jpeg(&png_bytes(), 95).expect("re-encode should succeed");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let back = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(back.color(), image::ColorType::Rgb8);
        assert_eq!((back.width(), back.height()), (8, 6));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = reencode_jpeg(b"<html>not an image</html>", 95).unwrap_err();
        assert!(matches!(err, ItemError::Decode { .. }));
        assert!(!err.is_fetch_failure());
    }
}
