//! Image normalization for product uploads.
//!
//! Uploaded images arrive as opaque byte buffers in whatever format the
//! client produced. Everything is re-encoded to PNG before persistence so
//! the render path serves exactly one content type.

use std::io::Cursor;

use image::ImageFormat;

use crate::ServiceError;

/// Content type of every stored image payload.
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Decodes the uploaded bytes and re-encodes them as PNG.
///
/// Input that does not decode as an image is a Validation error; the
/// upload boundary only filters on MIME type, which is client-supplied.
pub fn normalize_image(bytes: &[u8]) -> Result<Vec<u8>, ServiceError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ServiceError::Validation(format!("Invalid image: {e}")))?;

    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| ServiceError::Unexpected(format!("Failed to encode image: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn sample_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10])));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
            .unwrap();
        out
    }

    #[test]
    fn test_normalizes_jpeg_to_png() {
        let png = normalize_image(&sample_jpeg()).unwrap();
        let format = image::guess_format(&png).unwrap();
        assert_eq!(format, ImageFormat::Png);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
    }

    #[test]
    fn test_png_input_stays_decodable() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 3, image::Rgb([0, 0, 255])));
        let mut png_in = Vec::new();
        img.write_to(&mut Cursor::new(&mut png_in), ImageFormat::Png)
            .unwrap();

        let png_out = normalize_image(&png_in).unwrap();
        let decoded = image::load_from_memory(&png_out).unwrap();
        assert_eq!(decoded.height(), 3);
    }

    #[test]
    fn test_rejects_non_image_bytes() {
        let err = normalize_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.starts_with("Invalid image")));
    }
}
