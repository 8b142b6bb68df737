//! Raster recompression backed by the `image` crate.

use super::{ImageOptimizer, RasterFormat};
use crate::errors::TransformError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};

/// The default [`ImageOptimizer`].
///
/// Re-encodes PNGs at maximum compression and JPEGs at a fixed quality. The
/// original bytes are returned when re-encoding does not make the file
/// smaller.
#[derive(Debug, Clone, Copy)]
pub struct RasterRecompressor {
    jpeg_quality: u8,
}

impl Default for RasterRecompressor {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl RasterRecompressor {
    /// Creates a recompressor with JPEG quality 85.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JPEG quality (1-100).
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

fn codec(err: impl std::fmt::Display) -> TransformError {
    TransformError::Codec(err.to_string())
}

impl ImageOptimizer for RasterRecompressor {
    fn optimize(&self, bytes: &[u8], format: RasterFormat) -> Result<Vec<u8>, TransformError> {
        let image_format = match format {
            RasterFormat::Png => ImageFormat::Png,
            RasterFormat::Jpeg => ImageFormat::Jpeg,
        };
        let img = image::load_from_memory_with_format(bytes, image_format).map_err(codec)?;

        let mut encoded = Vec::with_capacity(bytes.len());
        match format {
            RasterFormat::Png => {
                PngEncoder::new_with_quality(&mut encoded, CompressionType::Best, FilterType::Adaptive)
                    .write_image(img.as_bytes(), img.width(), img.height(), img.color())
                    .map_err(codec)?;
            }
            RasterFormat::Jpeg => {
                JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality)
                    .encode_image(&img.to_rgb8())
                    .map_err(codec)?;
            }
        }

        if encoded.len() < bytes.len() {
            Ok(encoded)
        } else {
            Ok(bytes.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn sample(format: ImageOutputFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_png_never_grows_and_stays_decodable() {
        let original = sample(ImageOutputFormat::Png);
        let optimized = RasterRecompressor::new()
            .optimize(&original, RasterFormat::Png)
            .unwrap();

        assert!(optimized.len() <= original.len());
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }

    #[test]
    fn test_jpeg_never_grows() {
        let original = sample(ImageOutputFormat::Jpeg(100));
        let optimized = RasterRecompressor::new()
            .with_jpeg_quality(60)
            .optimize(&original, RasterFormat::Jpeg)
            .unwrap();

        assert!(optimized.len() <= original.len());
    }

    #[test]
    fn test_garbage_is_a_codec_error() {
        let err = RasterRecompressor::new()
            .optimize(b"not an image", RasterFormat::Png)
            .unwrap_err();
        assert!(matches!(err, TransformError::Codec(_)));
    }
}
