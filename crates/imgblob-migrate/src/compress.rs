//! Byte compressors
//!
//! A [`Compressor`] takes the raw file bytes plus their MIME type and returns
//! the bytes to store, or `None` when it cannot handle the input. Compressors
//! are shared read-only between table units and must be deterministic.

use flate2::{write::GzEncoder, Compression};
use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
    DynamicImage, ImageFormat,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Default JPEG re-encoding quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

pub trait Compressor: Send + Sync {
    fn compress(&self, bytes: &[u8], mime_type: &str) -> Option<Vec<u8>>;
}

impl<F> Compressor for F
where
    F: Fn(&[u8], &str) -> Option<Vec<u8>> + Send + Sync,
{
    fn compress(&self, bytes: &[u8], mime_type: &str) -> Option<Vec<u8>> {
        self(bytes, mime_type)
    }
}

/// Which compressor the run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressorKind {
    #[default]
    Image,
    Gzip,
}

/// Compression section of the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompressionSettings {
    #[serde(default)]
    pub kind: CompressorKind,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            kind: CompressorKind::Image,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CompressionSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(1..=100).contains(&self.jpeg_quality) {
            errors.push(format!(
                "JpegQuality '{}' must be between 1 and 100",
                self.jpeg_quality
            ));
        }
        errors
    }

    pub fn build(&self) -> Arc<dyn Compressor> {
        match self.kind {
            CompressorKind::Image => Arc::new(ImageCompressor::new(self.jpeg_quality)),
            CompressorKind::Gzip => Arc::new(GzipCompressor::default()),
        }
    }
}

/// Re-encodes JPEG and PNG images
///
/// Other MIME types and undecodable bytes yield `None`. When re-encoding does
/// not make the image smaller the original bytes are returned unchanged.
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    jpeg_quality: u8,
}

impl ImageCompressor {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        let result = match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let image = match image {
                    DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image.clone(),
                    other => DynamicImage::ImageRgb8(other.to_rgb8()),
                };
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.jpeg_quality))
            },
            ImageFormat::Png => image.write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                CompressionType::Best,
                FilterType::Adaptive,
            )),
            _ => return None,
        };

        match result {
            Ok(()) => Some(out),
            Err(e) => {
                debug!(error = %e, "Image re-encoding failed");
                None
            },
        }
    }
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl Compressor for ImageCompressor {
    fn compress(&self, bytes: &[u8], mime_type: &str) -> Option<Vec<u8>> {
        let format = ImageFormat::from_mime_type(mime_type)
            .filter(|f| matches!(f, ImageFormat::Jpeg | ImageFormat::Png))?;

        let image = match image::load_from_memory_with_format(bytes, format) {
            Ok(image) => image,
            Err(e) => {
                debug!(error = %e, mime_type, "Could not decode image");
                return None;
            },
        };

        let encoded = self.encode(&image, format)?;
        if encoded.len() < bytes.len() {
            Some(encoded)
        } else {
            Some(bytes.to_vec())
        }
    }
}

/// Gzips any input
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self {
            level: Compression::best(),
        }
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, bytes: &[u8], _mime_type: &str) -> Option<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), self.level);
        encoder.write_all(bytes).ok()?;
        encoder.finish().ok()
    }
}
