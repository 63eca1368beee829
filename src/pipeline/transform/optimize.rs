//! Lossless PNG recompression and quality-bounded JPEG re-encoding.
//!
//! Other formats pass through untouched. The re-encoded bytes are only kept
//! when they are smaller than the input.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageResult};

use crate::errors::TransformError;
use crate::pipeline::fileset::FileSet;

use super::{SyncTransform, TransformContext};

#[derive(Debug, Clone, Copy)]
pub struct OptimizeImages {
    jpeg_quality: u8,
}

impl OptimizeImages {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

fn reencode_png(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

fn reencode_jpeg(img: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)?;
    Ok(out)
}

impl SyncTransform for OptimizeImages {
    fn name(&self) -> &'static str {
        "optimize-images"
    }

    fn apply_sync(&self, files: FileSet, _ctx: &TransformContext) -> Result<FileSet, TransformError> {
        files.try_map(|entry| {
            let format = match entry.extension().as_deref() {
                Some("png") => ImageFormat::Png,
                Some("jpg" | "jpeg") => ImageFormat::Jpeg,
                _ => return Ok(()),
            };
            let fail = |e: image::ImageError| TransformError::new("optimize-images", &entry.origin, e);

            let img = image::load_from_memory_with_format(&entry.contents, format).map_err(fail)?;
            let encoded = match format {
                ImageFormat::Png => reencode_png(&img),
                _ => reencode_jpeg(&img, self.jpeg_quality),
            }
            .map_err(fail)?;

            if encoded.len() < entry.contents.len() {
                entry.contents = encoded;
            }
            Ok(())
        })
    }
}
