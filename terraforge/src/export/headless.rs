//! Headless rendering context for the scene exporter.
//!
//! Scene-export toolchains for the web assume a browser canvas for image
//! encoding. This pipeline runs server-side, so the exporter is written
//! against [`RenderContext`] instead: a deliberately narrow seam exposing
//! only the single call the exporter actually issues. It is not a general
//! DOM emulation layer and must not grow into one.

use std::io::Cursor;

use image::{ImageBuffer, Rgba};

use super::ExportError;

/// Image-encoding surface required by the scene exporter.
pub trait RenderContext {
    /// Encodes raw RGBA pixels to PNG bytes.
    ///
    /// # Errors
    ///
    /// Fails when the pixel buffer does not match the dimensions or the
    /// encoder rejects the image.
    fn encode_png(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, ExportError>;
}

/// Headless stand-in for a browser canvas.
///
/// Meshes carry no baked texture at export time (the imagery travels as a
/// separate file for the viewer), so in practice this only ever encodes the
/// 1x1 placeholder. The encoder is still real: a caller that does bake a
/// texture gets valid PNG bytes back.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessContext;

impl HeadlessContext {
    pub fn new() -> Self {
        Self
    }
}

impl RenderContext for HeadlessContext {
    fn encode_png(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, ExportError> {
        let buffer: ImageBuffer<Rgba<u8>, _> =
            ImageBuffer::from_raw(width, height, rgba.to_vec()).ok_or_else(|| {
                ExportError::Encoding(format!(
                    "pixel buffer of {} bytes does not match {}x{}",
                    rgba.len(),
                    width,
                    height
                ))
            })?;

        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(buffer)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|e| ExportError::Encoding(e.to_string()))?;

        Ok(bytes.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_context_encodes_png() {
        let ctx = HeadlessContext::new();
        let pixels = vec![255u8; 4]; // one white RGBA pixel
        let png = ctx.encode_png(1, 1, &pixels).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_headless_context_rejects_mismatched_buffer() {
        let ctx = HeadlessContext::new();
        let result = ctx.encode_png(2, 2, &[0u8; 4]);
        assert!(result.is_err());
    }
}
