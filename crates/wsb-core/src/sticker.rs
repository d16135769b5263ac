//! Sticker normalization: any image -> square, transparent-padded PNG.

use std::io::Cursor;

use image::{imageops, imageops::FilterType, DynamicImage, ImageError, ImageFormat, RgbaImage};

use crate::media::MediaError;

/// MIME type and file name every outgoing sticker is wrapped with.
pub const STICKER_MIME: &str = "image/png";
pub const STICKER_FILENAME: &str = "sticker.png";

/// Resize/encode routine used on the create-sticker path.
pub trait ImageCodec: Send + Sync {
    /// Fit `bytes` into a `size`×`size` canvas without cropping or distortion,
    /// pad with transparent pixels and return a lossless, alpha-capable encoding.
    fn resize_contain(&self, bytes: &[u8], size: u32) -> Result<Vec<u8>, MediaError>;
}

/// [`ImageCodec`] backed by the `image` crate, producing PNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContainPngCodec;

impl ImageCodec for ContainPngCodec {
    fn resize_contain(&self, bytes: &[u8], size: u32) -> Result<Vec<u8>, MediaError> {
        let source = image::load_from_memory(bytes).map_err(classify)?;
        let canvas = contain(&source, size);

        let mut out = Vec::new();
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| MediaError::Encode(e.to_string()))?;
        Ok(out)
    }
}

/// Scale `source` to fit inside `size`×`size` and centre it on a transparent canvas.
fn contain(source: &DynamicImage, size: u32) -> RgbaImage {
    let (w, h) = (source.width().max(1), source.height().max(1));
    let scale = f64::min(f64::from(size) / f64::from(w), f64::from(size) / f64::from(h));
    let fit_w = ((f64::from(w) * scale).round() as u32).clamp(1, size);
    let fit_h = ((f64::from(h) * scale).round() as u32).clamp(1, size);

    let resized = source
        .resize_exact(fit_w, fit_h, FilterType::Lanczos3)
        .to_rgba8();

    let mut canvas = RgbaImage::new(size, size);
    let x = i64::from((size - fit_w) / 2);
    let y = i64::from((size - fit_h) / 2);
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}

fn classify(err: ImageError) -> MediaError {
    match err {
        ImageError::Unsupported(e) => MediaError::UnsupportedFormat(e.to_string()),
        other => MediaError::InvalidData(other.to_string()),
    }
}
