// Phase 6: image crate wrapper: file/bytes -> RGB8 RasterImage

use std::path::Path;

use image::DynamicImage;

use crate::error::StitchError;
use crate::raster::RasterImage;

/// Decodes an image file and normalizes it to 3-channel RGB.
///
/// Alpha is dropped; grayscale, palette and 16-bit inputs are expanded or
/// reduced to RGB8.
///
/// # Errors
/// Returns `StitchError::DecodeFailure` if the file is missing, unreadable,
/// or not in a supported format (PNG, JPEG, TIFF, BMP, GIF, ...).
pub fn decode_file(path: &Path) -> crate::error::Result<RasterImage> {
    let img = image::open(path).map_err(|e| {
        StitchError::decode(format!("could not open '{}': {e}", path.display()))
    })?;
    Ok(normalize(img))
}

/// Decodes an in-memory image, guessing the format from its header.
pub fn decode_bytes(bytes: &[u8]) -> crate::error::Result<RasterImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| StitchError::decode(format!("could not decode image data: {e}")))?;
    Ok(normalize(img))
}

/// Force any decoded colour mode into RGB8.
pub fn normalize(img: DynamicImage) -> RasterImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => RasterImage::from_rgb_image(rgb),
        other => RasterImage::from_rgb_image(other.to_rgb8()),
    }
}
