// Phase 7: RasterImage -> PNG (png crate) / JPEG (image crate) bytes

use std::io::Cursor;

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::ExtendedColorType;

use crate::error::StitchError;
use crate::raster::RasterImage;

/// Encode to lossless PNG.
///
/// `dpi` は pHYs チャンク (pixels per meter) として書き込む。
pub fn encode_png(image: &RasterImage, dpi: u32) -> crate::error::Result<Vec<u8>> {
    if dpi == 0 {
        return Err(StitchError::encode("PNG DPI must be positive"));
    }
    let ppm = dpi_to_ppm(dpi);

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.as_raw())?;
        writer.finish()?;
    }
    Ok(buf)
}

/// 1 inch = 0.0254 m
fn dpi_to_ppm(dpi: u32) -> u32 {
    (f64::from(dpi) / 0.0254).round() as u32
}

/// Encode to baseline JPEG with the given quality (1-100).
///
/// The JFIF header records `dpi` as the pixel density so viewers print the
/// page at its physical size.
pub fn encode_jpeg(image: &RasterImage, quality: u8, dpi: u32) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(StitchError::encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }
    let density = u16::try_from(dpi)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| StitchError::encode(format!("JPEG DPI must be 1-65535, got {dpi}")))?;

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.set_pixel_density(PixelDensity::dpi(density));
        encoder.encode(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )?;
    }

    Ok(buf.into_inner())
}
