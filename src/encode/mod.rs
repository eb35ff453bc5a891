pub mod bitmap;

use std::fmt;
use std::path::Path;

use image::DynamicImage;
use serde::Deserialize;

use crate::config::page::DEFAULT_DPI;
use crate::decode;
use crate::error::StitchError;
use crate::raster::RasterImage;

/// 出力形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Pdf,
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Pdf => "pdf",
            OutputKind::Png => "png",
            OutputKind::Jpg => "jpg",
        }
    }

    /// Infer the kind from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(OutputKind::Pdf),
            "png" => Some(OutputKind::Png),
            "jpg" | "jpeg" => Some(OutputKind::Jpg),
            _ => None,
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputKind::Pdf => "PDF",
            OutputKind::Png => "PNG",
            OutputKind::Jpg => "JPG",
        })
    }
}

/// Encoder settings shared by all output kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub dpi: u32,
    pub jpeg_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            jpeg_quality: 95,
        }
    }
}

/// ページ画像を指定形式にエンコードする。
pub fn encode(
    image: &RasterImage,
    kind: OutputKind,
    options: &EncodeOptions,
) -> crate::error::Result<Vec<u8>> {
    if image.is_empty() {
        return Err(StitchError::encode(format!(
            "cannot encode an empty {}x{} image as {kind}",
            image.width(),
            image.height()
        )));
    }
    match kind {
        OutputKind::Pdf => crate::pdf::writer::encode_pdf(image, options.dpi),
        OutputKind::Png => bitmap::encode_png(image, options.dpi),
        OutputKind::Jpg => bitmap::encode_jpeg(image, options.jpeg_quality, options.dpi),
    }
}

/// Encode an arbitrary decoded image, flattening alpha/palette/grayscale to
/// opaque RGB first. JPEG and PDF carry no alpha channel.
pub fn encode_dynamic(
    image: DynamicImage,
    kind: OutputKind,
    options: &EncodeOptions,
) -> crate::error::Result<Vec<u8>> {
    encode(&decode::normalize(image), kind, options)
}
