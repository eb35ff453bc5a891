// Phase 2: RGB8ラスタ値とコンポジット用キャンバス

use image::RgbImage;

use crate::error::StitchError;

/// Samples per pixel. Every image the core sees is interleaved RGB.
pub const CHANNELS: usize = 3;

/// Canvas fill colour for padding.
pub const WHITE: [u8; CHANNELS] = [255, 255, 255];

/// 不変のRGB8ラスタ画像。
///
/// `pixels.len() == width * height * CHANNELS` を構築時に保証する。
/// 変更操作はすべて新しい値を返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap a row-major RGB buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> crate::error::Result<Self> {
        let expected = buffer_len(width, height).ok_or_else(|| {
            StitchError::decode(format!(
                "Overflow computing buffer size for {width}x{height} RGB image"
            ))
        })?;
        if pixels.len() != expected {
            return Err(StitchError::decode(format!(
                "RGB data size mismatch: expected {} bytes, got {}",
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A `width x height` image filled with a single colour.
    pub fn filled(width: u32, height: u32, color: [u8; CHANNELS]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Copy into an `image::RgbImage` for resampling/encoding.
    pub fn to_rgb_image(&self) -> RgbImage {
        let img = RgbImage::from_raw(self.width, self.height, self.pixels.clone());
        debug_assert!(img.is_some(), "pixel buffer length invariant broken");
        // 長さ不変条件により from_raw は失敗しない
        img.unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Bytes of row `y` (all columns).
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; CHANNELS] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// 行 `start..height` を切り出した新しい画像を返す。
    ///
    /// `start` が高さ以上なら高さ0の画像になる。
    pub fn crop_rows_from(&self, start: u32) -> Self {
        let start = start.min(self.height);
        let offset = start as usize * self.stride();
        Self {
            width: self.width,
            height: self.height - start,
            pixels: self.pixels[offset..].to_vec(),
        }
    }

    fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }
}

fn buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|wh| wh.checked_mul(CHANNELS))
}

/// Mutable working buffer owned by a composition step.
///
/// Starts filled with a colour, receives clipped pastes, and is frozen
/// with [`Canvas::into_image`].
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: [u8; CHANNELS]) -> Self {
        let RasterImage {
            width,
            height,
            pixels,
        } = RasterImage::filled(width, height, fill);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copy `src` with its top-left corner at `(x, y)`. Parts falling
    /// outside the canvas are dropped.
    pub fn paste(&mut self, src: &RasterImage, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width().min(self.width - x) as usize;
        let rows = src.height().min(self.height - y);
        if cols == 0 {
            return;
        }
        let dst_stride = self.width as usize * CHANNELS;
        for row in 0..rows {
            let src_row = &src.row(row)[..cols * CHANNELS];
            let dst_start = (y + row) as usize * dst_stride + x as usize * CHANNELS;
            self.pixels[dst_start..dst_start + cols * CHANNELS].copy_from_slice(src_row);
        }
    }

    pub fn into_image(self) -> RasterImage {
        RasterImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
        }
    }
}
