// Phase 4: 重複領域のトリミングと縦方向合成

use tracing::debug;

use super::overlap::OverlapResult;
use crate::error::StitchError;
use crate::raster::{Canvas, RasterImage, WHITE};

/// 上画像と下画像を縦に連結する。
///
/// `overlap.height > 0` の場合、下画像の上端からその行数を取り除いてから連結する。
/// 幅が異なる場合は狭い方を白地の中央に配置する（奇数余りは右側）。
///
/// # Errors
/// 両方の部分が高さ0になった場合 `StitchError::EmptyComposite` を返す。
pub fn stitch(
    top: &RasterImage,
    bottom: &RasterImage,
    overlap: &OverlapResult,
) -> crate::error::Result<RasterImage> {
    let bottom_part = if overlap.is_none() {
        bottom.clone()
    } else {
        let trim = overlap.height.min(bottom.height());
        debug!(trim, "trimming duplicated rows from lower image");
        bottom.crop_rows_from(trim)
    };

    if top.height() == 0 && bottom_part.height() == 0 {
        return Err(StitchError::empty_composite(format!(
            "both parts are empty (top {}x{}, bottom {}x{}, overlap {}px)",
            top.width(),
            top.height(),
            bottom.width(),
            bottom.height(),
            overlap.height
        )));
    }
    if bottom_part.height() == 0 {
        debug!("lower image fully inside the overlap; using upper image alone");
        return Ok(top.clone());
    }
    if top.height() == 0 {
        return Ok(bottom_part);
    }

    let final_width = top.width().max(bottom_part.width());
    let mut canvas = Canvas::new(final_width, top.height() + bottom_part.height(), WHITE);
    canvas.paste(top, centered_x(final_width, top.width()), 0);
    canvas.paste(
        &bottom_part,
        centered_x(final_width, bottom_part.width()),
        top.height(),
    );

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        "composite assembled"
    );
    Ok(canvas.into_image())
}

/// Left padding that centres `width` within `total` (floor, extra pixel on the right).
fn centered_x(total: u32, width: u32) -> u32 {
    (total - width) / 2
}
