// Phase 5: アスペクト比を保ったページフィット + 余白パディング

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::config::page::PageSpec;
use crate::raster::{Canvas, RasterImage, WHITE};

/// Scale factor below which the high-quality filter is used.
const HEAVY_DOWNSCALE: f64 = 0.5;

/// Scaled size of `(width, height)` fitting inside `target` without cropping.
///
/// Each side is clamped to `1..=target` so extreme aspect ratios still
/// produce a drawable strip.
pub fn fit_dimensions(width: u32, height: u32, target: &PageSpec) -> (u32, u32) {
    let (tw, th) = (target.width_px(), target.height_px());
    let (w, h) = (f64::from(width), f64::from(height));
    let aspect = w / h;

    let (new_w, new_h) = if w / f64::from(tw) > h / f64::from(th) {
        // 幅が制約
        (f64::from(tw), (f64::from(tw) / aspect).round())
    } else {
        // 高さが制約
        ((f64::from(th) * aspect).round(), f64::from(th))
    };

    (
        (new_w as u32).clamp(1, tw),
        (new_h as u32).clamp(1, th),
    )
}

/// Pick the resampling filter for a given scale factor.
///
/// Lanczos3 in the `image` crate widens its support with the reduction
/// ratio, so heavy downscales average over the whole source area.
pub fn choose_filter(scale_factor: f64) -> FilterType {
    if scale_factor < HEAVY_DOWNSCALE {
        FilterType::Lanczos3
    } else {
        FilterType::Triangle
    }
}

/// 画像を `target` に収まるよう等倍率で拡縮し、白地の中央に配置する。
///
/// 戻り値の寸法は常に `target` と一致する。
pub fn fit(image: &RasterImage, target: &PageSpec) -> RasterImage {
    let (tw, th) = (target.width_px(), target.height_px());
    let mut canvas = Canvas::new(tw, th, WHITE);

    if image.is_empty() {
        debug!("empty composite; emitting blank page");
        return canvas.into_image();
    }

    let (new_w, new_h) = fit_dimensions(image.width(), image.height(), target);
    let scale_factor = (f64::from(new_w) / f64::from(image.width()))
        .min(f64::from(new_h) / f64::from(image.height()));
    let filter = choose_filter(scale_factor);

    debug!(
        from = ?image.dimensions(),
        to = ?(new_w, new_h),
        scale_factor,
        ?filter,
        "resampling composite"
    );

    let scaled = if (new_w, new_h) == image.dimensions() {
        image.clone()
    } else {
        RasterImage::from_rgb_image(imageops::resize(
            &image.to_rgb_image(),
            new_w,
            new_h,
            filter,
        ))
    };

    canvas.paste(&scaled, (tw - new_w) / 2, (th - new_h) / 2);
    canvas.into_image()
}
