// Phase 3: 重なり検出 — 正規化SADによる縦方向オーバーラップ探索
//
// Compares the bottom strip of the upper scan with the top strip of the lower
// scan for every candidate overlap height and keeps the height with the lowest
// average per-sample absolute difference.

use image::imageops::{self, FilterType};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::StitchError;
use crate::raster::{CHANNELS, RasterImage};

/// Smallest overlap (in pixels) that is ever accepted.
const MIN_OVERLAP_PX: u32 = 5;

/// Proportional floor: overlaps below this share of the shorter image are rejected.
const MIN_OVERLAP_RATIO: f64 = 0.01;

/// 探索方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Every candidate height in `[step, search_max]`.
    #[default]
    Exhaustive,
    /// Coarse scan at `coarse_step`, then a fine scan around the best candidate.
    /// May miss a better peak outside the refine window.
    CoarseToFine,
}

/// 重なり検出の設定。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Maximum share of the shorter image's height searched for overlap.
    pub search_proportion: f64,
    pub step: u32,
    pub coarse_step: u32,
    /// Maximum accepted average per-sample difference (0-255 scale).
    pub sad_threshold: f64,
    pub search: SearchMode,
    /// Cap on the longest side used for the search. `None` searches at full resolution.
    pub downsample_max: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            search_proportion: 0.95,
            step: 1,
            coarse_step: 10,
            sad_threshold: 25.0,
            search: SearchMode::Exhaustive,
            downsample_max: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.step == 0 {
            return Err(StitchError::config("detector step must be at least 1"));
        }
        if self.coarse_step < self.step {
            return Err(StitchError::config(format!(
                "detector coarse_step ({}) must not be smaller than step ({})",
                self.coarse_step, self.step
            )));
        }
        if !(self.search_proportion > 0.0 && self.search_proportion <= 1.0) {
            return Err(StitchError::config(format!(
                "detector search_proportion must be in (0, 1], got {}",
                self.search_proportion
            )));
        }
        if !self.sad_threshold.is_finite() || self.sad_threshold < 0.0 {
            return Err(StitchError::config(format!(
                "detector sad_threshold must be a non-negative number, got {}",
                self.sad_threshold
            )));
        }
        if self.downsample_max == Some(0) {
            return Err(StitchError::config("detector downsample_max must be positive"));
        }
        Ok(())
    }
}

/// 検出結果。`height == 0` は「有効な重なりなし」を表す。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapResult {
    pub height: u32,
    /// Best normalized SAD seen during the search (lower is better).
    pub quality: f64,
}

impl OverlapResult {
    pub fn none() -> Self {
        Self {
            height: 0,
            quality: f64::INFINITY,
        }
    }

    pub fn is_none(&self) -> bool {
        self.height == 0
    }
}

/// Best candidate so far: `(normalized SAD, overlap height)`.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    sad: f64,
    height: u32,
}

impl Candidate {
    const NONE: Candidate = Candidate {
        sad: f64::INFINITY,
        height: 0,
    };

    /// Lower SAD wins; equal SAD prefers the taller overlap.
    fn better(self, other: Candidate) -> Candidate {
        if other.sad < self.sad || (other.sad == self.sad && other.height > self.height) {
            other
        } else {
            self
        }
    }
}

/// 上画像の下端と下画像の上端の重なり高さを検出する。
///
/// `config.downsample_max` が設定されていて入力がそれを超える場合、
/// 縮小コピー上で探索し、結果の高さを元解像度に戻して返す。
pub fn detect(top: &RasterImage, bottom: &RasterImage, config: &DetectorConfig) -> OverlapResult {
    let longest = top
        .width()
        .max(top.height())
        .max(bottom.width())
        .max(bottom.height());

    match config.downsample_max {
        Some(cap) if cap > 0 && longest > cap => {
            let scale = scale_for(top, cap).min(scale_for(bottom, cap));
            let small_top = downsample(top, scale);
            let small_bottom = downsample(bottom, scale);
            debug!(
                scale,
                top = ?small_top.dimensions(),
                bottom = ?small_bottom.dimensions(),
                "searching overlap on downsampled copies"
            );
            let found = detect_full_resolution(&small_top, &small_bottom, config);
            if found.is_none() {
                return found;
            }
            let full_max = top.height().min(bottom.height());
            let height = ((f64::from(found.height) / scale).round() as u32).min(full_max);
            OverlapResult {
                height,
                quality: found.quality,
            }
        }
        _ => detect_full_resolution(top, bottom, config),
    }
}

/// Search on the given buffers without any resampling.
pub fn detect_full_resolution(
    top: &RasterImage,
    bottom: &RasterImage,
    config: &DetectorConfig,
) -> OverlapResult {
    let step = config.step.max(1);

    let common_width = top.width().min(bottom.width());
    if common_width == 0 {
        debug!("no common width; overlap impossible");
        return OverlapResult::none();
    }

    let max_possible = top.height().min(bottom.height());
    if max_possible < step {
        debug!(max_possible, step, "images shorter than one search step");
        return OverlapResult::none();
    }

    let search_max = ((f64::from(max_possible) * config.search_proportion).round() as u32)
        .max(step)
        .min(max_possible);

    let strips = Strips {
        top,
        bottom,
        common_width,
    };

    let best = match config.search {
        SearchMode::Exhaustive => strips.scan(step, search_max, step),
        SearchMode::CoarseToFine => {
            coarse_to_fine(&strips, step, config.coarse_step, search_max, config.sad_threshold)
        }
    };

    let min_significant = step
        .max(MIN_OVERLAP_PX)
        .max((MIN_OVERLAP_RATIO * f64::from(max_possible)).round() as u32);

    debug!(
        best_height = best.height,
        best_sad = best.sad,
        search_max,
        min_significant,
        threshold = config.sad_threshold,
        "overlap search finished"
    );

    if best.height < min_significant || best.sad > config.sad_threshold {
        info!(
            candidate = best.height,
            sad = best.sad,
            "overlap rejected; appending lower image in full"
        );
        return OverlapResult {
            height: 0,
            quality: best.sad,
        };
    }

    info!(height = best.height, sad = best.sad, "overlap accepted");
    OverlapResult {
        height: best.height,
        quality: best.sad,
    }
}

fn coarse_to_fine(
    strips: &Strips<'_>,
    step: u32,
    coarse_step: u32,
    search_max: u32,
    sad_threshold: f64,
) -> Candidate {
    let coarse_step = coarse_step.max(step);
    let good_enough = sad_threshold / 2.0;

    // 粗探索: 十分に良い候補が見つかった時点で打ち切る
    let mut best = Candidate::NONE;
    let mut oh = coarse_step;
    while oh <= search_max {
        best = best.better(strips.evaluate(oh));
        if best.sad < good_enough {
            debug!(height = best.height, sad = best.sad, "coarse scan stopped early");
            break;
        }
        oh += coarse_step;
    }

    if best.height == 0 {
        // search_max < coarse_step: fall back to the fine scan over the whole range.
        return strips.scan(step, search_max, step);
    }

    let lo = best.height.saturating_sub(coarse_step - 1).max(step);
    let hi = best.height.saturating_add(coarse_step).min(search_max);
    best.better(strips.scan(lo, hi, step))
}

/// The two images restricted to their shared columns.
struct Strips<'a> {
    top: &'a RasterImage,
    bottom: &'a RasterImage,
    common_width: u32,
}

impl Strips<'_> {
    /// Evaluate every height in `[from, to]` stepped by `step`, in parallel.
    fn scan(&self, from: u32, to: u32, step: u32) -> Candidate {
        if from > to {
            return Candidate::NONE;
        }
        (from as usize..to as usize + 1)
            .into_par_iter()
            .step_by(step as usize)
            .map(|oh| self.evaluate(oh as u32))
            .reduce(|| Candidate::NONE, Candidate::better)
    }

    /// Normalized SAD between the bottom `oh` rows of `top` and the top `oh`
    /// rows of `bottom`.
    fn evaluate(&self, oh: u32) -> Candidate {
        let samples = self.common_width as usize * CHANNELS;
        let top_start = self.top.height() - oh;

        let sad: u64 = (0..oh)
            .map(|i| {
                let a = &self.top.row(top_start + i)[..samples];
                let b = &self.bottom.row(i)[..samples];
                a.iter()
                    .zip(b)
                    .map(|(&x, &y)| u64::from(x.abs_diff(y)))
                    .sum::<u64>()
            })
            .sum();

        let denominator = oh as f64 * samples as f64;
        Candidate {
            sad: sad as f64 / denominator,
            height: oh,
        }
    }
}

fn scale_for(img: &RasterImage, cap: u32) -> f64 {
    let longest = img.width().max(img.height());
    if longest > cap {
        f64::from(cap) / f64::from(longest)
    } else {
        1.0
    }
}

fn downsample(img: &RasterImage, scale: f64) -> RasterImage {
    if scale >= 1.0 || img.is_empty() {
        return img.clone();
    }
    let w = ((f64::from(img.width()) * scale).round() as u32).max(1);
    let h = ((f64::from(img.height()) * scale).round() as u32).max(1);
    let resized = imageops::resize(&img.to_rgb_image(), w, h, FilterType::Triangle);
    RasterImage::from_rgb_image(resized)
}
