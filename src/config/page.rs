// Phase 1: 用紙サイズ → ピクセル寸法 (PageSpec)

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::StitchError;

/// Default output resolution.
pub const DEFAULT_DPI: u32 = 300;

/// 物理用紙サイズ（インチ）。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PaperSize {
    pub width_in: f64,
    pub height_in: f64,
}

/// Built-in presets, keyed by normalized name.
const PRESETS: &[(&str, PaperSize)] = &[
    (
        "8.5x13in",
        PaperSize {
            width_in: 8.5,
            height_in: 13.0,
        },
    ),
    (
        "8.5x14in",
        PaperSize {
            width_in: 8.5,
            height_in: 14.0,
        },
    ),
    (
        "letter",
        PaperSize {
            width_in: 8.5,
            height_in: 11.0,
        },
    ),
    (
        "a4",
        PaperSize {
            width_in: 8.27,
            height_in: 11.69,
        },
    ),
];

/// 出力ページのピクセル寸法。
///
/// 両辺とも1以上であることを構築時に保証する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    width_px: u32,
    height_px: u32,
}

impl PageSpec {
    pub fn new(width_px: u32, height_px: u32) -> crate::error::Result<Self> {
        if width_px == 0 || height_px == 0 {
            return Err(StitchError::invalid_page_spec(format!(
                "target dimensions must be positive, got {width_px}x{height_px}"
            )));
        }
        Ok(Self {
            width_px,
            height_px,
        })
    }

    /// Convert a physical paper size to pixels at `dpi`, rounding each side.
    pub fn from_paper(paper: PaperSize, dpi: u32) -> crate::error::Result<Self> {
        if dpi == 0 {
            return Err(StitchError::invalid_page_spec("DPI must be positive"));
        }
        let to_px = |inches: f64| -> crate::error::Result<u32> {
            let px = (inches * f64::from(dpi)).round();
            if !px.is_finite() || px < 1.0 || px > f64::from(u32::MAX) {
                return Err(StitchError::invalid_page_spec(format!(
                    "paper {}x{} in at {dpi} DPI does not give a usable pixel size",
                    paper.width_in, paper.height_in
                )));
            }
            Ok(px as u32)
        };
        Self::new(to_px(paper.width_in)?, to_px(paper.height_in)?)
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }
}

/// 用紙名を解決する。
///
/// 検索順:
/// 1. `extra`（settings.yaml の `papers`）
/// 2. 組み込みプリセット（`8.5x13in`, `8.5x14in`, `letter`, `a4`）
/// 3. リテラル `<W>x<H>in`（例: `"8.5 x 13 inches"`）
pub fn resolve_paper(
    name: &str,
    extra: &BTreeMap<String, PaperSize>,
) -> crate::error::Result<PaperSize> {
    if let Some(paper) = extra.get(name) {
        return Ok(*paper);
    }

    let normalized = normalize_paper_name(name);
    if let Some(paper) = extra
        .iter()
        .find(|(k, _)| normalize_paper_name(k) == normalized)
        .map(|(_, v)| *v)
    {
        return Ok(paper);
    }
    if let Some((_, paper)) = PRESETS.iter().find(|(k, _)| *k == normalized) {
        return Ok(*paper);
    }

    parse_inches(&normalized)
        .ok_or_else(|| StitchError::invalid_page_spec(format!("Unknown paper size: '{name}'")))
}

/// Lowercase, drop whitespace, and fold `inches`/`inch` to `in`.
fn normalize_paper_name(name: &str) -> String {
    let compact: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if let Some(stem) = compact.strip_suffix("inches") {
        format!("{stem}in")
    } else if let Some(stem) = compact.strip_suffix("inch") {
        format!("{stem}in")
    } else {
        compact
    }
}

fn parse_inches(normalized: &str) -> Option<PaperSize> {
    let body = normalized.strip_suffix("in")?;
    let (w, h) = body.split_once('x')?;
    let width_in: f64 = w.parse().ok()?;
    let height_in: f64 = h.parse().ok()?;
    if width_in > 0.0 && height_in > 0.0 {
        Some(PaperSize {
            width_in,
            height_in,
        })
    } else {
        None
    }
}
