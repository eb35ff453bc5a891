pub mod compositor;
pub mod fit;
pub mod overlap;

use crate::config::page::PageSpec;
use crate::raster::RasterImage;
use overlap::{DetectorConfig, OverlapResult};

/// Result of the three core stages.
pub struct ComposedPage {
    pub page: RasterImage,
    pub overlap: OverlapResult,
    /// Composite size before page fitting.
    pub composite_size: (u32, u32),
}

/// detect → stitch → fit を順に実行する。
///
/// 入力画像は消費され、合成画像はフィット後に破棄される。
pub fn compose_page(
    top: RasterImage,
    bottom: RasterImage,
    detector: &DetectorConfig,
    target: &PageSpec,
) -> crate::error::Result<ComposedPage> {
    let overlap = overlap::detect(&top, &bottom, detector);
    let composite = compositor::stitch(&top, &bottom, &overlap)?;
    drop((top, bottom));

    let composite_size = composite.dimensions();
    let page = fit::fit(&composite, target);
    Ok(ComposedPage {
        page,
        overlap,
        composite_size,
    })
}
