// Phase 8: ジョブ単位: 画像読込 -> 重なり検出 -> 合成 -> ページフィット -> 出力

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::page::PageSpec;
use crate::decode::decode_file;
use crate::encode::{EncodeOptions, OutputKind, encode};
use crate::stitch::compose_page;
use crate::stitch::overlap::{DetectorConfig, OverlapResult};

/// Algorithm and encoder settings for one request.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub detector: DetectorConfig,
    pub encode: EncodeOptions,
}

/// Encoded page plus what the pipeline found along the way.
#[derive(Debug, Clone)]
pub struct StitchOutput {
    pub bytes: Vec<u8>,
    pub kind: OutputKind,
    pub width: u32,
    pub height: u32,
    pub overlap: OverlapResult,
    /// Composite size before page fitting.
    pub composite_size: (u32, u32),
}

/// 2枚の画像を1ページに合成し、指定形式でエンコードする。
///
/// 処理順序は固定: decode → detect → stitch → fit → encode。
/// 途中のいずれかが失敗した場合、そのエラーを1つだけ返す（再試行なし）。
pub fn process(
    top_path: &Path,
    bottom_path: &Path,
    page: &PageSpec,
    kind: OutputKind,
    options: &ProcessOptions,
) -> crate::error::Result<StitchOutput> {
    let (top, bottom) = rayon::join(|| decode_file(top_path), || decode_file(bottom_path));
    let (top, bottom) = (top?, bottom?);
    debug!(
        top = ?top.dimensions(),
        bottom = ?bottom.dimensions(),
        "decoded inputs"
    );

    let composed = compose_page(top, bottom, &options.detector, page)?;
    let bytes = encode(&composed.page, kind, &options.encode)?;

    info!(
        kind = %kind,
        bytes = bytes.len(),
        overlap = composed.overlap.height,
        "page encoded"
    );

    Ok(StitchOutput {
        bytes,
        kind,
        width: composed.page.width(),
        height: composed.page.height(),
        overlap: composed.overlap,
        composite_size: composed.composite_size,
    })
}

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub top_path: PathBuf,
    pub bottom_path: PathBuf,
    pub output_path: PathBuf,
    pub page: PageSpec,
    pub output_kind: OutputKind,
    pub options: ProcessOptions,
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub top_path: PathBuf,
    pub bottom_path: PathBuf,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub overlap: OverlapResult,
}

/// Run one job and write the encoded page to `config.output_path`.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let output = process(
        &config.top_path,
        &config.bottom_path,
        &config.page,
        config.output_kind,
        &config.options,
    )?;

    std::fs::write(&config.output_path, &output.bytes)?;

    Ok(JobResult {
        top_path: config.top_path.clone(),
        bottom_path: config.bottom_path.clone(),
        output_path: config.output_path.clone(),
        width: output.width,
        height: output.height,
        overlap: output.overlap,
    })
}
