use std::path::Path;

use super::job::Job;
use super::page::{PageSpec, resolve_paper};
use super::settings::Settings;
use crate::encode::{EncodeOptions, OutputKind};
use crate::error::StitchError;
use crate::stitch::overlap::DetectorConfig;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub page: PageSpec,
    pub output_kind: OutputKind,
    pub detector: DetectorConfig,
    pub encode: EncodeOptions,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    ///
    /// 用紙サイズとDPIはここで `PageSpec` に解決されるため、不正なページ指定は
    /// パイプライン開始前に `InvalidPageSpec` として報告される。
    pub fn new(settings: &Settings, job: &Job) -> crate::error::Result<Self> {
        let paper_name = job.paper.as_deref().unwrap_or(&settings.paper);
        let paper = resolve_paper(paper_name, &settings.papers)?;
        let page = PageSpec::from_paper(paper, settings.dpi)?;

        let output_kind = job
            .format
            .or_else(|| OutputKind::from_path(Path::new(&job.output)))
            .or(settings.format)
            .ok_or_else(|| {
                StitchError::config(format!(
                    "Cannot determine output format for '{}': set `format` or use a .pdf/.png/.jpg extension",
                    job.output
                ))
            })?;

        let mut detector = settings.detector.clone();
        if let Some(threshold) = job.sad_threshold {
            detector.sad_threshold = threshold;
        }
        if let Some(search) = job.search {
            detector.search = search;
        }
        detector.validate()?;

        Ok(MergedConfig {
            page,
            output_kind,
            detector,
            encode: EncodeOptions {
                dpi: settings.dpi,
                jpeg_quality: settings.jpeg_quality,
            },
        })
    }
}
