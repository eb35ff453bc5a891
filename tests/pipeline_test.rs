// Phase 8-9: パイプライン統合テスト

use std::path::{Path, PathBuf};

use image::RgbImage;
use page_stitch::config::page::PageSpec;
use page_stitch::decode::decode_bytes;
use page_stitch::encode::OutputKind;
use page_stitch::error::StitchError;
use page_stitch::pipeline::job_runner::{JobConfig, ProcessOptions, process, run_job};
use page_stitch::pipeline::orchestrator::{StitchService, run_all_jobs};

/// 100x200 white image with a 50x50 black square at rows `top..top+50`, cols 0-49.
fn write_square_png(path: &Path, top: u32) {
    let img = RgbImage::from_fn(100, 200, |x, y| {
        if x < 50 && y >= top && y < top + 50 {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    img.save(path).expect("write fixture");
}

fn write_pair(dir: &Path) -> (PathBuf, PathBuf) {
    let top = dir.join("top.png");
    let bottom = dir.join("bottom.png");
    write_square_png(&top, 150);
    write_square_png(&bottom, 0);
    (top, bottom)
}

fn job_config(dir: &Path, output: &str, kind: OutputKind) -> JobConfig {
    let (top, bottom) = write_pair(dir);
    JobConfig {
        top_path: top,
        bottom_path: bottom,
        output_path: dir.join(output),
        page: PageSpec::new(200, 500).unwrap(),
        output_kind: kind,
        options: ProcessOptions::default(),
    }
}

// ============================================================
// 1. 黒い正方形シナリオ（detect → stitch → fit）
// ============================================================

#[test]
fn test_square_scenario_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (top, bottom) = write_pair(dir.path());
    let page = PageSpec::new(200, 500).unwrap();

    let out = process(
        &top,
        &bottom,
        &page,
        OutputKind::Png,
        &ProcessOptions::default(),
    )
    .expect("pipeline should succeed");

    assert_eq!(out.overlap.height, 50);
    assert_eq!(out.overlap.quality, 0.0);
    assert_eq!(out.composite_size, (100, 350));
    assert_eq!((out.width, out.height), (200, 500));

    let page_img = decode_bytes(&out.bytes).unwrap();
    assert_eq!(page_img.dimensions(), (200, 500));

    // 100x350 scaled to 143x500 and pasted at x = 28.
    assert_eq!(page_img.pixel(10, 250), [255, 255, 255]);
    assert_eq!(page_img.pixel(190, 250), [255, 255, 255]);
    let inside_square = page_img.pixel(60, 250);
    assert!(inside_square[0] < 50, "square should stay dark: {inside_square:?}");
    let below_square = page_img.pixel(60, 400);
    assert!(below_square[0] > 200, "trimmed rows should be white: {below_square:?}");
}

// ============================================================
// 2. 決定性
// ============================================================

#[test]
fn test_pipeline_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (top, bottom) = write_pair(dir.path());
    let page = PageSpec::new(120, 300).unwrap();

    for kind in [OutputKind::Pdf, OutputKind::Png, OutputKind::Jpg] {
        let first = process(&top, &bottom, &page, kind, &ProcessOptions::default()).unwrap();
        let second = process(&top, &bottom, &page, kind, &ProcessOptions::default()).unwrap();
        assert_eq!(first.bytes, second.bytes, "{kind} output differs between runs");
    }
}

// ============================================================
// 3. エラー伝播
// ============================================================

#[test]
fn test_missing_input_is_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (top, _) = write_pair(dir.path());
    let page = PageSpec::new(100, 100).unwrap();

    let result = process(
        &top,
        &dir.path().join("missing.png"),
        &page,
        OutputKind::Pdf,
        &ProcessOptions::default(),
    );
    assert!(matches!(result, Err(StitchError::DecodeFailure(_))));
}

// ============================================================
// 4. run_job / run_all_jobs
// ============================================================

#[test]
fn test_run_job_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = job_config(dir.path(), "merged.pdf", OutputKind::Pdf);

    let result = run_job(&config).expect("job should succeed");
    assert_eq!(result.overlap.height, 50);
    assert_eq!((result.width, result.height), (200, 500));

    let written = std::fs::read(&config.output_path).unwrap();
    assert!(written.starts_with(b"%PDF-"));
}

#[test]
fn test_run_all_jobs_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = job_config(dir.path(), "good.png", OutputKind::Png);
    let mut bad = good.clone();
    bad.bottom_path = dir.path().join("nope.png");
    bad.output_path = dir.path().join("bad.png");

    let results = run_all_jobs(&[bad, good.clone()]);
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Err(StitchError::DecodeFailure(_))));
    assert!(results[1].is_ok());
    assert!(good.output_path.exists());
    assert!(!dir.path().join("bad.png").exists());
}

// ============================================================
// 5. StitchService（ワーカースレッド・単一完了通知）
// ============================================================

#[test]
fn test_service_delivers_single_completion() {
    let dir = tempfile::tempdir().unwrap();
    let config = job_config(dir.path(), "unused.png", OutputKind::Png);

    let service = StitchService::new();
    let handle = service.submit(config).expect("idle service accepts job");
    let out = handle.wait().expect("job should succeed");
    assert_eq!(out.overlap.height, 50);
    assert_eq!((out.width, out.height), (200, 500));
    assert!(!service.is_busy());
}

#[test]
fn test_service_reports_failure_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = job_config(dir.path(), "out.png", OutputKind::Png);
    config.top_path = dir.path().join("missing.png");

    let service = StitchService::new();
    let handle = service.submit_to_file(config).unwrap();
    assert!(matches!(handle.wait(), Err(StitchError::DecodeFailure(_))));
    assert!(!service.is_busy());
    assert!(!dir.path().join("out.png").exists());
}
