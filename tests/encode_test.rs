// Phase 6-7: デコード/エンコード・PDF出力テスト

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use page_stitch::decode::{decode_bytes, decode_file};
use page_stitch::encode::{EncodeOptions, OutputKind, encode, encode_dynamic};
use page_stitch::error::StitchError;
use page_stitch::raster::RasterImage;

fn pattern(width: u32, height: u32) -> RasterImage {
    let mut pixels = Vec::new();
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[(x * 10) as u8, (y * 10) as u8, 77]);
        }
    }
    RasterImage::new(width, height, pixels).unwrap()
}

// ============================================================
// 1. デコード（RGB正規化）
// ============================================================

#[test]
fn test_decode_missing_file_is_decode_failure() {
    let result = decode_file(Path::new("/nonexistent/dir/scan.png"));
    match result {
        Err(StitchError::DecodeFailure(msg)) => assert!(msg.contains("scan.png")),
        other => panic!("expected DecodeFailure, got {other:?}"),
    }
}

#[test]
fn test_decode_garbage_bytes_is_decode_failure() {
    let result = decode_bytes(b"definitely not an image");
    assert!(matches!(result, Err(StitchError::DecodeFailure(_))));
}

#[test]
fn test_decode_grayscale_expands_to_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray.png");
    GrayImage::from_pixel(4, 3, Luma([90])).save(&path).unwrap();

    let img = decode_file(&path).expect("decode");
    assert_eq!(img.dimensions(), (4, 3));
    assert_eq!(img.as_raw().len(), 4 * 3 * 3);
    assert_eq!(img.pixel(2, 1), [90, 90, 90]);
}

#[test]
fn test_decode_rgba_drops_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgba.png");
    RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 0]))
        .save(&path)
        .unwrap();

    let img = decode_file(&path).expect("decode");
    assert_eq!(img.pixel(1, 1), [10, 20, 30]);
}

// ============================================================
// 2. PNG / JPEG
// ============================================================

#[test]
fn test_png_is_lossless() {
    let img = pattern(12, 9);
    let bytes = encode(&img, OutputKind::Png, &EncodeOptions::default()).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(decode_bytes(&bytes).unwrap(), img);
}

#[test]
fn test_png_records_dpi() {
    let img = pattern(10, 6);
    let options = EncodeOptions {
        dpi: 300,
        jpeg_quality: 95,
    };
    let bytes = encode(&img, OutputKind::Png, &options).unwrap();

    let decoder = png::Decoder::new(std::io::Cursor::new(bytes.as_slice()));
    let reader = decoder.read_info().expect("valid PNG header");
    let dims = reader.info().pixel_dims.expect("pHYs chunk present");
    assert_eq!(dims.unit, png::Unit::Meter);
    // 300 dpi / 0.0254 m
    assert_eq!(dims.xppu, 11811);
    assert_eq!(dims.yppu, 11811);
}

#[test]
fn test_png_zero_dpi_is_encode_failure() {
    let options = EncodeOptions {
        dpi: 0,
        jpeg_quality: 95,
    };
    let result = encode(&pattern(4, 4), OutputKind::Png, &options);
    assert!(matches!(result, Err(StitchError::EncodeFailure(_))));
}

#[test]
fn test_jpeg_records_dpi() {
    let img = pattern(16, 16);
    let options = EncodeOptions {
        dpi: 300,
        jpeg_quality: 90,
    };
    let bytes = encode(&img, OutputKind::Jpg, &options).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    let jfif = bytes
        .windows(5)
        .position(|w| w == b"JFIF\0")
        .expect("JFIF header");
    assert_eq!(bytes[jfif + 7], 1, "density unit should be dots per inch");
    assert_eq!(&bytes[jfif + 8..jfif + 10], &[0x01, 0x2C]);

    let decoded = decode_bytes(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (16, 16));
}

#[test]
fn test_jpeg_quality_out_of_range() {
    let options = EncodeOptions {
        dpi: 300,
        jpeg_quality: 0,
    };
    let result = encode(&pattern(4, 4), OutputKind::Jpg, &options);
    assert!(matches!(result, Err(StitchError::EncodeFailure(_))));
}

#[test]
fn test_empty_image_is_encode_failure() {
    let empty = RasterImage::filled(0, 0, [0, 0, 0]);
    for kind in [OutputKind::Pdf, OutputKind::Png, OutputKind::Jpg] {
        let result = encode(&empty, kind, &EncodeOptions::default());
        assert!(
            matches!(result, Err(StitchError::EncodeFailure(_))),
            "{kind} should reject an empty image"
        );
    }
}

#[test]
fn test_encode_dynamic_flattens_alpha_for_jpeg() {
    let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 128])));
    let bytes = encode_dynamic(rgba, OutputKind::Jpg, &EncodeOptions::default()).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.color(), image::ColorType::Rgb8);
}

#[test]
fn test_output_kind_from_path() {
    assert_eq!(OutputKind::from_path(Path::new("a.pdf")), Some(OutputKind::Pdf));
    assert_eq!(OutputKind::from_path(Path::new("a.PNG")), Some(OutputKind::Png));
    assert_eq!(OutputKind::from_path(Path::new("a.jpeg")), Some(OutputKind::Jpg));
    assert_eq!(OutputKind::from_path(Path::new("a.jpg")), Some(OutputKind::Jpg));
    assert_eq!(OutputKind::from_path(Path::new("a.tiff")), None);
    assert_eq!(OutputKind::from_path(Path::new("noext")), None);
}

// ============================================================
// 3. PDF
// ============================================================

#[test]
fn test_pdf_single_page_with_physical_media_box() {
    let img = pattern(2550 / 50, 3900 / 50);
    let options = EncodeOptions {
        dpi: 6,
        jpeg_quality: 95,
    };
    let bytes = encode(&img, OutputKind::Pdf, &options).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.5"));

    let doc = lopdf::Document::load_mem(&bytes).expect("valid PDF");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);

    let page_id = *pages.values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let media_box: Vec<f32> = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_float().unwrap())
        .collect();

    // 51x78 px at 6 DPI = 8.5x13 in = 612x936 pt.
    assert_eq!(media_box.len(), 4);
    assert!((media_box[2] - 612.0).abs() < 0.01, "width {}", media_box[2]);
    assert!((media_box[3] - 936.0).abs() < 0.01, "height {}", media_box[3]);
}

#[test]
fn test_pdf_image_stream_round_trips_pixels() {
    let img = pattern(20, 10);
    let bytes = encode(&img, OutputKind::Pdf, &EncodeOptions::default()).unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();

    let image_stream = doc
        .objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .find(|s| {
            s.dict
                .get(b"Subtype")
                .and_then(|v| v.as_name())
                .map(|n| n == b"Image")
                .unwrap_or(false)
        })
        .expect("image XObject");

    assert_eq!(image_stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 20);
    assert_eq!(image_stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 10);
    let raw = image_stream.decompressed_content().expect("flate stream");
    assert_eq!(raw, img.as_raw());
}

#[test]
fn test_pdf_zero_dpi_rejected() {
    let options = EncodeOptions {
        dpi: 0,
        jpeg_quality: 95,
    };
    let result = encode(&pattern(4, 4), OutputKind::Pdf, &options);
    assert!(matches!(result, Err(StitchError::EncodeFailure(_))));
}
