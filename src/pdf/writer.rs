// Phase 7: 画像XObject構築、ページ・カタログ組立

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::StitchError;
use crate::raster::RasterImage;

/// PDF points per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// 1ページ1画像のPDFを組み立てる。
pub struct PageImageWriter {
    doc: Document,
}

impl Default for PageImageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PageImageWriter {
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
        }
    }

    /// RGB画像をFlateDecode圧縮のXObjectとして追加する。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_image_xobject(
        &mut self,
        image: &RasterImage,
    ) -> crate::error::Result<lopdf::ObjectId> {
        let compressed = deflate(image.as_raw())?;
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let stream = Stream::new(dict, compressed);
        Ok(self.doc.add_object(Object::Stream(stream)))
    }

    /// 画像をページ全面に描画するコンテンツストリームを生成する。
    ///
    /// `q <w> 0 0 <h> 0 0 cm /<name> Do Q`
    pub fn build_content_stream(name: &str, width_pt: f64, height_pt: f64) -> Vec<u8> {
        format!("q {width_pt:.4} 0 0 {height_pt:.4} 0 0 cm /{name} Do Q").into_bytes()
    }

    /// Add the single page showing `image` at `dpi`.
    ///
    /// MediaBox は `pixels * 72 / dpi` ポイント。
    pub fn write_page(&mut self, image: &RasterImage, dpi: u32) -> crate::error::Result<()> {
        if image.is_empty() {
            return Err(StitchError::encode("cannot write an empty image to PDF"));
        }
        if dpi == 0 {
            return Err(StitchError::encode("PDF DPI must be positive"));
        }

        let width_pt = f64::from(image.width()) * POINTS_PER_INCH / f64::from(dpi);
        let height_pt = f64::from(image.height()) * POINTS_PER_INCH / f64::from(dpi);

        let image_id = self.add_image_xobject(image)?;

        let pages_id = self.doc.new_object_id();

        let mut xobject_dict = lopdf::Dictionary::new();
        xobject_dict.set("Im0", Object::Reference(image_id));
        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });

        let content_bytes = Self::build_content_stream("Im0", width_pt, height_pt);
        let content_stream = Stream::new(dictionary! {}, content_bytes);
        let content_id = self.doc.add_object(Object::Stream(content_stream));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width_pt as f32),
                Object::Real(height_pt as f32),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        self.doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        Ok(())
    }

    /// PDFドキュメントをバイト列として出力する。
    pub fn save_to_bytes(&self) -> crate::error::Result<Vec<u8>> {
        let mut buf = Vec::new();
        // clone to avoid borrowing issues with save_to (takes &mut self in lopdf)
        self.doc
            .clone()
            .save_to(&mut buf)
            .map_err(|e| StitchError::encode(format!("PDF write failed: {e}")))?;
        Ok(buf)
    }
}

fn deflate(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| StitchError::encode(format!("Flate compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| StitchError::encode(format!("Flate compression failed: {e}")))
}

/// Encode `image` as a one-page PDF at `dpi`.
pub fn encode_pdf(image: &RasterImage, dpi: u32) -> crate::error::Result<Vec<u8>> {
    let mut writer = PageImageWriter::new();
    writer.write_page(image, dpi)?;
    writer.save_to_bytes()
}
