use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, RgbImage};
use mupdf::{Colorspace, Document as MuDocument, Matrix};

use super::document::PdfDocument;
use super::page_index::PageIndex;
use crate::error::{Error, Result};

/// Renders single PDF pages to pixels.
///
/// The compression job only ever asks for one page at a time and awaits it
/// before asking for the next.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Render one page at `scale` pixels per PDF point, on a white background
    async fn render_page(
        &self,
        doc: &PdfDocument,
        page: PageIndex,
        scale: f32,
    ) -> Result<RgbImage>;
}

/// Production rasterizer backed by mupdf
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfRasterizer;

impl MupdfRasterizer {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Rasterizer for MupdfRasterizer {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    async fn render_page(
        &self,
        doc: &PdfDocument,
        page: PageIndex,
        scale: f32,
    ) -> Result<RgbImage> {
        let bytes = doc.bytes_arc();
        let page_num = page.as_usize();

        // mupdf handles are not Send; open, render and drop on the blocking pool
        tokio::task::spawn_blocking(move || render_with_mupdf(&bytes, page, scale))
            .await
            .map_err(|e| Error::PdfRender {
                page: page_num,
                reason: format!("Render task failed: {e}"),
            })?
    }
}

fn render_with_mupdf(bytes: &[u8], page: PageIndex, scale: f32) -> Result<RgbImage> {
    let page_num = page.as_usize();
    let render_err = |reason: String| Error::PdfRender {
        page: page_num,
        reason,
    };

    let doc = MuDocument::from_bytes(bytes, "")
        .map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))?;

    let loaded = doc
        .load_page(page.into())
        .map_err(|e| render_err(format!("Failed to load page: {e}")))?;

    let matrix = Matrix::new_scale(scale, scale);
    let pixmap = loaded
        .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
        .map_err(|e| render_err(format!("Failed to render: {e}")))?;

    let components = pixmap.n() as usize;
    let rgb = flatten_to_rgb(pixmap.samples(), components)
        .ok_or_else(|| render_err(format!("Unexpected pixel format with {components} components")))?;

    RgbImage::from_raw(pixmap.width(), pixmap.height(), rgb)
        .ok_or_else(|| render_err("Failed to create image buffer".to_string()))
}

/// Convert gray, RGB or premultiplied RGBA samples to opaque RGB on white.
fn flatten_to_rgb(samples: &[u8], components: usize) -> Option<Vec<u8>> {
    if components == 0 {
        return None;
    }

    let mut rgb = Vec::with_capacity(samples.len() / components * 3);
    for chunk in samples.chunks_exact(components) {
        match *chunk {
            [gray] => rgb.extend_from_slice(&[gray, gray, gray]),
            [r, g, b] => rgb.extend_from_slice(&[r, g, b]),
            [r, g, b, a] => {
                let background = 255 - a;
                rgb.extend_from_slice(&[
                    r.saturating_add(background),
                    g.saturating_add(background),
                    b.saturating_add(background),
                ]);
            }
            _ => return None,
        }
    }

    Some(rgb)
}

/// Encode a rendered page as baseline JPEG (`quality` on the 1-100 scale)
pub fn encode_jpeg(img: &RgbImage, quality: u8, page_num: usize) -> Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::PdfEncode {
            page: page_num,
            reason: format!("Failed to encode JPEG: {e}"),
        })?;

    Ok(jpeg)
}
