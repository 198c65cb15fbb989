use std::fmt;

use tracing::{debug, info};

use super::intake::check_total_size;
use super::Progress;
use crate::config::RasterConfig;
use crate::error::{Error, Result};
use crate::pdf::{
    PageAssembler, PageIndex, PdfDocument, Rasterizer, dedupe_streams, encode_jpeg,
    save_document,
};
use crate::util::bytes_to_readable;

/// How to shrink a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionMode {
    /// Re-save with structural cleanups; pages are untouched
    #[default]
    Optimize,
    /// Replace every page with a JPEG of itself
    Rasterize,
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimize => write!(f, "Optimized"),
            Self::Rasterize => write!(f, "Rasterized"),
        }
    }
}

/// Re-save a document after pruning, deduplicating and compressing streams.
pub fn optimize(document: &PdfDocument, max_total_bytes: u64) -> Result<Vec<u8>> {
    check_total_size([document.byte_len()], max_total_bytes)?;
    info!("Optimizing {}", document.name());

    let mut doc = document.load()?;
    let pruned = doc.prune_objects().len();
    let deduped = dedupe_streams(&mut doc);
    doc.renumber_objects();
    doc.compress();
    debug!("Pruned {} objects, shared {} duplicate streams", pruned, deduped);

    save_document(&mut doc)
}

/// Rebuild a document from JPEG renders of its pages.
///
/// Pages are rendered one after another; `progress` hears `(done, total)`
/// after each. The first failing page aborts the job.
pub async fn rasterize(
    document: &PdfDocument,
    rasterizer: &dyn Rasterizer,
    raster: RasterConfig,
    max_total_bytes: u64,
    progress: Progress<'_>,
) -> Result<Vec<u8>> {
    check_total_size([document.byte_len()], max_total_bytes)?;

    let total = document.page_count() as usize;
    if total == 0 {
        return Err(Error::PdfNoPages);
    }

    let raster = raster.clamped();
    info!(
        "Rasterizing {} ({} pages) at {} DPI with {}",
        document.name(),
        total,
        raster.dpi,
        rasterizer.name()
    );

    let mut assembler = PageAssembler::new();
    for page_num in 0..total {
        let page = PageIndex::try_from_page_num(page_num, total)?;
        let img = rasterizer.render_page(document, page, raster.scale()).await?;
        let (width, height) = img.dimensions();
        let jpeg = encode_jpeg(&img, raster.jpeg_quality(), page_num)?;
        debug!(
            "Page {} rendered to {}x{} ({} bytes)",
            page.page_number(),
            width,
            height,
            jpeg.len()
        );
        drop(img);

        assembler.append_jpeg_page(jpeg, width, height)?;

        if let Some(callback) = progress {
            callback(page_num + 1, total);
        }
        tokio::task::yield_now().await;
    }

    assembler.finish()
}

/// Output size relative to the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeDelta {
    Saved { bytes: u64, percent: f64 },
    Grew { bytes: u64, percent: f64 },
    Unchanged,
}

impl SizeDelta {
    /// `None` when there is no original size to compare against
    #[allow(clippy::cast_precision_loss)]
    pub fn between(original: u64, result: u64) -> Option<Self> {
        if original == 0 {
            return None;
        }
        let percent = |bytes: u64| bytes as f64 / original as f64 * 100.0;

        Some(match result.cmp(&original) {
            std::cmp::Ordering::Less => {
                let bytes = original - result;
                Self::Saved {
                    bytes,
                    percent: percent(bytes),
                }
            }
            std::cmp::Ordering::Greater => {
                let bytes = result - original;
                Self::Grew {
                    bytes,
                    percent: percent(bytes),
                }
            }
            std::cmp::Ordering::Equal => Self::Unchanged,
        })
    }
}

impl fmt::Display for SizeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { bytes, percent } => {
                write!(f, "Saved {} ({percent:.1}%)", bytes_to_readable(*bytes))
            }
            Self::Grew { bytes, percent } => {
                write!(f, "Grew by {} ({percent:.1}%)", bytes_to_readable(*bytes))
            }
            Self::Unchanged => write!(f, "No size change detected"),
        }
    }
}
