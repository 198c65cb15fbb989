use std::sync::Arc;

use super::ToolCore;
use crate::config::RasterConfig;
use crate::error::{Error, JobKind, Result};
use crate::pdf::PdfDocument;
use crate::pipeline::{
    AssetStore, CompressionMode, InputFile, Job, Progress, ResultAsset, SizeDelta, ToolState,
    check_total_size,
};
use crate::toolkit::Toolkit;
use crate::util::{base_file_name, ensure_pdf_extension};

/// Shrinks one document, either losslessly or by rasterizing its pages.
pub struct CompressTool {
    core: ToolCore,
    file: Option<InputFile>,
    mode: CompressionMode,
    raster: RasterConfig,
    output_name: String,
}

impl CompressTool {
    pub fn new(toolkit: Arc<Toolkit>) -> Result<Self> {
        let raster = toolkit.config().raster.clamped();
        Ok(Self {
            core: ToolCore::new(toolkit)?,
            file: None,
            mode: CompressionMode::default(),
            raster,
            output_name: String::new(),
        })
    }

    pub const fn state(&self) -> ToolState {
        self.core.state()
    }

    pub fn notice(&self) -> Option<&str> {
        self.core.notice()
    }

    /// The compressed document, after a successful run
    pub fn result(&self) -> Option<&ResultAsset> {
        self.core.results.first()
    }

    pub const fn store(&self) -> &AssetStore {
        &self.core.store
    }

    pub const fn mode(&self) -> CompressionMode {
        self.mode
    }

    pub const fn raster(&self) -> RasterConfig {
        self.raster
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }

    /// Pick the document to compress. Parsing waits until `compress`.
    pub fn load(&mut self, file: InputFile) -> bool {
        if !file.is_pdf() {
            let err = Error::UnsupportedFiles {
                names: vec![file.name],
            };
            self.core.reject(&err, JobKind::Compress);
            return false;
        }

        self.core.reset();
        self.output_name = default_output_name(&file.name);
        self.file = Some(file);
        true
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.output_name.clear();
        self.core.reset();
    }

    pub fn set_mode(&mut self, mode: CompressionMode) {
        self.mode = mode;
        self.core.touch();
    }

    /// Render resolution, clamped to 100-300
    pub fn set_dpi(&mut self, dpi: u32) {
        self.raster = RasterConfig::new(dpi, self.raster.quality);
        self.core.touch();
    }

    /// JPEG quality, clamped to 0.40-0.95
    pub fn set_quality(&mut self, quality: f32) {
        self.raster = RasterConfig::new(self.raster.dpi, quality);
        self.core.touch();
    }

    pub fn set_output_name(&mut self, name: impl Into<String>) {
        self.output_name = name.into();
        self.core.touch();
    }

    /// Final output name, ending in `.pdf`
    pub fn output_name(&self) -> String {
        let fallback = self
            .file
            .as_ref()
            .map_or_else(|| default_output_name(""), |f| default_output_name(&f.name));
        ensure_pdf_extension(&self.output_name, &fallback)
    }

    /// How the last result compares with its input
    pub fn size_delta(&self) -> Option<SizeDelta> {
        self.result()
            .and_then(|asset| SizeDelta::between(asset.original_byte_size(), asset.byte_size()))
    }

    /// Compress the loaded document with the current mode and settings.
    ///
    /// `progress` only fires in rasterize mode.
    pub async fn compress(&mut self, progress: Progress<'_>) -> ToolState {
        let kind = match self.mode {
            CompressionMode::Optimize => JobKind::Compress,
            CompressionMode::Rasterize => JobKind::Rasterize,
        };

        let Some(file) = self.file.as_ref() else {
            return self.core.reject(&Error::NoInput, kind);
        };
        if let Err(e) = check_total_size([file.size()], self.core.max_total_bytes()) {
            return self.core.reject(&e, kind);
        }

        let output_name = self.output_name();
        let (mode, raster) = (self.mode, self.raster);
        self.core
            .run(
                kind,
                || {
                    let document = PdfDocument::from_bytes(file.name.clone(), file.bytes.clone())?;
                    Ok(Job::Compress {
                        document,
                        mode,
                        raster,
                        output_name,
                    })
                },
                progress,
            )
            .await
    }
}

fn default_output_name(file_name: &str) -> String {
    format!("{}-compressed.pdf", base_file_name(file_name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::pdf::create_test_pdf;

    fn tool() -> CompressTool {
        Toolkit::new(AppConfig::default()).compress_tool().unwrap()
    }

    #[test]
    fn test_load_sets_default_name() {
        let mut tool = tool();
        assert!(tool.load(InputFile::new("Scan 01.PDF", create_test_pdf(1))));
        assert_eq!(tool.output_name(), "Scan 01-compressed.pdf");

        tool.set_output_name("small");
        assert_eq!(tool.output_name(), "small.pdf");
        tool.set_output_name("   ");
        assert_eq!(tool.output_name(), "Scan 01-compressed.pdf");
    }

    #[test]
    fn test_settings_are_clamped() {
        let mut tool = tool();
        tool.set_dpi(600);
        tool.set_quality(0.1);
        assert_eq!(tool.raster().dpi, 300);
        assert!((tool.raster().quality - 0.40).abs() < f32::EPSILON);

        tool.set_dpi(10);
        assert_eq!(tool.raster().dpi, 100);
    }

    #[tokio::test]
    async fn test_compress_without_file() {
        let mut tool = tool();
        assert_eq!(tool.compress(None).await, ToolState::Idle);
        assert_eq!(tool.notice(), Some("Upload a PDF before compressing."));
    }

    #[tokio::test]
    async fn test_optimize_produces_result() {
        let mut tool = tool();
        tool.load(InputFile::new("doc.pdf", create_test_pdf(2)));

        assert_eq!(tool.compress(None).await, ToolState::Success);
        let asset = tool.result().unwrap();
        assert_eq!(asset.name(), "doc-compressed.pdf");
        assert!(tool.size_delta().is_some());

        let out = PdfDocument::from_bytes("out.pdf", asset.read().unwrap()).unwrap();
        assert_eq!(out.page_count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_input_fails_job() {
        let mut tool = tool();
        tool.load(InputFile::new("doc.pdf", b"garbage".to_vec()));

        assert_eq!(tool.compress(None).await, ToolState::Error);
        assert_eq!(
            tool.notice(),
            Some("We could not compress this PDF. Try another file or re-upload.")
        );
        assert!(tool.result().is_none());

        tool.set_mode(CompressionMode::Rasterize);
        assert_eq!(tool.state(), ToolState::Idle);
    }
}
