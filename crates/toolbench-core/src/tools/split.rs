use std::sync::Arc;

use tracing::info;

use super::ToolCore;
use crate::error::{Error, JobKind, Result};
use crate::pdf::PdfDocument;
use crate::pipeline::{
    AssetStore, InputFile, Job, PageRange, ResultAsset, SegmentField, SegmentId, SegmentManager,
    ToolState, check_total_size, validate_segments,
};
use crate::toolkit::Toolkit;
use crate::util::Direction;

/// Splits one document into user-defined page ranges.
pub struct SplitTool {
    core: ToolCore,
    document: Option<PdfDocument>,
    segments: SegmentManager,
}

impl SplitTool {
    pub fn new(toolkit: Arc<Toolkit>) -> Result<Self> {
        Ok(Self {
            core: ToolCore::new(toolkit)?,
            document: None,
            segments: SegmentManager::default(),
        })
    }

    pub const fn state(&self) -> ToolState {
        self.core.state()
    }

    pub fn notice(&self) -> Option<&str> {
        self.core.notice()
    }

    /// One asset per segment, in segment order
    pub fn results(&self) -> &[ResultAsset] {
        &self.core.results
    }

    pub const fn store(&self) -> &AssetStore {
        &self.core.store
    }

    pub const fn document(&self) -> Option<&PdfDocument> {
        self.document.as_ref()
    }

    pub fn segments(&self) -> &[PageRange] {
        self.segments.segments()
    }

    /// Open a document and start over with one segment covering it.
    ///
    /// Anything loaded before is dropped, even if this load fails.
    pub fn load(&mut self, file: InputFile) -> bool {
        if !file.is_pdf() {
            let err = Error::UnsupportedFiles {
                names: vec![file.name],
            };
            self.core.reject(&err, JobKind::Load);
            return false;
        }

        self.clear();

        let opened = PdfDocument::from_bytes(file.name, file.bytes).and_then(|doc| {
            if doc.page_count() == 0 {
                Err(Error::PdfNoPages)
            } else {
                Ok(doc)
            }
        });

        match opened {
            Ok(doc) => {
                info!("Loaded {} for splitting ({} pages)", doc.name(), doc.page_count());
                self.segments.reset(doc.page_count());
                self.document = Some(doc);
                true
            }
            Err(e) => {
                tracing::warn!("Could not load document: {}", e);
                self.core.reject(&e, JobKind::Load);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.document = None;
        self.segments.clear();
        self.core.reset();
    }

    pub fn add_segment(&mut self) -> Option<SegmentId> {
        let id = self.segments.add_segment();
        self.core.touch();
        id
    }

    pub fn update_segment(&mut self, id: SegmentId, field: SegmentField, raw: &str) {
        self.segments.update_segment(id, field, raw);
        self.core.touch();
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> bool {
        let removed = self.segments.remove_segment(id);
        self.core.touch();
        removed
    }

    pub fn reorder(&mut self, id: SegmentId, direction: Direction) -> bool {
        let moved = self.segments.reorder(id, direction);
        self.core.touch();
        moved
    }

    /// Build one PDF per segment.
    pub async fn split(&mut self) -> ToolState {
        let Some(document) = self.document.clone() else {
            return self.core.reject(&Error::NoInput, JobKind::Split);
        };
        if self.segments.is_empty() {
            return self.core.reject(&Error::NoSegments, JobKind::Split);
        }
        if let Err(e) = check_total_size([document.byte_len()], self.core.max_total_bytes()) {
            return self.core.reject(&e, JobKind::Split);
        }

        let segments = self.segments.normalized();
        if let Err(e) = validate_segments(&segments, document.page_count()) {
            return self.core.reject(&e, JobKind::Split);
        }

        self.core
            .run(
                JobKind::Split,
                || Ok(Job::Split { document, segments }),
                None,
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::pdf::{create_test_pdf, page_texts};

    fn tool() -> SplitTool {
        Toolkit::new(AppConfig::default()).split_tool().unwrap()
    }

    #[test]
    fn test_load_resets_segments() {
        let mut tool = tool();
        assert!(tool.load(InputFile::new("doc.pdf", create_test_pdf(6))));
        let ranges: Vec<_> = tool.segments().iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(ranges, vec![(1, 6)]);
        assert!(tool.notice().is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut tool = tool();
        assert!(!tool.load(InputFile::new("broken.pdf", b"not a pdf".to_vec())));
        assert!(tool.document().is_none());
        assert_eq!(
            tool.notice(),
            Some("We could not read this PDF. Try another file or re-upload.")
        );

        assert!(!tool.load(InputFile::new("photo.jpg", vec![0xFF, 0xD8])));
        assert_eq!(tool.notice(), Some("Unsupported file skipped: photo.jpg"));
    }

    #[tokio::test]
    async fn test_split_without_document() {
        let mut tool = tool();
        assert_eq!(tool.split().await, ToolState::Idle);
        assert_eq!(tool.notice(), Some("Upload a PDF before splitting."));
    }

    #[tokio::test]
    async fn test_split_publishes_in_segment_order() {
        let mut tool = tool();
        tool.load(InputFile::new("Report.pdf", create_test_pdf(5)));
        let first = tool.segments()[0].id;
        tool.update_segment(first, SegmentField::End, "2");
        let second = tool.add_segment().unwrap();
        tool.reorder(second, Direction::Up);

        assert_eq!(tool.split().await, ToolState::Success);
        let names: Vec<_> = tool.results().iter().map(ResultAsset::name).collect();
        assert_eq!(names, vec!["Report-pages-3-5.pdf", "Report-pages-1-2.pdf"]);

        let texts = page_texts(&tool.results()[0].read().unwrap());
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("Page 3"));
    }

    #[tokio::test]
    async fn test_edit_after_split_returns_to_idle() {
        let mut tool = tool();
        tool.load(InputFile::new("doc.pdf", create_test_pdf(3)));
        tool.split().await;
        assert_eq!(tool.state(), ToolState::Success);

        tool.add_segment();
        assert_eq!(tool.state(), ToolState::Idle);
        // Results stay downloadable until the next split
        assert_eq!(tool.results().len(), 1);

        tool.split().await;
        assert_eq!(tool.results().len(), 2);
        assert_eq!(tool.store().live_count(), 2);
    }
}
