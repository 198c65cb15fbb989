use tracing::{debug, info};

use super::segments::PageRange;
use crate::error::{Error, Result};
use crate::pdf::{PageAssembler, PdfDocument};
use crate::util::{base_file_name, format_segment_name};

/// One split result, in the same position as its segment
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub range: PageRange,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check every segment against the document before any work starts.
pub fn validate_segments(segments: &[PageRange], page_count: u32) -> Result<()> {
    if segments.is_empty() {
        return Err(Error::NoSegments);
    }

    if let Some(bad) = segments
        .iter()
        .find(|s| s.start < 1 || s.end > page_count || s.start > s.end)
    {
        return Err(Error::SegmentOutOfRange {
            start: bad.start,
            end: bad.end,
            page_count,
        });
    }

    Ok(())
}

/// Produce one PDF per segment, in segment order.
///
/// Segments may overlap or be out of page order. If any segment is invalid
/// the whole submission fails before a single output is built.
pub fn split(document: &PdfDocument, segments: &[PageRange]) -> Result<Vec<SplitOutput>> {
    validate_segments(segments, document.page_count())?;

    info!(
        "Splitting {} into {} segments",
        document.name(),
        segments.len()
    );

    let source = document.load()?;
    let base_name = base_file_name(document.name());

    let mut outputs = Vec::with_capacity(segments.len());
    for segment in segments {
        let mut assembler = PageAssembler::new();
        assembler.append_pages(source.clone(), &segment.pages())?;
        let bytes = assembler.finish()?;

        let name = format_segment_name(&base_name, segment.start, segment.end);
        debug!("Built {} ({} bytes)", name, bytes.len());
        outputs.push(SplitOutput {
            range: *segment,
            name,
            bytes,
        });
    }

    Ok(outputs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::{create_test_pdf, page_texts};

    fn doc(pages: u32) -> PdfDocument {
        PdfDocument::from_bytes("Annual Report.pdf", create_test_pdf(pages)).unwrap()
    }

    #[test]
    fn test_split_page_counts_and_names() {
        let outputs = split(&doc(10), &[PageRange::new(3, 5), PageRange::new(1, 1)]).unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name, "Annual Report-pages-3-5.pdf");
        assert_eq!(outputs[1].name, "Annual Report-pages-1-1.pdf");

        let first = page_texts(&outputs[0].bytes);
        assert_eq!(first.len(), 3);
        assert!(first[0].contains("Page 3"));
        assert!(first[2].contains("Page 5"));
        assert_eq!(page_texts(&outputs[1].bytes).len(), 1);
    }

    #[test]
    fn test_overlapping_segments_allowed() {
        let outputs = split(&doc(4), &[PageRange::new(1, 3), PageRange::new(2, 4)]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(page_texts(&outputs[1].bytes).len(), 3);
    }

    #[test]
    fn test_invalid_segment_fails_whole_submission() {
        let err = split(&doc(4), &[PageRange::new(1, 2), PageRange::new(3, 9)]).unwrap_err();
        assert!(matches!(
            err,
            Error::SegmentOutOfRange { start: 3, end: 9, page_count: 4 }
        ));

        assert!(matches!(
            split(&doc(4), &[PageRange::new(0, 2)]),
            Err(Error::SegmentOutOfRange { .. })
        ));
        assert!(matches!(split(&doc(4), &[]), Err(Error::NoSegments)));
    }
}
