use tracing::{debug, info};

use super::intake::check_total_size;
use crate::error::{Error, Result};
use crate::pdf::{PageAssembler, PdfDocument};

/// Concatenate every page of `documents`, in list order, into one PDF.
///
/// The size cap is checked before anything is parsed. Any input that fails
/// to open aborts the merge and nothing is returned.
pub fn merge(documents: &[PdfDocument], max_total_bytes: u64) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(Error::NoInput);
    }
    check_total_size(documents.iter().map(PdfDocument::byte_len), max_total_bytes)?;

    info!("Merging {} documents", documents.len());

    let mut assembler = PageAssembler::new();
    for doc in documents {
        let source = doc.load()?;
        let pages: Vec<u32> = (1..=doc.page_count()).collect();
        assembler.append_pages(source, &pages)?;
        debug!("Appended {} pages from {}", pages.len(), doc.name());
    }

    let expected: usize = documents.iter().map(|d| d.page_count() as usize).sum();
    debug_assert_eq!(assembler.page_count(), expected);

    assembler.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::{create_test_pdf, page_texts};

    fn doc(name: &str, pages: u32) -> PdfDocument {
        PdfDocument::from_bytes(name, create_test_pdf(pages)).unwrap()
    }

    #[test]
    fn test_merge_counts_and_order() {
        let bytes = merge(&[doc("a.pdf", 2), doc("b.pdf", 3)], u64::MAX).unwrap();
        let merged = PdfDocument::from_bytes("merged.pdf", bytes.clone()).unwrap();
        assert_eq!(merged.page_count(), 5);

        let texts = page_texts(&bytes);
        let expected = ["Page 1", "Page 2", "Page 1", "Page 2", "Page 3"];
        for (text, want) in texts.iter().zip(expected) {
            assert!(text.contains(want), "{text:?} should contain {want}");
        }
    }

    #[test]
    fn test_merge_single_document() {
        let bytes = merge(&[doc("a.pdf", 4)], u64::MAX).unwrap();
        assert_eq!(PdfDocument::from_bytes("m", bytes).unwrap().page_count(), 4);
    }

    #[test]
    fn test_merge_empty_is_rejected() {
        assert!(matches!(merge(&[], u64::MAX), Err(Error::NoInput)));
    }

    #[test]
    fn test_merge_size_cap() {
        let a = doc("a.pdf", 1);
        let limit = a.byte_len();
        let err = merge(&[a.clone(), a], limit).unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
    }
}
