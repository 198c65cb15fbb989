//! Page index newtype for safe conversion between page numbering schemes.
//!
//! Segments use 1-based page numbers (`u32`, as lopdf does), mupdf loads
//! pages by 0-based `i32`, and Rust collections want `usize`. This type is the
//! single place those conversions happen.

use std::fmt;

use crate::error::Error;

/// A validated 0-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Get the index as usize for Rust collections.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // Only ever built from non-negative values
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// The 1-based page number, as used by lopdf and by page ranges.
    #[must_use]
    pub const fn page_number(self) -> u32 {
        (self.0 + 1).cast_unsigned()
    }

    /// Validate a 0-based index against a document's page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PdfInvalidPage {
                page: page_num,
                total: total_pages,
            });
        }

        let index = i32::try_from(page_num).map_err(|_| Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        })?;

        Ok(Self(index))
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
