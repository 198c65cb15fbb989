use std::path::Path;
use std::sync::Arc;

use lopdf::Document as LoDocument;

use crate::error::{Error, Result};

/// An immutable, loaded PDF: the raw bytes plus what we learned parsing them
pub struct PdfDocument {
    /// Display name (usually the source file name)
    name: String,
    /// The raw PDF bytes, shared between clones
    bytes: Arc<Vec<u8>>,
    /// Number of pages
    page_count: u32,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let name = name.into();
        let bytes = bytes.into();

        let doc = LoDocument::load_mem(&bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse {name}: {e}")))?;

        let page_count = u32::try_from(doc.get_pages().len())
            .map_err(|_| Error::PdfOpen(format!("{name} has too many pages")))?;

        tracing::debug!("Loaded {} ({} bytes, {} pages)", name, bytes.len(), page_count);

        Ok(Self {
            name,
            bytes: Arc::new(bytes),
            page_count,
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map_or_else(|| "document.pdf".to_string(), |n| n.to_string_lossy().into_owned());
        Self::from_bytes(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get number of pages
    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Size of the source buffer in bytes
    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Get raw PDF bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get raw PDF bytes as a reference-counted pointer.
    ///
    /// Use this to move the buffer into a blocking task without copying.
    pub fn bytes_arc(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    /// Parse a fresh, mutable object model for this document
    pub(crate) fn load(&self) -> Result<LoDocument> {
        LoDocument::load_mem(&self.bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to open {}: {e}", self.name)))
    }
}

impl Clone for PdfDocument {
    /// O(1): clones the `Arc` around the bytes, not the bytes themselves.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            bytes: Arc::clone(&self.bytes),
            page_count: self.page_count,
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("name", &self.name)
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
