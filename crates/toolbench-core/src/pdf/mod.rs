mod assemble;
mod document;
mod page_index;
mod render;

pub use assemble::PageAssembler;
pub(crate) use assemble::{dedupe_streams, save_document};
pub use document::PdfDocument;
pub use page_index::PageIndex;
pub use render::{MupdfRasterizer, Rasterizer, encode_jpeg};

#[cfg(test)]
pub(crate) use assemble::tests::{create_test_pdf, page_texts};
