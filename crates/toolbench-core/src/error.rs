use thiserror::Error;

use crate::util::bytes_to_readable;

/// Unified error type for toolbench-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Input intake (wrong file type, size cap)
/// - PDF operations (opening, rendering, encoding, saving)
/// - Segment validation at submission time
/// - Base64, JWT and image codecs
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// One or more files were not PDFs
    #[error("unsupported files skipped: {}", names.join(", "))]
    UnsupportedFiles { names: Vec<String> },

    /// Nothing to work on
    #[error("no input documents")]
    NoInput,

    /// Combined input size exceeds the configured cap
    #[error("input is {total} bytes, limit is {limit} bytes")]
    TooLarge { total: u64, limit: u64 },

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// The document parsed but has no pages
    #[error("PDF has no pages")]
    PdfNoPages,

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to render a PDF page
    #[error("failed to render page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    /// Failed to encode a rendered page
    #[error("failed to encode page {page}: {reason}")]
    PdfEncode { page: usize, reason: String },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Job Errors
    // ==========================================================================
    /// Split submitted without segments
    #[error("no segments to split")]
    NoSegments,

    /// A segment falls outside the document
    #[error("segment {start}-{end} is outside pages 1-{page_count}")]
    SegmentOutOfRange { start: u32, end: u32, page_count: u32 },

    /// A job is already running on this tool
    #[error("a job is already in progress")]
    Busy,

    /// A job was abandoned before it finished
    #[error("job interrupted before completion")]
    Interrupted,

    // ==========================================================================
    // Codec Errors
    // ==========================================================================
    /// Input is not valid Base64
    #[error("invalid base64: {0}")]
    Base64Decode(String),

    /// Token is structurally broken
    #[error("malformed token: {0}")]
    JwtMalformed(String),

    /// Header or payload is not valid JSON
    #[error("invalid token JSON: {0}")]
    JwtJson(String),

    /// Signing requested without a secret
    #[error("a secret is required to sign this token")]
    JwtMissingSecret,

    /// Input bytes are not an image we can read
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Encoding to the target format failed
    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Sentence shown to the user when a job fails.
    ///
    /// Load, render and save failures collapse into one message per job kind;
    /// the technical detail stays in the logs.
    pub fn user_message(&self, job: JobKind) -> String {
        match self {
            Self::UnsupportedFiles { names } if names.len() == 1 => {
                format!("Unsupported file skipped: {}", names[0])
            }
            Self::UnsupportedFiles { names } => {
                format!("Unsupported files skipped: {}", names.join(", "))
            }
            Self::NoInput => match job {
                JobKind::Join => "Add at least one PDF to merge.".to_string(),
                JobKind::Split | JobKind::Load => "Upload a PDF before splitting.".to_string(),
                JobKind::Compress | JobKind::Rasterize => {
                    "Upload a PDF before compressing.".to_string()
                }
                JobKind::Convert => "Upload an image before converting.".to_string(),
            },
            Self::TooLarge { limit, .. } => match job {
                JobKind::Join => format!(
                    "Combined file size is too large. Remove files to stay below {}.",
                    bytes_to_readable(*limit)
                ),
                _ => format!(
                    "File is too large. Pick a PDF under {}.",
                    bytes_to_readable(*limit)
                ),
            },
            Self::NoSegments => "Add at least one segment to split.".to_string(),
            Self::SegmentOutOfRange { .. } => {
                "Segments must stay within the total page range.".to_string()
            }
            Self::Busy => "Another job is still running. Wait for it to finish.".to_string(),
            Self::ImageDecode(_) => {
                "We could not open that image. Try a different file.".to_string()
            }
            _ => match job {
                JobKind::Join => {
                    "We could not merge these PDFs. Try removing a file or uploading again."
                        .to_string()
                }
                JobKind::Split => {
                    "We could not split this PDF. Try adjusting segments or re-uploading."
                        .to_string()
                }
                JobKind::Load => {
                    "We could not read this PDF. Try another file or re-upload.".to_string()
                }
                JobKind::Compress => {
                    "We could not compress this PDF. Try another file or re-upload.".to_string()
                }
                JobKind::Rasterize => "We could not rasterize this PDF. Try lowering the \
                    resolution or switch to Optimized mode."
                    .to_string(),
                JobKind::Convert => {
                    "Something went wrong while converting the image. Please try again."
                        .to_string()
                }
            },
        }
    }
}

/// Which tool a failure came from, for picking the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Join,
    Split,
    /// Opening a document for segment editing
    Load,
    Compress,
    /// Compression in rasterize mode
    Rasterize,
    /// Image format conversion
    Convert,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_single_and_many() {
        let one = Error::UnsupportedFiles { names: vec!["a.png".into()] };
        assert_eq!(one.user_message(JobKind::Join), "Unsupported file skipped: a.png");

        let many = Error::UnsupportedFiles {
            names: vec!["a.png".into(), "b.txt".into()],
        };
        assert_eq!(
            many.user_message(JobKind::Join),
            "Unsupported files skipped: a.png, b.txt"
        );
    }

    #[test]
    fn test_size_cap_message_differs_from_parse_failure() {
        let limit = 150 * 1024 * 1024;
        let cap = Error::TooLarge { total: limit + 1, limit };
        let parse = Error::PdfOpen("bad xref".into());

        assert_eq!(
            cap.user_message(JobKind::Compress),
            "File is too large. Pick a PDF under 150.0 MB."
        );
        assert_ne!(cap.user_message(JobKind::Join), parse.user_message(JobKind::Join));
    }

    #[test]
    fn test_render_failure_uses_job_message() {
        let err = Error::PdfRender { page: 3, reason: "boom".into() };
        assert!(err.user_message(JobKind::Compress).starts_with("We could not compress"));
        assert!(err.user_message(JobKind::Rasterize).contains("lowering the resolution"));
    }

    #[test]
    fn test_load_failure_message() {
        assert_eq!(
            Error::PdfNoPages.user_message(JobKind::Load),
            "We could not read this PDF. Try another file or re-upload."
        );
        assert!(Error::PdfNoPages.user_message(JobKind::Split).starts_with("We could not split"));
    }

    #[test]
    fn test_image_messages() {
        assert_eq!(
            Error::ImageDecode("bad header".into()).user_message(JobKind::Convert),
            "We could not open that image. Try a different file."
        );
        assert_eq!(
            Error::ImageEncode("boom".into()).user_message(JobKind::Convert),
            "Something went wrong while converting the image. Please try again."
        );
        assert_eq!(
            Error::NoInput.user_message(JobKind::Convert),
            "Upload an image before converting."
        );
    }

    #[test]
    fn test_interrupted_job_uses_retry_message() {
        assert_eq!(
            Error::Interrupted.user_message(JobKind::Join),
            "We could not merge these PDFs. Try removing a file or uploading again."
        );
        assert_ne!(
            Error::Interrupted.user_message(JobKind::Compress),
            Error::Busy.user_message(JobKind::Compress)
        );
    }
}
