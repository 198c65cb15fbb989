//! Toolbench Core Library
//!
//! Offline document utilities built around a small assembly pipeline:
//! - Merge PDFs in a chosen order
//! - Split a PDF into user-defined page ranges
//! - Compress a PDF losslessly or by rasterizing its pages
//! - Base64 text, JWT and image format conversion helpers
//!
//! The [`tools`] hold per-instance state (queue, segments, results) on top of
//! the stateless functions in [`pipeline`]; a [`Toolkit`] hands them the
//! configuration and a shared page renderer.

pub mod codec;
pub mod config;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod toolkit;
pub mod tools;
pub mod util;

pub use codec::{
    DEFAULT_IMAGE_QUALITY, DecodedToken, ImageFormat, JwtAlgorithm, SignatureState,
    TokenInspection, convert_image, converted_file_name, decode_base64, decode_token,
    encode_base64, inspect_token, sign_token,
};
pub use config::{AppConfig, LimitsConfig, OutputConfig, RasterConfig};
pub use error::{Error, JobKind, Result};
pub use pdf::{MupdfRasterizer, PageIndex, PdfDocument, Rasterizer};
pub use pipeline::{
    AssetStore, CompressionMode, InputFile, Job, JobOutput, PageRange, Progress, ResultAsset,
    SegmentField, SegmentId, SegmentManager, SizeDelta, SplitOutput, ToolState,
};
pub use toolkit::Toolkit;
pub use tools::{CompressTool, JoinTool, QueuedPdf, SplitTool};
pub use util::Direction;
