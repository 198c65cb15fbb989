//! Document assembly pipeline
//!
//! Turns validated PDF buffers into derived ones: merged, split into
//! segments, or recompressed.

mod assets;
mod compress;
mod intake;
mod job;
mod merge;
mod segments;
mod split;

pub use assets::{AssetStore, ResultAsset};
pub use compress::{CompressionMode, SizeDelta, optimize, rasterize};
pub use intake::{InputFile, Intake, check_total_size, partition_inputs};
pub use job::{Job, JobOutput, ToolState};
pub use merge::merge;
pub use segments::{PageRange, SegmentField, SegmentId, SegmentManager};
pub use split::{SplitOutput, split, validate_segments};

/// Optional per-page progress callback, called with `(done, total)`
pub type Progress<'a> = Option<&'a (dyn Fn(usize, usize) + Send + Sync)>;
