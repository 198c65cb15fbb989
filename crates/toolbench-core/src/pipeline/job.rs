use std::fmt;

use tracing::info;

use super::Progress;
use super::intake::check_total_size;
use super::compress::{CompressionMode, optimize, rasterize};
use super::merge::merge;
use super::segments::PageRange;
use super::split::split;
use crate::config::RasterConfig;
use crate::error::{Error, JobKind, Result};
use crate::pdf::{PdfDocument, Rasterizer};

/// A single unit of work, built when an action is triggered and consumed by
/// [`Job::run`].
#[derive(Debug, Clone)]
pub enum Job {
    Join {
        documents: Vec<PdfDocument>,
        output_name: String,
    },
    Split {
        document: PdfDocument,
        segments: Vec<PageRange>,
    },
    Compress {
        document: PdfDocument,
        mode: CompressionMode,
        raster: RasterConfig,
        output_name: String,
    },
}

/// Named bytes produced by a job
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Join { .. } => JobKind::Join,
            Self::Split { .. } => JobKind::Split,
            Self::Compress {
                mode: CompressionMode::Rasterize,
                ..
            } => JobKind::Rasterize,
            Self::Compress { .. } => JobKind::Compress,
        }
    }

    /// Combined size of every input
    pub fn input_bytes(&self) -> u64 {
        match self {
            Self::Join { documents, .. } => documents.iter().map(PdfDocument::byte_len).sum(),
            Self::Split { document, .. } | Self::Compress { document, .. } => document.byte_len(),
        }
    }

    /// Execute the job. Outputs come back in order; on error there are none.
    pub async fn run(
        self,
        rasterizer: Option<&dyn Rasterizer>,
        max_total_bytes: u64,
        progress: Progress<'_>,
    ) -> Result<Vec<JobOutput>> {
        let kind = self.kind();
        info!("Running {:?} job over {} bytes", kind, self.input_bytes());

        let outputs = match self {
            Self::Join {
                documents,
                output_name,
            } => vec![JobOutput {
                name: output_name,
                bytes: merge(&documents, max_total_bytes)?,
            }],
            Self::Split { document, segments } => {
                check_total_size([document.byte_len()], max_total_bytes)?;
                split(&document, &segments)?
                    .into_iter()
                    .map(|out| JobOutput {
                        name: out.name,
                        bytes: out.bytes,
                    })
                    .collect()
            }
            Self::Compress {
                document,
                mode,
                raster,
                output_name,
            } => {
                let bytes = match mode {
                    CompressionMode::Optimize => optimize(&document, max_total_bytes)?,
                    CompressionMode::Rasterize => {
                        let rasterizer = rasterizer.ok_or_else(|| Error::PdfRender {
                            page: 0,
                            reason: "No rasterizer available".to_string(),
                        })?;
                        rasterize(&document, rasterizer, raster, max_total_bytes, progress)
                            .await?
                    }
                };
                vec![JobOutput {
                    name: output_name,
                    bytes,
                }]
            }
        };

        info!("{:?} job produced {} outputs", kind, outputs.len());
        Ok(outputs)
    }
}

/// Lifecycle of one tool instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolState {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
}

impl ToolState {
    /// Enter `Processing`. Fails while a job is already running.
    pub fn begin(&mut self) -> Result<()> {
        if *self == Self::Processing {
            return Err(Error::Busy);
        }
        *self = Self::Processing;
        Ok(())
    }

    pub fn succeed(&mut self) {
        *self = Self::Success;
    }

    pub fn fail(&mut self) {
        *self = Self::Error;
    }

    /// An edit returns a finished tool to `Idle`.
    pub fn touch(&mut self) {
        if matches!(self, Self::Success | Self::Error) {
            *self = Self::Idle;
        }
    }

    pub fn is_processing(self) -> bool {
        self == Self::Processing
    }
}

impl fmt::Display for ToolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}
