//! Stateful front-ends for the pipeline, one per tool.
//!
//! A tool never returns job errors. Failures land in [`ToolState::Error`]
//! with a user-facing notice, and finished outputs are kept as
//! [`ResultAsset`]s until the next job or `clear`.

mod compress;
mod join;
mod split;

use std::sync::Arc;

use tracing::warn;

pub use compress::CompressTool;
pub use join::{JoinTool, QueuedPdf};
pub use split::SplitTool;

use crate::error::{Error, JobKind, Result};
use crate::pipeline::{AssetStore, Job, JobOutput, Progress, ResultAsset, ToolState};
use crate::toolkit::Toolkit;

/// State shared by every tool: lifecycle, notice and owned results
struct ToolCore {
    toolkit: Arc<Toolkit>,
    state: ToolState,
    notice: Option<String>,
    store: AssetStore,
    results: Vec<ResultAsset>,
}

impl ToolCore {
    fn new(toolkit: Arc<Toolkit>) -> Result<Self> {
        Ok(Self {
            toolkit,
            state: ToolState::Idle,
            notice: None,
            store: AssetStore::new()?,
            results: Vec::new(),
        })
    }

    const fn state(&self) -> ToolState {
        self.state
    }

    fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn max_total_bytes(&self) -> u64 {
        self.toolkit.config().limits.max_total_bytes
    }

    /// A precondition failed; report it without touching the state.
    fn reject(&mut self, err: &Error, kind: JobKind) -> ToolState {
        self.notice = Some(err.user_message(kind));
        self.state
    }

    /// An edit happened.
    fn touch(&mut self) {
        self.state.touch();
    }

    fn release_results(&mut self) {
        let previous = std::mem::take(&mut self.results);
        self.store.release_all(previous);
    }

    /// Back to a blank tool.
    fn reset(&mut self) {
        self.release_results();
        self.state = ToolState::Idle;
        self.notice = None;
    }

    /// Run one job from start to finish.
    ///
    /// `prepare` builds the job once the tool is marked busy, so a parse
    /// failure there counts as a job failure. Dropping the returned future
    /// part way leaves the tool in `Error`, ready for another run.
    async fn run(
        &mut self,
        kind: JobKind,
        prepare: impl FnOnce() -> Result<Job>,
        progress: Progress<'_>,
    ) -> ToolState {
        let Self {
            toolkit,
            state,
            notice,
            store,
            results,
        } = self;

        if let Err(e) = state.begin() {
            *notice = Some(e.user_message(kind));
            return *state;
        }
        let guard = RunningJob {
            state,
            notice,
            kind,
        };
        *guard.notice = None;
        store.release_all(std::mem::take(results));

        let rasterizer = (kind == JobKind::Rasterize).then(|| toolkit.rasterizer());
        let max_total_bytes = toolkit.config().limits.max_total_bytes;

        let outcome = match prepare() {
            Ok(job) => {
                let original = job.input_bytes();
                match job.run(rasterizer.as_deref(), max_total_bytes, progress).await {
                    Ok(outputs) => publish(store, outputs, original),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(assets) => {
                *results = assets;
                guard.succeed()
            }
            Err(e) => guard.fail(&e),
        }
    }
}

/// Publish every output, or none of them.
fn publish(
    store: &mut AssetStore,
    outputs: Vec<JobOutput>,
    original: u64,
) -> Result<Vec<ResultAsset>> {
    let mut assets = Vec::with_capacity(outputs.len());
    for output in outputs {
        match store.publish(output.name, &output.bytes, original) {
            Ok(asset) => assets.push(asset),
            Err(e) => {
                store.release_all(assets);
                return Err(e);
            }
        }
    }
    Ok(assets)
}

/// A job in flight. Marks the tool failed if dropped before it settles.
struct RunningJob<'a> {
    state: &'a mut ToolState,
    notice: &'a mut Option<String>,
    kind: JobKind,
}

impl RunningJob<'_> {
    fn succeed(self) -> ToolState {
        self.state.succeed();
        *self.state
    }

    fn fail(self, err: &Error) -> ToolState {
        warn!("{:?} job failed: {}", self.kind, err);
        *self.notice = Some(err.user_message(self.kind));
        self.state.fail();
        *self.state
    }
}

impl Drop for RunningJob<'_> {
    fn drop(&mut self) {
        if self.state.is_processing() {
            warn!("{:?} job interrupted", self.kind);
            *self.notice = Some(Error::Interrupted.user_message(self.kind));
            self.state.fail();
        }
    }
}
