use std::sync::Arc;

use uuid::Uuid;

use super::ToolCore;
use crate::error::{Error, JobKind, Result};
use crate::pdf::PdfDocument;
use crate::pipeline::{
    AssetStore, InputFile, Job, ResultAsset, ToolState, check_total_size, partition_inputs,
};
use crate::toolkit::Toolkit;
use crate::util::{Direction, ensure_pdf_extension, move_adjacent};

const DEFAULT_OUTPUT_NAME: &str = "merged.pdf";

/// A file waiting in the merge queue
#[derive(Debug, Clone)]
pub struct QueuedPdf {
    pub id: Uuid,
    pub file: InputFile,
}

/// Merges a user-ordered queue of PDFs into one.
pub struct JoinTool {
    core: ToolCore,
    queue: Vec<QueuedPdf>,
    output_name: String,
}

impl JoinTool {
    pub fn new(toolkit: Arc<Toolkit>) -> Result<Self> {
        Ok(Self {
            core: ToolCore::new(toolkit)?,
            queue: Vec::new(),
            output_name: String::new(),
        })
    }

    pub const fn state(&self) -> ToolState {
        self.core.state()
    }

    pub fn notice(&self) -> Option<&str> {
        self.core.notice()
    }

    /// The merged document, after a successful merge
    pub fn result(&self) -> Option<&ResultAsset> {
        self.core.results.first()
    }

    pub const fn store(&self) -> &AssetStore {
        &self.core.store
    }

    pub fn files(&self) -> &[QueuedPdf] {
        &self.queue
    }

    pub fn total_bytes(&self) -> u64 {
        self.queue.iter().map(|q| q.file.size()).sum()
    }

    /// Queue PDFs, skipping anything else with a notice.
    ///
    /// Returns the number of files queued.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = InputFile>) -> usize {
        let intake = partition_inputs(files);
        if intake.accepted.is_empty() && intake.rejected.is_empty() {
            return 0;
        }

        self.core.release_results();
        self.core.notice = intake.rejection().map(|e| e.user_message(JobKind::Join));
        self.core.touch();

        let added = intake.accepted.len();
        self.queue.extend(intake.accepted.into_iter().map(|file| QueuedPdf {
            id: Uuid::new_v4(),
            file,
        }));
        added
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.queue.len();
        self.queue.retain(|q| q.id != id);
        if self.queue.len() == before {
            return false;
        }
        self.core.release_results();
        self.core.touch();
        true
    }

    /// Move a queued file one slot; no-op at either end.
    pub fn move_item(&mut self, id: Uuid, direction: Direction) -> bool {
        let moved = self
            .queue
            .iter()
            .position(|q| q.id == id)
            .is_some_and(|index| move_adjacent(&mut self.queue, index, direction));
        if moved {
            self.core.touch();
        }
        moved
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.output_name.clear();
        self.core.reset();
    }

    /// Set the output name as typed; it is sanitized when merging.
    pub fn set_output_name(&mut self, name: impl Into<String>) {
        self.output_name = name.into();
        self.core.touch();
    }

    /// Final output name, ending in `.pdf`
    pub fn output_name(&self) -> String {
        ensure_pdf_extension(&self.output_name, DEFAULT_OUTPUT_NAME)
    }

    /// Merge the queue, in order, into one document.
    pub async fn merge(&mut self) -> ToolState {
        if self.queue.is_empty() {
            return self.core.reject(&Error::NoInput, JobKind::Join);
        }
        let sizes = self.queue.iter().map(|q| q.file.size());
        if let Err(e) = check_total_size(sizes, self.core.max_total_bytes()) {
            return self.core.reject(&e, JobKind::Join);
        }

        let output_name = self.output_name();
        let queue = &self.queue;
        self.core
            .run(
                JobKind::Join,
                || {
                    let documents = queue
                        .iter()
                        .map(|q| PdfDocument::from_bytes(q.file.name.clone(), q.file.bytes.clone()))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Job::Join {
                        documents,
                        output_name,
                    })
                },
                None,
            )
            .await
    }
}
