//! Sorting incoming files into PDFs we accept and everything else.

use std::path::Path;

use crate::error::{Error, Result};

const PDF_MEDIA_TYPE: &str = "application/pdf";

/// A raw file as handed over by whoever picked it
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    /// Declared media type, if the source supplied one
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Read a file from disk, guessing its media type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let mut file = Self::new(name, bytes);
        file.media_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(file)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// PDF by declared media type, or by a `.pdf` name (any case).
    pub fn is_pdf(&self) -> bool {
        let declared = self
            .media_type
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE));
        declared || self.name.trim().to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Outcome of sorting a batch of files
#[derive(Debug, Default)]
pub struct Intake {
    pub accepted: Vec<InputFile>,
    /// Names of files that were skipped, in arrival order
    pub rejected: Vec<String>,
}

impl Intake {
    /// The combined rejection, if anything was skipped
    pub fn rejection(&self) -> Option<Error> {
        if self.rejected.is_empty() {
            None
        } else {
            Some(Error::UnsupportedFiles {
                names: self.rejected.clone(),
            })
        }
    }
}

/// Split a batch into PDFs and skipped names without failing the batch.
pub fn partition_inputs(files: impl IntoIterator<Item = InputFile>) -> Intake {
    let mut intake = Intake::default();
    for file in files {
        if file.is_pdf() {
            intake.accepted.push(file);
        } else {
            tracing::warn!("Skipping unsupported file {}", file.name);
            intake.rejected.push(file.name);
        }
    }
    intake
}

/// Fail if the combined size of `sizes` exceeds `limit`.
pub fn check_total_size(sizes: impl IntoIterator<Item = u64>, limit: u64) -> Result<()> {
    let total = sizes.into_iter().fold(0_u64, u64::saturating_add);
    if total > limit {
        return Err(Error::TooLarge { total, limit });
    }
    Ok(())
}
