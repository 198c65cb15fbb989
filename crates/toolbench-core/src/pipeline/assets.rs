//! Session-scoped storage for finished outputs.
//!
//! Each tool owns one store. Publishing writes the bytes to a private temp
//! directory and hands back a [`ResultAsset`]; releasing consumes the handle
//! and deletes the file, so an asset can be released at most once. Whatever
//! is still live when the store is dropped goes with its directory.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// A downloadable output held by an [`AssetStore`]
#[derive(Debug)]
pub struct ResultAsset {
    id: Uuid,
    location: PathBuf,
    name: String,
    byte_size: u64,
    original_byte_size: u64,
}

impl ResultAsset {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Ephemeral location of the bytes; valid until released
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Suggested file name for saving
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Size of the input this asset was derived from
    pub const fn original_byte_size(&self) -> u64 {
        self.original_byte_size
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.location)?)
    }
}

/// Owner of every live [`ResultAsset`] of one tool instance
pub struct AssetStore {
    /// Temp directory - auto-cleaned on drop
    dir: TempDir,
    live: HashSet<Uuid>,
}

impl AssetStore {
    /// Create a new store with a fresh temp directory.
    pub fn new() -> io::Result<Self> {
        let dir = TempDir::new()?;
        debug!("Created asset store at {}", dir.path().display());
        Ok(Self {
            dir,
            live: HashSet::new(),
        })
    }

    /// Write `bytes` and return a handle to them.
    pub fn publish(
        &mut self,
        name: impl Into<String>,
        bytes: &[u8],
        original_byte_size: u64,
    ) -> Result<ResultAsset> {
        let id = Uuid::new_v4();
        let location = self.dir.path().join(format!("{id}.pdf"));
        std::fs::write(&location, bytes)?;
        self.live.insert(id);

        let asset = ResultAsset {
            id,
            location,
            name: name.into(),
            byte_size: bytes.len() as u64,
            original_byte_size,
        };
        debug!("Published {} as {}", asset.name, id);
        Ok(asset)
    }

    /// Delete an asset's bytes. Consumes the handle.
    pub fn release(&mut self, asset: ResultAsset) {
        if self.live.remove(&asset.id) {
            if let Err(e) = std::fs::remove_file(&asset.location) {
                tracing::warn!("Failed to remove {}: {}", asset.location.display(), e);
            }
            debug!("Released {}", asset.id);
        }
    }

    pub fn release_all(&mut self, assets: impl IntoIterator<Item = ResultAsset>) {
        for asset in assets {
            self.release(asset);
        }
    }

    /// Copy an asset out to a permanent path.
    pub fn save_as(&self, asset: &ResultAsset, destination: impl AsRef<Path>) -> Result<u64> {
        Ok(std::fs::copy(&asset.location, destination)?)
    }

    /// Number of published, not yet released assets
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, asset: &ResultAsset) -> bool {
        self.live.contains(&asset.id)
    }
}
