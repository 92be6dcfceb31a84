//! Per-export scratch space.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::ExportResult;

/// An ephemeral directory exclusively owned by one export invocation.
///
/// All intermediates live here; the directory is removed when the value
/// drops, on every exit path. Scene slots are partitioned by index before
/// dispatch, so concurrent renders never collide.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a scratch directory, under `parent` when given.
    pub fn create(parent: Option<&Path>) -> ExportResult<Self> {
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                TempDir::with_prefix_in("sclip-", parent)?
            }
            None => TempDir::with_prefix("sclip-")?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a named intermediate inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Pre-assigned slot for a rendered scene, keyed by original index.
    pub fn scene_slot(&self, index: usize) -> PathBuf {
        self.file(&format!("scene_{index}.mp4"))
    }

    /// Pre-assigned slot for a scene's trimmed source segment.
    pub fn segment_slot(&self, index: usize) -> PathBuf {
        self.file(&format!("segment_{index}.mp4"))
    }
}
