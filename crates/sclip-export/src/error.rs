//! Exporter error types.

use thiserror::Error;

use sclip_media::MediaError;
use sclip_models::ScenesDocError;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("media error: {0}")]
    Media(#[from] MediaError),

    #[error("scenes document error: {0}")]
    Scenes(#[from] ScenesDocError),

    #[error("no scenes intersect the requested range")]
    NoScenes,

    #[error("scene task aborted: {0}")]
    TaskAborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Whether this failure was an unsupported scene type in the document.
    pub fn is_unsupported_scene_type(&self) -> bool {
        matches!(
            self,
            ExportError::Scenes(ScenesDocError::UnsupportedSceneType(_))
        )
    }
}
