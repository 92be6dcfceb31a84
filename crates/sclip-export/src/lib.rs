//! Scene-based recomposition exporter.
//!
//! Recomposes a source video's sub-range into a new clip retargeted to a
//! destination aspect ratio: frame-accurate trimming, per-scene fill/fit
//! transforms rendered concurrently, order-preserving concatenation, then
//! audio and optional hard-subtitle reattachment.
//!
//! The exporter consumes local file paths and a [`ProgressSink`] and emits
//! one local output file or a typed failure; download/upload, schema
//! validation and transport wiring belong to the embedding layer.

pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod progress;
pub mod scheduler;
pub mod scratch;

pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use exporter::{
    export_batch, BatchEntry, ExportRequest, Exporter, SceneCoordinates, ScenesSource,
};
pub use progress::{NullProgress, ProgressSink};
pub use scheduler::{run_scene_tasks, SceneTask};
pub use scratch::ScratchSpace;
