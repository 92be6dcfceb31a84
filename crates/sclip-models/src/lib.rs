//! Shared data models for the SceneClip export pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Exact rational time arithmetic and time ranges
//! - Frame rates and frame-period math
//! - Scene records (fill crop / fit blur-composite)
//! - Aspect ratios and encoding configuration

pub mod aspect;
pub mod encoding;
pub mod scene;
pub mod time;

// Re-export common types
pub use aspect::AspectRatio;
pub use encoding::EncodingConfig;
pub use scene::{parse_scenes, Scene, SceneLayout, ScenesDocError};
pub use time::{FrameRate, Rational, RationalParseError, TimeRange, TimeRangeError};
