//! Exporter configuration.

use std::path::PathBuf;
use std::time::Duration;

use sclip_models::EncodingConfig;

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Maximum scenes rendered in parallel within a single export
    pub max_scene_parallel: usize,
    /// Wall-clock bound for each external tool invocation
    pub stage_timeout: Duration,
    /// Parent directory for scratch spaces (system temp when unset)
    pub work_dir: Option<PathBuf>,
    /// Encoding settings for trim and subtitle passes
    pub encoding: EncodingConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_scene_parallel: 4,
            stage_timeout: Duration::from_secs(3600),
            work_dir: None,
            encoding: EncodingConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Create config from environment variables, loading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            max_scene_parallel: std::env::var("SCLIP_MAX_SCENE_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            stage_timeout: Duration::from_secs(
                std::env::var("SCLIP_STAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            work_dir: std::env::var("SCLIP_WORK_DIR").ok().map(PathBuf::from),
            encoding: EncodingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.max_scene_parallel, 4);
        assert_eq!(config.stage_timeout, Duration::from_secs(3600));
        assert!(config.work_dir.is_none());
    }
}
