//! Filesystem utilities for delivering artifacts.

use std::path::Path;

use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Copy `src` to `dst`, staging through a temp file in the destination
/// directory so the final rename is atomic on that filesystem. The source
/// is left in place (scratch cleanup owns it).
pub async fn deliver_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "Failed to stage delivery copy: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    fs::rename(&tmp_dst, dst).await.map_err(|e| {
        // Clean up the staged copy on failure
        let _ = std::fs::remove_file(&tmp_dst);
        tracing::error!(
            "Failed to finalize delivery: {} -> {}: {}",
            tmp_dst.display(),
            dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    tracing::debug!("Delivered {} -> {}", src.display(), dst.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_deliver_copies_content() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("artifact.mp4");
        let dst = dir.path().join("out").join("final.mp4");

        fs::write(&src, b"clip bytes").await.unwrap();

        deliver_file(&src, &dst).await.unwrap();

        assert!(src.exists(), "source stays in scratch");
        assert_eq!(fs::read(&dst).await.unwrap(), b"clip bytes");
    }

    #[tokio::test]
    async fn test_deliver_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.mp4");
        let dst = dir.path().join("final.mp4");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        deliver_file(&src, &dst).await.unwrap();
        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_deliver_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = deliver_file(dir.path().join("absent.mp4"), dir.path().join("o.mp4")).await;
        assert!(result.is_err());
    }
}
