//! FFprobe source metadata.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use sclip_models::FrameRate;

use crate::error::{MediaError, MediaResult};

/// Dimensions and exact frame rate of a video source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMetadata {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Exact frame rate as reported by ffprobe
    pub frame_rate: FrameRate,
}

impl SourceMetadata {
    /// Width-over-height ratio of the source frame.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video source for dimensions and exact frame rate.
pub async fn probe_source(path: impl AsRef<Path>) -> MediaResult<SourceMetadata> {
    let path = path.as_ref();

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe(
            format!("ffprobe failed for {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::NoVideoStream(path.to_path_buf()))?;

    // avg_frame_rate can be 0/0 on some containers; r_frame_rate is the
    // fallback. Both stay exact fractions all the way through.
    let frame_rate = video
        .avg_frame_rate
        .as_deref()
        .and_then(FrameRate::parse)
        .or_else(|| video.r_frame_rate.as_deref().and_then(FrameRate::parse))
        .ok_or_else(|| {
            MediaError::probe(
                format!("no usable frame rate for {}", path.display()),
                None,
            )
        })?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaError::probe(
                format!("missing video dimensions for {}", path.display()),
                None,
            ))
        }
    };

    Ok(SourceMetadata {
        width,
        height,
        frame_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_models::Rational;

    #[test]
    fn test_parse_probe_json() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001"}
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type == "video")
            .unwrap();

        let rate = FrameRate::parse(video.avg_frame_rate.as_deref().unwrap()).unwrap();
        assert_eq!(rate.fps(), Rational::new(30000, 1001).unwrap());
        assert_eq!(video.width, Some(1920));
    }

    #[test]
    fn test_degenerate_avg_rate_falls_back() {
        // Mirrors the selection logic in probe_source
        let avg = FrameRate::parse("0/0");
        let r = FrameRate::parse("25/1");
        let chosen = avg.or(r).unwrap();
        assert_eq!(chosen.fps(), Rational::from_int(25));
    }
}
