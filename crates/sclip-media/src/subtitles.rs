//! Hard-subtitle burn-in with an embedded font payload.
//!
//! Styled subtitle documents carry their font as a single labeled base64
//! line (`data: <base64>`). The payload is decoded into scratch space and
//! the directory registered as a font search path for the `ass` filter,
//! so rendering never depends on system fonts.

use std::path::Path;

use base64::Engine;
use regex::Regex;
use tracing::debug;

use sclip_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Pull the base64 font payload out of a subtitle document.
pub fn extract_font_payload(doc: &str) -> MediaResult<Vec<u8>> {
    // The pattern is fixed by the document format; compilation cannot fail.
    let pattern = Regex::new(r"data: (.+)").expect("valid font payload pattern");
    let payload = pattern
        .captures(doc)
        .and_then(|c| c.get(1))
        .ok_or(MediaError::MissingFontData)?
        .as_str()
        .trim();

    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

/// Burn the subtitle track into pixels, resolving fonts from `fonts_dir`.
pub async fn burn_subtitles(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    subtitles_path: impl AsRef<Path>,
    fonts_dir: impl AsRef<Path>,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    let subtitles_path = subtitles_path.as_ref();
    let fonts_dir = fonts_dir.as_ref();

    debug!(
        input = %input.display(),
        subtitles = %subtitles_path.display(),
        fonts_dir = %fonts_dir.display(),
        "Burning subtitles"
    );

    let filter = format!(
        "ass={}:fontsdir={}",
        subtitles_path.display(),
        fonts_dir.display()
    );

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(filter)
        .video_codec(&encoding.codec)
        .crf(encoding.crf);

    runner.run(&cmd).await
}

/// Render a subtitle document onto `input`, staging the document and its
/// embedded font under `work_dir`.
pub async fn attach_subtitles(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    document: &str,
    work_dir: impl AsRef<Path>,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let work_dir = work_dir.as_ref();

    let font = extract_font_payload(document)?;

    let fonts_dir = work_dir.join("fonts");
    tokio::fs::create_dir_all(&fonts_dir).await?;
    tokio::fs::write(fonts_dir.join("font.ttf"), font).await?;

    let subtitles_path = work_dir.join("subtitles.ass");
    tokio::fs::write(&subtitles_path, document).await?;

    burn_subtitles(input, output, &subtitles_path, &fonts_dir, encoding, runner).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_font_payload() {
        let doc = "[Script Info]\nTitle: demo\ndata: aGVsbG8=\n[Events]\n";
        assert_eq!(extract_font_payload(doc).unwrap(), b"hello");
    }

    #[test]
    fn test_missing_payload() {
        let doc = "[Script Info]\nTitle: demo\n[Events]\n";
        assert!(matches!(
            extract_font_payload(doc).unwrap_err(),
            MediaError::MissingFontData
        ));
    }

    #[test]
    fn test_invalid_payload() {
        let doc = "data: not-!!-base64\n";
        assert!(matches!(
            extract_font_payload(doc).unwrap_err(),
            MediaError::InvalidFontData(_)
        ));
    }
}
