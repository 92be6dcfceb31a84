//! Independent audio track handling.

use std::path::Path;

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Demux the audio track into its own file; the encoder follows the
/// output extension (`.aac`).
pub async fn extract_audio(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    debug!(
        input = %input.display(),
        output = %output.display(),
        "Extracting audio"
    );

    let cmd = FfmpegCommand::new(input, output).output_arg("-vn");
    runner.run(&cmd).await
}

/// Remux an audio track onto a video stream without re-encoding either,
/// truncated to the shorter stream.
pub async fn attach_audio(
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let video = video.as_ref();
    let audio = audio.as_ref();
    let output = output.as_ref();

    debug!(
        video = %video.display(),
        audio = %audio.display(),
        output = %output.display(),
        "Attaching audio"
    );

    let cmd = FfmpegCommand::new(video, output)
        .add_input(audio)
        .video_codec("copy")
        .audio_codec("copy")
        .shortest();

    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_copies_both_streams() {
        let cmd = FfmpegCommand::new("video.mp4", "out.mp4")
            .add_input("audio.aac")
            .video_codec("copy")
            .audio_codec("copy")
            .shortest();
        let args = cmd.build_args();

        let cv = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[cv + 1], "copy");
        let ca = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[ca + 1], "copy");
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_extract_drops_video() {
        let cmd = FfmpegCommand::new("in.mp4", "audio.aac").output_arg("-vn");
        assert!(cmd.build_args().contains(&"-vn".to_string()));
    }
}
