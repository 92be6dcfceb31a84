//! Ordered segment concatenation.

use std::path::Path;

use tracing::debug;

use sclip_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Build the concat-demuxer play-list, one `file` directive per segment,
/// in the given order.
pub fn build_concat_list(segments: &[impl AsRef<Path>]) -> String {
    let mut list = String::new();
    for segment in segments {
        list.push_str(&format!("file '{}'\n", segment.as_ref().display()));
    }
    list
}

/// Join ordered segments into one continuous stream, optionally muxing an
/// audio track truncated to the shorter stream.
pub async fn concat_segments(
    segments: &[impl AsRef<Path>],
    list_path: impl AsRef<Path>,
    output: impl AsRef<Path>,
    audio: Option<&Path>,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let list_path = list_path.as_ref();
    let output = output.as_ref();

    tokio::fs::write(list_path, build_concat_list(segments)).await?;

    debug!(
        segments = segments.len(),
        output = %output.display(),
        with_audio = audio.is_some(),
        "Concatenating segments"
    );

    let mut cmd = FfmpegCommand::new(list_path, output)
        .input_args(["-f", "concat", "-safe", "0"]);

    if let Some(audio) = audio {
        cmd = cmd.add_input(audio).shortest();
    }

    let cmd = cmd
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf);

    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_preserves_order() {
        let segments = ["/tmp/x/scene_0.mp4", "/tmp/x/scene_1.mp4", "/tmp/x/scene_2.mp4"];
        let list = build_concat_list(&segments);
        assert_eq!(
            list,
            "file '/tmp/x/scene_0.mp4'\nfile '/tmp/x/scene_1.mp4'\nfile '/tmp/x/scene_2.mp4'\n"
        );
    }

    #[test]
    fn test_concat_command_with_audio() {
        let cmd = FfmpegCommand::new("list.txt", "out.mp4")
            .input_args(["-f", "concat", "-safe", "0"])
            .add_input("audio.aac")
            .shortest()
            .video_codec("libx264")
            .preset("ultrafast")
            .crf(17);
        let args = cmd.build_args();
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"concat".to_string()));
        assert!(args.contains(&"audio.aac".to_string()));
    }
}
