//! Frame-accurate sub-range extraction.

use std::path::Path;

use tracing::debug;

use sclip_models::{EncodingConfig, FrameRate, Rational};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Filter that freezes the first decoded frame.
const FREEZE_FRAME_FILTER: &str = "select='eq(n,0)',setpts=PTS-STARTPTS";

/// Extract `[start, end)` from `input` into `output`.
///
/// When the duration does not exceed one frame period the output is a
/// single frozen frame taken at `start` (ranges narrower than one
/// displayed frame cannot be cut conventionally). Otherwise the range is
/// re-encoded with a fast pre-input seek; accuracy is bounded by one
/// frame period.
pub async fn trim_video(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: Rational,
    end: Rational,
    frame_rate: Option<FrameRate>,
    no_audio: bool,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let duration = end - start;
    if !duration.is_positive() {
        return Err(MediaError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let freeze = frame_rate.map(|r| r.is_subframe(duration)).unwrap_or(false);

    debug!(
        input = %input.display(),
        output = %output.display(),
        start = %start,
        duration = %duration,
        freeze = freeze,
        "Trimming video"
    );

    let cmd = if freeze {
        // Decode-accurate output seek, then freeze the first frame. A
        // sub-frame range carries no audio worth keeping.
        FfmpegCommand::new(input, output)
            .output_seek(start)
            .video_filter(FREEZE_FRAME_FILTER)
            .single_frame()
            .video_codec(&encoding.codec)
            .crf(encoding.crf)
            .no_audio()
    } else {
        let cmd = FfmpegCommand::new(input, output)
            .seek(start)
            .duration(duration)
            .video_codec(&encoding.codec)
            .crf(encoding.crf)
            .preset(&encoding.preset);
        if no_audio {
            cmd.no_audio()
        } else {
            cmd.audio_codec("copy")
        }
    };

    runner.run(&cmd).await
}
