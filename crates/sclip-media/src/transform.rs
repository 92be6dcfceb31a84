//! Per-scene crop and blur-composite transforms.
//!
//! Both transforms consume an already-trimmed, audio-stripped segment and
//! produce one independent output file. Sizing decisions live in pure
//! planning functions so they can be tested without FFmpeg.

use std::path::Path;

use tracing::debug;

use sclip_models::{AspectRatio, EncodingConfig, SceneLayout};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::SourceMetadata;

/// Gaussian blur strength for the fit background layer.
const BACKGROUND_BLUR_SIGMA: u32 = 10;
/// Foreground opacity of the fit composite.
const FOREGROUND_ALPHA: &str = "0.9";

/// An absolute crop rectangle in source pixels. Width and height are
/// rounded to the nearest even integer (codec constraint); offsets keep
/// their fractional precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: u32,
    pub height: u32,
}

fn round_even(v: f64) -> u32 {
    ((v / 2.0).round() as u32) * 2
}

/// Resolve normalized fill parameters against the source dimensions.
pub fn plan_fill_crop(
    top_left: [f64; 2],
    crop_width: f64,
    crop_height: f64,
    meta: &SourceMetadata,
) -> CropRect {
    let width = meta.width as f64;
    let height = meta.height as f64;

    CropRect {
        x: top_left[0] * width,
        y: top_left[1] * height,
        width: round_even(crop_width * width),
        height: round_even(crop_height * height),
    }
}

/// Compute the fit target dimensions for a destination aspect ratio.
///
/// Height-constrained when the source is wider than the destination
/// aspect, width-constrained otherwise; both dimensions even.
pub fn plan_fit_dims(meta: &SourceMetadata, aspect: AspectRatio) -> (u32, u32) {
    let (width, height) = if meta.aspect() > aspect.ratio() {
        (meta.height as f64 * aspect.ratio(), meta.height as f64)
    } else {
        (meta.width as f64, meta.width as f64 / aspect.ratio())
    };
    (round_even(width), round_even(height))
}

/// Build the fill crop filter chain.
pub fn fill_filter(rect: &CropRect, meta: &SourceMetadata) -> String {
    format!(
        "scale=w={}:h={},setsar=1/1,crop=w={}:h={}:x={}:y={}",
        meta.width, meta.height, rect.width, rect.height, rect.x, rect.y
    )
}

/// Build the fit composite filter graph.
///
/// Fixed layer order: scale -> blur -> crop for the background, scale for
/// the foreground, then a centered overlay with partial transparency.
pub fn fit_filter(target_width: u32, target_height: u32, meta: &SourceMetadata) -> String {
    format!(
        "[0:v]scale={sw}:{sh},gblur=sigma={sigma},crop={tw}:{th},setsar=1/1[b];\
         [1:v]scale={tw}:-2,setsar=1[f];\
         [b][f]overlay=(W-w)/2:(H-h)/2:enable=1,format=rgba,colorchannelmixer=aa={alpha}",
        sw = meta.width,
        sh = meta.height,
        sigma = BACKGROUND_BLUR_SIGMA,
        tw = target_width,
        th = target_height,
        alpha = FOREGROUND_ALPHA,
    )
}

/// Crop the segment to an absolute rectangle.
pub async fn apply_fill(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    rect: &CropRect,
    meta: &SourceMetadata,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    debug!(
        input = %input.display(),
        output = %output.display(),
        width = rect.width,
        height = rect.height,
        "Applying fill crop"
    );

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(fill_filter(rect, meta))
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf);

    runner.run(&cmd).await
}

/// Composite the segment over a blurred copy of itself at the target dims.
pub async fn apply_fit(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    meta: &SourceMetadata,
    aspect: AspectRatio,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let (target_width, target_height) = plan_fit_dims(meta, aspect);

    debug!(
        input = %input.display(),
        output = %output.display(),
        target_width = target_width,
        target_height = target_height,
        aspect = %aspect,
        "Applying fit composite"
    );

    // The segment feeds both layers of the composite.
    let cmd = FfmpegCommand::new(input, output)
        .add_input(input)
        .filter_complex(fit_filter(target_width, target_height, meta))
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .no_audio();

    runner.run(&cmd).await
}

/// Render one scene segment according to its layout.
pub async fn render_scene(
    segment: impl AsRef<Path>,
    output: impl AsRef<Path>,
    layout: &SceneLayout,
    meta: &SourceMetadata,
    destination_aspect: AspectRatio,
    encoding: &EncodingConfig,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    match layout {
        SceneLayout::Fill {
            top_left,
            crop_width,
            crop_height,
        } => {
            let rect = plan_fill_crop(*top_left, *crop_width, *crop_height, meta);
            apply_fill(segment, output, &rect, meta, encoding, runner).await
        }
        SceneLayout::Fit { aspect_ratio } => {
            let aspect = aspect_ratio.unwrap_or(destination_aspect);
            apply_fit(segment, output, meta, aspect, encoding, runner).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_models::FrameRate;

    fn meta_1080p() -> SourceMetadata {
        SourceMetadata {
            width: 1920,
            height: 1080,
            frame_rate: FrameRate::parse("30/1").unwrap(),
        }
    }

    #[test]
    fn test_round_even() {
        assert_eq!(round_even(960.0), 960);
        assert_eq!(round_even(961.0), 960);
        assert_eq!(round_even(963.0), 964);
        assert_eq!(round_even(541.2), 542);
    }

    #[test]
    fn test_fill_crop_from_spec_example() {
        // 1920x1080, crop 0.5x0.5 at (0.1, 0.1) -> 960x540 at (192, 108)
        let rect = plan_fill_crop([0.1, 0.1], 0.5, 0.5, &meta_1080p());
        assert_eq!(rect.width, 960);
        assert_eq!(rect.height, 540);
        assert!((rect.x - 192.0).abs() < 1e-9);
        assert!((rect.y - 108.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_dims_always_even() {
        let rect = plan_fill_crop([0.0, 0.0], 0.333, 0.333, &meta_1080p());
        assert_eq!(rect.width % 2, 0);
        assert_eq!(rect.height % 2, 0);
    }

    #[test]
    fn test_fit_height_constrained_for_wide_source() {
        // 16:9 source into 9:16 -> source aspect > dest aspect
        let (w, h) = plan_fit_dims(&meta_1080p(), AspectRatio::PORTRAIT);
        assert_eq!(h, 1080);
        // 1080 * 9/16 = 607.5 -> 608
        assert_eq!(w, 608);
        assert_eq!(w % 2, 0);
    }

    #[test]
    fn test_fit_width_constrained_for_tall_source() {
        let tall = SourceMetadata {
            width: 1080,
            height: 1920,
            frame_rate: FrameRate::parse("30/1").unwrap(),
        };
        // 9:16 source into 16:9 -> source aspect < dest aspect
        let (w, h) = plan_fit_dims(&tall, AspectRatio::new(16, 9).unwrap());
        assert_eq!(w, 1080);
        // 1080 / (16/9) = 607.5 -> 608
        assert_eq!(h, 608);
    }

    #[test]
    fn test_fit_filter_layer_order() {
        let filter = fit_filter(608, 1080, &meta_1080p());
        let scale = filter.find("[0:v]scale").unwrap();
        let blur = filter.find("gblur").unwrap();
        let crop = filter.find("crop=608:1080").unwrap();
        let overlay = filter.find("overlay=(W-w)/2:(H-h)/2").unwrap();
        assert!(scale < blur && blur < crop && crop < overlay);
        assert!(filter.contains("colorchannelmixer=aa=0.9"));
    }

    #[test]
    fn test_fill_filter_shape() {
        let rect = plan_fill_crop([0.1, 0.1], 0.5, 0.5, &meta_1080p());
        let filter = fill_filter(&rect, &meta_1080p());
        assert_eq!(
            filter,
            "scale=w=1920:h=1080,setsar=1/1,crop=w=960:h=540:x=192:y=108"
        );
    }
}
