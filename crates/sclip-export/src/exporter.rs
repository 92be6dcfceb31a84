//! Export orchestration.
//!
//! Fixed-stage state machine:
//!
//! `Trim -> ExtractAudio(opt) -> LoadScenes -> TransformScenes(parallel)
//!  -> Concatenate -> ReTrim(opt) -> AttachAudio(opt)
//!  -> AttachSubtitles(opt) -> Deliver`
//!
//! Every intermediate lives in one [`ScratchSpace`] scoped to the call and
//! removed on every exit path. Concurrent exports are fully independent:
//! each gets its own Exporter invocation, scratch directory and scene
//! list, with no shared mutable state.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use sclip_media::{
    attach_audio, attach_subtitles, concat_segments, deliver_file, extract_audio, probe_source,
    render_scene, trim_video, FfmpegRunner, SourceMetadata,
};
use sclip_models::{parse_scenes, scene, AspectRatio, EncodingConfig, Scene, TimeRange};

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::progress::{NullProgress, ProgressSink};
use crate::scheduler::{run_scene_tasks, SceneTask};
use crate::scratch::ScratchSpace;

/// Where the scenes document comes from.
#[derive(Debug, Clone)]
pub enum ScenesSource {
    /// Inline JSON document
    Document(String),
    /// Path to a JSON document on disk
    Path(PathBuf),
}

/// Coordinate system of the scene boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneCoordinates {
    /// Boundaries reference the original source timeline. Scene segments
    /// are cut from the source and the concatenated stream is re-trimmed
    /// to the requested range.
    #[default]
    Absolute,
    /// Boundaries are relative to the trimmed clip (the prober only saw
    /// an already-trimmed source). Boundaries are rebased onto the range
    /// and no re-trim pass runs.
    ClipRelative,
}

/// One export invocation.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Local source video path
    pub source: PathBuf,
    /// Destination path for the single output file
    pub destination: PathBuf,
    /// Requested sub-range of the source
    pub range: TimeRange,
    /// Scenes document
    pub scenes: ScenesSource,
    /// Destination aspect ratio for fit scenes
    pub aspect_ratio: AspectRatio,
    /// Styled subtitle document with an embedded font payload
    pub subtitles: Option<String>,
    /// Coordinate system of the scene boundaries
    pub scene_coordinates: SceneCoordinates,
}

/// Orchestrates one export end to end.
pub struct Exporter {
    config: ExportConfig,
    progress: Arc<dyn ProgressSink>,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NullProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the full pipeline, producing one file at the destination.
    ///
    /// The scratch directory is removed on every exit path, success or
    /// failure, discarding all intermediates.
    pub async fn export(&self, request: &ExportRequest) -> ExportResult<PathBuf> {
        let scratch = ScratchSpace::create(self.config.work_dir.as_deref())?;
        info!(
            source = %request.source.display(),
            destination = %request.destination.display(),
            scratch = %scratch.path().display(),
            "Starting export"
        );

        // Scratch drops (and is deleted) here whatever the outcome.
        self.run_stages(request, &scratch).await
    }

    async fn run_stages(
        &self,
        request: &ExportRequest,
        scratch: &ScratchSpace,
    ) -> ExportResult<PathBuf> {
        let runner = FfmpegRunner::new().with_timeout(self.config.stage_timeout);
        let encoding = &self.config.encoding;
        let transform_encoding = EncodingConfig::for_transform();

        let meta = probe_source(&request.source).await?;
        let range = request.range;
        let duration = range.duration();
        let frame_rate = meta.frame_rate;

        // Trim
        self.progress.report(10, "Trimming the video");
        let trimmed = scratch.file("trimmed.mp4");
        trim_video(
            &request.source,
            &trimmed,
            range.start,
            range.end,
            Some(frame_rate),
            false,
            encoding,
            &runner,
        )
        .await?;

        // ExtractAudio — a sub-frame freeze carries no meaningful audio
        let audio = if frame_rate.is_subframe(duration) {
            None
        } else {
            self.progress.report(20, "Extracting audio");
            let audio = scratch.file("audio.aac");
            extract_audio(&trimmed, &audio, &runner).await?;
            Some(audio)
        };

        // LoadScenes
        self.progress.report(30, "Processing scenes");
        let scenes = self.load_scenes(request).await?;
        if scenes.is_empty() {
            return Err(ExportError::NoScenes);
        }
        let first_scene_start = scenes[0].start_time;

        // TransformScenes — parallel fan-out over pre-assigned slots.
        // In absolute mode the scene boundaries address the original
        // source; in clip-relative mode they address the trimmed clip.
        let scene_input = match request.scene_coordinates {
            SceneCoordinates::Absolute => request.source.clone(),
            SceneCoordinates::ClipRelative => trimmed.clone(),
        };

        let tasks: Vec<SceneTask> = scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| SceneTask {
                index,
                scene: scene.clone(),
                segment: scratch.segment_slot(index),
                output: scratch.scene_slot(index),
            })
            .collect();

        let ctx = Arc::new(SceneRenderContext {
            input: scene_input,
            meta,
            aspect_ratio: request.aspect_ratio,
            encoding: transform_encoding.clone(),
            runner: runner.clone(),
        });
        let ordered = run_scene_tasks(tasks, self.config.max_scene_parallel, move |task| {
            let ctx = Arc::clone(&ctx);
            async move { ctx.render(task).await }
        })
        .await?;

        // Concatenate
        self.progress.report(50, "Concatenating scenes");
        let concatenated = scratch.file("concatenated.mp4");
        concat_segments(
            &ordered,
            scratch.file("concat_list.txt"),
            &concatenated,
            None,
            &transform_encoding,
            &runner,
        )
        .await?;

        // ReTrim — only in absolute mode, where the concatenated timeline
        // starts at the first scene boundary rather than the range start.
        self.progress.report(70, "Final trimming and attaching audio");
        let retrimmed = match request.scene_coordinates {
            SceneCoordinates::Absolute => {
                let local_start = (range.start - first_scene_start).clamp_non_negative();
                let local_end = local_start + duration;
                let path = scratch.file("retrimmed.mp4");
                trim_video(
                    &concatenated,
                    &path,
                    local_start,
                    local_end,
                    Some(frame_rate),
                    false,
                    encoding,
                    &runner,
                )
                .await?;
                path
            }
            SceneCoordinates::ClipRelative => concatenated,
        };

        // AttachAudio
        let with_audio = match &audio {
            Some(audio) => {
                let path = scratch.file("with_audio.mp4");
                attach_audio(&retrimmed, audio, &path, &runner).await?;
                path
            }
            None => retrimmed,
        };

        // AttachSubtitles
        let finished = match &request.subtitles {
            Some(document) => {
                self.progress.report(90, "Attaching subtitles");
                let path = scratch.file("subtitled.mp4");
                attach_subtitles(
                    &with_audio,
                    &path,
                    document,
                    scratch.path(),
                    encoding,
                    &runner,
                )
                .await?;
                path
            }
            None => with_audio,
        };

        // Deliver
        deliver_file(&finished, &request.destination).await?;
        self.progress.report(100, "Export completed successfully");
        info!(destination = %request.destination.display(), "Export finished");

        Ok(request.destination.clone())
    }

    /// Load, filter and (optionally) rebase the scenes document.
    async fn load_scenes(&self, request: &ExportRequest) -> ExportResult<Vec<Scene>> {
        let document = match &request.scenes {
            ScenesSource::Document(doc) => doc.clone(),
            ScenesSource::Path(path) => tokio::fs::read_to_string(path).await?,
        };

        let all = parse_scenes(&document)?;
        let filtered = scene::filter_to_range(all, &request.range);

        Ok(match request.scene_coordinates {
            SceneCoordinates::Absolute => filtered,
            SceneCoordinates::ClipRelative => scene::rebase_to_range(filtered, &request.range),
        })
    }
}

/// Everything a scene task needs, shared immutably across the fan-out.
struct SceneRenderContext {
    input: PathBuf,
    meta: SourceMetadata,
    aspect_ratio: AspectRatio,
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl SceneRenderContext {
    /// Cut the scene's segment (audio stripped, freeze-frame fallback for
    /// sub-frame scenes), then render it with the scene's layout.
    async fn render(&self, task: SceneTask) -> ExportResult<()> {
        trim_video(
            &self.input,
            &task.segment,
            task.scene.start_time,
            task.scene.end_time,
            Some(self.meta.frame_rate),
            true,
            &self.encoding,
            &self.runner,
        )
        .await?;

        render_scene(
            &task.segment,
            &task.output,
            &task.scene.layout,
            &self.meta,
            self.aspect_ratio,
            &self.encoding,
            &self.runner,
        )
        .await?;

        Ok(())
    }
}

/// One entry of a batch export.
pub struct BatchEntry {
    pub request: ExportRequest,
    pub progress: Arc<dyn ProgressSink>,
}

/// Run several exports as independent top-level tasks.
///
/// Each entry gets its own Exporter, scratch directory and scene list.
/// Results come back in entry order; one entry's failure never swallows
/// or blocks its siblings.
pub async fn export_batch(
    config: &ExportConfig,
    entries: Vec<BatchEntry>,
) -> Vec<ExportResult<PathBuf>> {
    let handles: Vec<_> = entries
        .into_iter()
        .map(|BatchEntry { request, progress }| {
            let exporter = Exporter::new(config.clone()).with_progress(progress);
            tokio::spawn(async move { exporter.export(&request).await })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            Err(join_err) => Err(ExportError::TaskAborted(join_err.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sclip_models::Rational;

    fn rat(s: &str) -> Rational {
        Rational::from_decimal_str(s).unwrap()
    }

    fn request(scenes: &str) -> ExportRequest {
        ExportRequest {
            source: PathBuf::from("/video/source.mp4"),
            destination: PathBuf::from("/video/out.mp4"),
            range: TimeRange::new(rat("2.0"), rat("5.0")).unwrap(),
            scenes: ScenesSource::Document(scenes.to_string()),
            aspect_ratio: AspectRatio::PORTRAIT,
            subtitles: None,
            scene_coordinates: SceneCoordinates::Absolute,
        }
    }

    const SCENES: &str = r#"[
        {"start_time": 2.0, "end_time": 3.5, "type": "fill",
         "top_left": [0.1, 0.1], "crop_width": 0.5, "crop_height": 0.5},
        {"start_time": 3.5, "end_time": 5.0, "type": "fit"},
        {"start_time": 6.0, "end_time": 7.0, "type": "fit"}
    ]"#;

    #[tokio::test]
    async fn test_load_scenes_filters_to_range() {
        let exporter = Exporter::new(ExportConfig::default());
        let scenes = exporter.load_scenes(&request(SCENES)).await.unwrap();
        // The 6.0-7.0 scene is outside [2.0, 5.0]
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].start_time, rat("2.0"));
    }

    #[tokio::test]
    async fn test_load_scenes_rebases_in_clip_relative_mode() {
        let exporter = Exporter::new(ExportConfig::default());
        let mut req = request(SCENES);
        req.scene_coordinates = SceneCoordinates::ClipRelative;

        let scenes = exporter.load_scenes(&req).await.unwrap();
        assert_eq!(scenes[0].start_time, Rational::ZERO);
        assert_eq!(scenes.last().unwrap().end_time, rat("3.0"));
    }

    #[tokio::test]
    async fn test_unknown_scene_type_fails_load() {
        let exporter = Exporter::new(ExportConfig::default());
        let req = request(r#"[{"start_time": 0, "end_time": 1, "type": "zoom"}]"#);
        let err = exporter.load_scenes(&req).await.unwrap_err();
        assert!(err.is_unsupported_scene_type());
    }
}
