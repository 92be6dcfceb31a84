//! Scene records and range filtering/rebasing.
//!
//! A scenes document is an ordered JSON array of records:
//!
//! ```json
//! [
//!   {"start_time": 2.0, "end_time": 3.5, "type": "fill",
//!    "top_left": [0.1, 0.1], "crop_width": 0.5, "crop_height": 0.5},
//!   {"start_time": 3.5, "end_time": 5.0, "type": "fit"}
//! ]
//! ```
//!
//! Unknown `type` tags are rejected here, at parse time, so the render
//! pipeline never sees an unclassifiable scene.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aspect::AspectRatio;
use crate::time::{Rational, TimeRange};

/// How one scene is rendered into the destination frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SceneLayout {
    /// Crop the source to a normalized rectangle.
    Fill {
        /// Normalized top-left corner, `[x, y]` in 0..=1.
        top_left: [f64; 2],
        /// Normalized crop width in 0..=1.
        crop_width: f64,
        /// Normalized crop height in 0..=1.
        crop_height: f64,
    },
    /// Letterbox the source over a blurred full-frame background.
    Fit {
        /// Per-scene aspect override; the export destination aspect applies
        /// when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aspect_ratio: Option<AspectRatio>,
    },
}

/// A time-bounded output region rendered by exactly one layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub start_time: Rational,
    pub end_time: Rational,
    #[serde(flatten)]
    pub layout: SceneLayout,
}

impl Scene {
    /// Whether this scene overlaps the requested range
    /// (`!(end < range.start || start > range.end)`).
    pub fn intersects(&self, range: &TimeRange) -> bool {
        !(self.end_time < range.start || self.start_time > range.end)
    }
}

/// Error reading a scenes document.
#[derive(Debug, Error)]
pub enum ScenesDocError {
    #[error("unsupported scene type: {0}")]
    UnsupportedSceneType(String),

    #[error("fill scene is missing `{0}`")]
    MissingFillParam(&'static str),

    #[error("malformed scenes document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw record as it appears on the wire, before the layout tag is checked.
#[derive(Debug, Deserialize)]
struct RawScene {
    start_time: Rational,
    end_time: Rational,
    #[serde(rename = "type")]
    kind: String,
    top_left: Option<[f64; 2]>,
    crop_width: Option<f64>,
    crop_height: Option<f64>,
    aspect_ratio: Option<AspectRatio>,
}

impl TryFrom<RawScene> for Scene {
    type Error = ScenesDocError;

    fn try_from(raw: RawScene) -> Result<Self, Self::Error> {
        let layout = match raw.kind.as_str() {
            "fill" => SceneLayout::Fill {
                top_left: raw
                    .top_left
                    .ok_or(ScenesDocError::MissingFillParam("top_left"))?,
                crop_width: raw
                    .crop_width
                    .ok_or(ScenesDocError::MissingFillParam("crop_width"))?,
                crop_height: raw
                    .crop_height
                    .ok_or(ScenesDocError::MissingFillParam("crop_height"))?,
            },
            "fit" => SceneLayout::Fit {
                aspect_ratio: raw.aspect_ratio,
            },
            other => return Err(ScenesDocError::UnsupportedSceneType(other.to_string())),
        };

        Ok(Scene {
            start_time: raw.start_time,
            end_time: raw.end_time,
            layout,
        })
    }
}

/// Parse a scenes document, rejecting unknown layout tags.
pub fn parse_scenes(doc: &str) -> Result<Vec<Scene>, ScenesDocError> {
    let raw: Vec<RawScene> = serde_json::from_str(doc)?;
    raw.into_iter().map(Scene::try_from).collect()
}

/// Keep exactly the scenes intersecting `range`, preserving document order.
pub fn filter_to_range(scenes: Vec<Scene>, range: &TimeRange) -> Vec<Scene> {
    scenes.into_iter().filter(|s| s.intersects(range)).collect()
}

/// Rebase scene boundaries to clip-relative coordinates.
///
/// Subtracts `range.start` from every boundary, clamps negatives to zero,
/// then pins the first scene's start to exactly 0 and the last scene's end
/// to exactly `range.duration()`, absorbing rounding at the range edges.
pub fn rebase_to_range(mut scenes: Vec<Scene>, range: &TimeRange) -> Vec<Scene> {
    if scenes.is_empty() {
        return scenes;
    }

    for scene in &mut scenes {
        scene.start_time = (scene.start_time - range.start).clamp_non_negative();
        scene.end_time = (scene.end_time - range.start).clamp_non_negative();
    }

    if let Some(first) = scenes.first_mut() {
        first.start_time = Rational::ZERO;
    }
    if let Some(last) = scenes.last_mut() {
        last.end_time = range.duration();
    }

    scenes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(s: &str) -> Rational {
        Rational::from_decimal_str(s).unwrap()
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::new(rat(start), rat(end)).unwrap()
    }

    const DOC: &str = r#"[
        {"start_time": 2.0, "end_time": 3.5, "type": "fill",
         "top_left": [0.1, 0.1], "crop_width": 0.5, "crop_height": 0.5},
        {"start_time": 3.5, "end_time": 5.0, "type": "fit"}
    ]"#;

    #[test]
    fn test_parse_scenes() {
        let scenes = parse_scenes(DOC).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].start_time, rat("2.0"));
        assert!(matches!(
            scenes[0].layout,
            SceneLayout::Fill { crop_width, .. } if (crop_width - 0.5).abs() < 1e-12
        ));
        assert!(matches!(scenes[1].layout, SceneLayout::Fit { .. }));
    }

    #[test]
    fn test_unknown_type_rejected_at_parse() {
        let doc = r#"[{"start_time": 0, "end_time": 1, "type": "pan"}]"#;
        let err = parse_scenes(doc).unwrap_err();
        assert!(matches!(
            err,
            ScenesDocError::UnsupportedSceneType(ref tag) if tag == "pan"
        ));
    }

    #[test]
    fn test_fill_requires_params() {
        let doc = r#"[{"start_time": 0, "end_time": 1, "type": "fill"}]"#;
        let err = parse_scenes(doc).unwrap_err();
        assert!(matches!(err, ScenesDocError::MissingFillParam("top_left")));
    }

    fn fit(start: &str, end: &str) -> Scene {
        Scene {
            start_time: rat(start),
            end_time: rat(end),
            layout: SceneLayout::Fit { aspect_ratio: None },
        }
    }

    #[test]
    fn test_filter_keeps_only_intersecting() {
        let scenes = vec![
            fit("0.0", "1.0"),
            fit("1.0", "4.0"),
            fit("4.0", "6.0"),
            fit("7.0", "9.0"),
        ];
        let kept = filter_to_range(scenes, &range("2.0", "5.0"));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].start_time, rat("1.0"));
        assert_eq!(kept[1].start_time, rat("4.0"));
    }

    #[test]
    fn test_filter_keeps_boundary_touching_scenes() {
        // end == range.start and start == range.end both survive the filter
        let scenes = vec![fit("1.0", "2.0"), fit("5.0", "6.0")];
        let kept = filter_to_range(scenes, &range("2.0", "5.0"));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_rebase_pins_boundaries_exactly() {
        let scenes = vec![fit("1.5", "3.5"), fit("3.5", "5.2")];
        let rebased = rebase_to_range(scenes, &range("2.0", "5.0"));

        assert_eq!(rebased[0].start_time, Rational::ZERO);
        assert_eq!(rebased[1].end_time, rat("3.0"));
        for scene in &rebased {
            assert!(!scene.start_time.is_negative());
            assert!(!scene.end_time.is_negative());
        }
        // Interior boundary shifted by exactly range.start
        assert_eq!(rebased[0].end_time, rat("1.5"));
        assert_eq!(rebased[1].start_time, rat("1.5"));
    }

    #[test]
    fn test_rebase_empty_is_noop() {
        assert!(rebase_to_range(Vec::new(), &range("0.0", "1.0")).is_empty());
    }
}
