//! Dataset info record (`meta/info.json`)

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Feature dtype marking a per-camera video stream
pub const VIDEO_DTYPE: &str = "video";

/// Descriptor for one named feature column/signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSpec {
    /// Element type, e.g. `float32`, `int64`, `video`
    pub dtype: String,
    /// Tensor shape of one frame's value
    #[serde(default)]
    pub shape: Vec<u64>,
    /// Axis names (structure varies between datasets, kept opaque)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Value>,
    /// Forward-compatible extras (`video_info`, normalization hints, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FeatureSpec {
    /// Whether this feature is a per-camera video stream.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.dtype == VIDEO_DTYPE
    }
}

/// The single dataset-level record stored in `meta/info.json`.
///
/// `total_episodes`, `total_frames` and `total_tasks` are derived counters;
/// [`MetadataStore::persist`](super::MetadataStore::persist) recomputes them
/// from the record sets instead of trusting the loaded values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoRecord {
    /// Count of episode records
    pub total_episodes: usize,
    /// Sum of episode frame lengths
    #[serde(default)]
    pub total_frames: usize,
    /// Count of task records
    pub total_tasks: usize,
    /// Robot identifier, e.g. `so100`
    pub robot_type: String,
    /// Recording frame rate
    pub fps: f64,
    /// Schema/version tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebase_version: Option<String>,
    /// Named feature descriptors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, FeatureSpec>,
    /// Unrecognized fields, preserved verbatim on rewrite
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Scalar fields that must be present for the dataset to be usable.
const REQUIRED_FIELDS: [&str; 4] = ["total_episodes", "total_tasks", "robot_type", "fps"];

impl InfoRecord {
    /// Parse from raw JSON text.
    ///
    /// `path` is used only for error messages.
    ///
    /// # Errors
    /// `MalformedMetadata` if the text is not a JSON object,
    /// `MissingRequiredField` if a mandatory scalar is absent.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::MalformedMetadata {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let Some(obj) = value.as_object() else {
            return Err(Error::MalformedMetadata {
                path: path.to_path_buf(),
                detail: "info record is not a JSON object".to_string(),
            });
        };

        // Required-field check runs on the raw object so a missing field is
        // reported as such rather than as a generic parse failure.
        for field in REQUIRED_FIELDS {
            if !obj.contains_key(field) {
                return Err(Error::MissingRequiredField {
                    field: field.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        serde_json::from_value(value).map_err(|e| Error::MalformedMetadata {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Names of video features, i.e. the dataset's camera list.
    #[must_use]
    pub fn camera_keys(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, spec)| spec.is_video())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names of all declared features.
    #[must_use]
    pub fn feature_keys(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"{
        "codebase_version": "v2.1",
        "robot_type": "so100",
        "fps": 30,
        "total_episodes": 3,
        "total_frames": 300,
        "total_tasks": 2,
        "total_videos": 6,
        "features": {
            "action": {"dtype": "float32", "shape": [6]},
            "observation.state": {"dtype": "float32", "shape": [6]},
            "observation.images.left": {"dtype": "video", "shape": [480, 640, 3]}
        }
    }"#;

    fn path() -> PathBuf {
        PathBuf::from("/ds/meta/info.json")
    }

    #[test]
    fn test_parse_sample() {
        let info = InfoRecord::parse(SAMPLE, &path()).unwrap();
        assert_eq!(info.total_episodes, 3);
        assert_eq!(info.total_tasks, 2);
        assert_eq!(info.robot_type, "so100");
        assert!((info.fps - 30.0).abs() < f64::EPSILON);
        assert_eq!(info.features.len(), 3);
    }

    #[test]
    fn test_camera_keys_are_video_features() {
        let info = InfoRecord::parse(SAMPLE, &path()).unwrap();
        assert_eq!(info.camera_keys(), vec!["observation.images.left"]);
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let info = InfoRecord::parse(SAMPLE, &path()).unwrap();
        assert_eq!(info.extra["total_videos"], serde_json::json!(6));

        let rewritten = serde_json::to_value(&info).unwrap();
        assert_eq!(rewritten["total_videos"], serde_json::json!(6));
    }

    #[test]
    fn test_missing_required_field() {
        let err = InfoRecord::parse(r#"{"total_episodes": 3}"#, &path()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRequiredField { ref field, .. } if field == "total_tasks"
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = InfoRecord::parse("{not json", &path()).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata { .. }));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = InfoRecord::parse("[1, 2]", &path()).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata { .. }));
    }
}
