use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::domain::frame_annotator::BoxStyle;
use crate::shared::constants::{
    DEFAULT_GROUP_OVERLAP, DEFAULT_MIN_NEIGHBORS, DEFAULT_MIN_SIZE_FRACTION,
    DEFAULT_SCALE_FACTOR, DEFAULT_STEP_FRACTION,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Tuning for the multi-scale scan and the window grouping that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Smallest window, as a fraction of the frame's shorter side.
    pub min_size_fraction: f64,
    /// Growth factor between consecutive rungs of the scale ladder.
    pub scale_factor: f64,
    /// Sliding step, as a fraction of the window size.
    pub step_fraction: f64,
    /// Raw windows a group needs before it is reported.
    pub min_neighbors: usize,
    /// IoU at which a raw window joins an existing group.
    pub group_overlap: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_size_fraction: DEFAULT_MIN_SIZE_FRACTION,
            scale_factor: DEFAULT_SCALE_FACTOR,
            step_fraction: DEFAULT_STEP_FRACTION,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            group_overlap: DEFAULT_GROUP_OVERLAP,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_fraction("min_size_fraction", self.min_size_fraction)?;
        check_unit_fraction("step_fraction", self.step_fraction)?;
        check_unit_fraction("group_overlap", self.group_overlap)?;
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(ConfigError::invalid(
                "scale_factor",
                format!("must be greater than 1.0, got {}", self.scale_factor),
            ));
        }
        if self.min_neighbors == 0 {
            return Err(ConfigError::invalid("min_neighbors", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_unit_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::invalid(
            field,
            format!("must be in (0.0, 1.0], got {value}"),
        ));
    }
    Ok(())
}

/// Which capture device feeds the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSelector {
    /// Image files in a directory, replayed in file-name order.
    Directory { path: PathBuf },
    /// Generated frames carrying a moving detection target.
    Synthetic {
        width: u32,
        height: u32,
        frames: usize,
    },
}

impl Default for SourceSelector {
    fn default() -> Self {
        SourceSelector::Synthetic {
            width: 640,
            height: 480,
            frames: 100,
        }
    }
}

/// Host-supplied configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub detector: DetectorConfig,
    pub source: SourceSelector,
    pub style: BoxStyle,
    /// Run detection every Nth frame (1 = every frame).
    pub skip_frames: usize,
    /// Detect on a gray plane shrunk by this integer factor (1 = full size).
    pub downscale: u32,
    /// Capture on a separate thread and drop frames while detection is busy.
    pub threaded: bool,
    pub model_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            source: SourceSelector::default(),
            style: BoxStyle::default(),
            skip_frames: 1,
            downscale: 1,
            threaded: false,
            model_path: None,
        }
    }
}

impl PipelineSettings {
    /// Reads settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: PipelineSettings =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        if self.skip_frames == 0 {
            return Err(ConfigError::invalid("skip_frames", "must be at least 1"));
        }
        if self.downscale == 0 {
            return Err(ConfigError::invalid("downscale", "must be at least 1"));
        }
        if self.style.stroke_width == 0 {
            return Err(ConfigError::invalid("stroke_width", "must be at least 1"));
        }
        if let SourceSelector::Synthetic { width, height, .. } = self.source {
            if width == 0 || height == 0 {
                return Err(ConfigError::invalid(
                    "source",
                    format!("synthetic frame size must be positive, got {width}x{height}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineSettings::default().validate().is_ok());
    }

    #[test]
    fn test_default_detector_values() {
        let config = DetectorConfig::default();
        assert_eq!(config.min_neighbors, 2);
        assert!((config.scale_factor - 1.1).abs() < f64::EPSILON);
        assert!((config.min_size_fraction - 0.2).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case::scale_factor_one(DetectorConfig { scale_factor: 1.0, ..Default::default() }, "scale_factor")]
    #[case::scale_factor_negative(DetectorConfig { scale_factor: -2.0, ..Default::default() }, "scale_factor")]
    #[case::scale_factor_nan(DetectorConfig { scale_factor: f64::NAN, ..Default::default() }, "scale_factor")]
    #[case::zero_min_size(DetectorConfig { min_size_fraction: 0.0, ..Default::default() }, "min_size_fraction")]
    #[case::min_size_over_one(DetectorConfig { min_size_fraction: 1.5, ..Default::default() }, "min_size_fraction")]
    #[case::zero_step(DetectorConfig { step_fraction: 0.0, ..Default::default() }, "step_fraction")]
    #[case::zero_overlap(DetectorConfig { group_overlap: 0.0, ..Default::default() }, "group_overlap")]
    #[case::zero_neighbors(DetectorConfig { min_neighbors: 0, ..Default::default() }, "min_neighbors")]
    fn test_invalid_detector_config(#[case] config: DetectorConfig, #[case] expected_field: &str) {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected Invalid({expected_field}), got {other:?}"),
        }
    }

    #[test]
    fn test_zero_skip_frames_rejected() {
        let settings = PipelineSettings {
            skip_frames: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "skip_frames", .. })
        ));
    }

    #[test]
    fn test_zero_downscale_rejected() {
        let settings = PipelineSettings {
            downscale: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "downscale", .. })
        ));
    }

    #[test]
    fn test_zero_stroke_rejected() {
        let mut settings = PipelineSettings::default();
        settings.style.stroke_width = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "detector": { "min_neighbors": 3 },
                "source": { "kind": "directory", "path": "/tmp/frames" },
                "threaded": true
            }"#,
        )
        .unwrap();

        let settings = PipelineSettings::load(&path).unwrap();
        assert_eq!(settings.detector.min_neighbors, 3);
        assert!((settings.detector.scale_factor - 1.1).abs() < f64::EPSILON);
        assert!(settings.threaded);
        assert_eq!(
            settings.source,
            SourceSelector::Directory {
                path: PathBuf::from("/tmp/frames")
            }
        );
        assert_eq!(settings.style, BoxStyle::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "detector": { "scale_factor": 0.9 } }"#).unwrap();
        assert!(matches!(
            PipelineSettings::load(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineSettings::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            PipelineSettings::load(Path::new("/nonexistent/settings.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_settings_roundtrip_through_json() {
        let settings = PipelineSettings {
            skip_frames: 3,
            model_path: Some(PathBuf::from("model.json")),
            ..Default::default()
        };
        let text = serde_json::to_string(&settings).unwrap();
        let back: PipelineSettings = serde_json::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }
}
