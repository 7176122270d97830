//! Proctoring configuration

use serde::{Deserialize, Serialize};

use crate::ProctorError;

/// Proctoring thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    /// Yaw offset from baseline that saturates the yaw score (degrees)
    pub max_yaw_offset_deg: f64,

    /// Pitch offset from baseline that saturates the pitch score (degrees)
    pub max_pitch_offset_deg: f64,

    /// Weight of the yaw score in the looking-away confidence
    pub yaw_weight: f64,

    /// Weight of the pitch score in the looking-away confidence
    pub pitch_weight: f64,

    /// Fraction of a max offset an axis must exceed to count as significant
    pub significant_offset_ratio: f64,

    /// Confidence needed to report looking away
    pub looking_away_threshold: f64,

    /// Confidence at which looking away is reported as high severity
    pub looking_away_high_threshold: f64,

    /// Minimum object detection confidence
    pub object_confidence_threshold: f32,

    /// Minimum seconds between two snapshots of the same session
    pub snapshot_interval_secs: f64,

    /// JPEG quality for snapshots (1-100)
    pub snapshot_jpeg_quality: u8,

    /// Draw labeled object boxes and violation banners on snapshots
    pub annotate_snapshots: bool,

    /// Mean luminance must be strictly above this
    pub min_brightness: f64,

    /// Mean luminance must be strictly below this
    pub max_brightness: f64,

    /// Open interval for the relative face center x
    pub face_center_x: (f32, f32),

    /// Open interval for the relative face center y
    pub face_center_y: (f32, f32),
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            max_yaw_offset_deg: 30.0,
            max_pitch_offset_deg: 25.0,
            yaw_weight: 0.7,
            pitch_weight: 0.3,
            significant_offset_ratio: 0.5,
            looking_away_threshold: 0.75,
            looking_away_high_threshold: 0.90,
            object_confidence_threshold: 0.3,
            snapshot_interval_secs: 2.0,
            snapshot_jpeg_quality: 95,
            annotate_snapshots: true,
            min_brightness: 40.0,
            max_brightness: 220.0,
            face_center_x: (0.3, 0.7),
            face_center_y: (0.2, 0.7),
        }
    }
}

impl ProctorConfig {
    /// Reject threshold combinations the engine cannot work with
    pub fn validate(&self) -> Result<(), ProctorError> {
        if !(self.max_yaw_offset_deg > 0.0 && self.max_pitch_offset_deg > 0.0) {
            return Err(ProctorError::Config("max offsets must be positive".into()));
        }
        if self.yaw_weight < 0.0 || self.pitch_weight < 0.0 || (self.yaw_weight + self.pitch_weight - 1.0).abs() > 1e-9 {
            return Err(ProctorError::Config(format!(
                "yaw and pitch weights must be non-negative and sum to 1 (got {} + {})",
                self.yaw_weight, self.pitch_weight
            )));
        }
        for (name, value) in [
            ("significant_offset_ratio", self.significant_offset_ratio),
            ("looking_away_threshold", self.looking_away_threshold),
            ("looking_away_high_threshold", self.looking_away_high_threshold),
            ("object_confidence_threshold", self.object_confidence_threshold as f64),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ProctorError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if !(self.snapshot_interval_secs >= 0.0 && self.snapshot_interval_secs.is_finite()) {
            return Err(ProctorError::Config("snapshot_interval_secs must be a finite, non-negative number".into()));
        }
        if self.min_brightness >= self.max_brightness {
            return Err(ProctorError::Config(format!(
                "min_brightness {} must be below max_brightness {}",
                self.min_brightness, self.max_brightness
            )));
        }
        if self.face_center_x.0 >= self.face_center_x.1 || self.face_center_y.0 >= self.face_center_y.1 {
            return Err(ProctorError::Config("face center intervals must be non-empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ProctorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_weights() {
        let config = ProctorConfig {
            yaw_weight: 0.9,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProctorError::Config(_))));
    }

    #[test]
    fn test_rejects_inverted_brightness() {
        let config = ProctorConfig {
            min_brightness: 200.0,
            max_brightness: 100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ProctorConfig = serde_json::from_str(r#"{"snapshot_interval_secs": 5.0}"#).unwrap();
        assert_eq!(config.snapshot_interval_secs, 5.0);
        assert_eq!(config.max_yaw_offset_deg, 30.0);
    }
}
