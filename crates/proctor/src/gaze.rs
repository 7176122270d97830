//! Gaze deviation against a calibrated baseline

use crate::analysis::{Severity, Violation, ViolationType};
use crate::calibration::CalibrationBaseline;
use crate::config::ProctorConfig;
use crate::pose::HeadPoseAngles;

/// Outcome of comparing a pose with the baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeAssessment {
    pub is_looking_away: bool,
    /// Weighted, clamped deviation score (0-1)
    pub confidence: f64,
    pub pitch_offset: f64,
    pub yaw_offset: f64,
}

/// Looking-away classifier.
///
/// Yaw carries more weight than pitch since turning sideways is the stronger
/// signal. A high score alone is not enough: at least one axis must also be
/// past half of its saturation offset.
#[derive(Debug, Clone)]
pub struct GazeDeviationClassifier {
    max_pitch_offset: f64,
    max_yaw_offset: f64,
    pitch_weight: f64,
    yaw_weight: f64,
    significant_ratio: f64,
    threshold: f64,
    high_threshold: f64,
}

impl GazeDeviationClassifier {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            max_pitch_offset: config.max_pitch_offset_deg,
            max_yaw_offset: config.max_yaw_offset_deg,
            pitch_weight: config.pitch_weight,
            yaw_weight: config.yaw_weight,
            significant_ratio: config.significant_offset_ratio,
            threshold: config.looking_away_threshold,
            high_threshold: config.looking_away_high_threshold,
        }
    }

    /// Returns (is_looking_away, confidence)
    pub fn classify(&self, pitch: f64, yaw: f64, baseline_pitch: f64, baseline_yaw: f64) -> (bool, f64) {
        let assessment = self.assess(pitch, yaw, baseline_pitch, baseline_yaw);
        (assessment.is_looking_away, assessment.confidence)
    }

    pub fn assess(&self, pitch: f64, yaw: f64, baseline_pitch: f64, baseline_yaw: f64) -> GazeAssessment {
        let pitch_offset = (pitch - baseline_pitch).abs();
        let yaw_offset = (yaw - baseline_yaw).abs();

        let norm_pitch = (pitch_offset / self.max_pitch_offset).min(1.0);
        let norm_yaw = (yaw_offset / self.max_yaw_offset).min(1.0);
        let confidence = self.yaw_weight * norm_yaw + self.pitch_weight * norm_pitch;

        let significant = yaw_offset > self.max_yaw_offset * self.significant_ratio
            || pitch_offset > self.max_pitch_offset * self.significant_ratio;

        GazeAssessment {
            is_looking_away: confidence >= self.threshold && significant,
            confidence,
            pitch_offset,
            yaw_offset,
        }
    }

    pub fn assess_pose(&self, pose: &HeadPoseAngles, baseline: &CalibrationBaseline) -> GazeAssessment {
        self.assess(pose.pitch, pose.yaw, baseline.pitch, baseline.yaw)
    }

    pub fn severity(&self, confidence: f64) -> Severity {
        if confidence >= self.high_threshold {
            Severity::High
        } else {
            Severity::Low
        }
    }

    /// Looking-away violation, if the assessment calls for one
    pub fn violation(&self, assessment: &GazeAssessment) -> Option<Violation> {
        if !assessment.is_looking_away {
            return None;
        }
        let severity = self.severity(assessment.confidence);
        let message = match severity {
            Severity::High => format!(
                "Student is clearly looking away from screen (confidence: {:.2})",
                assessment.confidence
            ),
            _ => format!(
                "Student may be looking away from screen (confidence: {:.2})",
                assessment.confidence
            ),
        };
        Some(Violation::new(ViolationType::LookingAway, severity, message).with_confidence(assessment.confidence))
    }
}

impl Default for GazeDeviationClassifier {
    fn default() -> Self {
        Self::new(&ProctorConfig::default())
    }
}
