//! Frame analysis results and violations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::objects::ProhibitedDetection;
use crate::pose::HeadPoseAngles;

/// Violation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Head turned away from the screen
    LookingAway,
    /// More than one face in frame
    MultipleFaces,
    /// Nobody in frame
    NoPerson,
    /// Phone in view
    PhoneDetected,
    /// Book in view
    BookDetected,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::LookingAway => "looking_away",
            ViolationType::MultipleFaces => "multiple_faces",
            ViolationType::NoPerson => "no_person",
            ViolationType::PhoneDetected => "phone_detected",
            ViolationType::BookDetected => "book_detected",
        }
    }
}

/// Violation severity, ordered low < medium < high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A single violation found in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationType,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Violation {
    pub fn new(kind: ViolationType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Pipeline stages that can be skipped when a collaborator fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    FaceDetection,
    Landmarks,
    ObjectDetection,
}

impl AnalysisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStage::FaceDetection => "face_detection",
            AnalysisStage::Landmarks => "landmarks",
            AnalysisStage::ObjectDetection => "object_detection",
        }
    }
}

/// Complete per-frame report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    pub timestamp: DateTime<Utc>,

    pub face_count: usize,

    /// Head pose, only for single-face frames where the pose solve succeeded
    pub head_pose: Option<HeadPoseAngles>,

    /// Violations in detection order
    pub violations: Vec<Violation>,

    pub looking_away: bool,
    pub multiple_faces: bool,
    pub no_person: bool,
    pub phone_detected: bool,
    pub book_detected: bool,

    /// Prohibited objects that passed the confidence filter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ProhibitedDetection>,

    /// Stages whose collaborator failed this frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_stages: Vec<AnalysisStage>,

    /// Base64 JPEG evidence, subject to the per-session throttle
    pub snapshot_base64: Option<String>,
}

impl FrameAnalysisResult {
    /// Empty report for a frame captured at `timestamp`
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            face_count: 0,
            head_pose: None,
            violations: Vec::new(),
            looking_away: false,
            multiple_faces: false,
            no_person: false,
            phone_detected: false,
            book_detected: false,
            objects: Vec::new(),
            skipped_stages: Vec::new(),
            snapshot_base64: None,
        }
    }

    /// Record a violation and raise its flag
    pub fn push_violation(&mut self, violation: Violation) {
        match violation.kind {
            ViolationType::LookingAway => self.looking_away = true,
            ViolationType::MultipleFaces => self.multiple_faces = true,
            ViolationType::NoPerson => self.no_person = true,
            ViolationType::PhoneDetected => self.phone_detected = true,
            ViolationType::BookDetected => self.book_detected = true,
        }
        self.violations.push(violation);
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Most severe violation; ties go to the one reported first
    pub fn highest_severity_violation(&self) -> Option<&Violation> {
        self.violations
            .iter()
            .rev()
            .max_by_key(|violation| violation.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_violation_sets_flag() {
        let mut result = FrameAnalysisResult::new(Utc::now());
        result.push_violation(Violation::new(ViolationType::BookDetected, Severity::Medium, "Book detected"));

        assert!(result.book_detected);
        assert!(!result.phone_detected);
        assert!(result.has_violations());
    }

    #[test]
    fn test_highest_severity_prefers_first_on_tie() {
        let mut result = FrameAnalysisResult::new(Utc::now());
        result.push_violation(Violation::new(ViolationType::LookingAway, Severity::Low, "away"));
        result.push_violation(Violation::new(ViolationType::NoPerson, Severity::High, "nobody"));
        result.push_violation(Violation::new(ViolationType::PhoneDetected, Severity::High, "phone"));
        result.push_violation(Violation::new(ViolationType::BookDetected, Severity::Medium, "book"));

        assert_eq!(result.highest_severity_violation().unwrap().kind, ViolationType::NoPerson);
    }

    #[test]
    fn test_violation_serialization() {
        let violation = Violation::new(ViolationType::LookingAway, Severity::High, "away").with_confidence(0.94);
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["type"], "looking_away");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["confidence"], 0.94);

        let plain = serde_json::to_value(Violation::new(ViolationType::NoPerson, Severity::High, "nobody")).unwrap();
        assert!(plain.get("confidence").is_none());
    }

    #[test]
    fn test_empty_result_serialization() {
        let json = serde_json::to_value(FrameAnalysisResult::new(Utc::now())).unwrap();
        assert_eq!(json["face_count"], 0);
        assert!(json["head_pose"].is_null());
        assert!(json["snapshot_base64"].is_null());
        assert!(json.get("skipped_stages").is_none());
    }
}
