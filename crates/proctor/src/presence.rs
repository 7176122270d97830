//! Presence checks from face detector output

use crate::analysis::{Severity, Violation, ViolationType};
use crate::models::FaceDetection;

/// Face count and the presence violation it implies
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceOutcome {
    pub face_count: usize,
    pub violation: Option<Violation>,
}

impl PresenceOutcome {
    /// Head pose is only evaluated for exactly one face
    pub fn single_face(&self) -> bool {
        self.face_count == 1
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceAnalyzer;

impl PresenceAnalyzer {
    pub fn analyze(&self, detections: &[FaceDetection]) -> PresenceOutcome {
        let face_count = detections.len();
        let violation = match face_count {
            0 => Some(Violation::new(
                ViolationType::NoPerson,
                Severity::High,
                "No person detected in frame",
            )),
            1 => None,
            n => Some(Violation::new(
                ViolationType::MultipleFaces,
                Severity::High,
                format!("{} people detected in frame", n),
            )),
        };
        PresenceOutcome { face_count, violation }
    }
}
