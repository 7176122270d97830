//! Prohibited object mapping from object detector output

use serde::{Deserialize, Serialize};
use video_frame::BoxOverlay;

use crate::analysis::{Severity, Violation, ViolationType};
use crate::models::ObjectDetection;

/// Objects not allowed in view during an exam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProhibitedObject {
    Phone,
    Book,
}

impl ProhibitedObject {
    /// Normalize a detector label (case and surrounding whitespace ignored)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "cell phone" | "phone" | "mobile" => Some(ProhibitedObject::Phone),
            "book" => Some(ProhibitedObject::Book),
            _ => None,
        }
    }

    pub fn violation_type(&self) -> ViolationType {
        match self {
            ProhibitedObject::Phone => ViolationType::PhoneDetected,
            ProhibitedObject::Book => ViolationType::BookDetected,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ProhibitedObject::Phone => Severity::High,
            ProhibitedObject::Book => Severity::Medium,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ProhibitedObject::Phone => "Mobile phone detected",
            ProhibitedObject::Book => "Book detected",
        }
    }

    /// Snapshot label prefix
    fn tag(&self) -> &'static str {
        match self {
            ProhibitedObject::Phone => "PHONE",
            ProhibitedObject::Book => "BOOK",
        }
    }

    /// Overlay color (RGB)
    fn color(&self) -> [u8; 3] {
        match self {
            ProhibitedObject::Phone => [255, 0, 0],
            ProhibitedObject::Book => [0, 0, 255],
        }
    }
}

/// Accepted detection of a prohibited object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProhibitedDetection {
    pub kind: ProhibitedObject,
    pub label: String,
    pub confidence: f32,
    /// [x1, y1, x2, y2] in pixels
    pub bbox: [f32; 4],
}

/// Prohibited objects found in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectFindings {
    pub detections: Vec<ProhibitedDetection>,
}

impl ObjectFindings {
    pub fn contains(&self, kind: ProhibitedObject) -> bool {
        self.detections.iter().any(|d| d.kind == kind)
    }

    pub fn phone_detected(&self) -> bool {
        self.contains(ProhibitedObject::Phone)
    }

    pub fn book_detected(&self) -> bool {
        self.contains(ProhibitedObject::Book)
    }

    /// One violation per object type, phone before book
    pub fn violations(&self) -> Vec<Violation> {
        [ProhibitedObject::Phone, ProhibitedObject::Book]
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .map(|kind| Violation::new(kind.violation_type(), kind.severity(), kind.message()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Labeled snapshot box per detection
    pub fn overlays(&self) -> Vec<BoxOverlay> {
        self.detections
            .iter()
            .map(|d| BoxOverlay {
                x1: d.bbox[0],
                y1: d.bbox[1],
                x2: d.bbox[2],
                y2: d.bbox[3],
                color: d.kind.color(),
                label: Some(format!("{} {:.2}", d.kind.tag(), d.confidence)),
            })
            .collect()
    }
}

/// Maps raw detections to prohibited object findings
#[derive(Debug, Clone)]
pub struct ObjectViolationMapper {
    confidence_threshold: f32,
}

impl ObjectViolationMapper {
    pub fn new(confidence_threshold: f32) -> Self {
        Self { confidence_threshold }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn map(&self, detections: &[ObjectDetection]) -> ObjectFindings {
        let detections = detections
            .iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .filter_map(|d| {
                ProhibitedObject::from_label(&d.label).map(|kind| ProhibitedDetection {
                    kind,
                    label: d.label.clone(),
                    confidence: d.confidence,
                    bbox: d.bbox,
                })
            })
            .collect();
        ObjectFindings { detections }
    }
}

impl Default for ObjectViolationMapper {
    fn default() -> Self {
        Self::new(0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::object;

    #[test]
    fn test_label_normalization() {
        assert_eq!(ProhibitedObject::from_label("cell phone"), Some(ProhibitedObject::Phone));
        assert_eq!(ProhibitedObject::from_label(" Mobile "), Some(ProhibitedObject::Phone));
        assert_eq!(ProhibitedObject::from_label("PHONE"), Some(ProhibitedObject::Phone));
        assert_eq!(ProhibitedObject::from_label("book"), Some(ProhibitedObject::Book));
        assert_eq!(ProhibitedObject::from_label("laptop"), None);
    }

    #[test]
    fn test_confidence_filter() {
        let findings = ObjectViolationMapper::new(0.3).map(&[object("cell phone", 0.4), object("book", 0.25)]);
        assert!(findings.phone_detected());
        assert!(!findings.book_detected());

        let violations = findings.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationType::PhoneDetected);
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let findings = ObjectViolationMapper::new(0.3).map(&[object("book", 0.3)]);
        assert!(findings.book_detected());
        assert_eq!(findings.violations()[0].severity, Severity::Medium);
    }

    #[test]
    fn test_one_violation_per_type() {
        let findings = ObjectViolationMapper::default().map(&[
            object("book", 0.9),
            object("phone", 0.5),
            object("cell phone", 0.8),
            object("book", 0.6),
            object("person", 0.99),
        ]);
        assert_eq!(findings.detections.len(), 4);

        let kinds: Vec<ViolationType> = findings.violations().iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationType::PhoneDetected, ViolationType::BookDetected]);
    }

    #[test]
    fn test_overlays_carry_labels() {
        let findings = ObjectViolationMapper::default().map(&[object("cell phone", 0.874), object("book", 0.5)]);
        let overlays = findings.overlays();

        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].label.as_deref(), Some("PHONE 0.87"));
        assert_eq!(overlays[0].color, [255, 0, 0]);
        assert_eq!(overlays[1].label.as_deref(), Some("BOOK 0.50"));
        assert_eq!(overlays[1].color, [0, 0, 255]);
        assert_eq!((overlays[1].x1, overlays[1].y2), (40.0, 160.0));
    }
}
