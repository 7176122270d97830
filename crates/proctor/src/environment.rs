//! Pre-session environment readiness check

use serde::{Deserialize, Serialize};
use video_frame::VideoFrame;

use crate::config::ProctorConfig;
use crate::models::FaceDetection;

/// Lighting and framing diagnostic for a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCheckResult {
    pub lighting_ok: bool,
    pub face_detected: bool,
    pub face_centered: bool,
    /// Mean luminance (0-255)
    pub brightness: f64,
    pub message: String,
}

impl EnvironmentCheckResult {
    pub fn passed(&self) -> bool {
        self.lighting_ok && self.face_detected && self.face_centered
    }
}

/// Stateless lighting and face-centering check
#[derive(Debug, Clone)]
pub struct EnvironmentChecker {
    min_brightness: f64,
    max_brightness: f64,
    center_x: (f32, f32),
    center_y: (f32, f32),
}

impl EnvironmentChecker {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            min_brightness: config.min_brightness,
            max_brightness: config.max_brightness,
            center_x: config.face_center_x,
            center_y: config.face_center_y,
        }
    }

    /// Check a frame given the face detector's output for it
    pub fn check(&self, frame: &VideoFrame, faces: &[FaceDetection]) -> EnvironmentCheckResult {
        let (brightness, lighting_ok) = self.lighting(frame);

        let face_detected = !faces.is_empty();
        let face_centered = faces.first().is_some_and(|face| {
            let (cx, cy) = face.bbox.center();
            within(cx, self.center_x) && within(cy, self.center_y)
        });

        let mut problems = Vec::new();
        if !lighting_ok {
            if brightness <= self.min_brightness {
                problems.push("Lighting too dark");
            } else {
                problems.push("Lighting too bright");
            }
        }
        if !face_detected {
            problems.push("No face detected");
        } else if !face_centered {
            problems.push("Face not centered");
        }

        let message = if problems.is_empty() {
            "Environment check passed".to_string()
        } else {
            problems.join(", ")
        };

        EnvironmentCheckResult {
            lighting_ok,
            face_detected,
            face_centered,
            brightness,
            message,
        }
    }

    /// Lighting-only result for a frame the face detector could not process
    pub fn check_without_faces(&self, frame: &VideoFrame, error: &str) -> EnvironmentCheckResult {
        let (brightness, lighting_ok) = self.lighting(frame);
        EnvironmentCheckResult {
            lighting_ok,
            face_detected: false,
            face_centered: false,
            brightness,
            message: format!("Environment check error: {}", error),
        }
    }

    fn lighting(&self, frame: &VideoFrame) -> (f64, bool) {
        let brightness = frame.mean_brightness();
        (brightness, brightness > self.min_brightness && brightness < self.max_brightness)
    }
}

impl Default for EnvironmentChecker {
    fn default() -> Self {
        Self::new(&ProctorConfig::default())
    }
}

fn within(value: f32, (low, high): (f32, f32)) -> bool {
    value > low && value < high
}
