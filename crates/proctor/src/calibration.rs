//! Per-session gaze calibration

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use video_frame::{decode_base64_image, FrameError, VideoFrame};

use crate::models::LandmarkModel;
use crate::pose::{HeadPoseAngles, HeadPoseEstimator, PoseUnavailable};

/// Neutral head orientation of an examinee, in degrees.
///
/// Roll is not part of the baseline since gaze comparison ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBaseline {
    pub pitch: f64,
    pub yaw: f64,
}

impl CalibrationBaseline {
    pub fn new(pitch: f64, yaw: f64) -> Self {
        Self { pitch, yaw }
    }
}

impl From<HeadPoseAngles> for CalibrationBaseline {
    fn from(angles: HeadPoseAngles) -> Self {
        Self::new(angles.pitch, angles.yaw)
    }
}

/// Calibration failure reasons
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("No face detected for calibration")]
    NoFace,

    #[error("Head pose unavailable for calibration: {0}")]
    PoseUnavailable(PoseUnavailable),

    #[error("Calibration image could not be decoded: {0}")]
    Decode(FrameError),

    #[error("Invalid calibration frame: {0}")]
    InvalidFrame(FrameError),

    #[error("Landmark model failed during calibration: {0}")]
    Model(String),
}

/// Captures a session baseline from a single frame
pub struct CalibrationManager<'a> {
    estimator: &'a HeadPoseEstimator,
}

impl<'a> CalibrationManager<'a> {
    pub fn new(estimator: &'a HeadPoseEstimator) -> Self {
        Self { estimator }
    }

    pub fn calibrate(
        &self,
        landmarks: &mut dyn LandmarkModel,
        frame: &VideoFrame,
    ) -> Result<CalibrationBaseline, CalibrationError> {
        frame.validate().map_err(CalibrationError::InvalidFrame)?;

        let sets = landmarks
            .detect(frame)
            .map_err(|e| CalibrationError::Model(e.to_string()))?;
        let Some(face) = sets.first() else {
            debug!("Calibration frame has no landmarks");
            return Err(CalibrationError::NoFace);
        };

        let angles = self
            .estimator
            .estimate(face, frame.width, frame.height)
            .into_result()
            .map_err(CalibrationError::PoseUnavailable)?;

        let baseline = CalibrationBaseline::from(angles);
        info!("Calibrated baseline: pitch={:.1}, yaw={:.1}", baseline.pitch, baseline.yaw);
        Ok(baseline)
    }

    /// Decode a base64 image (data URL prefix allowed) and calibrate on it
    pub fn calibrate_encoded(
        &self,
        landmarks: &mut dyn LandmarkModel,
        payload: &str,
    ) -> Result<CalibrationBaseline, CalibrationError> {
        let frame = decode_base64_image(payload).map_err(CalibrationError::Decode)?;
        self.calibrate(landmarks, &frame)
    }
}
