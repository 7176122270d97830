//! Exam Proctoring Engine
//!
//! Frame-level violation decisions for online exam sessions:
//! - Presence checks (no person / multiple people)
//! - Head pose estimation from facial landmarks
//! - Gaze deviation against a per-session calibration baseline
//! - Prohibited object mapping (phone, book)
//! - Environment readiness checks
//! - Throttled evidence snapshots

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod environment;
pub mod gaze;
pub mod models;
pub mod objects;
pub mod pnp;
pub mod pose;
pub mod presence;
pub mod snapshot;
pub mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::{AnalysisStage, FrameAnalysisResult, Severity, Violation, ViolationType};
pub use calibration::{CalibrationBaseline, CalibrationError, CalibrationManager};
pub use config::ProctorConfig;
pub use engine::{ModelSet, ProctorEngine};
pub use environment::{EnvironmentCheckResult, EnvironmentChecker};
pub use gaze::{GazeAssessment, GazeDeviationClassifier};
pub use models::{
    CameraIntrinsics, FaceDetection, FaceDetector, Landmark, LandmarkModel, LandmarkSet, ObjectDetection,
    ObjectDetector, PoseSolver, RelativeBox,
};
pub use objects::{ObjectFindings, ObjectViolationMapper, ProhibitedDetection, ProhibitedObject};
pub use pnp::IterativePnpSolver;
pub use pose::{HeadPoseAngles, HeadPoseEstimator, PoseResult, PoseUnavailable};
pub use presence::{PresenceAnalyzer, PresenceOutcome};
pub use snapshot::annotate_snapshot;
pub use throttle::EvidenceThrottle;

use thiserror::Error;
use video_frame::FrameError;

/// Proctoring error types
#[derive(Error, Debug)]
pub enum ProctorError {
    #[error("Invalid frame data: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
